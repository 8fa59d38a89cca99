//! Shared value types for the dual-mode card editor.
//!
//! Nothing in this crate has behavior beyond construction and merging. The
//! session controller owns every instance at runtime; the editor surface only
//! reads snapshots and emits [`EditorPatch`]es.

mod card;
mod editor_state;
mod mode;

pub use card::{Card, CardId, ProblemId};
pub use editor_state::{EditorPatch, EditorState};
pub use mode::{CardMode, CardModeState, SaveChannel, TransitionState};
