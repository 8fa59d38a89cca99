//! Dual-mode card editor controller.
//!
//! One shared code/notes editor surface is bound to either a problem's
//! regular attempt card or its single solution card. [`CardSession`] keeps the
//! two from leaking into each other:
//!
//! - [`transition`]: the mode switch state machine with rollback.
//! - [`content_sync`]: debounced pulls of card content into the editor.
//! - [`autosave`]: one debounced save channel per card kind, plus a
//!   concurrent force-flush barrier.
//! - [`force_save`]: single-target save validation.
//! - [`consistency`]: state validation, snapshots, and recovery plans.
//! - [`telemetry`]: the observer port for transitions, saves, and validation failures.

pub mod autosave;
pub mod config;
pub mod consistency;
pub mod content_sync;
pub mod error;
pub mod force_save;
mod invariants;
mod session;
pub mod telemetry;
#[cfg(test)]
mod test_support;
pub mod transition;

pub use autosave::{AutosaveScheduler, FlushReport, PendingSaves, SaveOutcome, SaveRequest, ScheduleOutcome};
pub use config::{ConfigError, SessionConfig};
pub use consistency::{ConsistencyGuard, RecoveryAction, RecoveryPlan, StateSnapshot, StateView, ValidationRecord, ValidationResult};
pub use content_sync::{ContentSynchronizer, SyncDecision};
pub use error::{Result, SessionError};
pub use force_save::{ForceSaveOptions, ForceSaveResult, ForceSaver, SaveContext, SaveTargetValidation, validate_save_target};
pub use session::CardSession;
pub use telemetry::{NoopObserver, SaveEvent, SaveTrigger, SessionObserver, TracingObserver, TransitionEvent, TransitionOutcome, ValidationKind};
pub use transition::{EditOutcome, ModeTransitionMachine, TransitionRecovery};
