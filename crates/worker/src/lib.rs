//! Worker primitives for the card session controller.
//!
//! Every timer in the controller is a [`Debouncer`] owned by the session that
//! created it, so dropping a session tears down its timers. Spawned work is
//! tagged with a [`TaskClass`] for log filtering.

mod class;
mod debounce;
mod spawn;
mod token;

pub use class::TaskClass;
pub use debounce::Debouncer;
pub use spawn::spawn;
pub use token::{GenerationClock, GenerationToken};
