//! Error types for the session controller.

use cardflip_model::CardMode;
use cardflip_store::StoreError;
use thiserror::Error;

/// Failures reported by [`crate::CardSession`] actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
	/// Storage rejected or failed an operation.
	#[error(transparent)]
	Store(#[from] StoreError),

	/// Another mode transition is still in flight.
	#[error("a mode transition is already in progress")]
	TransitionInProgress,

	/// The requested transition failed validation before it started.
	#[error("cannot switch from {from} to {to}: {reason}")]
	TransitionRejected { from: CardMode, to: CardMode, reason: String },

	/// A started transition failed and was rolled back, or left in error recovery.
	#[error("mode transition failed: {0}")]
	TransitionFailed(String),

	/// Unsaved edits could not be persisted, so the action left the editor as is.
	#[error("unsaved edits could not be saved: {0}")]
	FlushFailed(String),

	/// No single valid save target exists for the current mode.
	#[error("invalid save target: {0}")]
	InvalidSaveTarget(String),

	/// The action requires a solution card that storage does not have.
	#[error("problem has no solution card")]
	NoSolutionCard,
}

/// Result type for session actions.
pub type Result<T> = std::result::Result<T, SessionError>;
