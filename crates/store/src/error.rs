//! Error types for card storage.

use cardflip_model::{CardId, ProblemId};
use thiserror::Error;

/// Errors surfaced by a [`crate::CardStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
	/// No card exists with the given id.
	#[error("card not found: {0}")]
	CardNotFound(CardId),

	/// A solution card already exists where a new one was requested.
	#[error("solution card already exists for problem {0}")]
	SolutionExists(ProblemId),

	/// The backing storage rejected or failed the operation.
	#[error("storage backend failed: {0}")]
	Backend(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
