//! Storage collaborator for problem cards.
//!
//! The session controller only talks to storage through [`CardStore`]. Every
//! method is asynchronous and fallible; failures are [`StoreError`] values
//! with a human-readable message.

pub mod error;
mod memory;

use async_trait::async_trait;
use cardflip_model::{Card, CardId, ProblemId};
pub use error::{Result, StoreError};
pub use memory::{DEFAULT_SOLUTION_LANGUAGE, MemoryCardStore, StoreWrite};

/// Result of [`CardStore::toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionToggle {
	/// True when a solution card is available to view.
	pub is_active: bool,
	pub card: Option<Card>,
}

/// Asynchronous card storage.
///
/// The `get`/`create`/`exists`/`toggle`/`delete_solution` family is keyed by
/// problem and addresses that problem's single solution card. `update_code`
/// and `update_notes` are keyed by card id and accept any card.
#[async_trait]
pub trait CardStore: Send + Sync {
	/// Fetches the solution card for a problem.
	async fn get(&self, problem_id: &ProblemId) -> Result<Option<Card>>;

	/// Creates the solution card for a problem.
	async fn create(&self, problem_id: &ProblemId) -> Result<Card>;

	async fn update_code(&self, card_id: &CardId, code: &str, language: &str) -> Result<()>;

	async fn update_notes(&self, card_id: &CardId, notes: &str) -> Result<()>;

	async fn exists(&self, problem_id: &ProblemId) -> Result<bool>;

	/// Returns the solution card, creating it first when missing and
	/// `create_if_missing` is set.
	async fn toggle(&self, problem_id: &ProblemId, create_if_missing: bool) -> Result<SolutionToggle> {
		if let Some(card) = self.get(problem_id).await? {
			return Ok(SolutionToggle {
				is_active: true,
				card: Some(card),
			});
		}
		if !create_if_missing {
			return Ok(SolutionToggle { is_active: false, card: None });
		}
		let card = self.create(problem_id).await?;
		Ok(SolutionToggle {
			is_active: true,
			card: Some(card),
		})
	}

	/// Fetches any card by id.
	async fn card(&self, card_id: &CardId) -> Result<Option<Card>>;

	/// Non-solution cards of a problem, ordered by card number.
	async fn regular_cards(&self, problem_id: &ProblemId) -> Result<Vec<Card>>;

	/// Deletes the solution card. Returns true if one existed.
	async fn delete_solution(&self, problem_id: &ProblemId) -> Result<bool>;
}
