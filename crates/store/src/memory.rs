use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use cardflip_model::{Card, CardId, ProblemId};
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{CardStore, Result, StoreError};

/// Language assigned to freshly created solution cards.
pub const DEFAULT_SOLUTION_LANGUAGE: &str = "java";

/// One write observed by [`MemoryCardStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
	Code { card_id: CardId, code: String, language: String },
	Notes { card_id: CardId, notes: String },
}

impl StoreWrite {
	pub fn card_id(&self) -> &CardId {
		match self {
			Self::Code { card_id, .. } | Self::Notes { card_id, .. } => card_id,
		}
	}
}

#[derive(Debug, Default)]
struct Inner {
	cards: HashMap<CardId, Card>,
	writes: Vec<StoreWrite>,
	latency: Duration,
	write_failure: Option<String>,
}

/// In-process [`CardStore`].
///
/// Supports artificial latency and write-failure injection so callers can
/// exercise interleavings between timers and persistence.
#[derive(Debug)]
pub struct MemoryCardStore {
	inner: Mutex<Inner>,
	solution_language: String,
}

impl Default for MemoryCardStore {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryCardStore {
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(Inner::default()),
			solution_language: DEFAULT_SOLUTION_LANGUAGE.to_string(),
		}
	}

	/// Sets the language assigned to solution cards created by this store.
	pub fn with_solution_language(mut self, language: impl Into<String>) -> Self {
		self.solution_language = language.into();
		self
	}

	/// Delays every operation by `latency`.
	pub fn set_latency(&self, latency: Duration) {
		self.inner.lock().latency = latency;
	}

	/// Makes every subsequent write fail with `message`, or restores normal
	/// writes when `None`.
	pub fn fail_writes(&self, message: Option<&str>) {
		self.inner.lock().write_failure = message.map(str::to_string);
	}

	/// Inserts a card as-is, replacing any card with the same id.
	pub fn insert(&self, card: Card) {
		self.inner.lock().cards.insert(card.id.clone(), card);
	}

	/// Appends a regular card to a problem and returns it.
	pub fn insert_regular(&self, problem_id: &ProblemId, code: &str, language: &str) -> Card {
		let mut inner = self.inner.lock();
		let next_number = inner
			.cards
			.values()
			.filter(|c| &c.problem_id == problem_id && !c.is_solution)
			.map(|c| c.card_number)
			.max()
			.unwrap_or(0)
			+ 1;
		let card = Card::regular(uuid::Uuid::new_v4().to_string(), problem_id.0.clone(), next_number).with_content(code, "", language);
		inner.cards.insert(card.id.clone(), card.clone());
		card
	}

	/// Every successful write, in order.
	pub fn writes(&self) -> Vec<StoreWrite> {
		self.inner.lock().writes.clone()
	}

	/// Successful writes addressed to `card_id`.
	pub fn writes_to(&self, card_id: &CardId) -> Vec<StoreWrite> {
		self.inner.lock().writes.iter().filter(|w| w.card_id() == card_id).cloned().collect()
	}

	/// Current stored copy of a card.
	pub fn snapshot(&self, card_id: &CardId) -> Option<Card> {
		self.inner.lock().cards.get(card_id).cloned()
	}

	async fn simulate_latency(&self) {
		let latency = self.inner.lock().latency;
		if !latency.is_zero() {
			tokio::time::sleep(latency).await;
		}
	}

	fn find_solution(inner: &Inner, problem_id: &ProblemId) -> Option<Card> {
		inner.cards.values().find(|c| &c.problem_id == problem_id && c.is_solution).cloned()
	}

	fn write(&self, card_id: &CardId, apply: impl FnOnce(&mut Card), record: StoreWrite) -> Result<()> {
		let mut inner = self.inner.lock();
		if let Some(message) = &inner.write_failure {
			return Err(StoreError::Backend(message.clone()));
		}
		let card = inner.cards.get_mut(card_id).ok_or_else(|| StoreError::CardNotFound(card_id.clone()))?;
		apply(card);
		card.last_modified = Utc::now();
		inner.writes.push(record);
		Ok(())
	}
}

#[async_trait]
impl CardStore for MemoryCardStore {
	async fn get(&self, problem_id: &ProblemId) -> Result<Option<Card>> {
		self.simulate_latency().await;
		Ok(Self::find_solution(&self.inner.lock(), problem_id))
	}

	async fn create(&self, problem_id: &ProblemId) -> Result<Card> {
		self.simulate_latency().await;
		let mut inner = self.inner.lock();
		if let Some(message) = &inner.write_failure {
			return Err(StoreError::Backend(message.clone()));
		}
		if Self::find_solution(&inner, problem_id).is_some() {
			return Err(StoreError::SolutionExists(problem_id.clone()));
		}
		let card = Card::solution(uuid::Uuid::new_v4().to_string(), problem_id.0.clone(), self.solution_language.clone());
		debug!(problem_id = %problem_id, card_id = %card.id, "store.solution_created");
		inner.cards.insert(card.id.clone(), card.clone());
		Ok(card)
	}

	async fn update_code(&self, card_id: &CardId, code: &str, language: &str) -> Result<()> {
		self.simulate_latency().await;
		trace!(card_id = %card_id, bytes = code.len(), "store.update_code");
		self.write(
			card_id,
			|card| {
				card.code = Some(code.to_string());
				card.language = Some(language.to_string());
			},
			StoreWrite::Code {
				card_id: card_id.clone(),
				code: code.to_string(),
				language: language.to_string(),
			},
		)
	}

	async fn update_notes(&self, card_id: &CardId, notes: &str) -> Result<()> {
		self.simulate_latency().await;
		trace!(card_id = %card_id, bytes = notes.len(), "store.update_notes");
		self.write(
			card_id,
			|card| card.notes = Some(notes.to_string()),
			StoreWrite::Notes {
				card_id: card_id.clone(),
				notes: notes.to_string(),
			},
		)
	}

	async fn exists(&self, problem_id: &ProblemId) -> Result<bool> {
		self.simulate_latency().await;
		Ok(Self::find_solution(&self.inner.lock(), problem_id).is_some())
	}

	async fn card(&self, card_id: &CardId) -> Result<Option<Card>> {
		self.simulate_latency().await;
		Ok(self.inner.lock().cards.get(card_id).cloned())
	}

	async fn regular_cards(&self, problem_id: &ProblemId) -> Result<Vec<Card>> {
		self.simulate_latency().await;
		let mut cards: Vec<_> = self
			.inner
			.lock()
			.cards
			.values()
			.filter(|c| &c.problem_id == problem_id && !c.is_solution)
			.cloned()
			.collect();
		cards.sort_by_key(|c| c.card_number);
		Ok(cards)
	}

	async fn delete_solution(&self, problem_id: &ProblemId) -> Result<bool> {
		self.simulate_latency().await;
		let mut inner = self.inner.lock();
		let Some(card) = Self::find_solution(&inner, problem_id) else {
			return Ok(false);
		};
		inner.cards.remove(&card.id);
		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn problem() -> ProblemId {
		ProblemId::from("two-sum")
	}

	#[tokio::test]
	async fn created_solution_uses_configured_defaults() {
		let store = MemoryCardStore::new();
		let card = store.create(&problem()).await.unwrap();
		assert!(card.is_solution);
		assert_eq!(card.card_number, 0);
		assert_eq!(card.language.as_deref(), Some(DEFAULT_SOLUTION_LANGUAGE));
		assert_eq!(card.status, "In Progress");
		assert!(store.exists(&problem()).await.unwrap());
		assert_eq!(store.create(&problem()).await, Err(StoreError::SolutionExists(problem())));
	}

	#[tokio::test]
	async fn toggle_without_create_reports_inactive() {
		let store = MemoryCardStore::new().with_solution_language("python");
		let toggled = store.toggle(&problem(), false).await.unwrap();
		assert!(!toggled.is_active);
		assert!(toggled.card.is_none());

		let toggled = store.toggle(&problem(), true).await.unwrap();
		assert!(toggled.is_active);
		assert_eq!(toggled.card.unwrap().language.as_deref(), Some("python"));

		let again = store.toggle(&problem(), true).await.unwrap();
		assert!(again.is_active);
		assert_eq!(store.regular_cards(&problem()).await.unwrap().len(), 0);
	}

	#[tokio::test]
	async fn regular_cards_exclude_solution_and_sort() {
		let store = MemoryCardStore::new();
		let first = store.insert_regular(&problem(), "a", "rust");
		let second = store.insert_regular(&problem(), "b", "rust");
		store.create(&problem()).await.unwrap();

		let cards = store.regular_cards(&problem()).await.unwrap();
		assert_eq!(cards.iter().map(|c| c.id.clone()).collect::<Vec<_>>(), vec![first.id, second.id]);
		assert_eq!(cards[1].card_number, 2);
	}

	#[tokio::test]
	async fn writes_update_card_and_log() {
		let store = MemoryCardStore::new();
		let card = store.insert_regular(&problem(), "a", "python");
		store.update_code(&card.id, "ab", "python").await.unwrap();
		store.update_notes(&card.id, "hint").await.unwrap();

		let stored = store.snapshot(&card.id).unwrap();
		assert_eq!(stored.code.as_deref(), Some("ab"));
		assert_eq!(stored.notes.as_deref(), Some("hint"));
		assert_eq!(store.writes_to(&card.id).len(), 2);
	}

	#[tokio::test]
	async fn injected_failure_rejects_writes() {
		let store = MemoryCardStore::new();
		let card = store.insert_regular(&problem(), "a", "python");
		store.fail_writes(Some("disk full"));
		let err = store.update_code(&card.id, "b", "python").await.unwrap_err();
		assert_eq!(err.to_string(), "storage backend failed: disk full");
		assert!(store.writes().is_empty());

		store.fail_writes(None);
		store.update_code(&card.id, "b", "python").await.unwrap();
	}

	#[tokio::test]
	async fn update_unknown_card_is_typed_error() {
		let store = MemoryCardStore::new();
		let missing = CardId::from("nope");
		assert_eq!(store.update_notes(&missing, "x").await, Err(StoreError::CardNotFound(missing)));
	}

	#[tokio::test]
	async fn delete_solution_reports_presence() {
		let store = MemoryCardStore::new();
		assert!(!store.delete_solution(&problem()).await.unwrap());
		store.create(&problem()).await.unwrap();
		assert!(store.delete_solution(&problem()).await.unwrap());
		assert!(store.get(&problem()).await.unwrap().is_none());
	}
}
