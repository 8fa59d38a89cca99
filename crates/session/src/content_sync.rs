//! Debounced pulls of entity content into the editor state.
//!
//! The synchronizer itself is the decision half: it says whether a pull is
//! due and produces the content to install. Timing lives in the session,
//! which drives it from a [`cardflip_worker::Debouncer`].

use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use cardflip_model::{Card, CardId, CardMode, EditorState};
use rustc_hash::FxHasher;

/// Default quiet period before a pull.
pub const SYNC_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq, Eq)]
struct SyncRecord {
	card_id: CardId,
	mode: CardMode,
	at: Instant,
	fingerprint: u64,
}

/// Why a pull was or was not performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
	Sync,
	Transitioning,
	NoEntity,
	/// The same card, mode, and content were pulled within the window.
	Recent,
	/// The editor holds edits to the same card that are not stored yet.
	UnsavedEdits,
}

#[derive(Debug)]
pub struct ContentSynchronizer {
	window: Duration,
	last: Option<SyncRecord>,
}

impl Default for ContentSynchronizer {
	fn default() -> Self {
		Self::new(SYNC_DEBOUNCE)
	}
}

impl ContentSynchronizer {
	pub fn new(window: Duration) -> Self {
		Self { window, last: None }
	}

	/// Decides whether `card` should be pulled for `mode`.
	///
	/// Suppression needs the same card id, mode, and content as the last pull
	/// inside the window; a card reloaded with new fields always syncs.
	pub fn decide(&self, card: Option<&Card>, mode: CardMode, is_transitioning: bool, now: Instant) -> SyncDecision {
		if is_transitioning {
			return SyncDecision::Transitioning;
		}
		let Some(card) = card else {
			return SyncDecision::NoEntity;
		};
		match &self.last {
			Some(last)
				if last.card_id == card.id
					&& last.mode == mode
					&& last.fingerprint == fingerprint(&EditorState::from_card(card))
					&& now.saturating_duration_since(last.at) < self.window =>
			{
				SyncDecision::Recent
			}
			_ => SyncDecision::Sync,
		}
	}

	pub fn should_sync(&self, card: Option<&Card>, mode: CardMode, is_transitioning: bool, now: Instant) -> bool {
		self.decide(card, mode, is_transitioning, now) == SyncDecision::Sync
	}

	/// Returns the content to install and records the pull.
	pub fn pull(&mut self, card: &Card, mode: CardMode, now: Instant) -> EditorState {
		let content = EditorState::from_card(card);
		self.last = Some(SyncRecord {
			card_id: card.id.clone(),
			mode,
			at: now,
			fingerprint: fingerprint(&content),
		});
		content
	}

	/// Forgets the last pull so the next decision is not suppressed.
	pub fn forget(&mut self) {
		self.last = None;
	}
}

/// Structural hash of editor content.
pub(crate) fn fingerprint(state: &EditorState) -> u64 {
	let mut hasher = FxHasher::default();
	state.hash(&mut hasher);
	hasher.finish()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn card(code: &str) -> Card {
		Card::regular("r1", "p1", 1).with_content(code, "", "python")
	}

	#[test]
	fn transitioning_and_missing_entity_block_sync() {
		let sync = ContentSynchronizer::default();
		let now = Instant::now();
		assert_eq!(sync.decide(Some(&card("a")), CardMode::Regular, true, now), SyncDecision::Transitioning);
		assert_eq!(sync.decide(None, CardMode::Regular, false, now), SyncDecision::NoEntity);
	}

	#[test]
	fn same_pair_within_window_is_suppressed() {
		let mut sync = ContentSynchronizer::default();
		let now = Instant::now();
		let card = card("a");
		assert_eq!(sync.pull(&card, CardMode::Regular, now).code, "a");

		assert_eq!(sync.decide(Some(&card), CardMode::Regular, false, now + Duration::from_millis(50)), SyncDecision::Recent);
		assert!(sync.should_sync(Some(&card), CardMode::Regular, false, now + SYNC_DEBOUNCE));
		assert!(sync.should_sync(Some(&card), CardMode::Answer, false, now));
	}

	#[test]
	fn reloaded_fields_resync_despite_same_identity() {
		let mut sync = ContentSynchronizer::default();
		let now = Instant::now();
		sync.pull(&card("a"), CardMode::Regular, now);
		assert!(sync.should_sync(Some(&card("reloaded")), CardMode::Regular, false, now + Duration::from_millis(1)));
	}

	#[test]
	fn pull_defaults_absent_fields() {
		let mut sync = ContentSynchronizer::default();
		let bare = Card::regular("r2", "p1", 2);
		assert_eq!(sync.pull(&bare, CardMode::Regular, Instant::now()), EditorState::default());
	}

	#[test]
	fn forget_clears_suppression() {
		let mut sync = ContentSynchronizer::default();
		let now = Instant::now();
		let card = card("a");
		sync.pull(&card, CardMode::Regular, now);
		sync.forget();
		assert!(sync.should_sync(Some(&card), CardMode::Regular, false, now));
	}
}
