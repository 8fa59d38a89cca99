//! Observer port for session extension points.
//!
//! The controller reports transitions, saves, and validation failures to a
//! [`SessionObserver`] handed to it at construction. Control flow never
//! depends on what the observer does with them.

use cardflip_model::{CardId, CardMode, SaveChannel};
use tracing::{debug, info, warn};

use crate::consistency::ValidationResult;

/// How a toggle request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
	Completed,
	/// Refused before any state changed.
	Rejected { reason: String },
	/// Failed after starting; mode and editor were restored.
	RolledBack { error: String },
	/// Failed after starting with nothing to roll back to.
	AwaitingReset { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
	pub from: CardMode,
	pub to: CardMode,
	pub outcome: TransitionOutcome,
}

/// What caused a save to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
	/// An autosave debounce timer fired.
	Debounced,
	/// Part of a force-flush barrier.
	Flush,
	/// An explicit single-target force save.
	Forced,
}

impl SaveTrigger {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Debounced => "debounced",
			Self::Flush => "flush",
			Self::Forced => "forced",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveEvent {
	pub channel: SaveChannel,
	pub card_id: CardId,
	pub trigger: SaveTrigger,
	/// `Err` carries the storage error message.
	pub result: Result<(), String>,
}

/// Which check produced a failed [`ValidationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
	State,
	Transition,
}

/// Receives session events. All methods default to no-ops.
pub trait SessionObserver: Send + Sync {
	fn on_transition(&self, _event: &TransitionEvent) {}

	fn on_save(&self, _event: &SaveEvent) {}

	fn on_validation_failure(&self, _kind: ValidationKind, _result: &ValidationResult) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
	fn on_transition(&self, event: &TransitionEvent) {
		let (from, to) = (event.from.as_str(), event.to.as_str());
		match &event.outcome {
			TransitionOutcome::Completed => info!(from, to, "session.transition.completed"),
			TransitionOutcome::Rejected { reason } => debug!(from, to, reason = %reason, "session.transition.rejected"),
			TransitionOutcome::RolledBack { error } => warn!(from, to, error = %error, "session.transition.rolled_back"),
			TransitionOutcome::AwaitingReset { error } => warn!(from, to, error = %error, "session.transition.awaiting_reset"),
		}
	}

	fn on_save(&self, event: &SaveEvent) {
		match &event.result {
			Ok(()) => debug!(
				channel = event.channel.as_str(),
				card_id = %event.card_id,
				trigger = event.trigger.as_str(),
				"session.save.done"
			),
			Err(error) => warn!(
				channel = event.channel.as_str(),
				card_id = %event.card_id,
				trigger = event.trigger.as_str(),
				error = %error,
				"session.save.failed"
			),
		}
	}

	fn on_validation_failure(&self, kind: ValidationKind, result: &ValidationResult) {
		warn!(
			kind = ?kind,
			errors = ?result.errors,
			warnings = ?result.warnings,
			can_proceed = result.can_proceed,
			"session.validation.failed"
		);
	}
}
