//! Mode transition state machine.
//!
//! ```text
//! Idle -> SavingBeforeTransition -> SwitchingToAnswer | SwitchingToRegular -> Idle
//!                                          |
//!                                          v
//!                                    ErrorRecovery -> Idle (rollback or reset)
//! ```
//!
//! [`ModeTransitionMachine`] is the only writer of `current_mode`. It is plain
//! synchronous state; the session keeps it behind a mutex so every
//! read-check-write sequence below runs atomically with respect to timers.

use cardflip_model::{CardMode, CardModeState, EditorPatch, EditorState, TransitionState};
use tracing::{debug, trace, warn};

/// Result of routing an edit through [`ModeTransitionMachine::update_editor_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
	Applied,
	/// The patch matched the current content.
	Unchanged,
	/// A transition is in flight, or the editor is waiting for a newly bound
	/// card to be pulled. The edit was not applied.
	Rejected,
}

/// How [`ModeTransitionMachine::handle_transition_error`] resolved a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRecovery {
	/// Mode and editor were restored from the pre-transition snapshot.
	RolledBack,
	/// No snapshot was available; the machine stays in `ErrorRecovery` until reset.
	AwaitingReset,
}

#[derive(Debug, Clone)]
struct RollbackSnapshot {
	mode: CardMode,
	editor: EditorState,
}

#[derive(Debug, Default)]
pub struct ModeTransitionMachine {
	state: CardModeState,
	editor: EditorState,
	rollback: Option<RollbackSnapshot>,
}

impl ModeTransitionMachine {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self) -> &CardModeState {
		&self.state
	}

	pub fn editor(&self) -> &EditorState {
		&self.editor
	}

	pub fn current_mode(&self) -> CardMode {
		self.state.current_mode
	}

	pub fn is_transitioning(&self) -> bool {
		self.state.is_transitioning
	}

	pub fn has_rollback(&self) -> bool {
		self.rollback.is_some()
	}

	/// Begins a transition toward `target`.
	///
	/// Returns false without touching any state when a transition is already
	/// in flight or the machine is waiting in `ErrorRecovery`.
	pub fn start_transition(&mut self, target: CardMode, current_editor: EditorState) -> bool {
		if self.state.is_transitioning {
			debug!(
				target = target.as_str(),
				in_flight = self.state.transition_state.as_str(),
				"transition.start_rejected"
			);
			return false;
		}

		self.rollback = Some(RollbackSnapshot {
			mode: self.state.current_mode,
			editor: current_editor,
		});
		self.state.set_transition(TransitionState::SavingBeforeTransition);
		self.state.set_transition(TransitionState::switching_to(target));
		self.state.error = None;
		trace!(from = self.state.current_mode.as_str(), target = target.as_str(), "transition.start");
		true
	}

	/// Commits the in-flight transition and binds `new_editor` to the surface.
	///
	/// Returns the committed mode.
	pub fn complete_transition(&mut self, new_editor: EditorState) -> CardMode {
		let mode = match self.state.transition_state {
			TransitionState::SwitchingToAnswer => CardMode::Answer,
			_ => CardMode::Regular,
		};
		self.state.current_mode = mode;
		self.state.set_transition(TransitionState::Idle);
		self.editor = new_editor;
		self.rollback = None;
		trace!(mode = mode.as_str(), "transition.complete");
		mode
	}

	/// Records a transition failure and rolls back when a snapshot exists.
	pub fn handle_transition_error(&mut self, message: impl Into<String>) -> TransitionRecovery {
		let message = message.into();
		self.state.set_transition(TransitionState::ErrorRecovery);
		self.state.error = Some(message.clone());

		let Some(snapshot) = self.rollback.take() else {
			warn!(error = %message, "transition.error_no_rollback");
			return TransitionRecovery::AwaitingReset;
		};

		self.state.current_mode = snapshot.mode;
		self.editor = snapshot.editor;
		self.state.set_transition(TransitionState::Idle);
		warn!(error = %message, mode = snapshot.mode.as_str(), "transition.rolled_back");
		TransitionRecovery::RolledBack
	}

	/// Returns to `Regular`/`Idle` with an empty editor, discarding everything.
	pub fn reset(&mut self) {
		self.state = CardModeState::default();
		self.editor = EditorState::default();
		self.rollback = None;
	}

	/// Reinstates a previously captured mode and editor content.
	pub fn restore(&mut self, mode: CardMode, editor: EditorState) {
		self.state = CardModeState {
			current_mode: mode,
			..CardModeState::default()
		};
		self.editor = editor;
		self.rollback = None;
	}

	/// Merges `patch` into the editor state unless a transition is in flight.
	pub fn update_editor_state(&mut self, patch: EditorPatch) -> EditOutcome {
		if self.state.is_transitioning {
			trace!(transition = self.state.transition_state.as_str(), "transition.edit_rejected");
			return EditOutcome::Rejected;
		}
		if self.editor.apply(patch) {
			EditOutcome::Applied
		} else {
			EditOutcome::Unchanged
		}
	}
}
