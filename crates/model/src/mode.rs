use std::fmt;

use serde::{Deserialize, Serialize};

/// Which entity is currently bound to the shared editor surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardMode {
	/// Editing a regular attempt card.
	#[default]
	Regular,
	/// Viewing or editing the problem's solution card.
	Answer,
}

impl CardMode {
	/// Returns the opposite mode.
	pub const fn toggled(self) -> Self {
		match self {
			Self::Regular => Self::Answer,
			Self::Answer => Self::Regular,
		}
	}

	/// Autosave channel whose entity is authoritative in this mode.
	pub const fn channel(self) -> SaveChannel {
		match self {
			Self::Regular => SaveChannel::Regular,
			Self::Answer => SaveChannel::Solution,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Regular => "regular",
			Self::Answer => "answer",
		}
	}
}

impl fmt::Display for CardMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Phase of a mode transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionState {
	#[default]
	Idle,
	/// Pending edits are being persisted before the switch.
	SavingBeforeTransition,
	SwitchingToAnswer,
	SwitchingToRegular,
	/// A transition failed and no rollback snapshot was available.
	ErrorRecovery,
}

impl TransitionState {
	/// Switching phase that leads into `target`.
	pub const fn switching_to(target: CardMode) -> Self {
		match target {
			CardMode::Regular => Self::SwitchingToRegular,
			CardMode::Answer => Self::SwitchingToAnswer,
		}
	}

	/// Mode a switching phase commits to, if this is a switching phase.
	pub const fn target_mode(self) -> Option<CardMode> {
		match self {
			Self::SwitchingToAnswer => Some(CardMode::Answer),
			Self::SwitchingToRegular => Some(CardMode::Regular),
			_ => None,
		}
	}

	pub const fn is_idle(self) -> bool {
		matches!(self, Self::Idle)
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::SavingBeforeTransition => "saving_before_transition",
			Self::SwitchingToAnswer => "switching_to_answer",
			Self::SwitchingToRegular => "switching_to_regular",
			Self::ErrorRecovery => "error_recovery",
		}
	}
}

/// Externally visible state of the mode transition machine.
///
/// `is_transitioning` always equals `transition_state != Idle`. Use
/// [`CardModeState::set_transition`] to change the phase so the two never
/// drift apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardModeState {
	pub current_mode: CardMode,
	pub transition_state: TransitionState,
	pub is_transitioning: bool,
	pub error: Option<String>,
}

impl CardModeState {
	/// Sets the transition phase and the derived `is_transitioning` flag together.
	pub fn set_transition(&mut self, state: TransitionState) {
		self.transition_state = state;
		self.is_transitioning = !state.is_idle();
	}
}

/// Independent autosave channel, one per editable entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveChannel {
	Regular,
	Solution,
}

impl SaveChannel {
	pub const ALL: [SaveChannel; 2] = [SaveChannel::Regular, SaveChannel::Solution];

	/// Mode in which this channel's entity is authoritative.
	pub const fn mode(self) -> CardMode {
		match self {
			Self::Regular => CardMode::Regular,
			Self::Solution => CardMode::Answer,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Regular => "regular",
			Self::Solution => "solution",
		}
	}
}
