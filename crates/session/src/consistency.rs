//! State consistency guard.
//!
//! Validates the tuple `(mode, transition_state, regular, solution, editor)`,
//! keeps a bounded history of results, and remembers the last state that
//! validated cleanly so a failed state can be rolled back to it.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use cardflip_model::{Card, CardMode, EditorState, TransitionState};
use rustc_hash::FxHasher;

/// Outcome of a consistency or transition check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
	pub is_valid: bool,
	pub errors: Vec<String>,
	pub warnings: Vec<String>,
	/// Valid, and either non-strict or free of warnings.
	pub can_proceed: bool,
}

impl ValidationResult {
	pub fn new(errors: Vec<String>, warnings: Vec<String>, strict: bool) -> Self {
		let is_valid = errors.is_empty();
		let can_proceed = is_valid && (!strict || warnings.is_empty());
		Self {
			is_valid,
			errors,
			warnings,
			can_proceed,
		}
	}
}

/// Borrowed view of the state being validated.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
	pub mode: CardMode,
	pub transition_state: TransitionState,
	pub regular: Option<&'a Card>,
	pub solution: Option<&'a Card>,
	pub editor: &'a EditorState,
}

impl StateView<'_> {
	/// Card whose content is authoritative in the current mode.
	pub fn authoritative(&self) -> Option<&Card> {
		match self.mode {
			CardMode::Regular => self.regular,
			CardMode::Answer => self.solution,
		}
	}

	/// Stable structural hash of the semantically relevant fields.
	pub fn checksum(&self) -> u64 {
		let mut hasher = FxHasher::default();
		self.mode.hash(&mut hasher);
		self.transition_state.hash(&mut hasher);
		hash_card(self.regular, &mut hasher);
		hash_card(self.solution, &mut hasher);
		self.editor.hash(&mut hasher);
		hasher.finish()
	}
}

fn hash_card(card: Option<&Card>, hasher: &mut FxHasher) {
	match card {
		None => 0u8.hash(hasher),
		Some(card) => {
			1u8.hash(hasher);
			card.id.hash(hasher);
			card.code.hash(hasher);
			card.notes.hash(hasher);
			card.language.hash(hasher);
			card.is_solution.hash(hasher);
		}
	}
}

/// Immutable point-in-time copy of a validated state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
	pub taken_at: Instant,
	pub mode: CardMode,
	pub transition_state: TransitionState,
	pub regular: Option<Card>,
	pub solution: Option<Card>,
	pub editor: EditorState,
	pub checksum: u64,
}

impl StateSnapshot {
	pub fn capture(view: &StateView<'_>, now: Instant) -> Self {
		Self {
			taken_at: now,
			mode: view.mode,
			transition_state: view.transition_state,
			regular: view.regular.cloned(),
			solution: view.solution.cloned(),
			editor: view.editor.clone(),
			checksum: view.checksum(),
		}
	}
}

/// One entry of the validation history ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRecord {
	pub at: Instant,
	pub checksum: u64,
	pub result: ValidationResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
	None,
	Retry,
	/// Restore the last valid snapshot.
	Recover,
	/// Return to defaults, accepting loss of unsaved content.
	Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPlan {
	pub action: RecoveryAction,
	pub reason: String,
	/// Present for [`RecoveryAction::Recover`].
	pub snapshot: Option<StateSnapshot>,
}

/// Checks the state tuple against the session invariants.
pub fn validate_state_consistency(view: &StateView<'_>, strict: bool) -> ValidationResult {
	let mut errors = Vec::new();
	let mut warnings = Vec::new();

	match view.mode {
		CardMode::Regular => {
			if view.regular.is_none() {
				errors.push("Regular mode requires a regular card".to_string());
			}
			if view.solution.is_some() && view.transition_state == TransitionState::Idle {
				warnings.push("Solution card still bound in idle regular mode".to_string());
			}
		}
		CardMode::Answer => {
			if view.solution.is_none() {
				errors.push("Answer mode requires a solution card".to_string());
			}
			if view.regular.is_none() {
				warnings.push("Answer mode without a regular card".to_string());
			}
		}
	}

	if view.transition_state.target_mode() == Some(view.mode) {
		errors.push(format!(
			"Transition state {} contradicts current mode {}",
			view.transition_state.as_str(),
			view.mode
		));
	}

	if view.editor.language.trim().is_empty() {
		errors.push("Editor language must not be empty".to_string());
	}

	if strict
		&& view.transition_state == TransitionState::Idle
		&& let Some(card) = view.authoritative()
	{
		let bound = EditorState::from_card(card);
		for (field, differs) in [
			("code", bound.code != view.editor.code),
			("notes", bound.notes != view.editor.notes),
			("language", bound.language != view.editor.language),
		] {
			if differs {
				warnings.push(format!("Editor {field} differs from the {} card", view.mode.channel().as_str()));
			}
		}
	}

	ValidationResult::new(errors, warnings, strict)
}

/// Checks a requested mode switch before it starts.
pub fn validate_transition(from: CardMode, to: CardMode, regular: Option<&Card>, solution: Option<&Card>, strict: bool) -> ValidationResult {
	let mut errors = Vec::new();
	let mut warnings = Vec::new();

	if from == to {
		errors.push(format!("Already in {to} mode"));
	}
	match to {
		CardMode::Regular if regular.is_none() => errors.push("No regular card to return to".to_string()),
		CardMode::Answer if solution.is_none() => warnings.push("Solution card will be created".to_string()),
		_ => {}
	}

	ValidationResult::new(errors, warnings, strict)
}

/// Chooses how to respond to `current`.
pub fn create_recovery_plan(current: &ValidationResult, last_valid: Option<&StateSnapshot>, now: Instant, staleness: Duration) -> RecoveryPlan {
	if current.can_proceed {
		return RecoveryPlan {
			action: RecoveryAction::None,
			reason: "State is consistent".to_string(),
			snapshot: None,
		};
	}
	if current.errors.is_empty() {
		return RecoveryPlan {
			action: RecoveryAction::Retry,
			reason: format!("{} warning(s) block proceeding", current.warnings.len()),
			snapshot: None,
		};
	}
	if let Some(snapshot) = last_valid
		&& now.saturating_duration_since(snapshot.taken_at) < staleness
	{
		return RecoveryPlan {
			action: RecoveryAction::Recover,
			reason: format!("Restoring last valid state: {}", current.errors.join("; ")),
			snapshot: Some(snapshot.clone()),
		};
	}
	RecoveryPlan {
		action: RecoveryAction::Reset,
		reason: format!("No recent valid state: {}", current.errors.join("; ")),
		snapshot: None,
	}
}

/// Stateful wrapper holding history and the last valid snapshot.
#[derive(Debug)]
pub struct ConsistencyGuard {
	strict: bool,
	staleness: Duration,
	capacity: usize,
	history: VecDeque<ValidationRecord>,
	last_valid: Option<StateSnapshot>,
}

impl ConsistencyGuard {
	pub fn new(strict: bool, staleness: Duration, capacity: usize) -> Self {
		Self {
			strict,
			staleness,
			capacity: capacity.max(1),
			history: VecDeque::with_capacity(capacity.max(1)),
			last_valid: None,
		}
	}

	pub fn is_strict(&self) -> bool {
		self.strict
	}

	/// Validates `view` and appends the result to the history ring.
	pub fn validate(&mut self, view: &StateView<'_>, now: Instant) -> ValidationResult {
		let result = validate_state_consistency(view, self.strict);
		if self.history.len() == self.capacity {
			self.history.pop_front();
		}
		self.history.push_back(ValidationRecord {
			at: now,
			checksum: view.checksum(),
			result: result.clone(),
		});
		result
	}

	pub fn validate_transition(&self, from: CardMode, to: CardMode, regular: Option<&Card>, solution: Option<&Card>) -> ValidationResult {
		validate_transition(from, to, regular, solution, self.strict)
	}

	/// Validates `view` and, only if valid, replaces the last valid snapshot.
	pub fn capture_valid_state(&mut self, view: &StateView<'_>, now: Instant) -> ValidationResult {
		let result = self.validate(view, now);
		if result.is_valid {
			self.last_valid = Some(StateSnapshot::capture(view, now));
		}
		result
	}

	pub fn create_recovery_plan(&self, current: &ValidationResult, now: Instant) -> RecoveryPlan {
		create_recovery_plan(current, self.last_valid.as_ref(), now, self.staleness)
	}

	/// True when `view` differs from the last valid snapshot, or none exists.
	pub fn has_state_changed(&self, view: &StateView<'_>) -> bool {
		self.last_valid.as_ref().is_none_or(|snapshot| snapshot.checksum != view.checksum())
	}

	pub fn last_valid(&self) -> Option<&StateSnapshot> {
		self.last_valid.as_ref()
	}

	pub fn history(&self) -> impl ExactSizeIterator<Item = &ValidationRecord> {
		self.history.iter()
	}
}
