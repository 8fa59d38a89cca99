//! Per-problem editing session.
//!
//! [`CardSession`] owns every piece of controller state for one open problem:
//! the transition machine, the bound cards, the consistency guard, the content
//! synchronizer, and all timers. State lives behind one short-lived mutex;
//! each action takes it, runs its read-check-write sequence, and releases it
//! before any storage await.
//!
//! # Lock order
//!
//! Session state, then autosave channel state. Timer tasks never take the
//! session lock while holding a channel lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use cardflip_model::{Card, CardId, CardMode, CardModeState, EditorPatch, EditorState, ProblemId, SaveChannel, TransitionState};
use cardflip_store::{CardStore, SolutionToggle, StoreError};
use cardflip_worker::{Debouncer, TaskClass};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::autosave::{AutosaveScheduler, FlushReport, PendingSaves, SaveRequest};
use crate::config::SessionConfig;
use crate::consistency::{ConsistencyGuard, RecoveryAction, RecoveryPlan, StateView, ValidationRecord, ValidationResult};
use crate::content_sync::{ContentSynchronizer, SyncDecision};
use crate::error::{Result, SessionError};
use crate::force_save::{ForceSaveOptions, ForceSaveResult, ForceSaver, SaveContext, validate_save_target};
use crate::telemetry::{SaveEvent, SaveTrigger, SessionObserver, TransitionEvent, TransitionOutcome, ValidationKind};
use crate::transition::{EditOutcome, ModeTransitionMachine, TransitionRecovery};

/// Current time on the runtime clock, so paused test time drives validation
/// and sync windows too.
fn now() -> Instant {
	tokio::time::Instant::now().into_std()
}

fn view_of<'a>(machine: &'a ModeTransitionMachine, regular: Option<&'a Card>, solution: Option<&'a Card>) -> StateView<'a> {
	StateView {
		mode: machine.current_mode(),
		transition_state: machine.state().transition_state,
		regular,
		solution,
		editor: machine.editor(),
	}
}

#[derive(Debug)]
struct Inner {
	machine: ModeTransitionMachine,
	regular: Option<Card>,
	solution: Option<Card>,
	/// Solution card known to exist, kept while in regular mode.
	known_solution: Option<Card>,
	/// Card the editor content was last loaded from.
	bound: Option<CardId>,
	guard: ConsistencyGuard,
	synchronizer: ContentSynchronizer,
}

impl Inner {
	fn authoritative(&self) -> Option<&Card> {
		match self.machine.current_mode() {
			CardMode::Regular => self.regular.as_ref(),
			CardMode::Answer => self.solution.as_ref(),
		}
	}

	/// Authoritative card, if the editor content was loaded from it.
	fn bound_card(&self) -> Option<&Card> {
		self.authoritative().filter(|card| self.bound.as_ref() == Some(&card.id))
	}

	fn bind_authoritative(&mut self) {
		self.bound = self.authoritative().map(|card| card.id.clone());
	}

	/// Save context in which the authoritative slot only holds a card the
	/// editor content actually belongs to.
	fn save_context(&self) -> SaveContext {
		let mode = self.machine.current_mode();
		let bound = self.bound_card().cloned();
		match mode {
			CardMode::Regular => SaveContext {
				mode,
				regular: bound,
				solution: self.solution.clone(),
			},
			CardMode::Answer => SaveContext {
				mode,
				regular: self.regular.clone(),
				solution: bound,
			},
		}
	}

	/// Editor content bound for the single valid target, if one exists.
	fn live_request(&self) -> Option<SaveRequest> {
		let validation = validate_save_target(&self.save_context());
		let (Some(channel), Some(card_id)) = (validation.target, validation.expected_card_id) else {
			return None;
		};
		Some(SaveRequest {
			channel,
			card_id,
			content: self.machine.editor().clone(),
		})
	}

	fn validate(&mut self, now: Instant) -> ValidationResult {
		let Self {
			machine,
			regular,
			solution,
			guard,
			..
		} = self;
		guard.validate(&view_of(machine, regular.as_ref(), solution.as_ref()), now)
	}

	fn capture_valid_state(&mut self, now: Instant) -> ValidationResult {
		let Self {
			machine,
			regular,
			solution,
			guard,
			..
		} = self;
		let view = view_of(machine, regular.as_ref(), solution.as_ref());
		if !guard.has_state_changed(&view) {
			return ValidationResult::new(Vec::new(), Vec::new(), guard.is_strict());
		}
		guard.capture_valid_state(&view, now)
	}

	/// Copies saved content into whichever bound card has `card_id`.
	fn record_saved(&mut self, card_id: &CardId, content: &EditorState) {
		for card in [self.regular.as_mut(), self.solution.as_mut(), self.known_solution.as_mut()].into_iter().flatten() {
			if &card.id == card_id {
				card.code = Some(content.code.clone());
				card.notes = Some(content.notes.clone());
				card.language = Some(content.language.clone());
			}
		}
	}
}

struct Shared {
	problem_id: ProblemId,
	store: Arc<dyn CardStore>,
	config: SessionConfig,
	observer: Arc<dyn SessionObserver>,
	inner: Mutex<Inner>,
	autosave: AutosaveScheduler,
	saver: ForceSaver,
	sync_timer: Debouncer,
	closed: AtomicBool,
}

impl Shared {
	fn report_invalid(&self, kind: ValidationKind, result: &ValidationResult) {
		if !result.can_proceed {
			self.observer.on_validation_failure(kind, result);
		}
	}

	fn schedule_sync(self: &Arc<Self>) {
		let weak: Weak<Self> = Arc::downgrade(self);
		self.sync_timer.schedule(self.config.sync_debounce(), move |_token| async move {
			if let Some(shared) = weak.upgrade() {
				shared.pull_active();
			}
		});
	}

	/// Pulls the authoritative card into the editor if the synchronizer allows it.
	///
	/// Editor content bound to the same card that differs from the channel's
	/// saved baseline is never replaced; it stays queued for autosave.
	fn pull_active(&self) -> SyncDecision {
		let mut inner = self.inner.lock();
		let mode = inner.machine.current_mode();
		let card = inner.authoritative().cloned();
		let at = now();
		let decision = inner.synchronizer.decide(card.as_ref(), mode, inner.machine.is_transitioning(), at);
		let (SyncDecision::Sync, Some(card)) = (decision, card) else {
			trace!(mode = mode.as_str(), decision = ?decision, "session.sync.skipped");
			return decision;
		};
		let unsaved = inner.bound.as_ref() == Some(&card.id)
			&& self.autosave.saved_content(mode.channel(), &card.id).as_ref() != Some(inner.machine.editor());
		if unsaved {
			debug!(mode = mode.as_str(), card_id = %card.id, "session.sync.unsaved_edits");
			return SyncDecision::UnsavedEdits;
		}

		let content = inner.synchronizer.pull(&card, mode, at);
		inner.machine.update_editor_state(EditorPatch::replace(content.clone()));
		inner.bound = Some(card.id.clone());
		self.autosave.cancel(mode.channel());
		self.autosave.mark_saved(mode.channel(), &card.id, &content);
		let result = inner.capture_valid_state(at);
		drop(inner);
		self.report_invalid(ValidationKind::State, &result);
		debug!(mode = mode.as_str(), card_id = %card.id, "session.sync.pulled");
		decision
	}

	/// Persists queued and live content before an action replaces the editor.
	async fn flush_unsaved(&self, live: Option<SaveRequest>) -> Result<()> {
		let report = self.autosave.force_flush(live).await;
		match report.first_error() {
			Some(error) => {
				warn!(error = %error, "session.flush_failed");
				Err(SessionError::FlushFailed(error.to_string()))
			}
			None => Ok(()),
		}
	}

	fn emit_transition(&self, from: CardMode, to: CardMode, outcome: TransitionOutcome) {
		self.observer.on_transition(&TransitionEvent { from, to, outcome });
	}

	/// Routes a failure inside a started transition through rollback.
	fn fail_transition(&self, from: CardMode, to: CardMode, error: String) -> SessionError {
		let recovery = self.inner.lock().machine.handle_transition_error(error.clone());
		match recovery {
			TransitionRecovery::RolledBack => {
				self.autosave.resume();
				self.emit_transition(from, to, TransitionOutcome::RolledBack { error: error.clone() });
			}
			TransitionRecovery::AwaitingReset => {
				self.emit_transition(from, to, TransitionOutcome::AwaitingReset { error: error.clone() });
			}
		}
		SessionError::TransitionFailed(error)
	}
}

/// Editing session for one problem's regular and solution cards.
pub struct CardSession {
	shared: Arc<Shared>,
}

impl std::fmt::Debug for CardSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CardSession")
			.field("problem_id", &self.shared.problem_id)
			.field("mode", &self.mode_state())
			.field("autosave", &self.shared.autosave)
			.finish_non_exhaustive()
	}
}

impl CardSession {
	/// Opens a session in regular mode with `regular` bound to the editor.
	///
	/// The card's content is pulled immediately and recorded as the regular
	/// channel's saved baseline. Must be called inside a tokio runtime.
	pub fn open(problem_id: ProblemId, regular: Card, store: Arc<dyn CardStore>, config: SessionConfig, observer: Arc<dyn SessionObserver>) -> Self {
		let autosave = AutosaveScheduler::new(
			Arc::clone(&store),
			Arc::clone(&observer),
			config.regular_autosave_delay(),
			config.solution_autosave_delay(),
		);
		if !config.autosave_enabled {
			autosave.disable();
		}
		let inner = Inner {
			machine: ModeTransitionMachine::new(),
			regular: Some(regular),
			solution: None,
			known_solution: None,
			bound: None,
			guard: ConsistencyGuard::new(config.strict_validation, config.snapshot_staleness(), config.validation_history),
			synchronizer: ContentSynchronizer::new(config.sync_debounce()),
		};

		let shared = Arc::new(Shared {
			problem_id,
			saver: ForceSaver::new(Arc::clone(&store)),
			store,
			config,
			observer,
			inner: Mutex::new(inner),
			autosave,
			sync_timer: Debouncer::new("session.sync", TaskClass::ContentSync),
			closed: AtomicBool::new(false),
		});

		let weak = Arc::downgrade(&shared);
		shared.autosave.set_saved_hook(Arc::new(move |_channel: SaveChannel, card_id: &CardId, content: &EditorState| {
			if let Some(shared) = weak.upgrade() {
				shared.inner.lock().record_saved(card_id, content);
			}
		}));

		shared.pull_active();
		info!(problem_id = %shared.problem_id, "session.open");
		Self { shared }
	}

	pub fn problem_id(&self) -> &ProblemId {
		&self.shared.problem_id
	}

	pub fn config(&self) -> &SessionConfig {
		&self.shared.config
	}

	pub fn mode_state(&self) -> CardModeState {
		self.shared.inner.lock().machine.state().clone()
	}

	pub fn current_mode(&self) -> CardMode {
		self.shared.inner.lock().machine.current_mode()
	}

	pub fn editor_state(&self) -> EditorState {
		self.shared.inner.lock().machine.editor().clone()
	}

	pub fn regular_card(&self) -> Option<Card> {
		self.shared.inner.lock().regular.clone()
	}

	/// Solution card bound to the editor. Only set in answer mode.
	pub fn solution_card(&self) -> Option<Card> {
		self.shared.inner.lock().solution.clone()
	}

	pub fn pending_saves(&self) -> PendingSaves {
		self.shared.autosave.pending()
	}

	pub fn last_save_error(&self, channel: SaveChannel) -> Option<String> {
		self.shared.autosave.last_error(channel)
	}

	/// Oldest first.
	pub fn validation_history(&self) -> Vec<ValidationRecord> {
		self.shared.inner.lock().guard.history().cloned().collect()
	}

	/// Validates the current state and records the result in the history.
	pub fn validate(&self) -> ValidationResult {
		let result = self.shared.inner.lock().validate(now());
		self.shared.report_invalid(ValidationKind::State, &result);
		result
	}

	pub async fn solution_exists(&self) -> Result<bool> {
		Ok(self.shared.store.exists(&self.shared.problem_id).await?)
	}

	pub fn update_code(&self, code: impl Into<String>, language: impl Into<String>) -> EditOutcome {
		self.apply_edit(EditorPatch::code(code, language))
	}

	pub fn update_notes(&self, notes: impl Into<String>) -> EditOutcome {
		self.apply_edit(EditorPatch::notes(notes))
	}

	fn apply_edit(&self, patch: EditorPatch) -> EditOutcome {
		let mut inner = self.shared.inner.lock();
		if inner.authoritative().is_some() && inner.bound_card().is_none() {
			trace!("session.edit.awaiting_pull");
			return EditOutcome::Rejected;
		}
		let outcome = inner.machine.update_editor_state(patch);
		if outcome == EditOutcome::Applied {
			let channel = inner.machine.current_mode().channel();
			let schedule = self.shared.autosave.on_content_change(channel, inner.bound_card(), inner.machine.editor());
			trace!(channel = channel.as_str(), schedule = ?schedule, "session.edit");
		}
		outcome
	}

	/// Switches between regular and answer mode.
	///
	/// Pending edits are flushed first (unless disabled in config), the
	/// solution card is created on first entry, and the target card's content
	/// replaces the editor. A failure after the switch starts rolls back to
	/// the previous mode and editor content.
	pub async fn toggle(&self) -> Result<CardMode> {
		let shared = &self.shared;
		let (from, to, live) = {
			let mut inner = shared.inner.lock();
			if inner.machine.is_transitioning() {
				return Err(SessionError::TransitionInProgress);
			}
			let from = inner.machine.current_mode();
			let to = from.toggled();

			let solution = inner.solution.as_ref().or(inner.known_solution.as_ref());
			let check = inner.guard.validate_transition(from, to, inner.regular.as_ref(), solution);
			if !check.can_proceed {
				drop(inner);
				shared.report_invalid(ValidationKind::Transition, &check);
				let reason = check.errors.iter().chain(&check.warnings).cloned().collect::<Vec<_>>().join("; ");
				shared.emit_transition(from, to, TransitionOutcome::Rejected { reason: reason.clone() });
				return Err(SessionError::TransitionRejected { from, to, reason });
			}

			let live = inner.live_request();
			let editor = inner.machine.editor().clone();
			if !inner.machine.start_transition(to, editor) {
				return Err(SessionError::TransitionInProgress);
			}
			shared.sync_timer.cancel();
			shared.autosave.suspend();
			(from, to, live)
		};
		info!(from = from.as_str(), to = to.as_str(), "session.toggle.start");

		if shared.config.flush_before_toggle {
			let report = shared.autosave.force_flush(live).await;
			if let Some(error) = report.first_error() {
				return Err(shared.fail_transition(from, to, format!("Pre-transition save failed: {error}")));
			}
		} else {
			shared.autosave.cancel_all();
		}

		let target = match to {
			CardMode::Answer => match shared.store.toggle(&shared.problem_id, true).await {
				Ok(SolutionToggle { card: Some(card), .. }) => card,
				Ok(SolutionToggle { card: None, .. }) => {
					return Err(shared.fail_transition(from, to, SessionError::NoSolutionCard.to_string()));
				}
				Err(err) => {
					return Err(shared.fail_transition(from, to, format!("Failed to load solution card: {err}")));
				}
			},
			CardMode::Regular => {
				let regular = shared.inner.lock().regular.clone();
				match regular {
					Some(card) => card,
					None => {
						return Err(shared.fail_transition(from, to, "No regular card to return to".to_string()));
					}
				}
			}
		};

		let (mode, result) = {
			let mut inner = shared.inner.lock();
			let at = now();
			let content = inner.synchronizer.pull(&target, to, at);
			match to {
				CardMode::Answer => {
					inner.solution = Some(target.clone());
					inner.known_solution = None;
				}
				CardMode::Regular => {
					inner.regular = Some(target.clone());
					inner.known_solution = inner.solution.take();
				}
			}
			let mode = inner.machine.complete_transition(content.clone());
			inner.bound = Some(target.id.clone());
			shared.autosave.mark_saved(mode.channel(), &target.id, &content);
			(mode, inner.capture_valid_state(at))
		};
		shared.report_invalid(ValidationKind::State, &result);
		shared.autosave.resume();
		shared.emit_transition(from, to, TransitionOutcome::Completed);
		Ok(mode)
	}

	/// Returns to regular mode. A no-op outside answer mode.
	pub async fn exit_solution(&self) -> Result<CardMode> {
		match self.current_mode() {
			CardMode::Answer => self.toggle().await,
			mode => Ok(mode),
		}
	}

	/// Creates the problem's solution card if it does not exist yet.
	///
	/// The card is bound to the editor only when the session is already in
	/// answer mode; otherwise the next toggle picks it up.
	pub async fn create(&self) -> Result<Card> {
		let toggled = self.shared.store.toggle(&self.shared.problem_id, true).await?;
		let card = toggled.card.ok_or(SessionError::NoSolutionCard)?;
		debug!(problem_id = %self.shared.problem_id, card_id = %card.id, "session.solution_ready");

		let mut inner = self.shared.inner.lock();
		if inner.machine.current_mode() == CardMode::Answer && !inner.machine.is_transitioning() && inner.solution.is_none() {
			inner.solution = Some(card.clone());
			drop(inner);
			self.shared.schedule_sync();
		} else if inner.solution.is_none() {
			inner.known_solution = Some(card.clone());
		}
		Ok(card)
	}

	/// Re-reads the bound cards from storage and syncs the editor with the
	/// active one. Returns the problem's solution card, if any.
	///
	/// Unsaved edits are flushed first; if that fails nothing is re-read.
	pub async fn load(&self) -> Result<Option<Card>> {
		let (regular_id, live) = {
			let inner = self.shared.inner.lock();
			if inner.machine.is_transitioning() {
				return Err(SessionError::TransitionInProgress);
			}
			(inner.regular.as_ref().map(|card| card.id.clone()), inner.live_request())
		};
		self.shared.flush_unsaved(live).await?;

		let solution = self.shared.store.get(&self.shared.problem_id).await?;
		let regular = match regular_id {
			Some(id) => Some(self.shared.store.card(&id).await?.ok_or(StoreError::CardNotFound(id))?),
			None => None,
		};

		{
			let mut inner = self.shared.inner.lock();
			if inner.machine.is_transitioning() {
				return Err(SessionError::TransitionInProgress);
			}
			if regular.is_some() {
				inner.regular = regular;
			}
			if inner.machine.current_mode() == CardMode::Answer {
				if solution.is_none() {
					return Err(SessionError::NoSolutionCard);
				}
				inner.solution = solution.clone();
			} else {
				inner.known_solution = solution.clone();
			}
			inner.synchronizer.forget();
		}
		self.shared.pull_active();
		Ok(solution)
	}

	/// Binds another attempt card, flushing edits to the previous one first.
	///
	/// A failed flush keeps the previous card bound. In regular mode the new
	/// card's content is pulled after the sync debounce window, and edits
	/// are rejected until then.
	pub async fn set_regular_card(&self, card: Card) -> Result<()> {
		let live = {
			let inner = self.shared.inner.lock();
			if inner.machine.is_transitioning() {
				return Err(SessionError::TransitionInProgress);
			}
			inner.live_request()
		};
		self.shared.flush_unsaved(live).await?;

		let mode = {
			let mut inner = self.shared.inner.lock();
			if inner.machine.is_transitioning() {
				return Err(SessionError::TransitionInProgress);
			}
			debug!(card_id = %card.id, "session.rebind");
			inner.regular = Some(card);
			inner.machine.current_mode()
		};
		if mode == CardMode::Regular {
			self.shared.schedule_sync();
		}
		Ok(())
	}

	/// Re-reads the active card and schedules a pull of its current fields.
	///
	/// Unsaved edits are flushed before the read. Edits made after it keep
	/// the pull from replacing them.
	pub async fn refresh_from_store(&self) -> Result<()> {
		let (card_id, live) = {
			let inner = self.shared.inner.lock();
			if inner.machine.is_transitioning() {
				return Err(SessionError::TransitionInProgress);
			}
			let Some(card) = inner.authoritative() else {
				return Ok(());
			};
			(card.id.clone(), inner.live_request())
		};
		self.shared.flush_unsaved(live).await?;

		let fresh = self
			.shared
			.store
			.card(&card_id)
			.await?
			.ok_or(StoreError::CardNotFound(card_id.clone()))?;
		{
			let mut guard = self.shared.inner.lock();
			let inner = &mut *guard;
			for slot in [&mut inner.regular, &mut inner.solution, &mut inner.known_solution] {
				if slot.as_ref().is_some_and(|card| card.id == card_id) {
					*slot = Some(fresh.clone());
				}
			}
		}
		self.shared.schedule_sync();
		Ok(())
	}

	/// Pulls the active card into the editor now, bypassing the debounce.
	pub fn sync_immediately(&self) -> SyncDecision {
		self.shared.sync_timer.cancel();
		self.shared.inner.lock().synchronizer.forget();
		self.shared.pull_active()
	}

	/// Cancels a scheduled pull. Returns true if one was pending.
	pub fn cancel_sync(&self) -> bool {
		self.shared.sync_timer.cancel()
	}

	/// Saves the editor content to the single valid target for the current mode.
	pub async fn force_save(&self) -> ForceSaveResult {
		let (options, channel) = {
			let inner = self.shared.inner.lock();
			let context = inner.save_context();
			let channel = context.mode.channel();
			let previous = inner
				.bound_card()
				.and_then(|card| self.shared.autosave.saved_content(channel, &card.id));
			let options = ForceSaveOptions {
				context,
				content: inner.machine.editor().clone(),
				previous,
			};
			(options, channel)
		};
		self.shared.autosave.cancel(channel);

		let content = options.content.clone();
		let result = self.shared.saver.force_save(options).await;
		if let Some(card_id) = &result.card_id {
			if result.success {
				self.shared.autosave.mark_saved(channel, card_id, &content);
				self.shared.inner.lock().record_saved(card_id, &content);
			}
			self.shared.observer.on_save(&SaveEvent {
				channel,
				card_id: card_id.clone(),
				trigger: SaveTrigger::Forced,
				result: match &result.error {
					Some(error) if !result.success => Err(error.clone()),
					_ => Ok(()),
				},
			});
		}
		result
	}

	/// Persists all queued and live content on both channels concurrently.
	pub async fn force_flush(&self) -> FlushReport {
		let live = {
			let inner = self.shared.inner.lock();
			if inner.machine.is_transitioning() {
				None
			} else {
				inner.live_request()
			}
		};
		self.shared.autosave.force_flush(live).await
	}

	pub fn enable_autosave(&self) {
		self.shared.autosave.enable();
	}

	pub fn disable_autosave(&self) {
		self.shared.autosave.disable();
	}

	pub fn is_autosave_enabled(&self) -> bool {
		self.shared.autosave.is_enabled()
	}

	/// Starts a transition without touching storage.
	///
	/// For callers that drive the switch themselves; pair with
	/// [`Self::complete_transition`] or [`Self::handle_transition_error`].
	pub fn start_transition(&self, target: CardMode) -> bool {
		let mut inner = self.shared.inner.lock();
		let editor = inner.machine.editor().clone();
		if !inner.machine.start_transition(target, editor) {
			return false;
		}
		self.shared.sync_timer.cancel();
		self.shared.autosave.suspend();
		true
	}

	/// Commits a transition started with [`Self::start_transition`]. The
	/// editor is bound to whichever card is already set for the new mode.
	pub fn complete_transition(&self, editor: EditorState) -> CardMode {
		let (from, switching, mode, result) = {
			let mut inner = self.shared.inner.lock();
			let from = inner.machine.current_mode();
			let switching = inner.machine.state().transition_state.target_mode().is_some();
			let mode = inner.machine.complete_transition(editor);
			inner.bind_authoritative();
			(from, switching, mode, inner.capture_valid_state(now()))
		};
		self.shared.report_invalid(ValidationKind::State, &result);
		self.shared.autosave.resume();
		if switching {
			self.shared.emit_transition(from, mode, TransitionOutcome::Completed);
		}
		mode
	}

	pub fn handle_transition_error(&self, message: impl Into<String>) -> TransitionRecovery {
		let error = message.into();
		let (from, to, recovery) = {
			let mut inner = self.shared.inner.lock();
			let from = inner.machine.current_mode();
			let to = inner.machine.state().transition_state.target_mode().unwrap_or(from);
			(from, to, inner.machine.handle_transition_error(error.clone()))
		};
		let outcome = match recovery {
			TransitionRecovery::RolledBack => {
				self.shared.autosave.resume();
				TransitionOutcome::RolledBack { error }
			}
			TransitionRecovery::AwaitingReset => TransitionOutcome::AwaitingReset { error },
		};
		self.shared.emit_transition(from, to, outcome);
		recovery
	}

	/// Returns the machine to regular mode and re-pulls the regular card.
	pub fn reset(&self) {
		{
			let mut inner = self.shared.inner.lock();
			inner.machine.reset();
			if let Some(solution) = inner.solution.take() {
				inner.known_solution = Some(solution);
			}
			inner.bound = None;
			inner.synchronizer.forget();
		}
		self.shared.autosave.resume();
		self.shared.pull_active();
		info!(problem_id = %self.shared.problem_id, "session.reset");
	}

	/// Validates the current state and applies the guard's recovery plan.
	///
	/// A machine left in error recovery always counts as invalid.
	pub fn recover(&self) -> RecoveryPlan {
		let at = now();
		let (plan, result) = {
			let mut inner = self.shared.inner.lock();
			let mut result = inner.validate(at);
			if inner.machine.state().transition_state == TransitionState::ErrorRecovery {
				let error = inner.machine.state().error.clone().unwrap_or_default();
				let mut errors = result.errors;
				errors.push(format!("Transition left in error recovery: {error}"));
				result = ValidationResult::new(errors, result.warnings, inner.guard.is_strict());
			}

			let plan = inner.guard.create_recovery_plan(&result, at);
			if plan.action == RecoveryAction::Recover
				&& let Some(snapshot) = &plan.snapshot
			{
				inner.machine.restore(snapshot.mode, snapshot.editor.clone());
				inner.regular = snapshot.regular.clone();
				inner.solution = snapshot.solution.clone();
				inner.bind_authoritative();
				inner.synchronizer.forget();
				let channel = snapshot.mode.channel();
				self.shared.autosave.resume();
				self.shared.autosave.on_content_change(channel, inner.bound_card(), inner.machine.editor());
			}
			(plan, result)
		};
		self.shared.report_invalid(ValidationKind::State, &result);

		match plan.action {
			RecoveryAction::None => trace!("session.recover.none"),
			RecoveryAction::Retry => debug!(reason = %plan.reason, "session.recover.retry"),
			RecoveryAction::Recover => warn!(reason = %plan.reason, "session.recover.restored"),
			RecoveryAction::Reset => {
				warn!(reason = %plan.reason, "session.recover.reset");
				self.reset();
			}
		}
		plan
	}

	/// Flushes pending edits and stops every timer. Further edits still
	/// update the editor but are never persisted.
	pub async fn close(&self) -> FlushReport {
		if self.shared.closed.swap(true, Ordering::AcqRel) {
			return FlushReport::default();
		}
		self.shared.sync_timer.cancel();
		let report = self.force_flush().await;
		self.shared.autosave.disable();
		info!(
			problem_id = %self.shared.problem_id,
			flushed_ok = report.all_succeeded(),
			"session.close"
		);
		report
	}

	pub fn is_closed(&self) -> bool {
		self.shared.closed.load(Ordering::Acquire)
	}
}

impl Drop for CardSession {
	fn drop(&mut self) {
		self.shared.sync_timer.cancel();
		self.shared.autosave.cancel_all();
	}
}
