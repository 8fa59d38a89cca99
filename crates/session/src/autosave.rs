//! Dual-channel autosave scheduler.
//!
//! One debounce channel per entity kind ([`SaveChannel::Regular`],
//! [`SaveChannel::Solution`]), each with its own delay and last-saved
//! baseline. A scheduled save captures the target card and content at
//! schedule time; the timer never re-reads live session state.
//!
//! # Error Handling
//!
//! - Save failures clear the channel's pending flag and are reported to the
//!   observer. They are not retried; the next edit reschedules.
//! - A failure on one channel never blocks the other.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cardflip_model::{Card, CardId, EditorState, SaveChannel};
use cardflip_store::CardStore;
use cardflip_worker::{Debouncer, TaskClass};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::force_save::persist_content;
use crate::telemetry::{SaveEvent, SaveTrigger, SessionObserver};

/// Default delay before an edit is persisted.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(2500);

/// Content bound for one card, captured when the save was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
	pub channel: SaveChannel,
	pub card_id: CardId,
	pub content: EditorState,
}

impl SaveRequest {
	pub fn new(channel: SaveChannel, card: &Card, content: EditorState) -> Self {
		Self {
			channel,
			card_id: card.id.clone(),
			content,
		}
	}
}

/// Result of offering an edit to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
	Scheduled,
	/// Content equals the last saved value for this card.
	Unchanged,
	NoEntity,
	Disabled,
	/// A mode transition is in flight.
	Suspended,
}

/// Result of one channel save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
	Saved { card_id: CardId },
	/// Skipped because the content was already stored.
	Unchanged { card_id: CardId },
	Failed { card_id: CardId, error: String },
}

impl SaveOutcome {
	pub fn is_failure(&self) -> bool {
		matches!(self, Self::Failed { .. })
	}
}

/// Per-channel results of [`AutosaveScheduler::force_flush`]. `None` means
/// the channel had nothing to save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
	pub regular: Option<SaveOutcome>,
	pub solution: Option<SaveOutcome>,
}

impl FlushReport {
	pub fn get(&self, channel: SaveChannel) -> Option<&SaveOutcome> {
		match channel {
			SaveChannel::Regular => self.regular.as_ref(),
			SaveChannel::Solution => self.solution.as_ref(),
		}
	}

	pub fn all_succeeded(&self) -> bool {
		self.first_error().is_none()
	}

	pub fn first_error(&self) -> Option<&str> {
		[&self.regular, &self.solution].into_iter().flatten().find_map(|outcome| match outcome {
			SaveOutcome::Failed { error, .. } => Some(error.as_str()),
			_ => None,
		})
	}
}

/// Snapshot of `pendingTasks` for both channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSaves {
	pub regular: bool,
	pub solution: bool,
}

/// Invoked after a successful save with the stored content.
pub type SavedHook = Arc<dyn Fn(SaveChannel, &CardId, &EditorState) + Send + Sync>;

#[derive(Debug, Default)]
struct ChannelState {
	last_saved: Option<(CardId, EditorState)>,
	queued: Option<SaveRequest>,
	pending: bool,
	last_error: Option<String>,
}

impl ChannelState {
	fn previous_for(&self, card_id: &CardId) -> Option<EditorState> {
		self.last_saved.as_ref().filter(|(id, _)| id == card_id).map(|(_, content)| content.clone())
	}

	/// Newest content known for `card_id`: queued if any, else last saved.
	fn latest_for(&self, card_id: &CardId) -> Option<&EditorState> {
		match &self.queued {
			Some(request) if &request.card_id == card_id => Some(&request.content),
			_ => self.last_saved.as_ref().filter(|(id, _)| id == card_id).map(|(_, content)| content),
		}
	}
}

struct ChannelCore {
	channel: SaveChannel,
	store: Arc<dyn CardStore>,
	observer: Arc<dyn SessionObserver>,
	saved_hook: Mutex<Option<SavedHook>>,
	state: Mutex<ChannelState>,
}

impl ChannelCore {
	async fn save(&self, request: SaveRequest, trigger: SaveTrigger) -> SaveOutcome {
		let previous = self.state.lock().previous_for(&request.card_id);
		if previous.as_ref() == Some(&request.content) {
			self.settle();
			return SaveOutcome::Unchanged { card_id: request.card_id };
		}

		trace!(channel = self.channel.as_str(), card_id = %request.card_id, trigger = trigger.as_str(), "autosave.save_start");
		let result = persist_content(self.store.as_ref(), &request.card_id, &request.content, previous.as_ref()).await;

		let outcome = {
			let mut state = self.state.lock();
			state.pending = state.queued.is_some();
			match result {
				Ok(()) => {
					state.last_saved = Some((request.card_id.clone(), request.content.clone()));
					state.last_error = None;
					SaveOutcome::Saved {
						card_id: request.card_id.clone(),
					}
				}
				Err(err) => {
					let error = err.to_string();
					state.last_error = Some(error.clone());
					SaveOutcome::Failed {
						card_id: request.card_id.clone(),
						error,
					}
				}
			}
		};

		self.observer.on_save(&SaveEvent {
			channel: self.channel,
			card_id: request.card_id.clone(),
			trigger,
			result: match &outcome {
				SaveOutcome::Failed { error, .. } => Err(error.clone()),
				_ => Ok(()),
			},
		});
		if matches!(outcome, SaveOutcome::Saved { .. }) {
			let hook = self.saved_hook.lock().clone();
			if let Some(hook) = hook {
				hook(self.channel, &request.card_id, &request.content);
			}
		}
		outcome
	}

	fn settle(&self) {
		let mut state = self.state.lock();
		state.pending = state.queued.is_some();
	}
}

struct Channel {
	core: Arc<ChannelCore>,
	timer: Debouncer,
	delay: Duration,
}

/// Two independent debounce channels persisting editor content.
pub struct AutosaveScheduler {
	regular: Channel,
	solution: Channel,
	enabled: AtomicBool,
	suspended: AtomicBool,
}

impl std::fmt::Debug for AutosaveScheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AutosaveScheduler")
			.field("enabled", &self.is_enabled())
			.field("suspended", &self.is_suspended())
			.field("pending", &self.pending())
			.finish()
	}
}

impl AutosaveScheduler {
	pub fn new(store: Arc<dyn CardStore>, observer: Arc<dyn SessionObserver>, regular_delay: Duration, solution_delay: Duration) -> Self {
		let build = |channel: SaveChannel, delay: Duration| Channel {
			core: Arc::new(ChannelCore {
				channel,
				store: Arc::clone(&store),
				observer: Arc::clone(&observer),
				saved_hook: Mutex::new(None),
				state: Mutex::new(ChannelState::default()),
			}),
			timer: Debouncer::new(
				match channel {
					SaveChannel::Regular => "autosave.regular",
					SaveChannel::Solution => "autosave.solution",
				},
				TaskClass::Autosave,
			),
			delay,
		};
		Self {
			regular: build(SaveChannel::Regular, regular_delay),
			solution: build(SaveChannel::Solution, solution_delay),
			enabled: AtomicBool::new(true),
			suspended: AtomicBool::new(false),
		}
	}

	/// Registers a callback run after every successful save.
	pub fn set_saved_hook(&self, hook: SavedHook) {
		for channel in [&self.regular, &self.solution] {
			*channel.core.saved_hook.lock() = Some(Arc::clone(&hook));
		}
	}

	fn channel(&self, channel: SaveChannel) -> &Channel {
		match channel {
			SaveChannel::Regular => &self.regular,
			SaveChannel::Solution => &self.solution,
		}
	}

	/// True if `content` differs from the newest value saved or queued for `card_id`.
	pub fn has_content_changed(&self, channel: SaveChannel, card_id: &CardId, content: &EditorState) -> bool {
		self.channel(channel).core.state.lock().latest_for(card_id) != Some(content)
	}

	/// Last content saved to `card_id` on `channel`.
	pub fn saved_content(&self, channel: SaveChannel, card_id: &CardId) -> Option<EditorState> {
		self.channel(channel).core.state.lock().previous_for(card_id)
	}

	/// Records `content` as already stored for `card_id`, e.g. after loading it.
	pub fn mark_saved(&self, channel: SaveChannel, card_id: &CardId, content: &EditorState) {
		self.channel(channel).core.state.lock().last_saved = Some((card_id.clone(), content.clone()));
	}

	/// Offers an edit to `channel`, scheduling a save if the content changed.
	///
	/// Rescheduling cancels the channel's previous timer and replaces its
	/// queued content.
	pub fn on_content_change(&self, channel: SaveChannel, card: Option<&Card>, content: &EditorState) -> ScheduleOutcome {
		if !self.is_enabled() {
			return ScheduleOutcome::Disabled;
		}
		if self.is_suspended() {
			return ScheduleOutcome::Suspended;
		}
		let Some(card) = card else {
			return ScheduleOutcome::NoEntity;
		};
		if !self.has_content_changed(channel, &card.id, content) {
			trace!(channel = channel.as_str(), card_id = %card.id, "autosave.unchanged");
			return ScheduleOutcome::Unchanged;
		}

		let slot = self.channel(channel);
		{
			let mut state = slot.core.state.lock();
			state.queued = Some(SaveRequest::new(channel, card, content.clone()));
			state.pending = true;
		}

		let core = Arc::clone(&slot.core);
		slot.timer.schedule(slot.delay, move |_token| async move {
			let request = core.state.lock().queued.take();
			if let Some(request) = request {
				core.save(request, SaveTrigger::Debounced).await;
			}
		});
		trace!(channel = channel.as_str(), card_id = %card.id, delay_ms = slot.delay.as_millis() as u64, "autosave.scheduled");
		ScheduleOutcome::Scheduled
	}

	/// Cancels the channel's timer and drops its queued content.
	pub fn cancel(&self, channel: SaveChannel) -> bool {
		let slot = self.channel(channel);
		let cancelled = slot.timer.cancel();
		let mut state = slot.core.state.lock();
		let dropped = state.queued.take().is_some();
		if dropped {
			state.pending = false;
		}
		cancelled || dropped
	}

	pub fn cancel_all(&self) {
		for channel in SaveChannel::ALL {
			if self.cancel(channel) {
				debug!(channel = channel.as_str(), "autosave.cancelled");
			}
		}
	}

	/// Blocks new scheduling and cancels both timers until [`Self::resume`].
	///
	/// Queued content is kept so a following [`Self::force_flush`] can still
	/// persist it.
	pub fn suspend(&self) {
		self.suspended.store(true, Ordering::Release);
		self.regular.timer.cancel();
		self.solution.timer.cancel();
	}

	pub fn resume(&self) {
		self.suspended.store(false, Ordering::Release);
	}

	pub fn is_suspended(&self) -> bool {
		self.suspended.load(Ordering::Acquire)
	}

	pub fn enable(&self) {
		self.enabled.store(true, Ordering::Release);
	}

	/// Turns autosave off and cancels everything pending.
	pub fn disable(&self) {
		self.enabled.store(false, Ordering::Release);
		self.cancel_all();
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled.load(Ordering::Acquire)
	}

	pub fn is_pending(&self, channel: SaveChannel) -> bool {
		self.channel(channel).core.state.lock().pending
	}

	pub fn pending(&self) -> PendingSaves {
		PendingSaves {
			regular: self.is_pending(SaveChannel::Regular),
			solution: self.is_pending(SaveChannel::Solution),
		}
	}

	pub fn last_error(&self, channel: SaveChannel) -> Option<String> {
		self.channel(channel).core.state.lock().last_error.clone()
	}

	/// Cancels both timers and persists every channel's content concurrently.
	///
	/// `live` replaces the queued content of its channel. Requests are
	/// captured before the first await, so a transition completing mid-flush
	/// cannot redirect them. Returns once both saves have settled.
	pub async fn force_flush(&self, live: Option<SaveRequest>) -> FlushReport {
		self.regular.timer.cancel();
		self.solution.timer.cancel();

		let mut live = live;
		let mut capture = |channel: SaveChannel| -> Option<SaveRequest> {
			let mut state = self.channel(channel).core.state.lock();
			let queued = state.queued.take();
			let request = match live.take_if(|request| request.channel == channel) {
				Some(request) => Some(request),
				None => queued,
			};
			if request.is_some() {
				state.pending = true;
			}
			request
		};
		let regular_request = capture(SaveChannel::Regular);
		let solution_request = capture(SaveChannel::Solution);

		debug!(
			regular = regular_request.is_some(),
			solution = solution_request.is_some(),
			"autosave.force_flush"
		);

		let regular_core = Arc::clone(&self.regular.core);
		let solution_core = Arc::clone(&self.solution.core);
		let (regular, solution) = tokio::join!(
			async move {
				match regular_request {
					Some(request) => Some(regular_core.save(request, SaveTrigger::Flush).await),
					None => None,
				}
			},
			async move {
				match solution_request {
					Some(request) => Some(solution_core.save(request, SaveTrigger::Flush).await),
					None => None,
				}
			},
		);
		FlushReport { regular, solution }
	}
}

#[cfg(test)]
mod tests;
