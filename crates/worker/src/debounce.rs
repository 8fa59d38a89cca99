use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::{GenerationClock, GenerationToken, TaskClass, spawn};

struct PendingTimer {
	token: GenerationToken,
	handle: JoinHandle<()>,
}

/// Single-slot debounce timer.
///
/// Scheduling replaces any pending timer. A timer leaves the slot the moment
/// its delay elapses, so [`Debouncer::cancel`] only affects work that has not
/// started yet; the callback itself is never interrupted. Dropping the
/// debouncer cancels the pending timer.
pub struct Debouncer {
	name: &'static str,
	class: TaskClass,
	clock: GenerationClock,
	slot: Arc<Mutex<Option<PendingTimer>>>,
}

impl std::fmt::Debug for Debouncer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Debouncer")
			.field("name", &self.name)
			.field("pending", &self.is_pending())
			.finish()
	}
}

impl Debouncer {
	pub fn new(name: &'static str, class: TaskClass) -> Self {
		Self {
			name,
			class,
			clock: GenerationClock::new(),
			slot: Arc::new(Mutex::new(None)),
		}
	}

	/// Schedules `f` to run after `delay` of quiet, replacing any pending timer.
	///
	/// Returns the generation assigned to the new timer.
	pub fn schedule<F, Fut>(&self, delay: Duration, f: F) -> u64
	where
		F: FnOnce(GenerationToken) -> Fut + Send + 'static,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let generation = self.clock.next();
		let token = GenerationToken::new(generation);
		let slot = Arc::clone(&self.slot);
		let name = self.name;
		let task_token = token.clone();

		let mut guard = self.slot.lock();
		if let Some(previous) = guard.take() {
			tracing::trace!(debouncer = name, superseded = previous.token.generation(), generation, "debounce.reschedule");
			previous.token.cancel();
		}

		let handle = spawn(self.class, async move {
			tokio::select! {
				_ = task_token.cancelled() => return,
				_ = tokio::time::sleep(delay) => {}
			}
			{
				let mut slot = slot.lock();
				match slot.as_ref() {
					Some(pending) if pending.token.generation() == generation => {
						slot.take();
					}
					_ => return,
				}
			}
			tracing::trace!(debouncer = name, generation, "debounce.fire");
			f(task_token).await;
		});

		*guard = Some(PendingTimer { token, handle });
		generation
	}

	/// Cancels the pending timer. Returns true if one was pending.
	pub fn cancel(&self) -> bool {
		let Some(pending) = self.slot.lock().take() else {
			return false;
		};
		tracing::trace!(debouncer = self.name, generation = pending.token.generation(), "debounce.cancel");
		pending.token.cancel();
		pending.handle.abort();
		true
	}

	/// Returns true while a timer is waiting out its delay.
	pub fn is_pending(&self) -> bool {
		self.slot.lock().is_some()
	}

	/// Generation of the most recently scheduled timer.
	pub fn generation(&self) -> u64 {
		self.clock.current()
	}
}

impl Drop for Debouncer {
	fn drop(&mut self) {
		if let Some(pending) = self.slot.lock().take() {
			pending.token.cancel();
			pending.handle.abort();
		}
	}
}
