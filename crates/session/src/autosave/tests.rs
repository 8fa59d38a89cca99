use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cardflip_model::{Card, EditorState, ProblemId, SaveChannel};
use cardflip_store::{MemoryCardStore, StoreWrite};
use pretty_assertions::assert_eq;
use tokio::time::{Instant, sleep};

use super::*;
use crate::telemetry::SaveTrigger;
use crate::test_support::RecordingObserver;

const DELAY: Duration = Duration::from_millis(2500);

struct Fixture {
	store: Arc<MemoryCardStore>,
	observer: Arc<RecordingObserver>,
	scheduler: AutosaveScheduler,
	regular: Card,
	solution: Card,
}

fn fixture() -> Fixture {
	let store = Arc::new(MemoryCardStore::new());
	let problem = ProblemId::from("p1");
	let regular = store.insert_regular(&problem, "a", "python");
	let solution = Card::solution("s1", "p1", "python");
	store.insert(solution.clone());
	let observer = Arc::new(RecordingObserver::default());
	let scheduler = AutosaveScheduler::new(store.clone(), observer.clone(), DELAY, DELAY);
	scheduler.mark_saved(SaveChannel::Regular, &regular.id, &EditorState::from_card(&regular));
	scheduler.mark_saved(SaveChannel::Solution, &solution.id, &EditorState::from_card(&solution));
	Fixture {
		store,
		observer,
		scheduler,
		regular,
		solution,
	}
}

fn code(code: &str) -> EditorState {
	EditorState::new(code, "", "python")
}

#[tokio::test(start_paused = true)]
async fn identical_content_schedules_once() {
	let f = fixture();
	let edited = code("ab");
	assert_eq!(f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &edited), ScheduleOutcome::Scheduled);
	assert_eq!(f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &edited), ScheduleOutcome::Unchanged);

	sleep(DELAY + Duration::from_millis(10)).await;
	assert_eq!(f.store.writes().len(), 1);
	assert_eq!(f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &edited), ScheduleOutcome::Unchanged);
}

#[tokio::test(start_paused = true)]
async fn content_equal_to_loaded_card_is_not_scheduled() {
	let f = fixture();
	assert_eq!(f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("a")), ScheduleOutcome::Unchanged);
	assert!(!f.scheduler.is_pending(SaveChannel::Regular));
}

#[tokio::test(start_paused = true)]
async fn debounced_save_writes_only_changed_fields() {
	let f = fixture();
	f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("ab"));
	assert!(f.scheduler.is_pending(SaveChannel::Regular));

	sleep(DELAY / 2).await;
	assert!(f.store.writes().is_empty(), "nothing persists before the delay");

	sleep(DELAY).await;
	assert_eq!(
		f.store.writes(),
		vec![StoreWrite::Code {
			card_id: f.regular.id.clone(),
			code: "ab".into(),
			language: "python".into(),
		}]
	);
	assert!(!f.scheduler.is_pending(SaveChannel::Regular));
	let saves = f.observer.saves.lock().clone();
	assert_eq!(saves.len(), 1);
	assert_eq!(saves[0].trigger, SaveTrigger::Debounced);
}

#[tokio::test(start_paused = true)]
async fn rescheduling_restarts_the_window() {
	let f = fixture();
	f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("ab"));
	sleep(DELAY - Duration::from_millis(100)).await;
	f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("abc"));
	sleep(Duration::from_millis(200)).await;
	assert!(f.store.writes().is_empty());

	sleep(DELAY).await;
	let stored = f.store.snapshot(&f.regular.id).unwrap();
	assert_eq!(stored.code.as_deref(), Some("abc"));
	assert_eq!(f.store.writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failure_clears_pending_without_retry_and_spares_other_channel() {
	let f = fixture();
	let ghost = Card::regular("ghost", "p1", 9);
	f.scheduler.on_content_change(SaveChannel::Regular, Some(&ghost), &code("lost"));
	f.scheduler.on_content_change(SaveChannel::Solution, Some(&f.solution), &code("answer"));

	sleep(DELAY * 4).await;
	assert!(!f.scheduler.is_pending(SaveChannel::Regular));
	assert!(f.scheduler.last_error(SaveChannel::Regular).unwrap().contains("card not found"));
	assert_eq!(f.scheduler.last_error(SaveChannel::Solution), None);
	assert_eq!(f.store.writes_to(&f.solution.id).len(), 1);
	assert_eq!(f.store.writes().len(), 1, "failed save is not retried");

	let failures = f.observer.saves.lock().iter().filter(|e| e.result.is_err()).count();
	assert_eq!(failures, 1);
}

#[tokio::test(start_paused = true)]
async fn disable_cancels_and_blocks_scheduling() {
	let f = fixture();
	f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("ab"));
	f.scheduler.disable();
	assert!(!f.scheduler.is_pending(SaveChannel::Regular));
	assert_eq!(f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("abc")), ScheduleOutcome::Disabled);

	sleep(DELAY * 2).await;
	assert!(f.store.writes().is_empty());

	f.scheduler.enable();
	assert_eq!(f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("abc")), ScheduleOutcome::Scheduled);
}

#[tokio::test(start_paused = true)]
async fn cancel_is_idempotent() {
	let f = fixture();
	assert!(!f.scheduler.cancel(SaveChannel::Solution));
	f.scheduler.on_content_change(SaveChannel::Solution, Some(&f.solution), &code("x"));
	assert!(f.scheduler.cancel(SaveChannel::Solution));
	assert!(!f.scheduler.cancel(SaveChannel::Solution));
	assert!(!f.scheduler.is_pending(SaveChannel::Solution));
}

#[tokio::test(start_paused = true)]
async fn suspend_keeps_queued_content_for_flush() {
	let f = fixture();
	f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("ab"));
	f.scheduler.suspend();
	assert_eq!(f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("abc")), ScheduleOutcome::Suspended);

	sleep(DELAY * 2).await;
	assert!(f.store.writes().is_empty(), "suspended timers never fire");

	let report = f.scheduler.force_flush(None).await;
	assert_eq!(
		report.regular,
		Some(SaveOutcome::Saved {
			card_id: f.regular.id.clone()
		})
	);
	assert_eq!(report.solution, None);
	f.scheduler.resume();
	assert!(!f.scheduler.is_suspended());
}

#[tokio::test(start_paused = true)]
async fn force_flush_waits_for_both_channels_concurrently() {
	let f = fixture();
	f.store.set_latency(Duration::from_millis(100));
	f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("ab"));
	f.scheduler.on_content_change(SaveChannel::Solution, Some(&f.solution), &code("answer"));

	let started = Instant::now();
	let report = f.scheduler.force_flush(None).await;
	let elapsed = started.elapsed();

	assert!(report.all_succeeded());
	assert!(report.regular.is_some() && report.solution.is_some());
	assert_eq!(f.store.writes().len(), 2, "both saves settled before return");
	assert!(elapsed >= Duration::from_millis(100));
	assert!(elapsed < Duration::from_millis(200), "saves ran concurrently, took {elapsed:?}");
	assert_eq!(f.scheduler.pending(), PendingSaves::default());

	sleep(DELAY * 2).await;
	assert_eq!(f.store.writes().len(), 2, "flushed timers do not fire later");
}

#[tokio::test(start_paused = true)]
async fn force_flush_reports_failures_per_channel() {
	let f = fixture();
	f.store.fail_writes(Some("offline"));
	let report = f
		.scheduler
		.force_flush(Some(SaveRequest::new(SaveChannel::Solution, &f.solution, code("x"))))
		.await;
	assert_eq!(report.regular, None);
	assert!(report.solution.as_ref().is_some_and(SaveOutcome::is_failure));
	assert_eq!(report.first_error(), Some("storage backend failed: offline"));
}

#[tokio::test(start_paused = true)]
async fn live_request_supersedes_queued_content() {
	let f = fixture();
	f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("ab"));
	f.scheduler
		.force_flush(Some(SaveRequest::new(SaveChannel::Regular, &f.regular, code("abc"))))
		.await;
	assert_eq!(f.store.snapshot(&f.regular.id).unwrap().code.as_deref(), Some("abc"));
	assert_eq!(f.store.writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn saved_hook_sees_stored_content() {
	let f = fixture();
	let calls = Arc::new(AtomicUsize::new(0));
	let seen = Arc::clone(&calls);
	f.scheduler.set_saved_hook(Arc::new(move |channel: SaveChannel, _card_id: &CardId, content: &EditorState| {
		assert_eq!(channel, SaveChannel::Regular);
		assert_eq!(content.code, "ab");
		seen.fetch_add(1, Ordering::SeqCst);
	}));
	f.scheduler.on_content_change(SaveChannel::Regular, Some(&f.regular), &code("ab"));
	sleep(DELAY * 2).await;
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}
