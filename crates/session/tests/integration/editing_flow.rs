use std::time::Duration;

use cardflip_model::{CardMode, EditorState, SaveChannel};
use cardflip_session::{EditOutcome, SaveTrigger, SessionConfig, TransitionOutcome};
use cardflip_store::StoreWrite;
use pretty_assertions::assert_eq;
use tokio::time::{Instant, sleep};

use crate::common::open;

#[tokio::test(start_paused = true)]
async fn edit_then_toggle_persists_edit_and_shows_solution() {
	let h = open(SessionConfig::default());
	assert_eq!(h.session.update_code("ab", "python"), EditOutcome::Applied);

	sleep(Duration::from_millis(1000)).await;
	assert!(h.store.writes().is_empty(), "still inside the autosave window");

	assert_eq!(h.session.toggle().await.unwrap(), CardMode::Answer);
	assert_eq!(
		h.store.writes(),
		vec![StoreWrite::Code {
			card_id: h.regular.id.clone(),
			code: "ab".into(),
			language: "python".into(),
		}]
	);
	assert_eq!(h.session.editor_state(), EditorState::new("", "", "python"));
	assert!(!h.session.pending_saves().regular);

	let saves = h.recorder.saves.lock().clone();
	assert_eq!(saves.len(), 1);
	assert_eq!(saves[0].channel, SaveChannel::Regular);
	assert_eq!(saves[0].trigger, SaveTrigger::Flush);

	let transitions = h.recorder.transitions.lock().clone();
	assert_eq!(transitions.len(), 1);
	assert_eq!(transitions[0].from, CardMode::Regular);
	assert_eq!(transitions[0].to, CardMode::Answer);
	assert_eq!(transitions[0].outcome, TransitionOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn typing_persists_once_after_quiet_period() {
	let h = open(SessionConfig::default());
	for code in ["ab", "abc", "abcd"] {
		h.session.update_code(code, "python");
		sleep(Duration::from_millis(500)).await;
	}
	assert!(h.store.writes().is_empty());

	sleep(Duration::from_millis(2500)).await;
	assert_eq!(h.store.writes().len(), 1);
	assert_eq!(h.store.snapshot(&h.regular.id).unwrap().code.as_deref(), Some("abcd"));
	assert_eq!(h.recorder.saves.lock()[0].trigger, SaveTrigger::Debounced);
	assert_eq!(h.session.regular_card().unwrap().code.as_deref(), Some("abcd"));
}

#[tokio::test(start_paused = true)]
async fn force_flush_waits_for_slow_storage() {
	let h = open(SessionConfig::default());
	h.session.update_code("ab", "python");
	h.session.update_notes("note");
	h.store.set_latency(Duration::from_millis(100));

	let started = Instant::now();
	let report = h.session.force_flush().await;
	assert!(report.all_succeeded());
	assert!(started.elapsed() >= Duration::from_millis(200), "code and notes are written in turn");
	assert_eq!(h.store.writes_to(&h.regular.id).len(), 2);
	assert!(!h.session.pending_saves().regular);
}

#[tokio::test(start_paused = true)]
async fn solution_save_failure_is_reported_per_channel() {
	let h = open(SessionConfig::default());
	h.session.toggle().await.unwrap();
	h.session.update_code("answer", "python");
	h.store.fail_writes(Some("quota exceeded"));

	sleep(Duration::from_secs(3)).await;
	assert!(!h.session.pending_saves().solution);
	assert_eq!(
		h.session.last_save_error(SaveChannel::Solution).as_deref(),
		Some("storage backend failed: quota exceeded")
	);
	assert_eq!(h.session.last_save_error(SaveChannel::Regular), None);
	assert!(h.recorder.saves.lock().iter().any(|event| event.result.is_err()));

	h.store.fail_writes(None);
	h.session.update_code("answer!", "python");
	sleep(Duration::from_secs(3)).await;
	assert_eq!(h.session.last_save_error(SaveChannel::Solution), None);
}

#[tokio::test(start_paused = true)]
async fn round_trip_records_valid_states() {
	let h = open(SessionConfig::default());
	h.session.toggle().await.unwrap();
	h.session.exit_solution().await.unwrap();
	assert_eq!(h.session.exit_solution().await.unwrap(), CardMode::Regular);

	let transitions = h.recorder.transitions.lock().clone();
	assert_eq!(transitions.len(), 2);
	assert!(transitions.iter().all(|event| event.outcome == TransitionOutcome::Completed));
	assert!(h.session.validation_history().iter().all(|record| record.result.is_valid));
}
