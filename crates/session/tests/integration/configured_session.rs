use std::time::Duration;

use cardflip_model::CardMode;
use cardflip_session::{SessionConfig, SessionError, ValidationKind};
use tokio::time::sleep;

use crate::common::open;

const FAST: &str = r#"
sync_debounce_ms = 20
regular_autosave_ms = 100
solution_autosave_ms = 300
"#;

#[tokio::test(start_paused = true)]
async fn channels_use_their_own_delays() {
	let h = open(SessionConfig::from_toml_str(FAST).unwrap());
	h.session.update_code("ab", "python");
	sleep(Duration::from_millis(150)).await;
	assert_eq!(h.store.writes_to(&h.regular.id).len(), 1);

	h.session.toggle().await.unwrap();
	let solution = h.session.solution_card().unwrap();
	h.session.update_code("answer", "python");
	sleep(Duration::from_millis(150)).await;
	assert!(h.store.writes_to(&solution.id).is_empty());
	sleep(Duration::from_millis(200)).await;
	assert_eq!(h.store.writes_to(&solution.id).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn autosave_can_start_disabled() {
	let config = SessionConfig::from_toml_str("autosave_enabled = false\nregular_autosave_ms = 100").unwrap();
	let h = open(config);
	assert!(!h.session.is_autosave_enabled());
	h.session.update_code("ab", "python");
	sleep(Duration::from_secs(1)).await;
	assert!(h.store.writes().is_empty());

	h.session.enable_autosave();
	h.session.update_code("abc", "python");
	sleep(Duration::from_secs(1)).await;
	assert_eq!(h.store.writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn strict_config_blocks_implicit_solution_creation() {
	let h = open(SessionConfig::from_toml_str("strict_validation = true").unwrap());
	let err = h.session.toggle().await.unwrap_err();
	assert!(matches!(err, SessionError::TransitionRejected { .. }));
	assert_eq!(*h.recorder.validation_failures.lock(), vec![ValidationKind::Transition]);

	h.session.create().await.unwrap();
	assert_eq!(h.session.toggle().await.unwrap(), CardMode::Answer);
}
