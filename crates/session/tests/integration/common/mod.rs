use std::sync::Arc;

use cardflip_model::{Card, ProblemId};
use cardflip_session::{CardSession, SaveEvent, SessionConfig, SessionObserver, TransitionEvent, ValidationKind, ValidationResult};
use cardflip_store::MemoryCardStore;
use parking_lot::Mutex;

/// Installs a test-friendly subscriber once per binary.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

#[derive(Debug, Default)]
pub struct Recorder {
	pub transitions: Mutex<Vec<TransitionEvent>>,
	pub saves: Mutex<Vec<SaveEvent>>,
	pub validation_failures: Mutex<Vec<ValidationKind>>,
}

impl SessionObserver for Recorder {
	fn on_transition(&self, event: &TransitionEvent) {
		self.transitions.lock().push(event.clone());
	}

	fn on_save(&self, event: &SaveEvent) {
		self.saves.lock().push(event.clone());
	}

	fn on_validation_failure(&self, kind: ValidationKind, _result: &ValidationResult) {
		self.validation_failures.lock().push(kind);
	}
}

pub struct Harness {
	pub store: Arc<MemoryCardStore>,
	pub recorder: Arc<Recorder>,
	pub session: CardSession,
	pub regular: Card,
}

/// Opens a session on problem `p1` whose regular card holds `a` in python.
pub fn open(config: SessionConfig) -> Harness {
	init_tracing();
	let store = Arc::new(MemoryCardStore::new().with_solution_language("python"));
	let problem = ProblemId::from("p1");
	let regular = store.insert_regular(&problem, "a", "python");
	let recorder = Arc::new(Recorder::default());
	let session = CardSession::open(problem, regular.clone(), store.clone(), config, recorder.clone());
	Harness {
		store,
		recorder,
		session,
		regular,
	}
}
