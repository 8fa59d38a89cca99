use parking_lot::Mutex;

use crate::consistency::ValidationResult;
use crate::telemetry::{SaveEvent, SessionObserver, TransitionEvent, ValidationKind};

/// Observer that keeps every event for later assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
	pub(crate) transitions: Mutex<Vec<TransitionEvent>>,
	pub(crate) saves: Mutex<Vec<SaveEvent>>,
	pub(crate) validation_failures: Mutex<Vec<(ValidationKind, ValidationResult)>>,
}

impl SessionObserver for RecordingObserver {
	fn on_transition(&self, event: &TransitionEvent) {
		self.transitions.lock().push(event.clone());
	}

	fn on_save(&self, event: &SaveEvent) {
		self.saves.lock().push(event.clone());
	}

	fn on_validation_failure(&self, kind: ValidationKind, result: &ValidationResult) {
		self.validation_failures.lock().push((kind, result.clone()));
	}
}
