/// Execution classes used to tag spawned work in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Debounced pulls of entity content into the editor state.
	ContentSync,
	/// Debounced per-channel autosave timers.
	Autosave,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ContentSync => "content_sync",
			Self::Autosave => "autosave",
		}
	}
}
