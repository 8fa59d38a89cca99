use serde::{Deserialize, Serialize};

use crate::Card;

/// Content bound to the shared code/notes editor surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditorState {
	pub code: String,
	pub notes: String,
	pub language: String,
}

impl EditorState {
	pub fn new(code: impl Into<String>, notes: impl Into<String>, language: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			notes: notes.into(),
			language: language.into(),
		}
	}

	/// Copies a card's editable fields, substituting empty strings for absent ones.
	pub fn from_card(card: &Card) -> Self {
		Self {
			code: card.code.clone().unwrap_or_default(),
			notes: card.notes.clone().unwrap_or_default(),
			language: card.language.clone().unwrap_or_default(),
		}
	}

	/// Returns true when `code` or `language` differ from `other`.
	pub fn code_differs(&self, other: &Self) -> bool {
		self.code != other.code || self.language != other.language
	}

	pub fn notes_differs(&self, other: &Self) -> bool {
		self.notes != other.notes
	}

	/// Merges a patch in place. Returns true if any field changed.
	pub fn apply(&mut self, patch: EditorPatch) -> bool {
		let mut changed = false;
		for (slot, value) in [
			(&mut self.code, patch.code),
			(&mut self.notes, patch.notes),
			(&mut self.language, patch.language),
		] {
			if let Some(value) = value
				&& *slot != value
			{
				*slot = value;
				changed = true;
			}
		}
		changed
	}
}

/// Partial update emitted by the editor surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorPatch {
	pub code: Option<String>,
	pub notes: Option<String>,
	pub language: Option<String>,
}

impl EditorPatch {
	pub fn code(code: impl Into<String>, language: impl Into<String>) -> Self {
		Self {
			code: Some(code.into()),
			language: Some(language.into()),
			..Self::default()
		}
	}

	pub fn notes(notes: impl Into<String>) -> Self {
		Self {
			notes: Some(notes.into()),
			..Self::default()
		}
	}

	/// Patch replacing every field.
	pub fn replace(state: EditorState) -> Self {
		Self {
			code: Some(state.code),
			notes: Some(state.notes),
			language: Some(state.language),
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn apply_reports_only_real_changes() {
		let mut state = EditorState::new("a", "", "python");
		assert!(!state.apply(EditorPatch::code("a", "python")));
		assert!(state.apply(EditorPatch::code("ab", "python")));
		assert_eq!(state, EditorState::new("ab", "", "python"));
	}

	#[test]
	fn notes_patch_leaves_code_untouched() {
		let mut state = EditorState::new("fn main() {}", "old", "rust");
		assert!(state.apply(EditorPatch::notes("new")));
		assert_eq!(state.code, "fn main() {}");
		assert_eq!(state.notes, "new");
	}

	#[test]
	fn from_card_defaults_absent_fields() {
		let mut card = Card::regular("c1", "p1", 1);
		card.code = Some("x".into());
		let state = EditorState::from_card(&card);
		assert_eq!(state, EditorState::new("x", "", ""));
	}
}
