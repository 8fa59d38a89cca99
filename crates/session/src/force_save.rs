//! Single-target save validation and execution.
//!
//! [`validate_save_target`] picks the one entity that may receive the editor
//! content for a given mode. [`ForceSaver::force_save`] re-runs that decision
//! on the context it is handed and issues exactly one save against the result.

use std::sync::Arc;

use cardflip_model::{Card, CardId, CardMode, EditorState, SaveChannel};
use cardflip_store::{CardStore, StoreError};
use tracing::trace;

/// Mode and candidate entities a save is decided against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveContext {
	pub mode: CardMode,
	pub regular: Option<Card>,
	pub solution: Option<Card>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTargetValidation {
	pub is_valid: bool,
	pub expected_card_id: Option<CardId>,
	pub target: Option<SaveChannel>,
	pub error: Option<String>,
}

impl SaveTargetValidation {
	fn valid(channel: SaveChannel, card: &Card) -> Self {
		Self {
			is_valid: true,
			expected_card_id: Some(card.id.clone()),
			target: Some(channel),
			error: None,
		}
	}

	fn invalid(error: impl Into<String>) -> Self {
		Self {
			is_valid: false,
			expected_card_id: None,
			target: None,
			error: Some(error.into()),
		}
	}
}

/// Returns the single valid save target for `ctx`, or an invalid result.
pub fn validate_save_target(ctx: &SaveContext) -> SaveTargetValidation {
	match ctx.mode {
		CardMode::Regular => match &ctx.regular {
			Some(card) => SaveTargetValidation::valid(SaveChannel::Regular, card),
			None => SaveTargetValidation::invalid("Regular mode has no regular card to save to"),
		},
		CardMode::Answer => match &ctx.solution {
			Some(card) => SaveTargetValidation::valid(SaveChannel::Solution, card),
			None => SaveTargetValidation::invalid("Answer mode has no solution card to save to"),
		},
	}
}

/// Writes `content` to `card_id`, touching only fields that differ from
/// `previous`. With no `previous` both code and notes are written.
pub async fn persist_content(store: &dyn CardStore, card_id: &CardId, content: &EditorState, previous: Option<&EditorState>) -> Result<(), StoreError> {
	let write_code = previous.is_none_or(|prev| content.code_differs(prev));
	let write_notes = previous.is_none_or(|prev| content.notes_differs(prev));
	trace!(card_id = %card_id, write_code, write_notes, "save.persist");

	if write_code {
		store.update_code(card_id, &content.code, &content.language).await?;
	}
	if write_notes {
		store.update_notes(card_id, &content.notes).await?;
	}
	Ok(())
}

#[derive(Debug, Clone)]
pub struct ForceSaveOptions {
	pub context: SaveContext,
	pub content: EditorState,
	/// Last content known to be stored for the target, if any.
	pub previous: Option<EditorState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForceSaveResult {
	pub success: bool,
	pub error: Option<String>,
	pub saved_to: Option<SaveChannel>,
	pub card_id: Option<CardId>,
}

/// Executes validated single-target saves.
#[derive(Clone)]
pub struct ForceSaver {
	store: Arc<dyn CardStore>,
}

impl std::fmt::Debug for ForceSaver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ForceSaver").finish_non_exhaustive()
	}
}

impl ForceSaver {
	pub fn new(store: Arc<dyn CardStore>) -> Self {
		Self { store }
	}

	/// Validates `options.context` and saves to the chosen target.
	///
	/// Never returns an error; failures are reported in the result.
	pub async fn force_save(&self, options: ForceSaveOptions) -> ForceSaveResult {
		let validation = validate_save_target(&options.context);
		let (Some(channel), Some(card_id)) = (validation.target, validation.expected_card_id) else {
			return ForceSaveResult {
				success: false,
				error: validation.error,
				..ForceSaveResult::default()
			};
		};

		match persist_content(self.store.as_ref(), &card_id, &options.content, options.previous.as_ref()).await {
			Ok(()) => ForceSaveResult {
				success: true,
				error: None,
				saved_to: Some(channel),
				card_id: Some(card_id),
			},
			Err(err) => ForceSaveResult {
				success: false,
				error: Some(format!("Failed to save {} card: {err}", channel.as_str())),
				saved_to: None,
				card_id: Some(card_id),
			},
		}
	}
}
