use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque storage identifier of a card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

/// Opaque storage identifier of a practice problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemId(pub String);

impl fmt::Display for CardId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Display for ProblemId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CardId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl From<&str> for ProblemId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

/// A card record as held by the storage collaborator.
///
/// Regular attempt cards and the per-problem solution card share this shape;
/// `is_solution` tells them apart. Solution cards always carry
/// `card_number == 0` so they never take part in attempt numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
	pub id: CardId,
	pub problem_id: ProblemId,
	pub card_number: i32,
	pub code: Option<String>,
	pub notes: Option<String>,
	pub language: Option<String>,
	pub status: String,
	pub is_solution: bool,
	pub created_at: DateTime<Utc>,
	pub last_modified: DateTime<Utc>,
}

impl Card {
	/// Builds an empty regular card stamped with the current time.
	pub fn regular(id: impl Into<String>, problem_id: impl Into<String>, card_number: i32) -> Self {
		let now = Utc::now();
		Self {
			id: CardId(id.into()),
			problem_id: ProblemId(problem_id.into()),
			card_number,
			code: None,
			notes: None,
			language: None,
			status: "In Progress".to_string(),
			is_solution: false,
			created_at: now,
			last_modified: now,
		}
	}

	/// Builds an empty solution card in `language`.
	pub fn solution(id: impl Into<String>, problem_id: impl Into<String>, language: impl Into<String>) -> Self {
		Self {
			card_number: 0,
			code: Some(String::new()),
			notes: Some(String::new()),
			language: Some(language.into()),
			is_solution: true,
			..Self::regular(id, problem_id, 0)
		}
	}

	/// Sets the editable fields, builder style.
	pub fn with_content(mut self, code: impl Into<String>, notes: impl Into<String>, language: impl Into<String>) -> Self {
		self.code = Some(code.into());
		self.notes = Some(notes.into());
		self.language = Some(language.into());
		self
	}
}
