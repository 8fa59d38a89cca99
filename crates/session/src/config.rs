//! Session configuration.
//!
//! Every timing and validation knob of a [`crate::CardSession`] lives in
//! [`SessionConfig`]. Values can be written in TOML; omitted keys fall back to
//! the defaults below.
//!
//! ```toml
//! sync_debounce_ms = 150
//! regular_autosave_ms = 2500
//! solution_autosave_ms = 2500
//! strict_validation = false
//! flush_before_toggle = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	/// A value parsed but is outside its allowed range.
	#[error("invalid value for {key}: {reason}")]
	Invalid { key: &'static str, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
	/// Quiet period before entity content is pulled into the editor.
	pub sync_debounce_ms: u64,
	pub regular_autosave_ms: u64,
	pub solution_autosave_ms: u64,
	/// Treat validation warnings as blocking.
	pub strict_validation: bool,
	/// Age after which the last valid snapshot is no longer used for recovery.
	pub snapshot_staleness_ms: u64,
	/// Capacity of the validation history ring.
	pub validation_history: usize,
	/// Persist the live editor content before every mode switch. When off,
	/// edits younger than the autosave delay are dropped on toggle.
	pub flush_before_toggle: bool,
	pub autosave_enabled: bool,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			sync_debounce_ms: 150,
			regular_autosave_ms: 2500,
			solution_autosave_ms: 2500,
			strict_validation: false,
			snapshot_staleness_ms: 30_000,
			validation_history: 10,
			flush_before_toggle: true,
			autosave_enabled: true,
		}
	}
}

impl SessionConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.validation_history == 0 {
			return Err(ConfigError::Invalid {
				key: "validation_history",
				reason: "must hold at least one entry",
			});
		}
		if self.regular_autosave_ms == 0 || self.solution_autosave_ms == 0 {
			return Err(ConfigError::Invalid {
				key: "autosave delay",
				reason: "must be greater than zero",
			});
		}
		Ok(())
	}

	pub fn sync_debounce(&self) -> Duration {
		Duration::from_millis(self.sync_debounce_ms)
	}

	pub fn regular_autosave_delay(&self) -> Duration {
		Duration::from_millis(self.regular_autosave_ms)
	}

	pub fn solution_autosave_delay(&self) -> Duration {
		Duration::from_millis(self.solution_autosave_ms)
	}

	pub fn snapshot_staleness(&self) -> Duration {
		Duration::from_millis(self.snapshot_staleness_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		assert_eq!(SessionConfig::from_toml_str("").unwrap(), SessionConfig::default());
	}

	#[test]
	fn partial_document_overrides_named_keys() {
		let config = SessionConfig::from_toml_str("solution_autosave_ms = 500\nstrict_validation = true\n").unwrap();
		assert_eq!(config.solution_autosave_delay(), Duration::from_millis(500));
		assert_eq!(config.regular_autosave_delay(), Duration::from_millis(2500));
		assert!(config.strict_validation);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		assert!(matches!(SessionConfig::from_toml_str("autosave = 1"), Err(ConfigError::Toml(_))));
	}

	#[test]
	fn zero_history_is_invalid() {
		let err = SessionConfig::from_toml_str("validation_history = 0").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid { key: "validation_history", .. }));
	}
}
