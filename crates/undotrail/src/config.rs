#![forbid(unsafe_code)]

//! Options of an [`UndoManager`](crate::UndoManager).
//!
//! Options can be built in code or loaded from TOML or JSON. Missing keys
//! take their defaults and unknown keys are ignored.
//!
//! ```toml
//! levels = 50
//! undo_label = "Undo (#COUNT#)"
//! dereference = true
//! replay_order = "capture_order"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::ReplayOrder;
use crate::error::ConfigError;

/// Token replaced with the stack length in command labels.
pub const COUNT_TOKEN: &str = "#COUNT#";

/// Construction options of an undo manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoOptions {
    /// Maximum number of entries kept per stack.
    pub levels: usize,
    /// Undo command label template.
    pub undo_label: String,
    /// Redo command label template.
    pub redo_label: String,
    /// Start with the dereferencing synthesis strategy.
    pub dereference: bool,
    /// Step order of combined actions.
    pub replay_order: ReplayOrder,
}

impl Default for UndoOptions {
    fn default() -> Self {
        Self {
            levels: 100,
            undo_label: format!("undo ({COUNT_TOKEN})"),
            redo_label: format!("redo ({COUNT_TOKEN})"),
            dereference: false,
            replay_order: ReplayOrder::NewestFirst,
        }
    }
}

impl UndoOptions {
    #[must_use]
    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    #[must_use]
    pub fn with_undo_label(mut self, label: impl Into<String>) -> Self {
        self.undo_label = label.into();
        self
    }

    #[must_use]
    pub fn with_redo_label(mut self, label: impl Into<String>) -> Self {
        self.redo_label = label.into();
        self
    }

    #[must_use]
    pub fn with_dereference(mut self, dereference: bool) -> Self {
        self.dereference = dereference;
        self
    }

    #[must_use]
    pub fn with_replay_order(mut self, order: ReplayOrder) -> Self {
        self.replay_order = order;
        self
    }

    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(s)?;
        options.validated()
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(s)?;
        options.validated()
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check every option. An empty list means the options are valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.levels == 0 {
            errors.push("levels must be at least 1".to_string());
        }
        errors
    }

    /// `self` if [`validate`](Self::validate) finds nothing.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    /// Serialize to a single-line JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Render a label template: the first `#COUNT#` becomes `count`.
#[must_use]
pub fn render_label(template: &str, count: usize) -> String {
    template.replacen(COUNT_TOKEN, &count.to_string(), 1)
}
