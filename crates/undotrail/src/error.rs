use thiserror::Error;
use undotrail_reactive::{ItemStatus, ModelError, NodeKind};

use crate::path::PathError;

/// Result of running an action or a command.
pub type Result<T, E = UndoError> = std::result::Result<T, E>;

/// Errors returned while running an inverse action or a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    #[error("stack cleanup ran before any stack was written")]
    NoStackWritten,

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("path error: {0}")]
    Path(#[from] PathError),

    #[error("action failed: {0}")]
    Action(String),
}

impl UndoError {
    /// Failure reported by a hand-built action.
    #[must_use]
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }
}

/// A change notification that no inverse action can be built for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("change carries neither a previous value nor an item event")]
    Unrecognized,

    #[error("unsupported item status: {0:?}")]
    UnsupportedStatus(ItemStatus),

    #[error("change target is a {found} node, expected {expected}")]
    WrongTarget { expected: NodeKind, found: NodeKind },

    #[error("cannot build path: {0}")]
    Path(#[from] PathError),
}

/// Invalid or unreadable [`UndoOptions`](crate::UndoOptions).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid options: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
