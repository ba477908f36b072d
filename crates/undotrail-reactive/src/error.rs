use thiserror::Error;

use crate::node::NodeKind;

pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised by model mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("expected {expected} node, found {found}")]
    KindMismatch { expected: NodeKind, found: NodeKind },
}

impl ModelError {
    #[must_use]
    pub fn kind_mismatch(expected: NodeKind, found: NodeKind) -> Self {
        Self::KindMismatch { expected, found }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_index_and_length() {
        let err = ModelError::IndexOutOfBounds { index: 7, len: 3 };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn kind_mismatch_display() {
        let err = ModelError::kind_mismatch(NodeKind::Array, NodeKind::Cell);
        assert_eq!(err.to_string(), "expected array node, found cell");
    }
}
