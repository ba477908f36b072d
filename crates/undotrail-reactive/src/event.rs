#![forbid(unsafe_code)]

//! Change notifications emitted by observable nodes.

use crate::node::Node;

/// Classification of one element of an array mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    /// The value was inserted at `index`.
    Added,
    /// The value was removed from `index`.
    Deleted,
    /// The value stayed in place. Produced by array diffing, never by the
    /// splice operations of [`crate::ObservableArray`].
    Retained,
}

/// One element-level change of an array.
///
/// Indices are expressed against the array as left by the previous event of
/// the same notification, so replaying the events in order reproduces the
/// mutation, and reverting them newest-first undoes it.
#[derive(Debug, Clone)]
pub struct ItemEvent {
    pub status: ItemStatus,
    pub index: usize,
    pub value: Node,
}

impl ItemEvent {
    #[must_use]
    pub fn added(index: usize, value: Node) -> Self {
        Self {
            status: ItemStatus::Added,
            index,
            value,
        }
    }

    #[must_use]
    pub fn deleted(index: usize, value: Node) -> Self {
        Self {
            status: ItemStatus::Deleted,
            index,
            value,
        }
    }
}

/// Notification delivered to direct subscribers of a cell or array.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// A cell's value was replaced; `old` is the previous value.
    Replaced { old: Node },
    /// An array was spliced.
    Spliced { items: Vec<ItemEvent> },
}

/// A change reported by a deep watch.
///
/// Exactly one of `old_value` and `item` is set for well-formed changes:
/// `old_value` for a replaced cell (when old values are retained), `item`
/// for an array splice element.
#[derive(Debug, Clone)]
pub struct Change {
    /// Ancestor chain from the watched root (inclusive) to the target
    /// (exclusive). Empty when the target is the root.
    pub parents: Vec<Node>,
    /// The cell or array that mutated.
    pub target: Node,
    /// Previous value of a replaced cell.
    pub old_value: Option<Node>,
    /// Element-level array event.
    pub item: Option<ItemEvent>,
}

impl Change {
    /// Full chain from the root to the target, both inclusive.
    #[must_use]
    pub fn chain(&self) -> Vec<Node> {
        let mut chain = self.parents.clone();
        chain.push(self.target.clone());
        chain
    }
}
