#![forbid(unsafe_code)]

//! Bounded, merge-aware stack of inverse actions.
//!
//! # Invariants
//!
//! 1. `len() <= levels()` after every operation.
//! 2. Merging only ever looks at the top entry.
//! 3. Overflow evicts the oldest entry (FIFO eviction, LIFO push/pop).
//!
//! ```text
//! levels = 3
//!
//! push(d)          [a, b, c] -> [b, c, d]      (a evicted)
//! push(e), top=d   d.merge(e) == Combine  -> [b, c, d+e]
//! push(f), top=d+e (d+e).merge(f) == KeepExisting -> [b, c, d+e]
//! ```

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::action::{InverseAction, MergeDecision, ReplayOrder};

/// What [`ActionStack::push`] did with the incoming action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended as a new entry; `evicted` is set when the oldest entry made
    /// room for it.
    Appended { evicted: bool },
    /// Fused with the top entry into a combined action.
    Combined,
    /// Dropped; the top entry was kept as it was.
    KeptExisting,
}

impl PushOutcome {
    /// Whether the stack was written (appended to or merged into).
    #[must_use]
    pub fn wrote(self) -> bool {
        !matches!(self, Self::KeptExisting)
    }
}

/// A stack of [`InverseAction`]s holding at most `levels` entries.
pub struct ActionStack {
    /// Oldest at the front, newest at the back.
    entries: VecDeque<InverseAction>,
    levels: usize,
    order: ReplayOrder,
}

impl fmt::Debug for ActionStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionStack")
            .field("len", &self.entries.len())
            .field("levels", &self.levels)
            .field("order", &self.order)
            .finish()
    }
}

impl ActionStack {
    /// Create an empty stack. `levels` is clamped to at least 1.
    #[must_use]
    pub fn new(levels: usize, order: ReplayOrder) -> Self {
        Self {
            entries: VecDeque::new(),
            levels: levels.max(1),
            order,
        }
    }

    /// Merge `action` into the top entry or append it.
    pub fn push(&mut self, action: InverseAction) -> PushOutcome {
        let action = match self.try_merge(action) {
            Ok(outcome) => return outcome,
            Err(action) => action,
        };

        let evicted = if self.entries.len() >= self.levels {
            self.entries.pop_front();
            true
        } else {
            false
        };
        if evicted {
            debug!(levels = self.levels, "oldest action evicted");
        }
        self.entries.push_back(action);
        PushOutcome::Appended { evicted }
    }

    /// Ask the top entry's merge rule about `action`. Hands the action back
    /// when no merge happened.
    fn try_merge(&mut self, action: InverseAction) -> Result<PushOutcome, InverseAction> {
        let Some(top) = self.entries.back() else {
            return Err(action);
        };
        match top.merge_decision(&action) {
            MergeDecision::Reject => Err(action),
            MergeDecision::KeepExisting => {
                debug!(kept = top.description(), dropped = action.description(), "action absorbed by top");
                Ok(PushOutcome::KeptExisting)
            }
            MergeDecision::Combine => {
                let Some(top) = self.entries.pop_back() else {
                    return Err(action);
                };
                let combined = InverseAction::combine(top, action, self.order);
                debug!(summary = %combined.summary(), "action combined with top");
                self.entries.push_back(combined);
                Ok(PushOutcome::Combined)
            }
        }
    }

    /// Remove and return the newest entry.
    pub fn pop(&mut self) -> Option<InverseAction> {
        self.entries.pop_back()
    }

    #[must_use]
    pub fn top(&self) -> Option<&InverseAction> {
        self.entries.back()
    }

    /// Remove the merge rule of the top entry, if any. Returns whether a
    /// rule was removed.
    pub fn strip_top_merge(&mut self) -> bool {
        self.entries
            .back_mut()
            .is_some_and(InverseAction::strip_merge_rule)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn levels(&self) -> usize {
        self.levels
    }

    #[must_use]
    pub fn order(&self) -> ReplayOrder {
        self.order
    }

    /// Summaries of the entries, most recent first.
    #[must_use]
    pub fn descriptions(&self, limit: usize) -> Vec<String> {
        self.entries
            .iter()
            .rev()
            .take(limit)
            .map(InverseAction::summary)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::MergeRule;

    fn plain(name: &str) -> InverseAction {
        InverseAction::new(name, || Ok(()))
    }

    fn bursty(name: &str) -> InverseAction {
        plain(name)
            .with_merge_rule(MergeRule::Burst)
            .with_merge_flag(true)
    }

    #[test]
    fn push_and_pop_are_lifo() {
        let mut stack = ActionStack::new(10, ReplayOrder::default());
        stack.push(plain("a"));
        stack.push(plain("b"));
        assert_eq!(stack.pop().unwrap().description(), "b");
        assert_eq!(stack.pop().unwrap().description(), "a");
        assert!(stack.pop().is_none());
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut stack = ActionStack::new(2, ReplayOrder::default());
        assert_eq!(stack.push(plain("a")), PushOutcome::Appended { evicted: false });
        stack.push(plain("b"));
        assert_eq!(stack.push(plain("c")), PushOutcome::Appended { evicted: true });
        assert_eq!(stack.descriptions(10), vec!["c", "b"]);
    }

    #[test]
    fn burst_merges_into_top() {
        let mut stack = ActionStack::new(10, ReplayOrder::default());
        stack.push(bursty("a"));
        assert_eq!(stack.push(bursty("b")), PushOutcome::Combined);
        assert_eq!(stack.push(bursty("c")), PushOutcome::Combined);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.descriptions(1), vec!["a (+2)"]);
    }

    #[test]
    fn merge_at_capacity_does_not_evict() {
        let mut stack = ActionStack::new(1, ReplayOrder::default());
        stack.push(bursty("a"));
        assert_eq!(stack.push(bursty("b")), PushOutcome::Combined);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn stripped_top_no_longer_merges() {
        let mut stack = ActionStack::new(10, ReplayOrder::default());
        stack.push(bursty("a"));
        assert!(stack.strip_top_merge());
        assert!(!stack.strip_top_merge());
        assert_eq!(stack.push(bursty("b")), PushOutcome::Appended { evicted: false });
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn strip_on_empty_is_noop() {
        let mut stack = ActionStack::new(10, ReplayOrder::default());
        assert!(!stack.strip_top_merge());
    }

    #[test]
    fn zero_levels_clamped() {
        let stack = ActionStack::new(0, ReplayOrder::default());
        assert_eq!(stack.levels(), 1);
    }

    #[test]
    fn descriptions_respect_limit() {
        let mut stack = ActionStack::new(10, ReplayOrder::default());
        for name in ["a", "b", "c"] {
            stack.push(plain(name));
        }
        assert_eq!(stack.descriptions(2), vec!["c", "b"]);
        stack.clear();
        assert!(stack.is_empty());
    }
}
