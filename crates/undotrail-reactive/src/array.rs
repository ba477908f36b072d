#![forbid(unsafe_code)]

//! Observable sequence of the model tree.
//!
//! Every mutation is a splice. A splice is reported as one
//! [`NodeEvent::Spliced`] carrying single-element [`ItemEvent`]s:
//!
//! ```text
//! [a, b, c, d].splice(1, 2, [x])
//!   Deleted(1, b)   -> [a, c, d]
//!   Deleted(1, c)   -> [a, d]
//!   Added(1, x)     -> [a, x, d]
//! ```
//!
//! Each event's index refers to the array as left by the previous event.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::{ModelError, Result};
use crate::event::{ItemEvent, NodeEvent};
use crate::node::{Node, NodeId};
use crate::observable::{Listeners, Subscription, emit};

struct ArrayInner {
    items: Vec<Node>,
    version: u64,
    field_name: Option<String>,
    listeners: Listeners<NodeEvent>,
}

/// An observable array of [`Node`]s. Cloning shares the array.
#[derive(Clone)]
pub struct ObservableArray {
    inner: Rc<RefCell<ArrayInner>>,
}

impl fmt::Debug for ObservableArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableArray")
            .field("items", &inner.items)
            .field("version", &inner.version)
            .field("field_name", &inner.field_name)
            .finish()
    }
}

impl Default for ObservableArray {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Into<Node>> FromIterator<T> for ObservableArray {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::with_items(iter.into_iter().map(Into::into).collect())
    }
}

impl ObservableArray {
    #[must_use]
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    #[must_use]
    pub fn with_items(items: Vec<Node>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ArrayInner {
                items,
                version: 0,
                field_name: None,
                listeners: Listeners::default(),
            })),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Node> {
        self.inner.borrow().items.get(index).cloned()
    }

    /// Snapshot of the items.
    #[must_use]
    pub fn items(&self) -> Vec<Node> {
        self.inner.borrow().items.clone()
    }

    /// Position of the first item [`Node::same`] as `node`.
    #[must_use]
    pub fn position_of(&self, node: &Node) -> Option<usize> {
        self.inner.borrow().items.iter().position(|n| n.same(node))
    }

    pub fn push(&self, value: impl Into<Node>) {
        let index = self.len();
        // Cannot fail: index == len.
        let _ = self.splice(index, 0, vec![value.into()]);
    }

    pub fn insert(&self, index: usize, value: impl Into<Node>) -> Result<()> {
        self.splice(index, 0, vec![value.into()]).map(drop)
    }

    pub fn remove(&self, index: usize) -> Result<Node> {
        let len = self.len();
        if index >= len {
            return Err(ModelError::IndexOutOfBounds { index, len });
        }
        let mut removed = self.splice(index, 1, Vec::new())?;
        Ok(removed.remove(0))
    }

    /// Remove the first item [`Node::same`] as `node`, returning its index.
    pub fn remove_item(&self, node: &Node) -> Option<usize> {
        let index = self.position_of(node)?;
        self.remove(index).ok().map(|_| index)
    }

    /// Remove `delete_count` items at `index` and insert `items` there.
    ///
    /// `delete_count` is clamped to the items available after `index`;
    /// `index > len` is an error. Returns the removed items. A splice that
    /// removes and inserts nothing does not notify.
    pub fn splice(&self, index: usize, delete_count: usize, items: Vec<Node>) -> Result<Vec<Node>> {
        let (removed, events, listeners) = {
            let mut inner = self.inner.borrow_mut();
            let len = inner.items.len();
            if index > len {
                return Err(ModelError::IndexOutOfBounds { index, len });
            }
            let end = index + delete_count.min(len - index);
            let inserted = items.clone();
            let removed: Vec<Node> = inner.items.splice(index..end, items).collect();
            if removed.is_empty() && inserted.is_empty() {
                return Ok(removed);
            }
            inner.version += 1;

            let mut events = Vec::with_capacity(removed.len() + inserted.len());
            events.extend(removed.iter().map(|v| ItemEvent::deleted(index, v.clone())));
            events.extend(
                inserted
                    .into_iter()
                    .enumerate()
                    .map(|(k, v)| ItemEvent::added(index + k, v)),
            );
            (removed, events, inner.listeners.live())
        };
        trace!(array = ?self.id(), events = events.len(), "array spliced");
        emit(&listeners, &NodeEvent::Spliced { items: events });
        Ok(removed)
    }

    /// Subscribe to splice events of this array only.
    pub fn subscribe(&self, callback: impl Fn(&NodeEvent) + 'static) -> Subscription {
        self.inner.borrow_mut().listeners.subscribe(callback)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    #[must_use]
    pub fn field_name(&self) -> Option<String> {
        self.inner.borrow().field_name.clone()
    }

    pub(crate) fn set_field_name(&self, name: &str) {
        self.inner.borrow_mut().field_name = Some(name.to_string());
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        NodeId::of(&self.inner)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &ObservableArray) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
