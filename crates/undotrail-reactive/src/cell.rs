#![forbid(unsafe_code)]

//! Observable single-value slot of the model tree.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::event::NodeEvent;
use crate::node::{Node, NodeId};
use crate::observable::{Listeners, Subscription, emit};

struct CellInner {
    value: Node,
    version: u64,
    field_name: Option<String>,
    listeners: Listeners<NodeEvent>,
}

/// An observable slot holding one [`Node`].
///
/// Cloning shares the slot. [`set`](ObservableCell::set) with a value that
/// is [`Node::same`] as the current one is a no-op; any other value bumps the
/// version and emits [`NodeEvent::Replaced`] carrying the previous value.
#[derive(Clone)]
pub struct ObservableCell {
    inner: Rc<RefCell<CellInner>>,
}

impl fmt::Debug for ObservableCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableCell")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("field_name", &inner.field_name)
            .finish()
    }
}

impl ObservableCell {
    #[must_use]
    pub fn new(value: impl Into<Node>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellInner {
                value: value.into(),
                version: 0,
                field_name: None,
                listeners: Listeners::default(),
            })),
        }
    }

    /// Current value (a cheap handle clone for containers).
    #[must_use]
    pub fn get(&self) -> Node {
        self.inner.borrow().value.clone()
    }

    /// Replace the value and notify subscribers.
    ///
    /// Safe to call re-entrantly from within subscriber callbacks.
    pub fn set(&self, value: impl Into<Node>) {
        let value = value.into();
        let (old, listeners) = {
            let mut inner = self.inner.borrow_mut();
            if inner.value.same(&value) {
                return;
            }
            let old = std::mem::replace(&mut inner.value, value);
            inner.version += 1;
            (old, inner.listeners.live())
        };
        trace!(cell = ?self.id(), listeners = listeners.len(), "cell replaced");
        emit(&listeners, &NodeEvent::Replaced { old });
    }

    /// Subscribe to replacement events of this cell only.
    pub fn subscribe(&self, callback: impl Fn(&NodeEvent) + 'static) -> Subscription {
        self.inner.borrow_mut().listeners.subscribe(callback)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().listeners.len()
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
    pub fn ptr_eq(&self, other: &ObservableCell) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
