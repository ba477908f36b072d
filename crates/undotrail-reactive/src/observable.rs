#![forbid(unsafe_code)]

//! Subscriber registry and flat observable bindings.
//!
//! Every source in this crate (cells, arrays and [`Observable`] bindings)
//! keeps its subscribers in a `Listeners` registry: a list of weak
//! callback handles whose strong halves live in the [`Subscription`] guards
//! handed back to subscribers. Dropping a guard unsubscribes; the dead entry
//! is pruned the next time the source notifies.
//!
//! [`Observable<T>`] is the flat sibling of the model tree. The undo engine
//! publishes derived state through it (command labels, enabled flags) so UI
//! code can bind to them without touching the model.
//!
//! # Re-entrancy
//!
//! Sources collect their live callbacks and release every borrow before
//! calling them, so a callback may read or write the source it listens to.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace_span;

pub(crate) type Callback<E> = Rc<dyn Fn(&E)>;

/// Weak subscriber list, notified in registration order.
pub(crate) struct Listeners<E> {
    entries: Vec<Weak<dyn Fn(&E)>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: 'static> Listeners<E> {
    pub(crate) fn subscribe(&mut self, callback: impl Fn(&E) + 'static) -> Subscription {
        let strong: Callback<E> = Rc::new(callback);
        self.entries.push(Rc::downgrade(&strong));
        Subscription::new(Box::new(strong))
    }

    /// Prune dead entries and return the live ones.
    pub(crate) fn live(&mut self) -> Vec<Callback<E>> {
        self.entries.retain(|w| w.strong_count() > 0);
        self.entries.iter().filter_map(Weak::upgrade).collect()
    }

    /// Registered entries, including dead ones not yet pruned.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Deliver `event` to `listeners`. Callers must not hold any borrow of the
/// emitting source.
pub(crate) fn emit<E>(listeners: &[Callback<E>], event: &E) {
    for listener in listeners {
        listener(event);
    }
}

/// Keeps one callback subscribed. Drop it to unsubscribe.
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl Subscription {
    pub(crate) fn new(guard: Box<dyn Any>) -> Self {
        Self { _guard: guard }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

struct Binding<T> {
    value: T,
    version: u64,
    listeners: Listeners<T>,
}

/// A shared value that notifies subscribers when it changes.
///
/// Cloning shares the value. Setting an equal value is a no-op; any other
/// value bumps [`version`](Observable::version) by one and notifies.
pub struct Observable<T> {
    inner: Rc<RefCell<Binding<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Binding {
                value,
                version: 0,
                listeners: Listeners::default(),
            })),
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value. `f` must not write this binding.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Store `value` and notify if it differs from the current one.
    pub fn set(&self, value: T) {
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value.clone();
            inner.version += 1;
            inner.listeners.live()
        };
        Self::publish(&listeners, &value);
    }

    /// Edit the value in place; notifies only if the edit changed it.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let (listeners, value) = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.value.clone();
            f(&mut inner.value);
            if inner.value == before {
                return;
            }
            inner.version += 1;
            (inner.listeners.live(), inner.value.clone())
        };
        Self::publish(&listeners, &value);
    }

    fn publish(listeners: &[Callback<T>], value: &T) {
        if listeners.is_empty() {
            return;
        }
        let _span = trace_span!("undotrail.observable.notify", subscribers = listeners.len())
            .entered();
        emit(listeners, value);
    }

    /// Subscribe to later values. The current value is not replayed.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
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
}
