#![forbid(unsafe_code)]

//! Deep watch over a model graph.
//!
//! [`watch`] subscribes to every [`ObservableCell`](crate::ObservableCell)
//! and [`ObservableArray`](crate::ObservableArray) reachable from a root and
//! funnels their notifications into one callback as [`Change`] records.
//!
//! # Traversal
//!
//! The graph is walked depth-first from the root. Containers are visited at
//! most once (identity by [`NodeId`]), so shared subtrees and cycles are
//! fine. The ancestor chain handed to the callback is the first path the
//! walk finds from the root to the mutated node, computed when the change
//! happens rather than when the node was subscribed.
//!
//! # Structural changes
//!
//! With `mutable` set, any splice and any replacement involving a container
//! triggers a re-scan: newly reachable nodes are subscribed (and tagged),
//! nodes no longer reachable are dropped. Notifications from nodes that are
//! not reachable from the root are ignored.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::event::{Change, NodeEvent};
use crate::node::{Node, NodeId};
use crate::observable::Subscription;

/// Options of a deep watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Maximum depth below the root to track (`None` = unlimited; the root
    /// itself is depth 0).
    pub depth: Option<usize>,
    /// Report the previous value of replaced cells.
    pub keep_old_values: bool,
    /// Re-scan after structural changes.
    pub mutable: bool,
    /// Tag nodes stored in record fields with their field name.
    pub tag_fields: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            depth: None,
            keep_old_values: true,
            mutable: true,
            tag_fields: false,
        }
    }
}

impl WatchOptions {
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    #[must_use]
    pub fn with_keep_old_values(mut self, keep: bool) -> Self {
        self.keep_old_values = keep;
        self
    }

    #[must_use]
    pub fn with_mutable(mut self, mutable: bool) -> Self {
        self.mutable = mutable;
        self
    }

    #[must_use]
    pub fn with_tag_fields(mut self, tag: bool) -> Self {
        self.tag_fields = tag;
        self
    }
}

struct WatchInner {
    root: Node,
    options: WatchOptions,
    callback: Box<dyn Fn(&Change)>,
    tracked: RefCell<HashMap<NodeId, Subscription>>,
    rescans: Cell<u64>,
}

/// Handle of an active deep watch. Dropping it unsubscribes everything.
pub struct Watch {
    inner: Rc<WatchInner>,
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("root", &self.inner.root)
            .field("options", &self.inner.options)
            .field("tracked", &self.inner.tracked.borrow().len())
            .finish()
    }
}

impl Watch {
    /// Number of observable nodes currently subscribed.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.inner.tracked.borrow().len()
    }

    /// Number of structural rescans run since the watch started.
    #[must_use]
    pub fn rescan_count(&self) -> u64 {
        self.inner.rescans.get()
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.inner.root
    }

    #[must_use]
    pub fn options(&self) -> &WatchOptions {
        &self.inner.options
    }

    /// Ancestor chain of `target` (root inclusive, target exclusive), or
    /// `None` when it is not reachable within the watched depth.
    #[must_use]
    pub fn ancestors_of(&self, target: &Node) -> Option<Vec<Node>> {
        self.inner.ancestors_of(target)
    }
}

/// Start a deep watch over `root`.
pub fn watch(
    root: &Node,
    options: WatchOptions,
    callback: impl Fn(&Change) + 'static,
) -> Watch {
    let inner = Rc::new(WatchInner {
        root: root.clone(),
        options,
        callback: Box::new(callback),
        tracked: RefCell::new(HashMap::new()),
        rescans: Cell::new(0),
    });
    WatchInner::rescan(&inner);
    Watch { inner }
}

impl WatchInner {
    fn within_depth(&self, depth: usize) -> bool {
        self.options.depth.is_none_or(|max| depth <= max)
    }

    /// Walk the graph, tagging fields and collecting observable nodes.
    fn reachable(&self) -> Vec<(NodeId, Node)> {
        let mut visited = HashSet::new();
        let mut found = Vec::new();
        self.walk(&self.root, 0, &mut visited, &mut found);
        found
    }

    fn walk(
        &self,
        node: &Node,
        depth: usize,
        visited: &mut HashSet<NodeId>,
        found: &mut Vec<(NodeId, Node)>,
    ) {
        let Some(id) = node.id() else {
            return;
        };
        if !self.within_depth(depth) || !visited.insert(id) {
            return;
        }
        if node.is_observable() {
            found.push((id, node.clone()));
        }
        if let Node::Record(record) = node {
            for (name, child) in record.fields() {
                if self.options.tag_fields {
                    child.set_field_name(&name);
                }
                self.walk(&child, depth + 1, visited, found);
            }
        } else {
            for child in node.children() {
                self.walk(&child, depth + 1, visited, found);
            }
        }
    }

    fn rescan(this: &Rc<Self>) {
        this.rescans.set(this.rescans.get() + 1);
        let reachable = this.reachable();
        let live: HashSet<NodeId> = reachable.iter().map(|(id, _)| *id).collect();

        let mut added = Vec::new();
        {
            let tracked = this.tracked.borrow();
            for (id, node) in reachable {
                if !tracked.contains_key(&id) {
                    added.push((id, node));
                }
            }
        }

        let mut fresh = Vec::with_capacity(added.len());
        for (id, node) in added {
            let weak = Rc::downgrade(this);
            let target = node.clone();
            let listener = move |event: &NodeEvent| {
                if let Some(inner) = Weak::upgrade(&weak) {
                    WatchInner::dispatch(&inner, &target, event);
                }
            };
            let subscription = match &node {
                Node::Cell(cell) => cell.subscribe(listener),
                Node::Array(array) => array.subscribe(listener),
                _ => continue,
            };
            fresh.push((id, subscription));
        }

        // Dropped subscriptions are released after the borrow ends.
        let dropped: Vec<Subscription> = {
            let mut tracked = this.tracked.borrow_mut();
            let stale: Vec<NodeId> = tracked
                .keys()
                .filter(|id| !live.contains(id))
                .copied()
                .collect();
            let dropped = stale
                .iter()
                .filter_map(|id| tracked.remove(id))
                .collect();
            tracked.extend(fresh);
            dropped
        };
        debug!(
            tracked = this.tracked.borrow().len(),
            dropped = dropped.len(),
            "deep watch rescanned"
        );
    }

    fn ancestors_of(&self, target: &Node) -> Option<Vec<Node>> {
        let target_id = target.id()?;
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        if self.search(&self.root, target_id, 0, &mut visited, &mut path) {
            // `path` holds the chain including the target itself.
            path.pop();
            Some(path)
        } else {
            None
        }
    }

    fn search(
        &self,
        node: &Node,
        target: NodeId,
        depth: usize,
        visited: &mut HashSet<NodeId>,
        path: &mut Vec<Node>,
    ) -> bool {
        let Some(id) = node.id() else {
            return false;
        };
        if !self.within_depth(depth) || !visited.insert(id) {
            return false;
        }
        path.push(node.clone());
        if id == target {
            return true;
        }
        for child in node.children() {
            if self.search(&child, target, depth + 1, visited, path) {
                return true;
            }
        }
        path.pop();
        false
    }

    fn dispatch(this: &Rc<Self>, target: &Node, event: &NodeEvent) {
        let Some(parents) = this.ancestors_of(target) else {
            trace!(node = ?target, "change from unreachable node ignored");
            return;
        };

        match event {
            NodeEvent::Replaced { old } => {
                let structural = old.is_container()
                    || target.as_cell().is_some_and(|c| c.get().is_container());
                if this.options.mutable && structural {
                    Self::rescan(this);
                }
                let change = Change {
                    parents,
                    target: target.clone(),
                    old_value: this.options.keep_old_values.then(|| old.clone()),
                    item: None,
                };
                trace!(node = ?target, "cell change captured");
                (this.callback)(&change);
            }
            NodeEvent::Spliced { items } => {
                let structural = items.iter().any(|item| item.value.is_container());
                if this.options.mutable && structural {
                    Self::rescan(this);
                }
                for item in items {
                    let change = Change {
                        parents: parents.clone(),
                        target: target.clone(),
                        old_value: None,
                        item: Some(item.clone()),
                    };
                    trace!(node = ?target, status = ?item.status, index = item.index, "item change captured");
                    (this.callback)(&change);
                }
            }
        }
    }
}
