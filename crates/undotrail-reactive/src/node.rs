#![forbid(unsafe_code)]

//! Model tree nodes.
//!
//! A model is a graph of [`Node`] values:
//!
//! - [`Scalar`]: a plain immutable value (null, bool, number, text).
//! - [`ObservableCell`]: a single observable slot holding any node.
//! - [`ObservableArray`]: an observable sequence of nodes.
//! - [`Record`]: a plain, non-observable set of named fields. Changes to a
//!   record's contents are observed through the cells and arrays stored in
//!   its fields.
//!
//! Container nodes are shared handles (`Rc`), so the same cell or array may
//! be reachable from several places and the graph may contain cycles.
//!
//! # Identity
//!
//! [`Node::same`] is the identity used everywhere a node must be found
//! again: pointer identity for containers, equality for scalars. Searching
//! an array for an item, matching the two halves of a move, and building
//! index accessors all use it.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::array::ObservableArray;
use crate::cell::ObservableCell;
use crate::error::ModelError;

/// Stable identity of a container node while it is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn of<T>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc) as *const () as usize)
    }
}

/// Discriminant of a [`Node`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Scalar,
    Cell,
    Array,
    Record,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::Cell => "cell",
            Self::Array => "array",
            Self::Record => "record",
        };
        f.write_str(name)
    }
}

/// A plain leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Equality, except floats compare by bit pattern so `NaN` is the same
    /// as itself.
    #[must_use]
    pub fn same(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }
}

/// A node of the observable model graph.
#[derive(Clone)]
pub enum Node {
    Scalar(Scalar),
    Cell(ObservableCell),
    Array(ObservableArray),
    Record(Record),
}

impl Node {
    /// The null scalar.
    #[must_use]
    pub const fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Text(value.into()))
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Scalar(_) => NodeKind::Scalar,
            Self::Cell(_) => NodeKind::Cell,
            Self::Array(_) => NodeKind::Array,
            Self::Record(_) => NodeKind::Record,
        }
    }

    /// Value identity: pointer identity for containers, [`Scalar::same`] for
    /// scalars.
    #[must_use]
    pub fn same(&self, other: &Node) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a.same(b),
            (Self::Cell(a), Self::Cell(b)) => a.ptr_eq(b),
            (Self::Array(a), Self::Array(b)) => a.ptr_eq(b),
            (Self::Record(a), Self::Record(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Identity of a container node; `None` for scalars.
    #[must_use]
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Self::Scalar(_) => None,
            Self::Cell(c) => Some(c.id()),
            Self::Array(a) => Some(a.id()),
            Self::Record(r) => Some(r.id()),
        }
    }

    /// Whether the node is observable (emits change notifications).
    #[must_use]
    pub fn is_observable(&self) -> bool {
        matches!(self, Self::Cell(_) | Self::Array(_))
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_cell(&self) -> Option<&ObservableCell> {
        match self {
            Self::Cell(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&ObservableArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Like [`Node::as_cell`], but reports the mismatch as an error.
    pub fn expect_cell(&self) -> Result<&ObservableCell, ModelError> {
        self.as_cell()
            .ok_or_else(|| ModelError::kind_mismatch(NodeKind::Cell, self.kind()))
    }

    /// Like [`Node::as_array`], but reports the mismatch as an error.
    pub fn expect_array(&self) -> Result<&ObservableArray, ModelError> {
        self.as_array()
            .ok_or_else(|| ModelError::kind_mismatch(NodeKind::Array, self.kind()))
    }

    /// Like [`Node::as_record`], but reports the mismatch as an error.
    pub fn expect_record(&self) -> Result<&Record, ModelError> {
        self.as_record()
            .ok_or_else(|| ModelError::kind_mismatch(NodeKind::Record, self.kind()))
    }

    /// Field name tag attached by a deep watch with `tag_fields` enabled.
    #[must_use]
    pub fn field_name(&self) -> Option<String> {
        match self {
            Self::Scalar(_) => None,
            Self::Cell(c) => c.field_name(),
            Self::Array(a) => a.field_name(),
            Self::Record(r) => r.field_name(),
        }
    }

    pub(crate) fn set_field_name(&self, name: &str) {
        match self {
            Self::Scalar(_) => {}
            Self::Cell(c) => c.set_field_name(name),
            Self::Array(a) => a.set_field_name(name),
            Self::Record(r) => r.set_field_name(name),
        }
    }

    /// Direct children: a cell's value, an array's items, a record's fields.
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        match self {
            Self::Scalar(_) => Vec::new(),
            Self::Cell(c) => vec![c.get()],
            Self::Array(a) => a.items(),
            Self::Record(r) => r.fields().into_iter().map(|(_, v)| v).collect(),
        }
    }

    /// Deep snapshot as plain data, unwrapping cells.
    ///
    /// A container reached again while it is already being rendered (a
    /// cycle) is rendered as [`PlainValue::Cycle`].
    #[must_use]
    pub fn to_plain(&self) -> PlainValue {
        let mut on_path = HashSet::new();
        self.to_plain_inner(&mut on_path)
    }

    fn to_plain_inner(&self, on_path: &mut HashSet<NodeId>) -> PlainValue {
        if let Some(id) = self.id()
            && !on_path.insert(id)
        {
            return PlainValue::Cycle;
        }
        let plain = match self {
            Self::Scalar(s) => PlainValue::from(s.clone()),
            Self::Cell(c) => c.get().to_plain_inner(on_path),
            Self::Array(a) => PlainValue::List(
                a.items()
                    .iter()
                    .map(|item| item.to_plain_inner(on_path))
                    .collect(),
            ),
            Self::Record(r) => PlainValue::Map(
                r.fields()
                    .into_iter()
                    .map(|(name, value)| (name, value.to_plain_inner(on_path)))
                    .collect(),
            ),
        };
        if let Some(id) = self.id() {
            on_path.remove(&id);
        }
        plain
    }
}

impl fmt::Debug for Node {
    // Shallow on purpose: the graph may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s:?}"),
            Self::Cell(c) => write!(f, "Cell(v{})", c.version()),
            Self::Array(a) => write!(f, "Array(len={})", a.len()),
            Self::Record(r) => write!(f, "Record(fields={})", r.len()),
        }
    }
}

impl From<Scalar> for Node {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Self::Scalar(Scalar::Int(i64::from(value)))
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Self::Scalar(Scalar::Float(value))
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::Scalar(Scalar::Text(value))
    }
}

impl From<ObservableCell> for Node {
    fn from(value: ObservableCell) -> Self {
        Self::Cell(value)
    }
}

impl From<ObservableArray> for Node {
    fn from(value: ObservableArray) -> Self {
        Self::Array(value)
    }
}

impl From<Record> for Node {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

/// Plain-data snapshot of a model subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<PlainValue>),
    Map(Vec<(String, PlainValue)>),
    Cycle,
}

impl From<Scalar> for PlainValue {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Null => Self::Null,
            Scalar::Bool(b) => Self::Bool(b),
            Scalar::Int(i) => Self::Int(i),
            Scalar::Float(x) => Self::Float(x),
            Scalar::Text(s) => Self::Text(s),
        }
    }
}

impl From<&str> for PlainValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for PlainValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PlainValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

struct RecordInner {
    fields: Vec<(String, Node)>,
    field_name: Option<String>,
}

/// A plain record of named fields.
///
/// Records are not observable: inserting a field does not notify anyone.
/// Build records before watching them and route later changes through the
/// cells and arrays stored in their fields.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RefCell<RecordInner>>,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Record")
            .field(
                "fields",
                &inner.fields.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            )
            .field("field_name", &inner.field_name)
            .finish()
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RecordInner {
                fields: Vec::new(),
                field_name: None,
            })),
        }
    }

    /// Builder-style [`Record::insert`].
    #[must_use]
    pub fn with(self, name: impl Into<String>, value: impl Into<Node>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a field. Field order is insertion order.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<Node>) {
        let name = name.into();
        let value = value.into();
        let mut inner = self.inner.borrow_mut();
        if let Some(slot) = inner.fields.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            inner.fields.push((name, value));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Node> {
        self.inner
            .borrow()
            .fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    /// Snapshot of the fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> Vec<(String, Node)> {
        self.inner.borrow().fields.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().fields.is_empty()
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
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
