#![forbid(unsafe_code)]

//! Textual accessor paths from the model root to a node.
//!
//! Dereferenced actions do not hold the container they mutate. They hold a
//! [`Path`] and resolve it against the live root when they run, so a
//! container replaced by an equivalent one at the same position is still
//! found.
//!
//! # Grammar
//!
//! ```text
//! path     := accessor*
//! accessor := "()"             unwrap an observable cell
//!           | "[" digits "]"   index into an array
//!           | "." name         read a record field
//! name     := [A-Za-z0-9_$]+
//! ```
//!
//! `.todos[2]().title` reads field `todos` of the root record, takes item 2
//! of that array, unwraps the cell found there and reads field `title` of
//! the record it holds.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use undotrail_reactive::{Node, NodeKind};

/// Errors raised while building, parsing or resolving a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path syntax error at byte {position}: {message}")]
    Syntax {
        position: usize,
        message: &'static str,
    },

    #[error("field name {name:?} cannot be written in a path")]
    UnrepresentableField { name: String },

    #[error("node at step {step} has no field-name tag")]
    MissingFieldTag { step: usize },

    #[error("node at step {step} was not found in its parent")]
    NotInParent { step: usize },

    #[error("step {step} expects a {expected} node, found {found}")]
    KindMismatch {
        step: usize,
        expected: NodeKind,
        found: NodeKind,
    },

    #[error("step {step}: index {index} out of bounds (length {len})")]
    IndexOutOfBounds { step: usize, index: usize, len: usize },

    #[error("step {step}: no field named {name:?}")]
    UnknownField { step: usize, name: String },
}

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    /// `()`
    Unwrap,
    /// `[n]`
    Index(usize),
    /// `.name`
    Field(String),
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unwrap => f.write_str("()"),
            Self::Index(i) => write!(f, "[{i}]"),
            Self::Field(name) => write!(f, ".{name}"),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn check_field_name(name: &str) -> Result<(), PathError> {
    if name.is_empty() || !name.chars().all(is_name_char) {
        return Err(PathError::UnrepresentableField {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// A sequence of [`Accessor`]s. The empty path denotes the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    accessors: Vec<Accessor>,
}

impl Path {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a path from accessors, rejecting field names the grammar
    /// cannot express.
    pub fn from_accessors(accessors: Vec<Accessor>) -> Result<Self, PathError> {
        for accessor in &accessors {
            if let Accessor::Field(name) = accessor {
                check_field_name(name)?;
            }
        }
        Ok(Self { accessors })
    }

    #[must_use]
    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }

    /// Parse the textual form produced by `Display`.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        Parser::new(input).path()
    }

    /// Build the path that leads along `chain`, a root-first list of nodes
    /// where each entry is a direct child of the previous one.
    ///
    /// Array positions are found by identity search in the parent's current
    /// items; record fields come from the child's field-name tag.
    pub fn from_chain(chain: &[Node]) -> Result<Self, PathError> {
        let mut accessors = Vec::with_capacity(chain.len().saturating_sub(1));
        for (offset, pair) in chain.windows(2).enumerate() {
            let step = offset + 1;
            let (parent, child) = (&pair[0], &pair[1]);
            let accessor = match parent {
                Node::Cell(_) => Accessor::Unwrap,
                Node::Array(array) => array
                    .position_of(child)
                    .map(Accessor::Index)
                    .ok_or(PathError::NotInParent { step })?,
                Node::Record(record) => {
                    let name = child
                        .field_name()
                        .ok_or(PathError::MissingFieldTag { step })?;
                    // A node shared by several fields carries the last tag
                    // it was given; fall back to identity search.
                    let tagged = record.get(&name).is_some_and(|n| n.same(child));
                    if tagged {
                        Accessor::Field(name)
                    } else {
                        record
                            .fields()
                            .into_iter()
                            .find(|(_, value)| value.same(child))
                            .map(|(name, _)| Accessor::Field(name))
                            .ok_or(PathError::NotInParent { step })?
                    }
                }
                Node::Scalar(_) => {
                    return Err(PathError::KindMismatch {
                        step,
                        expected: NodeKind::Record,
                        found: NodeKind::Scalar,
                    });
                }
            };
            accessors.push(accessor);
        }
        Self::from_accessors(accessors)
    }

    /// Walk the path from `root`.
    pub fn resolve(&self, root: &Node) -> Result<Node, PathError> {
        let mut current = root.clone();
        for (offset, accessor) in self.accessors.iter().enumerate() {
            let step = offset + 1;
            let mismatch = |expected: NodeKind, found: &Node| PathError::KindMismatch {
                step,
                expected,
                found: found.kind(),
            };
            current = match accessor {
                Accessor::Unwrap => match &current {
                    Node::Cell(cell) => cell.get(),
                    other => return Err(mismatch(NodeKind::Cell, other)),
                },
                Accessor::Index(index) => match &current {
                    Node::Array(array) => {
                        array.get(*index).ok_or(PathError::IndexOutOfBounds {
                            step,
                            index: *index,
                            len: array.len(),
                        })?
                    }
                    other => return Err(mismatch(NodeKind::Array, other)),
                },
                Accessor::Field(name) => match &current {
                    Node::Record(record) => {
                        record.get(name).ok_or_else(|| PathError::UnknownField {
                            step,
                            name: name.clone(),
                        })?
                    }
                    other => return Err(mismatch(NodeKind::Record, other)),
                },
            };
        }
        Ok(current)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for accessor in &self.accessors {
            write!(f, "{accessor}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: &'static str) -> PathError {
        PathError::Syntax {
            position: self.pos,
            message,
        }
    }

    fn expect(&mut self, wanted: char, message: &'static str) -> Result<(), PathError> {
        match self.peek() {
            Some(c) if c == wanted => {
                self.bump();
                Ok(())
            }
            _ => Err(self.error(message)),
        }
    }

    fn path(&mut self) -> Result<Path, PathError> {
        let mut accessors = Vec::new();
        while self.peek().is_some() {
            accessors.push(self.accessor()?);
        }
        Ok(Path { accessors })
    }

    fn accessor(&mut self) -> Result<Accessor, PathError> {
        match self.peek() {
            Some('(') => {
                self.bump();
                self.expect(')', "expected ')' after '('")?;
                Ok(Accessor::Unwrap)
            }
            Some('[') => {
                self.bump();
                let index = self.index()?;
                self.expect(']', "expected ']' after index")?;
                Ok(Accessor::Index(index))
            }
            Some('.') => {
                self.bump();
                Ok(Accessor::Field(self.name()?))
            }
            _ => Err(self.error("expected '(', '[' or '.'")),
        }
    }

    fn index(&mut self) -> Result<usize, PathError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if start == self.pos {
            return Err(self.error("expected digits"));
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| PathError::Syntax {
                position: start,
                message: "index does not fit in usize",
            })
    }

    fn name(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.bump();
        }
        if start == self.pos {
            return Err(self.error("expected field name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }
}
