#![forbid(unsafe_code)]

//! undotrail reactive model
//!
//! This crate provides the observable model graph that the undo engine in
//! `undotrail` records changes from.
//!
//! # Key Components
//!
//! - [`Node`] - A model value: scalar, cell, array or record
//! - [`ObservableCell`] - Observable single-value slot
//! - [`ObservableArray`] - Observable sequence with element-level splice events
//! - [`Record`] - Plain set of named fields
//! - [`watch`] - Deep watch turning every mutation below a root into a [`Change`]
//! - [`Observable`] - Flat observable value used for derived state
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use undotrail_reactive::{Node, ObservableCell, Record, WatchOptions, watch};
//!
//! let title = ObservableCell::new("draft");
//! let model = Node::from(Record::new().with("title", title.clone()));
//!
//! let seen = Rc::new(RefCell::new(0));
//! let seen_clone = Rc::clone(&seen);
//! let _watch = watch(&model, WatchOptions::default(), move |_| {
//!     *seen_clone.borrow_mut() += 1;
//! });
//!
//! title.set("final");
//! assert_eq!(*seen.borrow(), 1);
//! ```

pub mod array;
pub mod cell;
pub mod error;
pub mod event;
pub mod node;
pub mod observable;
pub mod watch;

pub use array::ObservableArray;
pub use cell::ObservableCell;
pub use error::{ModelError, Result};
pub use event::{Change, ItemEvent, ItemStatus, NodeEvent};
pub use node::{Node, NodeId, NodeKind, PlainValue, Record, Scalar};
pub use observable::{Observable, Subscription};
pub use watch::{Watch, WatchOptions, watch};
