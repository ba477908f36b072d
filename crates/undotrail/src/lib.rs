#![forbid(unsafe_code)]

//! undotrail
//!
//! An undo/redo engine that attaches to an observable model and records a
//! reversible action for every mutation below its root.
//!
//! # Key Components
//!
//! - [`UndoManager`] - Watches a model and owns the undo and redo stacks
//! - [`Command`] - Undo/redo command with observable label and enabled flag
//! - [`InverseAction`] - Replayable step list plus merge metadata
//! - [`ActionStack`] - Bounded stack that merges into its top entry
//! - [`Path`] - Textual accessor path used by dereferenced actions
//! - [`UndoOptions`] - Construction options, loadable from TOML or JSON
//!
//! # Pipeline
//!
//! ```text
//! model mutation ──> deep watch ──> synthesize ──> recording mode ──> push
//!                                                                      │
//!                    undo/redo command <── stack (merge / evict) <─────┘
//! ```
//!
//! # Example
//!
//! ```
//! use undotrail::{UndoManager, UndoOptions};
//! use undotrail_reactive::{Node, ObservableArray, PlainValue, Record};
//!
//! let list = ObservableArray::from_iter(["a", "b", "c"]);
//! let model = Node::from(Record::new().with("list", list.clone()));
//! let manager = UndoManager::new(&model, UndoOptions::default()).unwrap();
//!
//! list.remove(1).unwrap();
//! assert_eq!(manager.undo_command().label(), "undo (1)");
//!
//! manager.undo().unwrap();
//! assert_eq!(list.get(1).unwrap().to_plain(), PlainValue::from("b"));
//! ```

pub mod action;
pub mod command;
pub mod config;
pub mod error;
pub mod manager;
pub mod path;
pub mod stack;
pub mod synth;

pub use action::{
    ActionResult, FieldTag, InverseAction, MergeDecision, MergePredicate, MergeRule, MoveTag,
    ReplayOrder,
};
pub use command::Command;
pub use config::{COUNT_TOKEN, UndoOptions, render_label};
pub use error::{ConfigError, Result, SynthesisError, UndoError};
pub use manager::{ExecutionState, RecordingMode, StackSide, UndoManager};
pub use path::{Accessor, Path, PathError};
pub use stack::{ActionStack, PushOutcome};
pub use synth::{SynthesisStrategy, synthesize};
