#![forbid(unsafe_code)]

//! Turns one change notification into the inverse action that undoes it.
//!
//! | Change                      | Inverse action                        |
//! |-----------------------------|---------------------------------------|
//! | cell replaced, old value    | set the cell back to the old value    |
//! | item `Deleted` at `i`       | insert the item again at `i`          |
//! | item `Added` at `i`         | remove the item at `i`                |
//!
//! The action either holds the mutated container itself
//! ([`SynthesisStrategy::Direct`]) or the model root plus a [`Path`] it
//! resolves when it runs ([`SynthesisStrategy::Dereference`]).

use tracing::trace;
use undotrail_reactive::{Change, ItemStatus, Node, NodeKind};

use crate::action::{FieldTag, InverseAction, MergeRule, MoveTag};
use crate::error::{Result, SynthesisError};
use crate::manager::RecordingMode;
use crate::path::Path;

/// How synthesized actions find the container they mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesisStrategy {
    /// Hold the container by reference.
    #[default]
    Direct,
    /// Hold the root and a textual path, resolved at execution time.
    Dereference,
}

impl SynthesisStrategy {
    #[must_use]
    pub fn from_dereference(dereference: bool) -> Self {
        if dereference {
            Self::Dereference
        } else {
            Self::Direct
        }
    }
}

enum Shape {
    Restore { old: Node },
    Reinsert { index: usize, value: Node },
    RemoveAt { index: usize, value: Node },
}

fn classify(change: &Change) -> Result<Shape, SynthesisError> {
    let expect = |expected: NodeKind| {
        let found = change.target.kind();
        if found == expected {
            Ok(())
        } else {
            Err(SynthesisError::WrongTarget { expected, found })
        }
    };

    if let Some(old) = &change.old_value {
        expect(NodeKind::Cell)?;
        return Ok(Shape::Restore { old: old.clone() });
    }
    let item = change.item.as_ref().ok_or(SynthesisError::Unrecognized)?;
    let shape = match item.status {
        ItemStatus::Deleted => Shape::Reinsert {
            index: item.index,
            value: item.value.clone(),
        },
        ItemStatus::Added => Shape::RemoveAt {
            index: item.index,
            value: item.value.clone(),
        },
        status @ ItemStatus::Retained => return Err(SynthesisError::UnsupportedStatus(status)),
    };
    expect(NodeKind::Array)?;
    Ok(shape)
}

#[derive(Clone)]
enum Target {
    Direct(Node),
    Dereference { root: Node, path: Path },
}

impl Target {
    fn resolve(&self) -> Result<Node> {
        match self {
            Self::Direct(node) => Ok(node.clone()),
            Self::Dereference { root, path } => Ok(path.resolve(root)?),
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Direct(node) => node
                .field_name()
                .map_or_else(|| node.kind().to_string(), |name| format!(".{name}")),
            Self::Dereference { path, .. } if path.is_empty() => "root".to_string(),
            Self::Dereference { path, .. } => path.to_string(),
        }
    }
}

/// Build the inverse action for `change`, tagged for `mode`.
///
/// `mode` must not be [`RecordingMode::Ignore`]; ignored changes never reach
/// synthesis.
pub fn synthesize(
    change: &Change,
    root: &Node,
    strategy: SynthesisStrategy,
    mode: RecordingMode,
) -> Result<InverseAction, SynthesisError> {
    let shape = classify(change)?;
    let target = match strategy {
        SynthesisStrategy::Direct => Target::Direct(change.target.clone()),
        SynthesisStrategy::Dereference => Target::Dereference {
            root: root.clone(),
            path: Path::from_chain(&change.chain())?,
        },
    };
    let label = target.label();

    let mut action = match shape {
        Shape::Restore { old } => {
            let mut action = InverseAction::new(format!("restore {label}"), move || {
                let node = target.resolve()?;
                node.expect_cell()?.set(old);
                Ok(())
            });
            if mode == RecordingMode::Once {
                action.set_field_tag(FieldTag {
                    container: change.target.clone(),
                });
                action.set_merge_rule(MergeRule::SameField);
            }
            action
        }
        Shape::Reinsert { index, value } => {
            let item = value.clone();
            InverseAction::new(format!("reinsert {label}[{index}]"), move || {
                let node = target.resolve()?;
                node.expect_array()?.insert(index, value)?;
                Ok(())
            })
            .with_merge_rule(MergeRule::Move { item })
        }
        Shape::RemoveAt { index, value } => {
            InverseAction::new(format!("remove {label}[{index}]"), move || {
                let node = target.resolve()?;
                node.expect_array()?.remove(index)?;
                Ok(())
            })
            .with_move_tag(MoveTag {
                container: change.target.clone(),
                item: value,
            })
        }
    };

    if mode == RecordingMode::Merge {
        action.set_merge_rule(MergeRule::Burst);
        action.set_merge_flag(true);
    }
    trace!(description = action.description(), ?strategy, ?mode, "inverse action synthesized");
    Ok(action)
}
