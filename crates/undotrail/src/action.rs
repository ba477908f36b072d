#![forbid(unsafe_code)]

//! Inverse actions and the merge protocol.
//!
//! An [`InverseAction`] reverses one observed mutation, or a run of them once
//! merged. It is a list of boxed `FnOnce` steps plus metadata that decides
//! how it fuses with the next action pushed on top of it.
//!
//! # Merge protocol
//!
//! When an action is pushed onto a non-empty stack, the stack asks the top
//! action's [`MergeRule`] about the incoming one:
//!
//! | Rule        | Fuses with an incoming action that...         | Result                 |
//! |-------------|-----------------------------------------------|------------------------|
//! | `Burst`     | has the merge flag                            | combined action        |
//! | `SameField` | has a field tag for the same field            | the existing action    |
//! | `Move`      | has a move tag for the same item              | combined action        |
//! | `Custom`    | the predicate accepts                         | whatever it decides    |
//!
//! A combined action owns the steps of both and inherits the incoming
//! action's rule, flag and tags, so a burst keeps growing.
//!
//! # Invariants
//!
//! - An action runs at most once (`run` consumes it).
//! - Steps run in their stored order; the first failing step stops the run.

use std::fmt;

use undotrail_reactive::Node;

use crate::error::Result;

/// Result of running an action or one of its steps.
pub type ActionResult = Result<()>;

type Step = Box<dyn FnOnce() -> ActionResult>;

/// Order in which a combined action runs the steps of its two halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayOrder {
    /// The step captured last runs first. Reverses bursts on a single
    /// field or array exactly.
    #[default]
    NewestFirst,
    /// The step captured first runs first.
    CaptureOrder,
}

/// Outcome of asking a merge rule about an incoming action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// Replace the top with an action running both.
    Combine,
    /// Keep the top unchanged and drop the incoming action.
    KeepExisting,
    /// Do not merge; the incoming action is appended.
    Reject,
}

/// Predicate of a [`MergeRule::Custom`]: `(top, incoming) -> decision`.
pub type MergePredicate = Box<dyn Fn(&InverseAction, &InverseAction) -> MergeDecision>;

/// Decides whether the next action pushed on the same stack fuses with this
/// one.
pub enum MergeRule {
    /// Absorb any incoming action carrying the merge flag.
    Burst,
    /// Swallow a later change to the same field.
    SameField,
    /// First half of a move: absorb the addition of `item`.
    Move { item: Node },
    /// Caller-supplied predicate for hand-built actions.
    Custom(MergePredicate),
}

impl fmt::Debug for MergeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Burst => f.write_str("Burst"),
            Self::SameField => f.write_str("SameField"),
            Self::Move { item } => f.debug_struct("Move").field("item", item).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl MergeRule {
    /// Custom rule from a closure.
    pub fn custom(
        predicate: impl Fn(&InverseAction, &InverseAction) -> MergeDecision + 'static,
    ) -> Self {
        Self::Custom(Box::new(predicate))
    }

    fn decide(&self, top: &InverseAction, incoming: &InverseAction) -> MergeDecision {
        match self {
            Self::Burst if incoming.merge_flag => MergeDecision::Combine,
            Self::SameField => match (&top.field_tag, &incoming.field_tag) {
                (Some(mine), Some(theirs)) if mine.container.same(&theirs.container) => {
                    MergeDecision::KeepExisting
                }
                _ => MergeDecision::Reject,
            },
            Self::Move { item } => match &incoming.move_tag {
                Some(tag) if tag.item.same(item) => MergeDecision::Combine,
                _ => MergeDecision::Reject,
            },
            Self::Custom(predicate) => predicate(top, incoming),
            Self::Burst => MergeDecision::Reject,
        }
    }
}

/// Marks an addition-undo as the possible second half of a move.
#[derive(Debug, Clone)]
pub struct MoveTag {
    /// Array the item was added to.
    pub container: Node,
    /// The added item.
    pub item: Node,
}

/// Marks a property-change undo with the field it restores.
#[derive(Debug, Clone)]
pub struct FieldTag {
    /// The cell whose value changed.
    pub container: Node,
}

/// A replayable operation reversing one or more observed mutations.
pub struct InverseAction {
    steps: Vec<Step>,
    merge: Option<MergeRule>,
    merge_flag: bool,
    move_tag: Option<MoveTag>,
    field_tag: Option<FieldTag>,
    description: String,
    merged: usize,
}

impl fmt::Debug for InverseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InverseAction")
            .field("description", &self.description)
            .field("steps", &self.steps.len())
            .field("merge", &self.merge)
            .field("merge_flag", &self.merge_flag)
            .field("move_tag", &self.move_tag)
            .field("field_tag", &self.field_tag)
            .finish()
    }
}

impl InverseAction {
    /// Create an action with a single step and no merge metadata.
    pub fn new(
        description: impl Into<String>,
        step: impl FnOnce() -> ActionResult + 'static,
    ) -> Self {
        Self {
            steps: vec![Box::new(step)],
            merge: None,
            merge_flag: false,
            move_tag: None,
            field_tag: None,
            description: description.into(),
            merged: 0,
        }
    }

    #[must_use]
    pub fn with_merge_rule(mut self, rule: MergeRule) -> Self {
        self.merge = Some(rule);
        self
    }

    #[must_use]
    pub fn with_merge_flag(mut self, flag: bool) -> Self {
        self.merge_flag = flag;
        self
    }

    #[must_use]
    pub fn with_move_tag(mut self, tag: MoveTag) -> Self {
        self.move_tag = Some(tag);
        self
    }

    #[must_use]
    pub fn with_field_tag(mut self, tag: FieldTag) -> Self {
        self.field_tag = Some(tag);
        self
    }

    #[must_use]
    pub fn merge_rule(&self) -> Option<&MergeRule> {
        self.merge.as_ref()
    }

    #[must_use]
    pub fn merge_flag(&self) -> bool {
        self.merge_flag
    }

    #[must_use]
    pub fn move_tag(&self) -> Option<&MoveTag> {
        self.move_tag.as_ref()
    }

    #[must_use]
    pub fn field_tag(&self) -> Option<&FieldTag> {
        self.field_tag.as_ref()
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Description including how many actions were merged into this one.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.merged == 0 {
            self.description.clone()
        } else {
            format!("{} (+{})", self.description, self.merged)
        }
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn set_merge_rule(&mut self, rule: MergeRule) {
        self.merge = Some(rule);
    }

    pub(crate) fn set_merge_flag(&mut self, flag: bool) {
        self.merge_flag = flag;
    }

    pub(crate) fn set_field_tag(&mut self, tag: FieldTag) {
        self.field_tag = Some(tag);
    }

    /// Drop the merge rule so nothing fuses with this action any more.
    pub fn strip_merge_rule(&mut self) -> bool {
        self.merge.take().is_some()
    }

    /// Ask this action's merge rule about `incoming`.
    #[must_use]
    pub fn merge_decision(&self, incoming: &InverseAction) -> MergeDecision {
        self.merge
            .as_ref()
            .map_or(MergeDecision::Reject, |rule| rule.decide(self, incoming))
    }

    /// Fuse `top` (already stacked) with `incoming` (just captured).
    #[must_use]
    pub fn combine(top: InverseAction, incoming: InverseAction, order: ReplayOrder) -> Self {
        let InverseAction {
            steps: top_steps,
            description,
            merged: top_merged,
            ..
        } = top;
        let InverseAction {
            steps: new_steps,
            merge,
            merge_flag,
            move_tag,
            field_tag,
            merged: new_merged,
            ..
        } = incoming;

        let mut steps = Vec::with_capacity(top_steps.len() + new_steps.len());
        match order {
            ReplayOrder::NewestFirst => {
                steps.extend(new_steps);
                steps.extend(top_steps);
            }
            ReplayOrder::CaptureOrder => {
                steps.extend(top_steps);
                steps.extend(new_steps);
            }
        }
        Self {
            steps,
            merge,
            merge_flag,
            move_tag,
            field_tag,
            description,
            merged: top_merged + new_merged + 1,
        }
    }

    /// Run every step in order, consuming the action.
    pub fn run(self) -> ActionResult {
        for step in self.steps {
            step()?;
        }
        Ok(())
    }
}
