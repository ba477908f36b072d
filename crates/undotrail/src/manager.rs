#![forbid(unsafe_code)]

//! The undo/redo controller.
//!
//! [`UndoManager`] deep-watches a model, turns every change into an inverse
//! action and routes it to one of two [`ActionStack`]s:
//!
//! | Execution state | Destination | Side effect       |
//! |-----------------|-------------|-------------------|
//! | `Recording`     | undo stack  | redo stack cleared|
//! | `Undoing`       | redo stack  | none              |
//! | `Redoing`       | undo stack  | none              |
//!
//! Running a popped action re-enters the pipeline synchronously: the model
//! mutations it performs are captured again, this time as the inverse of the
//! inverse, and land on the opposite stack.
//!
//! # Execution
//!
//! ```text
//! execute(undo)
//!   pop undo top ─────────────┐
//!   state = Undoing           │  guard restores state and mode
//!   mode  = Merge             │  on every exit path
//!   run action ──> changes ──> capture ──> push(redo)
//!   strip merge rule of last written stack top
//!   restore state, mode ──────┘
//! ```
//!
//! Replay runs in merge mode so a combined action is re-captured as a single
//! entry. The rule is stripped afterwards so the next unrelated change does
//! not fuse with it.
//!
//! # Re-entrancy
//!
//! No borrow of the controller state is held while an action runs, while
//! command bindings are refreshed or while the model is mutated.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, debug_span, trace, warn};
use undotrail_reactive::{Change, Node, Watch, WatchOptions, watch};

use crate::action::InverseAction;
use crate::command::Command;
use crate::config::UndoOptions;
use crate::error::{ConfigError, Result, UndoError};
use crate::stack::ActionStack;
use crate::synth::{SynthesisStrategy, synthesize};

/// What the controller is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    /// Capturing user changes.
    #[default]
    Recording,
    /// Running an action popped from the undo stack.
    Undoing,
    /// Running an action popped from the redo stack.
    Redoing,
}

/// Policy applied to newly synthesized actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingMode {
    /// Record every change.
    #[default]
    Normal,
    /// Record nothing.
    Ignore,
    /// Keep only the first of consecutive changes to the same field.
    Once,
    /// Merge consecutive changes into one entry.
    Merge,
}

/// One of the two stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackSide {
    Undo,
    Redo,
}

impl StackSide {
    fn working_state(self) -> ExecutionState {
        match self {
            Self::Undo => ExecutionState::Undoing,
            Self::Redo => ExecutionState::Redoing,
        }
    }
}

impl fmt::Display for StackSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
        })
    }
}

struct ManagerState {
    undo: ActionStack,
    redo: ActionStack,
    execution: ExecutionState,
    mode: RecordingMode,
    strategy: SynthesisStrategy,
    last_written: Option<StackSide>,
}

impl ManagerState {
    fn stack_mut(&mut self, side: StackSide) -> &mut ActionStack {
        match side {
            StackSide::Undo => &mut self.undo,
            StackSide::Redo => &mut self.redo,
        }
    }

    fn stack(&self, side: StackSide) -> &ActionStack {
        match side {
            StackSide::Undo => &self.undo,
            StackSide::Redo => &self.redo,
        }
    }

    fn destination(&self) -> StackSide {
        match self.execution {
            ExecutionState::Recording | ExecutionState::Redoing => StackSide::Undo,
            ExecutionState::Undoing => StackSide::Redo,
        }
    }
}

/// State shared between the manager, its commands and its watch callback.
pub(crate) struct Shared {
    root: Node,
    options: UndoOptions,
    state: RefCell<ManagerState>,
    undo_command: Command,
    redo_command: Command,
}

/// Restores execution state and recording mode when dropped.
struct ExecutionGuard<'a> {
    shared: &'a Shared,
    execution: ExecutionState,
    mode: RecordingMode,
}

impl<'a> ExecutionGuard<'a> {
    fn enter(shared: &'a Shared, side: StackSide) -> Self {
        let mut state = shared.state.borrow_mut();
        let guard = Self {
            shared,
            execution: state.execution,
            mode: state.mode,
        };
        state.execution = side.working_state();
        state.mode = RecordingMode::Merge;
        guard
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.try_borrow_mut() {
            state.execution = self.execution;
            state.mode = self.mode;
        }
    }
}

impl Shared {
    fn capture(&self, change: &Change) {
        let (mode, strategy) = {
            let state = self.state.borrow();
            (state.mode, state.strategy)
        };
        if mode == RecordingMode::Ignore {
            trace!("change ignored");
            return;
        }
        match synthesize(change, &self.root, strategy, mode) {
            Ok(action) => self.push(action),
            Err(error) => warn!(%error, node = ?change.target, "change dropped without inverse action"),
        }
    }

    pub(crate) fn push(&self, action: InverseAction) {
        let description = action.description().to_string();
        let (side, outcome, cleared) = {
            let mut state = self.state.borrow_mut();
            let side = state.destination();
            let outcome = state.stack_mut(side).push(action);
            if outcome.wrote() {
                state.last_written = Some(side);
            }
            let cleared = if state.execution == ExecutionState::Recording {
                let cleared = state.redo.len();
                state.redo.clear();
                cleared
            } else {
                0
            };
            (side, outcome, cleared)
        };
        debug!(%side, ?outcome, cleared_redo = cleared, %description, "action pushed");
        self.refresh_commands();
    }

    pub(crate) fn execute(&self, side: StackSide) -> Result<bool> {
        let (action, undo_len, redo_len) = {
            let mut state = self.state.borrow_mut();
            let Some(action) = state.stack_mut(side).pop() else {
                trace!(%side, "nothing to execute");
                return Ok(false);
            };
            (action, state.undo.len(), state.redo.len())
        };
        let _span = debug_span!("undotrail.execute", side = %side, undo_len, redo_len).entered();
        let summary = action.summary();

        let guard = ExecutionGuard::enter(self, side);
        self.refresh_commands();
        let result = action.run();
        let cleanup = self.strip_last_written();
        drop(guard);
        self.refresh_commands();

        match &result {
            Ok(()) => debug!(%summary, "action replayed"),
            Err(error) => warn!(%summary, %error, "action failed"),
        }
        result?;
        cleanup?;
        Ok(true)
    }

    fn strip_last_written(&self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let side = state.last_written.ok_or(UndoError::NoStackWritten)?;
        if state.stack_mut(side).strip_top_merge() {
            trace!(%side, "merge rule stripped after replay");
        }
        Ok(())
    }

    fn set_mode(&self, mode: RecordingMode) {
        {
            let mut state = self.state.borrow_mut();
            state.mode = mode;
            state.undo.strip_top_merge();
        }
        debug!(?mode, "recording mode changed");
    }

    fn set_strategy(&self, strategy: SynthesisStrategy) {
        {
            let mut state = self.state.borrow_mut();
            state.strategy = strategy;
            state.undo.strip_top_merge();
        }
        debug!(?strategy, "synthesis strategy changed");
    }

    fn lens(&self) -> (usize, usize) {
        let state = self.state.borrow();
        (state.undo.len(), state.redo.len())
    }

    fn refresh_commands(&self) {
        let (undo_len, redo_len) = self.lens();
        self.undo_command.refresh(undo_len);
        self.redo_command.refresh(redo_len);
    }
}

/// Records inverse actions for every change below a model root.
///
/// One manager per model. Dropping it stops recording.
pub struct UndoManager {
    shared: Rc<Shared>,
    _watch: Watch,
}

impl fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("UndoManager")
            .field("undo", &state.undo)
            .field("redo", &state.redo)
            .field("execution", &state.execution)
            .field("mode", &state.mode)
            .field("strategy", &state.strategy)
            .finish()
    }
}

impl UndoManager {
    /// Start recording changes below `model`.
    pub fn new(model: &Node, options: UndoOptions) -> Result<Self, ConfigError> {
        let options = options.validated()?;
        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| Shared {
            root: model.clone(),
            state: RefCell::new(ManagerState {
                undo: ActionStack::new(options.levels, options.replay_order),
                redo: ActionStack::new(options.levels, options.replay_order),
                execution: ExecutionState::Recording,
                mode: RecordingMode::Normal,
                strategy: SynthesisStrategy::from_dereference(options.dereference),
                last_written: None,
            }),
            undo_command: Command::new(StackSide::Undo, &options.undo_label, weak.clone()),
            redo_command: Command::new(StackSide::Redo, &options.redo_label, weak.clone()),
            options,
        });

        let weak = Rc::downgrade(&shared);
        let watch_options = WatchOptions {
            depth: None,
            keep_old_values: true,
            mutable: true,
            tag_fields: true,
        };
        let handle = watch(model, watch_options, move |change| {
            if let Some(shared) = weak.upgrade() {
                shared.capture(change);
            }
        });
        debug!(tracked = handle.tracked_count(), "undo manager attached");
        Ok(Self {
            shared,
            _watch: handle,
        })
    }

    /// Push a hand-built action, routed by the current execution state.
    pub fn push(&self, action: InverseAction) {
        self.shared.push(action);
    }

    #[must_use]
    pub fn undo_command(&self) -> &Command {
        &self.shared.undo_command
    }

    #[must_use]
    pub fn redo_command(&self) -> &Command {
        &self.shared.redo_command
    }

    /// Run the top undo action. `Ok(false)` when there is nothing to undo.
    pub fn undo(&self) -> Result<bool> {
        self.shared.execute(StackSide::Undo)
    }

    /// Run the top redo action. `Ok(false)` when there is nothing to redo.
    pub fn redo(&self) -> Result<bool> {
        self.shared.execute(StackSide::Redo)
    }

    /// Clear both stacks. Mode, state and strategy are left alone.
    pub fn reset(&self) {
        {
            let mut state = self.shared.state.borrow_mut();
            state.undo.clear();
            state.redo.clear();
        }
        debug!("history reset");
        self.shared.refresh_commands();
    }

    pub fn set_mode(&self, mode: RecordingMode) {
        self.shared.set_mode(mode);
    }

    pub fn set_mode_normal(&self) {
        self.set_mode(RecordingMode::Normal);
    }

    pub fn set_mode_ignore(&self) {
        self.set_mode(RecordingMode::Ignore);
    }

    pub fn set_mode_once(&self) {
        self.set_mode(RecordingMode::Once);
    }

    pub fn set_mode_merge(&self) {
        self.set_mode(RecordingMode::Merge);
    }

    /// Switch between direct and path-dereferencing synthesis.
    pub fn set_dereference(&self, dereference: bool) {
        self.shared
            .set_strategy(SynthesisStrategy::from_dereference(dereference));
    }

    #[must_use]
    pub fn dereference(&self) -> bool {
        self.strategy() == SynthesisStrategy::Dereference
    }

    #[must_use]
    pub fn strategy(&self) -> SynthesisStrategy {
        self.shared.state.borrow().strategy
    }

    #[must_use]
    pub fn mode(&self) -> RecordingMode {
        self.shared.state.borrow().mode
    }

    #[must_use]
    pub fn execution_state(&self) -> ExecutionState {
        self.shared.state.borrow().execution
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo_len() > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.redo_len() > 0
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.shared.lens().0
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.shared.lens().1
    }

    /// Summaries of the undo entries, most recent first.
    #[must_use]
    pub fn undo_descriptions(&self, limit: usize) -> Vec<String> {
        self.shared
            .state
            .borrow()
            .stack(StackSide::Undo)
            .descriptions(limit)
    }

    /// Summaries of the redo entries, most recent first.
    #[must_use]
    pub fn redo_descriptions(&self, limit: usize) -> Vec<String> {
        self.shared
            .state
            .borrow()
            .stack(StackSide::Redo)
            .descriptions(limit)
    }

    #[must_use]
    pub fn options(&self) -> &UndoOptions {
        &self.shared.options
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.shared.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tracing_test::traced_test;
    use undotrail_reactive::{ObservableArray, ObservableCell, PlainValue, Record};

    fn model() -> (Node, ObservableCell, ObservableArray) {
        let title = ObservableCell::new("a");
        let list = ObservableArray::from_iter(["x", "y", "z"]);
        let root = Node::from(
            Record::new()
                .with("title", title.clone())
                .with("list", list.clone()),
        );
        (root, title, list)
    }

    #[test]
    fn recording_clears_redo() {
        let (root, title, _) = model();
        let manager = UndoManager::new(&root, UndoOptions::default()).unwrap();
        title.set("b");
        assert!(manager.undo().unwrap());
        assert_eq!(manager.redo_len(), 1);
        title.set("c");
        assert_eq!(manager.redo_len(), 0);
        assert_eq!(manager.undo_len(), 1);
    }

    #[test]
    fn state_and_mode_restored_after_execute() {
        let (root, title, _) = model();
        let manager = UndoManager::new(&root, UndoOptions::default()).unwrap();
        manager.set_mode_once();
        title.set("b");
        manager.undo().unwrap();
        assert_eq!(manager.execution_state(), ExecutionState::Recording);
        assert_eq!(manager.mode(), RecordingMode::Once);
    }

    #[test]
    fn execution_state_visible_inside_action() {
        let (root, _, _) = model();
        let manager = Rc::new(UndoManager::new(&root, UndoOptions::default()).unwrap());
        let seen = Rc::new(Cell::new(None));
        let (seen_in, handle) = (Rc::clone(&seen), Rc::downgrade(&manager));
        manager.push(InverseAction::new("probe", move || {
            if let Some(manager) = handle.upgrade() {
                seen_in.set(Some((manager.execution_state(), manager.mode())));
            }
            Ok(())
        }));
        manager.undo().unwrap();
        assert_eq!(
            seen.get(),
            Some((ExecutionState::Undoing, RecordingMode::Merge))
        );
    }

    #[test]
    fn failing_action_is_consumed_and_state_restored() {
        let (root, _, _) = model();
        let manager = UndoManager::new(&root, UndoOptions::default()).unwrap();
        manager.push(InverseAction::new("broken", || Err(UndoError::action("boom"))));
        assert_eq!(manager.undo(), Err(UndoError::action("boom")));
        assert_eq!(manager.undo_len(), 0);
        assert_eq!(manager.execution_state(), ExecutionState::Recording);
        assert_eq!(manager.mode(), RecordingMode::Normal);
    }

    #[test]
    fn empty_stack_is_not_an_error() {
        let (root, _, _) = model();
        let manager = UndoManager::new(&root, UndoOptions::default()).unwrap();
        assert_eq!(manager.undo(), Ok(false));
        assert_eq!(manager.redo(), Ok(false));
    }

    #[test]
    fn ignore_mode_records_nothing() {
        let (root, title, list) = model();
        let manager = UndoManager::new(&root, UndoOptions::default()).unwrap();
        manager.set_mode_ignore();
        title.set("b");
        list.push("w");
        assert_eq!(manager.undo_len(), 0);
    }

    #[test]
    fn reset_keeps_mode_and_strategy() {
        let (root, title, _) = model();
        let manager = UndoManager::new(&root, UndoOptions::default()).unwrap();
        manager.set_mode_merge();
        manager.set_dereference(true);
        title.set("b");
        manager.reset();
        assert_eq!(manager.undo_len(), 0);
        assert_eq!(manager.mode(), RecordingMode::Merge);
        assert!(manager.dereference());
        assert!(!manager.undo_command().enabled());
    }

    #[test]
    fn mode_change_stops_burst() {
        let (root, title, _) = model();
        let manager = UndoManager::new(&root, UndoOptions::default()).unwrap();
        manager.set_mode_merge();
        title.set("b");
        title.set("c");
        assert_eq!(manager.undo_len(), 1);
        manager.set_mode_merge();
        title.set("d");
        assert_eq!(manager.undo_len(), 2);
    }

    #[test]
    fn strategy_change_stops_burst() {
        let (root, title, _) = model();
        let manager = UndoManager::new(&root, UndoOptions::default()).unwrap();
        manager.set_mode_merge();
        title.set("b");
        title.set("c");
        assert_eq!(manager.undo_len(), 1);

        manager.set_dereference(true);
        title.set("d");
        assert_eq!(manager.undo_len(), 2);

        manager.undo().unwrap();
        assert_eq!(title.get().to_plain(), PlainValue::from("c"));
        manager.undo().unwrap();
        assert_eq!(title.get().to_plain(), PlainValue::from("a"));
    }

    #[test]
    fn push_during_undo_goes_to_redo() {
        let (root, _, _) = model();
        let manager = Rc::new(UndoManager::new(&root, UndoOptions::default()).unwrap());
        let handle = Rc::downgrade(&manager);
        manager.push(InverseAction::new("outer", move || {
            if let Some(manager) = handle.upgrade() {
                manager.push(InverseAction::new("inner", || Ok(())));
            }
            Ok(())
        }));
        manager.undo().unwrap();
        assert_eq!(manager.undo_len(), 0);
        assert_eq!(manager.redo_descriptions(5), vec!["inner"]);
    }

    #[test]
    fn invalid_options_rejected() {
        let (root, _, _) = model();
        let err = UndoManager::new(&root, UndoOptions::default().with_levels(0)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    #[traced_test]
    fn synthesis_failure_is_logged_and_dropped() {
        let title = ObservableCell::new("a");
        let root = Node::from(Record::new().with("my title", title.clone()));
        let manager =
            UndoManager::new(&root, UndoOptions::default().with_dereference(true)).unwrap();
        title.set("b");
        assert_eq!(manager.undo_len(), 0);
        assert_eq!(title.get().to_plain(), PlainValue::from("b"));
        assert!(logs_contain("change dropped without inverse action"));
    }

    #[test]
    fn cleanup_without_written_stack_is_reported() {
        let (root, _, _) = model();
        let manager = UndoManager::new(&root, UndoOptions::default()).unwrap();
        manager.push(InverseAction::new("noop", || Ok(())));
        // Simulate a history restored without ever writing a stack.
        manager.shared.state.borrow_mut().last_written = None;
        assert_eq!(manager.undo(), Err(UndoError::NoStackWritten));
        assert_eq!(manager.execution_state(), ExecutionState::Recording);
    }
}
