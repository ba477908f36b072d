#![forbid(unsafe_code)]

//! Undo and redo commands with observable label and enabled state.

use std::fmt;
use std::rc::Weak;

use undotrail_reactive::Observable;

use crate::config::render_label;
use crate::error::Result;
use crate::manager::{Shared, StackSide};

/// One of the two commands of an [`UndoManager`](crate::UndoManager).
///
/// `label` and `enabled` are kept up to date whenever the command's stack
/// changes and can be subscribed to. Cloning shares the bindings.
#[derive(Clone)]
pub struct Command {
    side: StackSide,
    template: String,
    label: Observable<String>,
    enabled: Observable<bool>,
    manager: Weak<Shared>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("side", &self.side)
            .field("label", &self.label.get())
            .field("enabled", &self.enabled.get())
            .finish()
    }
}

impl Command {
    pub(crate) fn new(side: StackSide, template: &str, manager: Weak<Shared>) -> Self {
        Self {
            side,
            template: template.to_string(),
            label: Observable::new(render_label(template, 0)),
            enabled: Observable::new(false),
            manager,
        }
    }

    /// Pop and run the top action of this command's stack.
    ///
    /// Returns `Ok(false)` when the stack is empty or the manager is gone.
    pub fn execute(&self) -> Result<bool> {
        match self.manager.upgrade() {
            Some(shared) => shared.execute(self.side),
            None => Ok(false),
        }
    }

    #[must_use]
    pub fn side(&self) -> StackSide {
        self.side
    }

    /// Current label: the template with `#COUNT#` replaced by the stack
    /// length.
    #[must_use]
    pub fn label(&self) -> String {
        self.label.get()
    }

    /// Whether the stack is non-empty.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    #[must_use]
    pub fn label_observable(&self) -> &Observable<String> {
        &self.label
    }

    #[must_use]
    pub fn enabled_observable(&self) -> &Observable<bool> {
        &self.enabled
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    pub(crate) fn refresh(&self, len: usize) {
        self.label.set(render_label(&self.template, len));
        self.enabled.set(len != 0);
    }
}
