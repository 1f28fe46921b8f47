#![forbid(unsafe_code)]

//! The triggerable-action contract.
//!
//! A [`Command`] is what a host invokes when the user activates something:
//! an `execute` action guarded by `can_execute`. The contract is consumed
//! by [`invoke`], which only runs the action when the guard allows it;
//! hosts re-query enabled state when
//! [`can_execute_changed`](Command::can_execute_changed) fires.

use std::fmt;
use std::rc::Rc;

use crate::item::Item;
use crate::signal::Changed;

/// An action with an enablement guard.
pub trait Command {
    /// Whether the action may run for `parameter` right now.
    fn can_execute(&self, parameter: Option<&Item>) -> bool;

    /// Runs the action. Callers go through [`invoke`], which checks the
    /// guard first.
    fn execute(&self, parameter: Option<&Item>);

    /// Fires when the guard's answer may have changed, so hosts can
    /// re-query enabled state. `None` when enablement never changes.
    fn can_execute_changed(&self) -> Option<&Changed> {
        None
    }
}

/// Runs `command` for `parameter` if its guard allows it; returns whether
/// it ran.
pub fn invoke(command: &impl Command, parameter: Option<&Item>) -> bool {
    if !command.can_execute(parameter) {
        return false;
    }
    command.execute(parameter);
    true
}

/// Closure-based [`Command`] with an optional guard. Clones share state.
pub struct FnCommand {
    execute: Rc<dyn Fn(Option<&Item>)>,
    guard: Option<Rc<dyn Fn(Option<&Item>) -> bool>>,
    can_execute_changed: Changed,
}

impl FnCommand {
    /// Always-enabled command.
    pub fn new(execute: impl Fn(Option<&Item>) + 'static) -> Self {
        Self {
            execute: Rc::new(execute),
            guard: None,
            can_execute_changed: Changed::new(),
        }
    }

    /// Adds an enablement guard.
    #[must_use]
    pub fn with_guard(mut self, guard: impl Fn(Option<&Item>) -> bool + 'static) -> Self {
        self.guard = Some(Rc::new(guard));
        self
    }

    /// Tells hosts the guard's answer may have changed.
    pub fn notify_can_execute(&self) {
        self.can_execute_changed.notify();
    }
}

impl Command for FnCommand {
    fn can_execute(&self, parameter: Option<&Item>) -> bool {
        self.guard.as_ref().is_none_or(|guard| guard(parameter))
    }

    fn execute(&self, parameter: Option<&Item>) {
        (self.execute)(parameter);
    }

    fn can_execute_changed(&self) -> Option<&Changed> {
        Some(&self.can_execute_changed)
    }
}

impl Clone for FnCommand {
    fn clone(&self) -> Self {
        Self {
            execute: Rc::clone(&self.execute),
            guard: self.guard.clone(),
            can_execute_changed: self.can_execute_changed.clone(),
        }
    }
}

impl fmt::Debug for FnCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCommand")
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
