#![forbid(unsafe_code)]

//! The bindable-host contract.
//!
//! A host is the UI-facing object a binding is attached to: a widget, a
//! window, a panel. Host types embed a [`HostCore`] and hand it out through
//! [`Model::host_core`](crate::model::Model::host_core); the core bundles
//! the three things the framework needs from a host:
//!
//! - a replaceable *data context* (typically the view-model),
//! - a signal firing when that context is replaced,
//! - a [`BindingScope`] owning every binding registered on the host, so
//!   releasing the host releases them all.
//!
//! [`binding::HostBinding`] is the per-property binding surface built on
//! top of the core.

mod binding;

pub use binding::HostBinding;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::item::Item;
use crate::signal::{Changed, Unbind};

// ─── BindingScope ────────────────────────────────────────────────────────

/// Owns severable bindings for one host. Releasing the scope (or dropping
/// it) unbinds every entry in registration order, then drops them.
#[derive(Default)]
pub struct BindingScope {
    entries: RefCell<Vec<Box<dyn Unbind>>>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `entry` until the scope is released.
    pub fn hold(&self, entry: impl Unbind + 'static) {
        self.entries.borrow_mut().push(Box::new(entry));
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Unbinds and drops every held entry. Idempotent; the scope is
    /// reusable afterwards.
    pub fn release(&self) {
        let entries = self.entries.take();
        if entries.is_empty() {
            return;
        }
        tracing::debug!(count = entries.len(), "releasing binding scope");
        for entry in &entries {
            entry.unbind();
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("count", &self.count())
            .finish()
    }
}

// ─── HostCore ────────────────────────────────────────────────────────────

/// The embeddable bindable-state bundle for host types. Cloneable handle;
/// clones share the context, the signal, and the scope.
#[derive(Clone, Default)]
pub struct HostCore {
    inner: Rc<CoreInner>,
}

#[derive(Default)]
struct CoreInner {
    context: RefCell<Option<Item>>,
    context_changed: Changed,
    scope: BindingScope,
}

impl HostCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current data context.
    #[must_use]
    pub fn context(&self) -> Option<Item> {
        self.inner.context.borrow().clone()
    }

    /// Replaces the data context. Swapping in a handle to the same
    /// allocation is a no-op; otherwise `context_changed` fires after the
    /// slot is updated.
    pub fn replace_context(&self, context: Option<Item>) {
        {
            let mut slot = self.inner.context.borrow_mut();
            let same = match (slot.as_ref(), context.as_ref()) {
                (Some(a), Some(b)) => a.ptr_eq(b),
                (None, None) => true,
                _ => false,
            };
            if same {
                return;
            }
            tracing::debug!(
                old = ?slot.as_ref().map(Item::id),
                new = ?context.as_ref().map(Item::id),
                "host context replaced"
            );
            *slot = context;
        }
        self.inner.context_changed.notify();
    }

    /// Fires after the context object is replaced.
    #[must_use]
    pub fn context_changed(&self) -> &Changed {
        &self.inner.context_changed
    }

    /// The scope owning every binding registered on this host.
    #[must_use]
    pub fn scope(&self) -> &BindingScope {
        &self.inner.scope
    }

    fn downgrade(&self) -> std::rc::Weak<CoreInner> {
        Rc::downgrade(&self.inner)
    }
}

impl CoreInner {
    fn context(&self) -> Option<Item> {
        self.context.borrow().clone()
    }
}

impl fmt::Debug for HostCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCore")
            .field("context", &self.context().map(|c| c.id()))
            .field("bindings", &self.inner.scope.count())
            .finish()
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, Schema};
    use crate::signal::Subscription;
    use std::cell::Cell;

    #[derive(Default)]
    struct Ctx;

    impl Model for Ctx {
        fn describe(_schema: &mut Schema<Self>) {}
    }

    #[test]
    fn replace_context_fires_once_per_swap() {
        let core = HostCore::new();
        let hits = Rc::new(Cell::new(0u32));
        let h = hits.clone();
        let _sub = core.context_changed().subscribe(move |()| h.set(h.get() + 1));

        let a = Item::new(Ctx);
        core.replace_context(Some(a.clone()));
        assert_eq!(hits.get(), 1);
        assert!(core.context().unwrap().ptr_eq(&a));

        // Same allocation: no-op.
        core.replace_context(Some(a.clone()));
        assert_eq!(hits.get(), 1);

        core.replace_context(None);
        assert_eq!(hits.get(), 2);
        core.replace_context(None);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn listeners_observe_the_new_context() {
        let core = HostCore::new();
        let seen = Rc::new(Cell::new(false));

        let probe = core.clone();
        let s = seen.clone();
        let _sub = core
            .context_changed()
            .subscribe(move |()| s.set(probe.context().is_some()));

        core.replace_context(Some(Item::new(Ctx)));
        assert!(seen.get());
    }

    #[test]
    fn scope_release_unbinds_in_registration_order() {
        let scope = BindingScope::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second"] {
            let l = log.clone();
            scope.hold(Subscription::new(move || l.borrow_mut().push(tag)));
        }
        assert_eq!(scope.count(), 2);

        scope.release();
        assert!(scope.is_empty());
        assert_eq!(*log.borrow(), vec!["first", "second"]);

        // Idempotent.
        scope.release();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn scope_drop_releases() {
        let hits = Rc::new(Cell::new(0u32));
        {
            let scope = BindingScope::new();
            let h = hits.clone();
            scope.hold(Subscription::new(move || h.set(h.get() + 1)));
        }
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn scope_is_reusable_after_release() {
        let scope = BindingScope::new();
        scope.hold(Subscription::inert());
        scope.release();

        scope.hold(Subscription::inert());
        assert_eq!(scope.count(), 1);
    }

    #[test]
    fn clones_share_the_core() {
        let core = HostCore::new();
        let alias = core.clone();

        alias.replace_context(Some(Item::new(Ctx)));
        assert!(core.context().is_some());
    }
}
