#![forbid(unsafe_code)]

//! Dynamically-typed item handles.
//!
//! An [`Item`] is what accessors point at: a cloneable, interior-mutable
//! handle to a value whose concrete type is erased but remembered
//! (`TypeId` plus type name). Constructing an item registers its type's
//! bindable schema (see [`crate::model`]), so resolution failures surface
//! the first time a property is actually used, not here.
//!
//! # Invariants
//!
//! 1. Clones share the underlying cell; [`Item::id`] is stable across
//!    clones and unique per allocation.
//! 2. Typed access (`with`/`with_mut`) returns `None` on a type mismatch
//!    instead of panicking.
//! 3. The host core, when the type exposes one, is captured once at
//!    construction.
//!
//! # Panics
//!
//! `with`/`with_mut` follow `RefCell` borrow rules: re-entering a binding
//! API while holding a borrow of the same item panics. Binding callbacks
//! run after the framework releases its borrows, so this only bites code
//! that calls back into bindings from inside its own `with_mut` closure.

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::host::HostCore;
use crate::model::{self, Model};

/// Identity token for an [`Item`]. Two clones of one handle compare equal;
/// handles over distinct allocations never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(usize);

/// Cloneable handle to a dynamically-typed, interior-mutable value.
#[derive(Clone)]
pub struct Item {
    cell: Rc<RefCell<dyn Any>>,
    type_id: TypeId,
    type_name: &'static str,
    host: Option<HostCore>,
}

impl Item {
    /// Wraps `value` in a fresh cell and registers `T`'s schema.
    pub fn new<T: Model>(value: T) -> Self {
        Self::from_cell(Rc::new(RefCell::new(value)))
    }

    /// Wraps an existing cell, letting the application keep typed access
    /// to the same storage the bindings see.
    pub fn from_cell<T: Model>(cell: Rc<RefCell<T>>) -> Self {
        model::ensure_registered::<T>();
        let host = cell.borrow().host_core().cloned();
        let erased: Rc<RefCell<dyn Any>> = cell;
        Self {
            cell: erased,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            host,
        }
    }

    /// Identity of the underlying allocation.
    #[must_use]
    pub fn id(&self) -> ItemId {
        ItemId(Rc::as_ptr(&self.cell) as *const () as usize)
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The host core captured at construction, when `T` exposes one.
    #[must_use]
    pub fn host_core(&self) -> Option<&HostCore> {
        self.host.as_ref()
    }

    /// True when both handles share one allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Item) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// True when the erased type is `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Runs `f` over a shared borrow of the value, if it is a `T`.
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.cell.borrow();
        guard.downcast_ref::<T>().map(f)
    }

    /// Runs `f` over a mutable borrow of the value, if it is a `T`.
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.cell.borrow_mut();
        guard.downcast_mut::<T>().map(f)
    }

    pub(crate) fn with_any<R>(&self, f: impl FnOnce(&dyn Any) -> R) -> R {
        let guard = self.cell.borrow();
        f(&*guard)
    }

    pub(crate) fn with_any_mut<R>(&self, f: impl FnOnce(&mut dyn Any) -> R) -> R {
        let mut guard = self.cell.borrow_mut();
        f(&mut *guard)
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("type", &self.type_name)
            .field("id", &self.id())
            .field("host", &self.host.is_some())
            .finish()
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Schema;

    #[derive(Default)]
    struct Plain {
        value: u32,
    }

    impl Model for Plain {
        fn describe(_schema: &mut Schema<Self>) {}
    }

    #[test]
    fn typed_access_roundtrips() {
        let item = Item::new(Plain { value: 3 });
        item.with_mut(|p: &mut Plain| p.value = 9);
        assert_eq!(item.with(|p: &Plain| p.value), Some(9));
    }

    #[test]
    fn wrong_type_access_is_none() {
        let item = Item::new(Plain::default());
        assert_eq!(item.with(|s: &String| s.len()), None);
        assert!(item.is::<Plain>());
        assert!(!item.is::<String>());
    }

    #[test]
    fn ids_are_stable_across_clones() {
        let item = Item::new(Plain::default());
        let alias = item.clone();
        assert_eq!(item.id(), alias.id());
        assert!(item.ptr_eq(&alias));

        let other = Item::new(Plain::default());
        assert_ne!(item.id(), other.id());
        assert!(!item.ptr_eq(&other));
    }

    #[test]
    fn from_cell_shares_storage_with_the_application() {
        let cell = Rc::new(RefCell::new(Plain { value: 1 }));
        let item = Item::from_cell(cell.clone());

        cell.borrow_mut().value = 42;
        assert_eq!(item.with(|p: &Plain| p.value), Some(42));

        item.with_mut(|p: &mut Plain| p.value = 7);
        assert_eq!(cell.borrow().value, 7);
    }

    #[test]
    fn plain_models_have_no_host_core() {
        let item = Item::new(Plain::default());
        assert!(item.host_core().is_none());
    }

    #[test]
    fn reports_the_concrete_type_name() {
        let item = Item::new(Plain::default());
        assert!(item.type_name().contains("Plain"));
    }
}
