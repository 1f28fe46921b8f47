#![forbid(unsafe_code)]

//! Accessor-plus-item endpoints.
//!
//! A [`Bound`] pairs an [`Accessor`] with the item it currently targets and
//! exposes the pair as an [`Endpoint`]. The item is rebindable: swapping it
//! detaches the old item's change subscription before attaching to the new
//! one, so stale items never keep notifying. The `changed` handle is owned
//! by the `Bound` itself and stays stable across rebinds.
//!
//! Construction attaches eagerly, so resolution errors (a mistyped property
//! name, an unregistered type) surface at bind time.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::accessor::Accessor;
use crate::endpoint::Endpoint;
use crate::error::BindResult;
use crate::item::Item;
use crate::signal::{Changed, Subscription};

/// An accessor attached to a rebindable item. Clones share state.
pub struct Bound<V: 'static> {
    inner: Rc<BoundInner<V>>,
}

struct BoundInner<V: 'static> {
    accessor: Rc<dyn Accessor<V>>,
    item: RefCell<Option<Item>>,
    changed: Changed,
    watch: RefCell<Option<Subscription>>,
}

impl<V: 'static> Bound<V> {
    /// Binds `accessor` to `item`, attaching its change subscription.
    pub fn new(item: &Item, accessor: impl Accessor<V> + 'static) -> BindResult<Self> {
        Self::with(Some(item.clone()), accessor)
    }

    /// Binds `accessor` to an optional item. With `None` the bound reads
    /// the accessor's default and drops writes until rebound.
    pub fn with(item: Option<Item>, accessor: impl Accessor<V> + 'static) -> BindResult<Self> {
        let bound = Self {
            inner: Rc::new(BoundInner {
                accessor: Rc::new(accessor),
                item: RefCell::new(item),
                changed: Changed::new(),
                watch: RefCell::new(None),
            }),
        };
        bound.attach_current()?;
        Ok(bound)
    }

    /// The currently targeted item.
    #[must_use]
    pub fn item(&self) -> Option<Item> {
        self.inner.item.borrow().clone()
    }

    /// Retargets the bound. The old item's subscription is detached before
    /// the new one is attached; no change fires for the swap itself, so a
    /// caller that needs an immediate sync follows up with its link's
    /// update.
    pub fn rebind(&self, item: Option<Item>) -> BindResult<()> {
        self.inner.watch.borrow_mut().take();
        *self.inner.item.borrow_mut() = item;
        self.attach_current()
    }

    fn attach_current(&self) -> BindResult<()> {
        let item = self.inner.item.borrow().clone();
        let changed = self.inner.changed.clone();
        let sub = self
            .inner
            .accessor
            .attach(item.as_ref(), Rc::new(move || changed.notify()))?;
        *self.inner.watch.borrow_mut() = Some(sub);
        Ok(())
    }
}

impl<V: 'static> Endpoint<V> for Bound<V> {
    fn get(&self) -> BindResult<V> {
        let item = self.inner.item.borrow().clone();
        self.inner.accessor.get(item.as_ref())
    }

    fn set(&self, value: V) -> BindResult<()> {
        let item = self.inner.item.borrow().clone();
        self.inner.accessor.set(item.as_ref(), value)
    }

    fn changed(&self) -> &Changed {
        &self.inner.changed
    }

    /// Drops the current change subscription. The bound stays readable and
    /// writable; it just stops hearing about changes.
    fn unbind(&self) {
        self.inner.watch.borrow_mut().take();
    }
}

impl<V: 'static> crate::signal::Unbind for Bound<V> {
    fn unbind(&self) {
        Endpoint::unbind(self);
    }
}

impl<V: 'static> Clone for Bound<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: 'static> fmt::Debug for Bound<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("item", &self.inner.item.borrow().as_ref().map(Item::id))
            .field("watching", &self.inner.watch.borrow().is_some())
            .finish()
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
