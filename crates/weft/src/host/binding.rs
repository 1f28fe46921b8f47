#![forbid(unsafe_code)]

//! Per-property host bindings.
//!
//! A [`HostBinding`] is a bindable property *of a host item* plus the
//! transform-and-bind surface on top of it: binding to the host's data
//! context with automatic re-link on context swap, composing toward nested
//! properties, value conversion, and write-failure containment.
//!
//! Every operation that creates a [`Link`] registers it in the host's
//! [`BindingScope`](super::BindingScope), so releasing the host releases
//! all of its bindings at once.

use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use crate::accessor::Accessor;
use crate::bound::Bound;
use crate::endpoint::Endpoint;
use crate::error::{BindError, BindResult};
use crate::host::HostCore;
use crate::item::Item;
use crate::link::{Link, LinkMode};
use crate::signal::{Changed, Subscription};

/// A bindable property of a host. Clones share state.
pub struct HostBinding<V: 'static> {
    host: Item,
    core: HostCore,
    endpoint: Rc<dyn Endpoint<V>>,
}

impl<V: 'static> HostBinding<V> {
    /// Binds `accessor` to the host item. Fails with
    /// [`BindError::HostRequired`] when the item's type exposes no host
    /// core, and fails fast on accessor resolution errors.
    pub fn new(host: &Item, accessor: impl Accessor<V> + 'static) -> BindResult<Self> {
        let core = host
            .host_core()
            .cloned()
            .ok_or(BindError::HostRequired {
                type_name: host.type_name(),
            })?;
        let bound = Bound::new(host, accessor)?;
        Ok(Self {
            host: host.clone(),
            core,
            endpoint: Rc::new(bound),
        })
    }

    /// The host item this binding belongs to.
    #[must_use]
    pub fn host(&self) -> &Item {
        &self.host
    }

    /// Links this host property (destination) to an arbitrary endpoint
    /// (source). The link is registered in the host's scope.
    pub fn bind_to(
        &self,
        endpoint: impl Endpoint<V> + 'static,
        mode: LinkMode,
    ) -> BindResult<Rc<Link<V>>> {
        let link = Link::new(endpoint, Rc::clone(&self.endpoint), mode)?;
        self.core.scope().hold(Rc::clone(&link));
        Ok(link)
    }

    /// Binds the host's data context, read through `accessor`, to this
    /// host property. The context side is the link source.
    ///
    /// Whenever the context object is replaced, the context-side endpoint
    /// rebinds (the old item's subscription detached first) and the link
    /// re-syncs in its primary direction: changes sourced from the old
    /// context stop propagating, and the new context's value shows
    /// immediately. Both the link and the context watcher live in the
    /// host's scope.
    pub fn bind_context(
        &self,
        accessor: impl Accessor<V> + 'static,
        mode: LinkMode,
    ) -> BindResult<Rc<Link<V>>> {
        let ctx_bound = Bound::with(self.core.context(), accessor)?;
        let link = Link::new(ctx_bound.clone(), Rc::clone(&self.endpoint), mode)?;

        let weak_core = self.core.downgrade();
        let weak_link = Rc::downgrade(&link);
        let watcher = self.core.context_changed().subscribe(move |()| {
            let (Some(core), Some(link)) = (weak_core.upgrade(), weak_link.upgrade()) else {
                return;
            };
            if let Err(err) = ctx_bound.rebind(core.context()) {
                panic!("context swap could not rebind: {err}");
            }
            if let Err(err) = link.refresh() {
                panic!("context swap could not re-sync: {err}");
            }
        });

        self.core.scope().hold(Rc::clone(&link));
        self.core.scope().hold(watcher);
        Ok(link)
    }

    /// A binding whose reads pass through `to` and writes through `from`.
    /// Change notifications forward unchanged through the same signal.
    pub fn convert<U: 'static>(
        &self,
        to: impl Fn(V) -> U + 'static,
        from: impl Fn(U) -> V + 'static,
    ) -> HostBinding<U> {
        self.rewrap(Rc::new(ConvertEndpoint {
            inner: Rc::clone(&self.endpoint),
            to: Box::new(to),
            from: Box::new(from),
        }))
    }

    /// [`convert`](Self::convert) via the `From` conversions in both
    /// directions.
    pub fn cast<U>(&self) -> HostBinding<U>
    where
        U: From<V> + 'static,
        V: From<U>,
    {
        self.convert(U::from, V::from)
    }

    /// Wraps `set` in a failure guard. The handler runs on every write:
    /// with `None` after a success (so "clear previous error" logic is
    /// uniform), with `Some(&E)` when the write failed with an application
    /// error downcastable to `E`. Returning `true` swallows the failure;
    /// `false` re-raises it. Errors that are not an `E` propagate
    /// untouched without invoking the handler.
    pub fn catch<E: Error + 'static>(
        &self,
        handler: impl Fn(Option<&E>) -> bool + 'static,
    ) -> HostBinding<V> {
        self.guard_writes(move |outcome| match outcome {
            Ok(()) => {
                handler(None);
                Ok(())
            }
            Err(err) => {
                if err.source_as::<E>().is_some_and(|app| handler(Some(app))) {
                    Ok(())
                } else {
                    Err(err)
                }
            }
        })
    }

    /// [`catch`](Self::catch) over the whole [`BindError`] instead of one
    /// application error type.
    pub fn catch_all(
        &self,
        handler: impl Fn(Option<&BindError>) -> bool + 'static,
    ) -> HostBinding<V> {
        self.guard_writes(move |outcome| match outcome {
            Ok(()) => {
                handler(None);
                Ok(())
            }
            Err(err) if handler(Some(&err)) => Ok(()),
            Err(err) => Err(err),
        })
    }

    fn guard_writes(
        &self,
        filter: impl Fn(BindResult<()>) -> BindResult<()> + 'static,
    ) -> HostBinding<V> {
        self.rewrap(Rc::new(CatchEndpoint {
            inner: Rc::clone(&self.endpoint),
            filter: Box::new(filter),
        }))
    }

    fn rewrap<U: 'static>(&self, endpoint: Rc<dyn Endpoint<U>>) -> HostBinding<U> {
        HostBinding {
            host: self.host.clone(),
            core: self.core.clone(),
            endpoint,
        }
    }
}

impl HostBinding<Option<Item>> {
    /// Composes toward a property of the child item this binding yields.
    /// The inner accessor re-resolves and re-subscribes whenever this
    /// binding's own value changes, recursively: a `child` of a `child`
    /// tracks swaps at every level.
    pub fn child<U: 'static>(
        &self,
        accessor: impl Accessor<U> + 'static,
    ) -> BindResult<HostBinding<U>> {
        let endpoint = ChildEndpoint::new(Rc::clone(&self.endpoint), Rc::new(accessor))?;
        Ok(self.rewrap(Rc::new(endpoint)))
    }
}

impl<V: 'static> Endpoint<V> for HostBinding<V> {
    fn get(&self) -> BindResult<V> {
        self.endpoint.get()
    }

    fn set(&self, value: V) -> BindResult<()> {
        self.endpoint.set(value)
    }

    fn changed(&self) -> &Changed {
        self.endpoint.changed()
    }

    fn unbind(&self) {
        self.endpoint.unbind();
    }
}

impl<V: 'static> Clone for HostBinding<V> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            core: self.core.clone(),
            endpoint: Rc::clone(&self.endpoint),
        }
    }
}

impl<V: 'static> fmt::Debug for HostBinding<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBinding")
            .field("host", &self.host.id())
            .finish()
    }
}

// ─── endpoint wrappers ───────────────────────────────────────────────────

struct ConvertEndpoint<V, U> {
    inner: Rc<dyn Endpoint<V>>,
    to: Box<dyn Fn(V) -> U>,
    from: Box<dyn Fn(U) -> V>,
}

impl<V: 'static, U: 'static> Endpoint<U> for ConvertEndpoint<V, U> {
    fn get(&self) -> BindResult<U> {
        self.inner.get().map(&self.to)
    }

    fn set(&self, value: U) -> BindResult<()> {
        self.inner.set((self.from)(value))
    }

    fn changed(&self) -> &Changed {
        self.inner.changed()
    }

    fn unbind(&self) {
        self.inner.unbind();
    }
}

struct CatchEndpoint<V> {
    inner: Rc<dyn Endpoint<V>>,
    filter: Box<dyn Fn(BindResult<()>) -> BindResult<()>>,
}

impl<V: 'static> Endpoint<V> for CatchEndpoint<V> {
    fn get(&self) -> BindResult<V> {
        self.inner.get()
    }

    fn set(&self, value: V) -> BindResult<()> {
        (self.filter)(self.inner.set(value))
    }

    fn changed(&self) -> &Changed {
        self.inner.changed()
    }

    fn unbind(&self) {
        self.inner.unbind();
    }
}

/// Endpoint over a property of the child item another endpoint yields.
/// Watches both levels: the inner subscription moves whenever the outer
/// value changes, and the composed signal fires for both kinds of change.
struct ChildEndpoint<U: 'static> {
    inner: Rc<ChildState<U>>,
}

struct ChildState<U: 'static> {
    outer: Rc<dyn Endpoint<Option<Item>>>,
    accessor: Rc<dyn Accessor<U>>,
    changed: Changed,
    outer_sub: RefCell<Option<Subscription>>,
    inner_sub: RefCell<Option<Subscription>>,
}

impl<U: 'static> ChildEndpoint<U> {
    fn new(
        outer: Rc<dyn Endpoint<Option<Item>>>,
        accessor: Rc<dyn Accessor<U>>,
    ) -> BindResult<Self> {
        let state = Rc::new(ChildState {
            outer,
            accessor,
            changed: Changed::new(),
            outer_sub: RefCell::new(None),
            inner_sub: RefCell::new(None),
        });

        let child = state.outer.get()?;
        let changed = state.changed.clone();
        let first = state
            .accessor
            .attach(child.as_ref(), Rc::new(move || changed.notify()))?;
        *state.inner_sub.borrow_mut() = Some(first);

        let weak = Rc::downgrade(&state);
        let outer_sub = state.outer.changed().subscribe(move |()| {
            if let Some(state) = weak.upgrade() {
                state.follow_outer_change();
            }
        });
        *state.outer_sub.borrow_mut() = Some(outer_sub);

        Ok(Self { inner: state })
    }
}

impl<U: 'static> ChildState<U> {
    fn follow_outer_change(self: &Rc<Self>) {
        // Detach before re-resolving so a vanished child goes quiet even
        // if the re-attach below fails.
        self.inner_sub.borrow_mut().take();
        let child = match self.outer.get() {
            Ok(child) => child,
            Err(err) => panic!("nested binding lost its child item: {err}"),
        };
        let changed = self.changed.clone();
        match self
            .accessor
            .attach(child.as_ref(), Rc::new(move || changed.notify()))
        {
            Ok(sub) => *self.inner_sub.borrow_mut() = Some(sub),
            Err(err) => panic!("nested binding could not re-subscribe: {err}"),
        }
        self.changed.notify();
    }
}

impl<U: 'static> Endpoint<U> for ChildEndpoint<U> {
    fn get(&self) -> BindResult<U> {
        let child = self.inner.outer.get()?;
        self.inner.accessor.get(child.as_ref())
    }

    fn set(&self, value: U) -> BindResult<()> {
        let child = self.inner.outer.get()?;
        self.inner.accessor.set(child.as_ref(), value)
    }

    fn changed(&self) -> &Changed {
        &self.inner.changed
    }

    fn unbind(&self) {
        self.inner.outer_sub.borrow_mut().take();
        self.inner.inner_sub.borrow_mut().take();
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
