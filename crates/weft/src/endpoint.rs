#![forbid(unsafe_code)]

//! Self-contained bindable values.
//!
//! An [`Endpoint`] is what a [`Link`](crate::link::Link) connects: a value
//! that can be read, written, and watched without supplying an item per
//! call. [`Bound`](crate::bound::Bound) is the accessor-plus-item endpoint;
//! this module holds the free-standing ones, built from explicit factories
//! (no implicit coercion from literals):
//!
//! - [`constant`] — a fixed value; writes are dropped, never fires.
//! - [`FnEndpoint`] — closure pair over external state, with an optional
//!   change signal.
//!
//! Endpoint handles are cheap clones sharing state, so a linked endpoint
//! stays writable by whoever created it.

use std::fmt;
use std::rc::Rc;

use crate::error::BindResult;
use crate::signal::Changed;

/// A bindable value: get, set, change notification, teardown.
pub trait Endpoint<V> {
    fn get(&self) -> BindResult<V>;

    fn set(&self, value: V) -> BindResult<()>;

    /// Fires after the value changes. Endpoints over change-silent state
    /// own a signal that simply never fires.
    fn changed(&self) -> &Changed;

    /// Severs whatever subscriptions the endpoint holds. Default: no-op.
    fn unbind(&self) {}
}

impl<V, E: Endpoint<V> + ?Sized> Endpoint<V> for Rc<E> {
    fn get(&self) -> BindResult<V> {
        (**self).get()
    }

    fn set(&self, value: V) -> BindResult<()> {
        (**self).set(value)
    }

    fn changed(&self) -> &Changed {
        (**self).changed()
    }

    fn unbind(&self) {
        (**self).unbind();
    }
}

// ─── Constant ────────────────────────────────────────────────────────────

/// Endpoint over `value`. See [`Constant`].
#[must_use]
pub fn constant<V: Clone>(value: V) -> Constant<V> {
    Constant::new(value)
}

/// A fixed-value endpoint: reads clone the value, writes are dropped,
/// the change signal never fires.
#[derive(Clone)]
pub struct Constant<V> {
    value: V,
    changed: Changed,
}

impl<V: Clone> Constant<V> {
    #[must_use]
    pub fn new(value: V) -> Self {
        Self {
            value,
            changed: Changed::new(),
        }
    }
}

impl<V: Clone> Endpoint<V> for Constant<V> {
    fn get(&self) -> BindResult<V> {
        Ok(self.value.clone())
    }

    fn set(&self, _value: V) -> BindResult<()> {
        Ok(())
    }

    fn changed(&self) -> &Changed {
        &self.changed
    }
}

impl<V: fmt::Debug> fmt::Debug for Constant<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constant").field("value", &self.value).finish()
    }
}

// ─── FnEndpoint ──────────────────────────────────────────────────────────

/// Closure-driven endpoint over external state.
///
/// Missing closures follow the accessor contract: no getter reads the
/// default, no setter makes writes a no-op. After a successful write the
/// endpoint emits its change signal itself; supply the underlying system's
/// signal via [`with_changed`](FnEndpoint::with_changed) when external
/// mutations must also be observed.
pub struct FnEndpoint<V> {
    get: Option<Rc<dyn Fn() -> V>>,
    set: Option<Rc<dyn Fn(V)>>,
    default: V,
    changed: Changed,
}

impl<V: Clone + Default + 'static> FnEndpoint<V> {
    pub fn new(get: impl Fn() -> V + 'static, set: impl Fn(V) + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: Some(Rc::new(set)),
            default: V::default(),
            changed: Changed::new(),
        }
    }

    /// Endpoint whose writes are accepted and dropped.
    pub fn read_only(get: impl Fn() -> V + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: None,
            default: V::default(),
            changed: Changed::new(),
        }
    }

    /// Endpoint whose reads return the default.
    pub fn write_only(set: impl Fn(V) + 'static) -> Self {
        Self {
            get: None,
            set: Some(Rc::new(set)),
            default: V::default(),
            changed: Changed::new(),
        }
    }

    /// Overrides the value returned when no getter is present.
    #[must_use]
    pub fn with_default(mut self, value: V) -> Self {
        self.default = value;
        self
    }

    /// Uses `signal` as the endpoint's change signal instead of a private
    /// one, so changes the underlying system makes on its own are seen too.
    #[must_use]
    pub fn with_changed(mut self, signal: Changed) -> Self {
        self.changed = signal;
        self
    }
}

impl<V: Clone + Default + 'static> Endpoint<V> for FnEndpoint<V> {
    fn get(&self) -> BindResult<V> {
        Ok(self
            .get
            .as_ref()
            .map_or_else(|| self.default.clone(), |get| get()))
    }

    fn set(&self, value: V) -> BindResult<()> {
        let Some(set) = &self.set else {
            return Ok(());
        };
        set(value);
        self.changed.notify();
        Ok(())
    }

    fn changed(&self) -> &Changed {
        &self.changed
    }
}

impl<V: Clone> Clone for FnEndpoint<V> {
    fn clone(&self) -> Self {
        Self {
            get: self.get.clone(),
            set: self.set.clone(),
            default: self.default.clone(),
            changed: self.changed.clone(),
        }
    }
}

impl<V> fmt::Debug for FnEndpoint<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEndpoint")
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .finish()
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
