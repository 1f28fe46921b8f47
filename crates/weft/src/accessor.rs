#![forbid(unsafe_code)]

//! Abstract property access.
//!
//! An [`Accessor`] reads, writes, and watches one logical property of an
//! [`Item`] without holding the item itself; the item arrives as an argument
//! on every call. Accessors are value-like descriptors: create one, reuse it
//! across any number of items.
//!
//! Two implementations live here. [`FnAccessor`] is the universal low-level
//! building block, driven entirely by caller-supplied closures; every other
//! accessor in the crate is expressible as one. [`ChildAccessor`] composes
//! an accessor yielding a nested item with an accessor over that item,
//! re-subscribing the inner level whenever the outer value changes.
//!
//! # Invariants
//!
//! 1. `get` with no item (or a missing getter) returns the configured
//!    default, never an error.
//! 2. `set` with no item (or a missing setter) is an `Ok` no-op: a
//!    read-only binding is a configuration, not a failure.
//! 3. `attach` is optional capability; accessors over change-silent state
//!    return an inert token.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::BindResult;
use crate::item::Item;
use crate::signal::{Changed, Subscription};

/// Reads, writes, and watches one property of an item supplied per call.
///
/// Setter hooks only write state. After a successful framework-driven write
/// the framework emits the associated change signal itself, when it knows
/// one; application code mutating state directly emits the signal after
/// releasing its borrow.
pub trait Accessor<V> {
    /// Current value on `item`; the configured default when `item` is
    /// `None`.
    fn get(&self, item: Option<&Item>) -> BindResult<V>;

    /// Writes `value` to `item`. A `None` item is an `Ok` no-op.
    fn set(&self, item: Option<&Item>, value: V) -> BindResult<()>;

    /// Subscribes `on_change` to the property's change notifications.
    ///
    /// Accessors without a change capability return an inert token; the
    /// property then only syncs on demand.
    fn attach(&self, item: Option<&Item>, on_change: Rc<dyn Fn()>) -> BindResult<Subscription> {
        let _ = (item, on_change);
        Ok(Subscription::inert())
    }
}

impl<V, A: Accessor<V> + ?Sized> Accessor<V> for Rc<A> {
    fn get(&self, item: Option<&Item>) -> BindResult<V> {
        (**self).get(item)
    }

    fn set(&self, item: Option<&Item>, value: V) -> BindResult<()> {
        (**self).set(item, value)
    }

    fn attach(&self, item: Option<&Item>, on_change: Rc<dyn Fn()>) -> BindResult<Subscription> {
        (**self).attach(item, on_change)
    }
}

// ─── FnAccessor ──────────────────────────────────────────────────────────

type WatchHook<T> = Rc<dyn Fn(&T) -> Changed>;
type AttachHook<T> = Rc<dyn Fn(&T, Rc<dyn Fn()>) -> Subscription>;

/// Closure-driven accessor over items of concrete type `T`.
///
/// Any combination of the four hooks may be present. Missing hooks follow
/// the trait contract: no getter means `get` returns the default, no setter
/// makes writes a no-op, no change hook makes `attach` inert.
pub struct FnAccessor<T: 'static, V> {
    get: Option<Rc<dyn Fn(&T) -> V>>,
    set: Option<Rc<dyn Fn(&mut T, V)>>,
    watch: Option<WatchHook<T>>,
    attach_with: Option<AttachHook<T>>,
    default: V,
}

impl<T: 'static, V: Clone + Default + 'static> FnAccessor<T, V> {
    /// Read/write accessor from a getter and a setter.
    pub fn new(get: impl Fn(&T) -> V + 'static, set: impl Fn(&mut T, V) + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: Some(Rc::new(set)),
            watch: None,
            attach_with: None,
            default: V::default(),
        }
    }

    /// Accessor whose writes are accepted and dropped.
    pub fn read_only(get: impl Fn(&T) -> V + 'static) -> Self {
        Self {
            get: Some(Rc::new(get)),
            set: None,
            watch: None,
            attach_with: None,
            default: V::default(),
        }
    }

    /// Accessor whose reads return the default.
    pub fn write_only(set: impl Fn(&mut T, V) + 'static) -> Self {
        Self {
            get: None,
            set: Some(Rc::new(set)),
            watch: None,
            attach_with: None,
            default: V::default(),
        }
    }

    /// Overrides the value returned for a missing item or getter.
    #[must_use]
    pub fn with_default(mut self, value: V) -> Self {
        self.default = value;
        self
    }

    /// Supplies the change signal owned by `T`. The framework emits it
    /// after its own successful writes; `attach` subscribes to it.
    #[must_use]
    pub fn watch(mut self, hook: impl Fn(&T) -> Changed + 'static) -> Self {
        self.watch = Some(Rc::new(hook));
        self
    }

    /// Raw attach hook for state with a foreign subscription system. On
    /// this path the underlying system owns all notification; the
    /// framework emits nothing after its writes.
    #[must_use]
    pub fn attach_with(
        mut self,
        hook: impl Fn(&T, Rc<dyn Fn()>) -> Subscription + 'static,
    ) -> Self {
        self.attach_with = Some(Rc::new(hook));
        self
    }
}

impl<T: 'static, V: Clone + Default + 'static> Accessor<V> for FnAccessor<T, V> {
    fn get(&self, item: Option<&Item>) -> BindResult<V> {
        let value = match (item, &self.get) {
            (Some(item), Some(get)) => item.with(|t: &T| get(t)),
            _ => None,
        };
        Ok(value.unwrap_or_else(|| self.default.clone()))
    }

    fn set(&self, item: Option<&Item>, value: V) -> BindResult<()> {
        let (Some(item), Some(set)) = (item, &self.set) else {
            return Ok(());
        };
        if item.with_mut(|t: &mut T| set(t, value)).is_none() {
            return Ok(());
        }
        if self.attach_with.is_none()
            && let Some(watch) = &self.watch
            && let Some(signal) = item.with(|t: &T| watch(t))
        {
            // Emitted after the mutable borrow is released.
            signal.notify();
        }
        Ok(())
    }

    fn attach(&self, item: Option<&Item>, on_change: Rc<dyn Fn()>) -> BindResult<Subscription> {
        let Some(item) = item else {
            return Ok(Subscription::inert());
        };
        if let Some(hook) = &self.attach_with {
            let sub = item.with(|t: &T| hook(t, Rc::clone(&on_change)));
            return Ok(sub.unwrap_or_else(Subscription::inert));
        }
        if let Some(watch) = &self.watch
            && let Some(signal) = item.with(|t: &T| watch(t))
        {
            return Ok(signal.subscribe(move |()| on_change()));
        }
        Ok(Subscription::inert())
    }
}

impl<T: 'static, V: Clone> Clone for FnAccessor<T, V> {
    fn clone(&self) -> Self {
        Self {
            get: self.get.clone(),
            set: self.set.clone(),
            watch: self.watch.clone(),
            attach_with: self.attach_with.clone(),
            default: self.default.clone(),
        }
    }
}

impl<T: 'static, V> fmt::Debug for FnAccessor<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAccessor")
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .field("watch", &self.watch.is_some())
            .field("attach_with", &self.attach_with.is_some())
            .finish()
    }
}

// ─── ChildAccessor ───────────────────────────────────────────────────────

/// Builds nested-path accessors from an accessor yielding a child item.
pub trait AccessorExt: Accessor<Option<Item>> + Sized + 'static {
    /// Composes `self` with `inner` into an accessor over the nested
    /// property. `attach` watches both levels: when the child item is
    /// replaced, the inner subscription moves to the new child and the
    /// composed callback fires.
    fn child<U: 'static>(self, inner: impl Accessor<U> + 'static) -> ChildAccessor<U> {
        ChildAccessor {
            outer: Rc::new(self),
            inner: Rc::new(inner),
            _marker: PhantomData,
        }
    }
}

impl<A: Accessor<Option<Item>> + 'static> AccessorExt for A {}

/// Accessor over a property of a child item. See [`AccessorExt::child`].
pub struct ChildAccessor<U> {
    outer: Rc<dyn Accessor<Option<Item>>>,
    inner: Rc<dyn Accessor<U>>,
    _marker: PhantomData<fn() -> U>,
}

impl<U: 'static> Accessor<U> for ChildAccessor<U> {
    fn get(&self, item: Option<&Item>) -> BindResult<U> {
        let child = self.outer.get(item)?;
        self.inner.get(child.as_ref())
    }

    fn set(&self, item: Option<&Item>, value: U) -> BindResult<()> {
        let child = self.outer.get(item)?;
        self.inner.set(child.as_ref(), value)
    }

    fn attach(&self, item: Option<&Item>, on_change: Rc<dyn Fn()>) -> BindResult<Subscription> {
        let child = self.outer.get(item)?;
        let held = Rc::new(RefCell::new(Some(
            self.inner.attach(child.as_ref(), Rc::clone(&on_change))?,
        )));

        let outer = Rc::clone(&self.outer);
        let inner = Rc::clone(&self.inner);
        let root = item.cloned();
        let slot = Rc::clone(&held);
        let outer_sub = self.outer.attach(
            item,
            Rc::new(move || {
                // The outer value may now be a different child; move the
                // inner subscription before telling the consumer.
                slot.borrow_mut().take();
                let child = match outer.get(root.as_ref()) {
                    Ok(child) => child,
                    Err(err) => panic!("nested binding lost its child item: {err}"),
                };
                match inner.attach(child.as_ref(), Rc::clone(&on_change)) {
                    Ok(sub) => *slot.borrow_mut() = Some(sub),
                    Err(err) => panic!("nested binding could not re-subscribe: {err}"),
                }
                on_change();
            }),
        )?;

        Ok(outer_sub.and(Subscription::new(move || {
            held.borrow_mut().take();
        })))
    }
}

impl<U> Clone for ChildAccessor<U> {
    fn clone(&self) -> Self {
        Self {
            outer: Rc::clone(&self.outer),
            inner: Rc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}

impl<U> fmt::Debug for ChildAccessor<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildAccessor").finish()
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, Schema};
    use std::cell::Cell;

    #[derive(Default)]
    struct Counter {
        value: u32,
        tick: Changed,
    }

    impl Model for Counter {
        fn describe(_schema: &mut Schema<Self>) {}
    }

    fn value_accessor() -> FnAccessor<Counter, u32> {
        FnAccessor::new(|c: &Counter| c.value, |c, v| c.value = v)
    }

    #[test]
    fn get_set_roundtrip() {
        let item = Item::new(Counter::default());
        let acc = value_accessor();

        acc.set(Some(&item), 11).unwrap();
        assert_eq!(acc.get(Some(&item)).unwrap(), 11);
    }

    #[test]
    fn missing_item_reads_the_default() {
        let acc = value_accessor().with_default(7);
        assert_eq!(acc.get(None).unwrap(), 7);
        acc.set(None, 99).unwrap();
    }

    #[test]
    fn read_only_drops_writes() {
        let item = Item::new(Counter {
            value: 3,
            ..Counter::default()
        });
        let acc: FnAccessor<Counter, u32> = FnAccessor::read_only(|c: &Counter| c.value);

        acc.set(Some(&item), 99).unwrap();
        assert_eq!(acc.get(Some(&item)).unwrap(), 3);
    }

    #[test]
    fn write_only_reads_the_default() {
        let item = Item::new(Counter::default());
        let acc: FnAccessor<Counter, u32> =
            FnAccessor::write_only(|c: &mut Counter, v| c.value = v).with_default(5);

        acc.set(Some(&item), 8).unwrap();
        assert_eq!(item.with(|c: &Counter| c.value), Some(8));
        assert_eq!(acc.get(Some(&item)).unwrap(), 5);
    }

    #[test]
    fn wrong_item_type_reads_default_and_drops_writes() {
        #[derive(Default)]
        struct Other;
        impl Model for Other {
            fn describe(_schema: &mut Schema<Self>) {}
        }

        let item = Item::new(Other);
        let acc = value_accessor().with_default(1);
        assert_eq!(acc.get(Some(&item)).unwrap(), 1);
        acc.set(Some(&item), 9).unwrap();
    }

    #[test]
    fn framework_write_emits_the_watched_signal() {
        let item = Item::new(Counter::default());
        let tick = item.with(|c: &Counter| c.tick.clone()).unwrap();
        let acc = value_accessor().watch(|c: &Counter| c.tick.clone());

        let hits = Rc::new(Cell::new(0u32));
        let h = hits.clone();
        let _sub = acc
            .attach(Some(&item), Rc::new(move || h.set(h.get() + 1)))
            .unwrap();

        acc.set(Some(&item), 4).unwrap();
        assert_eq!(hits.get(), 1);

        // Application writes emit the signal themselves.
        item.with_mut(|c: &mut Counter| c.value = 5);
        tick.notify();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn attach_without_change_capability_is_inert() {
        let item = Item::new(Counter::default());
        let acc = value_accessor();
        let sub = acc.attach(Some(&item), Rc::new(|| {})).unwrap();
        assert!(sub.is_inert());
    }

    #[test]
    fn attach_with_hook_owns_notification() {
        let item = Item::new(Counter::default());
        let tick = item.with(|c: &Counter| c.tick.clone()).unwrap();
        let acc = value_accessor()
            .attach_with(|c: &Counter, on_change| c.tick.subscribe(move |()| on_change()));

        let hits = Rc::new(Cell::new(0u32));
        let h = hits.clone();
        let _sub = acc
            .attach(Some(&item), Rc::new(move || h.set(h.get() + 1)))
            .unwrap();

        // The framework does not double-notify on its own writes.
        acc.set(Some(&item), 2).unwrap();
        assert_eq!(hits.get(), 0);

        tick.notify();
        assert_eq!(hits.get(), 1);
    }

    // ─── child composition ───────────────────────────────────────────────

    #[derive(Default)]
    struct Holder {
        child: Option<Item>,
        tick: Changed,
    }

    impl Model for Holder {
        fn describe(_schema: &mut Schema<Self>) {}
    }

    fn holder_accessor() -> FnAccessor<Holder, Option<Item>> {
        FnAccessor::new(|h: &Holder| h.child.clone(), |h, v| h.child = v)
            .watch(|h: &Holder| h.tick.clone())
    }

    #[test]
    fn child_reads_and_writes_through_the_nested_item() {
        let leaf = Item::new(Counter {
            value: 10,
            ..Counter::default()
        });
        let root = Item::new(Holder {
            child: Some(leaf.clone()),
            ..Holder::default()
        });

        let nested = holder_accessor().child(value_accessor());
        assert_eq!(nested.get(Some(&root)).unwrap(), 10);

        nested.set(Some(&root), 20).unwrap();
        assert_eq!(leaf.with(|c: &Counter| c.value), Some(20));
    }

    #[test]
    fn child_with_no_current_item_reads_the_inner_default() {
        let root = Item::new(Holder::default());
        let nested = holder_accessor().child(value_accessor().with_default(42));
        assert_eq!(nested.get(Some(&root)).unwrap(), 42);
        nested.set(Some(&root), 1).unwrap();
    }

    #[test]
    fn child_resubscribes_when_the_outer_value_changes() {
        let first = Item::new(Counter::default());
        let first_tick = first.with(|c: &Counter| c.tick.clone()).unwrap();
        let root = Item::new(Holder {
            child: Some(first.clone()),
            ..Holder::default()
        });

        let nested =
            holder_accessor().child(value_accessor().watch(|c: &Counter| c.tick.clone()));
        let hits = Rc::new(Cell::new(0u32));
        let h = hits.clone();
        let _sub = nested
            .attach(Some(&root), Rc::new(move || h.set(h.get() + 1)))
            .unwrap();

        first_tick.notify();
        assert_eq!(hits.get(), 1);

        // Swap the child through the outer accessor: composed callback
        // fires once for the swap itself.
        let second = Item::new(Counter::default());
        let second_tick = second.with(|c: &Counter| c.tick.clone()).unwrap();
        holder_accessor()
            .set(Some(&root), Some(second.clone()))
            .unwrap();
        assert_eq!(hits.get(), 2);

        // The old child is silent, the new one is live.
        first_tick.notify();
        assert_eq!(hits.get(), 2);
        second_tick.notify();
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn detaching_a_child_attachment_silences_both_levels() {
        let leaf = Item::new(Counter::default());
        let leaf_tick = leaf.with(|c: &Counter| c.tick.clone()).unwrap();
        let root = Item::new(Holder {
            child: Some(leaf),
            ..Holder::default()
        });
        let root_tick = root.with(|h: &Holder| h.tick.clone()).unwrap();

        let nested =
            holder_accessor().child(value_accessor().watch(|c: &Counter| c.tick.clone()));
        let hits = Rc::new(Cell::new(0u32));
        let h = hits.clone();
        let sub = nested
            .attach(Some(&root), Rc::new(move || h.set(h.get() + 1)))
            .unwrap();

        sub.unbind();
        leaf_tick.notify();
        root_tick.notify();
        assert_eq!(hits.get(), 0);
    }
}
