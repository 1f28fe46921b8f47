#![forbid(unsafe_code)]

//! Named property access.
//!
//! [`Property`] is an [`Accessor`] that resolves a property by name against
//! whatever item it is handed, using the type's registered schema (see
//! [`crate::model`]). Resolution of a `(type, name)` pair happens once per
//! process and is memoized; repeat binds of the same property across many
//! instances of one type reuse the slot.
//!
//! A mistyped name is a programmer error and fails loud at first use:
//! `get`/`set`/`attach` return the resolution errors of
//! [`crate::error::BindError`], naming both the type and the property.

use std::any::{TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use crate::accessor::Accessor;
use crate::error::{BindError, BindResult};
use crate::item::Item;
use crate::model::{self, ChangeRoute, ChangeStrategy, ResolvedSlot, SetFailure};
use crate::notify;
use crate::signal::Subscription;

/// Shorthand for [`Property::new`].
#[must_use]
pub fn prop<V: 'static>(name: &'static str) -> Property<V> {
    Property::new(name)
}

/// Accessor resolving `name` on the runtime type of each item it is given.
pub struct Property<V> {
    name: &'static str,
    _marker: PhantomData<fn() -> V>,
}

impl<V: 'static> Property<V> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// How changes to this property on `item`'s type are detected.
    /// Diagnostic surface; bindings pick the strategy up automatically.
    pub fn strategy(&self, item: &Item) -> BindResult<ChangeStrategy> {
        self.slot(item).map(|slot| slot.route.strategy())
    }

    fn slot(&self, item: &Item) -> BindResult<Arc<ResolvedSlot>> {
        model::resolve(item.type_id(), item.type_name(), self.name)
    }

    fn check_value_type(&self, slot: &ResolvedSlot) -> BindResult<()> {
        if slot.vtable.value_type_id == TypeId::of::<V>() {
            return Ok(());
        }
        Err(BindError::ValueType {
            type_name: slot.type_name,
            property: slot.property,
            requested: type_name::<V>(),
            registered: slot.vtable.value_type,
        })
    }
}

impl<V: Default + 'static> Accessor<V> for Property<V> {
    fn get(&self, item: Option<&Item>) -> BindResult<V> {
        let Some(item) = item else {
            return Ok(V::default());
        };
        let slot = self.slot(item)?;
        self.check_value_type(&slot)?;
        let boxed = item.with_any(|any| (slot.vtable.get)(any));
        match boxed.downcast::<V>() {
            Ok(value) => Ok(*value),
            Err(_) => unreachable!("slot value type checked before the get hook ran"),
        }
    }

    fn set(&self, item: Option<&Item>, value: V) -> BindResult<()> {
        let Some(item) = item else {
            return Ok(());
        };
        let slot = self.slot(item)?;
        self.check_value_type(&slot)?;
        let Some(set) = &slot.vtable.set else {
            // Read-only property: the write is accepted and dropped.
            return Ok(());
        };
        let outcome = item.with_any_mut(|any| set(any, Box::new(value)));
        match outcome {
            Ok(()) => {
                emit_route(item, &slot);
                Ok(())
            }
            Err(SetFailure::ValueType) => Err(BindError::ValueType {
                type_name: slot.type_name,
                property: slot.property,
                requested: type_name::<V>(),
                registered: slot.vtable.value_type,
            }),
            Err(SetFailure::Rejected(source)) => Err(BindError::Propagation {
                type_name: Some(slot.type_name),
                property: Some(slot.property),
                source,
            }),
        }
    }

    fn attach(&self, item: Option<&Item>, on_change: Rc<dyn Fn()>) -> BindResult<Subscription> {
        let Some(item) = item else {
            return Ok(Subscription::inert());
        };
        let slot = self.slot(item)?;
        Ok(notify::attach_route(item, &slot, on_change))
    }
}

/// Emits the slot's change signal after a framework write. Runs with no
/// borrow of the item held.
fn emit_route(item: &Item, slot: &ResolvedSlot) {
    match &slot.route {
        ChangeRoute::Structured(hook) => {
            let signal = item.with_any(|any| hook(any));
            signal.notify(slot.property);
        }
        ChangeRoute::Named(hook) => {
            let changed = item.with_any(|any| hook(any));
            changed.notify();
        }
        ChangeRoute::OnDemand => {}
    }
}

impl<V> Clone for Property<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Property<V> {}

impl<V> fmt::Debug for Property<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property").field("name", &self.name).finish()
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, Schema};
    use crate::notify::PropertySignal;
    use crate::signal::Changed;
    use std::cell::Cell;
    use std::error::Error;

    #[derive(Default)]
    struct Track {
        title: String,
        plays: u32,
        rating: u8,
        props: PropertySignal,
    }

    #[derive(Debug)]
    struct BadRating(u8);

    impl fmt::Display for BadRating {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "rating {} out of range", self.0)
        }
    }

    impl Error for BadRating {}

    impl Model for Track {
        fn describe(schema: &mut Schema<Self>) {
            schema
                .property("title", |t: &Track| t.title.clone(), |t, v| t.title = v)
                .read_only("plays", |t: &Track| t.plays)
                .try_property(
                    "rating",
                    |t: &Track| t.rating,
                    |t, v: u8| {
                        if v > 5 {
                            return Err(BadRating(v));
                        }
                        t.rating = v;
                        Ok(())
                    },
                )
                .notifier(|t: &Track| t.props.clone());
        }
    }

    #[derive(Default)]
    struct Dial {
        level: u32,
        level_changed: Changed,
    }

    impl Model for Dial {
        fn describe(schema: &mut Schema<Self>) {
            schema
                .property("level", |d: &Dial| d.level, |d, v| d.level = v)
                .changed_signal("level", |d: &Dial| d.level_changed.clone());
        }
    }

    #[test]
    fn named_get_set_roundtrip() {
        let item = Item::new(Track::default());
        let title = prop::<String>("title");

        title.set(Some(&item), "Hole in the Sky".into()).unwrap();
        assert_eq!(title.get(Some(&item)).unwrap(), "Hole in the Sky");
    }

    #[test]
    fn missing_item_yields_default_and_noop() {
        let title = prop::<String>("title");
        assert_eq!(title.get(None).unwrap(), "");
        title.set(None, "x".into()).unwrap();
        assert!(title.attach(None, Rc::new(|| {})).unwrap().is_inert());
    }

    #[test]
    fn unknown_property_names_type_and_property() {
        let item = Item::new(Track::default());
        let err = prop::<String>("subtitle").get(Some(&item)).unwrap_err();
        assert!(matches!(err, BindError::UnknownProperty { .. }));
        assert!(err.to_string().contains("Track"));
        assert!(err.to_string().contains("subtitle"));
    }

    #[test]
    fn value_type_mismatch_is_a_resolution_error() {
        let item = Item::new(Track::default());
        let err = prop::<u64>("plays").get(Some(&item)).unwrap_err();
        assert!(matches!(err, BindError::ValueType { .. }));
        assert!(err.is_resolution());
    }

    #[test]
    fn read_only_property_drops_writes() {
        let item = Item::new(Track {
            plays: 12,
            ..Track::default()
        });
        let plays = prop::<u32>("plays");
        plays.set(Some(&item), 99).unwrap();
        assert_eq!(plays.get(Some(&item)).unwrap(), 12);
    }

    #[test]
    fn rejected_write_surfaces_the_application_error() {
        let item = Item::new(Track::default());
        let rating = prop::<u8>("rating");

        rating.set(Some(&item), 4).unwrap();
        let err = rating.set(Some(&item), 9).unwrap_err();
        assert_eq!(err.source_as::<BadRating>().map(|e| e.0), Some(9));
        assert_eq!(rating.get(Some(&item)).unwrap(), 4);
    }

    #[test]
    fn framework_write_emits_the_structured_signal() {
        let item = Item::new(Track::default());
        let title = prop::<String>("title");
        let hits = Rc::new(Cell::new(0u32));

        let h = hits.clone();
        let _sub = title
            .attach(Some(&item), Rc::new(move || h.set(h.get() + 1)))
            .unwrap();

        title.set(Some(&item), "Planet Caravan".into()).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn framework_write_emits_the_named_signal() {
        let item = Item::new(Dial::default());
        let level = prop::<u32>("level");
        let hits = Rc::new(Cell::new(0u32));

        let h = hits.clone();
        let _sub = level
            .attach(Some(&item), Rc::new(move || h.set(h.get() + 1)))
            .unwrap();

        level.set(Some(&item), 8).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(level.get(Some(&item)).unwrap(), 8);
    }

    #[test]
    fn rejected_write_does_not_notify() {
        let item = Item::new(Track::default());
        let rating = prop::<u8>("rating");
        let hits = Rc::new(Cell::new(0u32));

        let h = hits.clone();
        let _sub = rating
            .attach(Some(&item), Rc::new(move || h.set(h.get() + 1)))
            .unwrap();

        let _ = rating.set(Some(&item), 200);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn strategy_is_observable() {
        let track = Item::new(Track::default());
        let dial = Item::new(Dial::default());

        assert_eq!(
            prop::<String>("title").strategy(&track).unwrap(),
            ChangeStrategy::Structured
        );
        assert_eq!(
            prop::<u32>("level").strategy(&dial).unwrap(),
            ChangeStrategy::NamedSignal
        );
    }

    #[test]
    fn properties_are_copyable_descriptors() {
        let title = prop::<String>("title");
        let alias = title;
        let item = Item::new(Track::default());

        alias.set(Some(&item), "Embryo".into()).unwrap();
        assert_eq!(title.get(Some(&item)).unwrap(), "Embryo");
    }
}
