#![forbid(unsafe_code)]

//! Bindable type registration.
//!
//! Types opt into binding by name through the [`Model`] trait: `describe`
//! declares the type's bindable surface on a [`Schema`] builder, once per
//! process. [`Item`](crate::Item) construction triggers registration, so
//! by the time a named property is resolved the table is in place.
//!
//! The registry is the only process-wide state in the crate. Two maps,
//! both behind one `RwLock`: `TypeId` to type table, and
//! `(TypeId, name)` to memoized resolved slot. User code never runs under
//! the lock; `describe` builds the whole table first and the lock guards
//! plain map access only.
//!
//! # Invariants
//!
//! 1. `describe` runs at most once per type per process. Concurrent first
//!    registration is first-writer-wins.
//! 2. Resolution of `(type, name)` is memoized; repeat binds reuse the
//!    slot.
//! 3. Change-detection strategy is discovered per slot in fixed order:
//!    structured notifier, then a per-property named signal, then none.
//!
//! # Failure Modes
//!
//! | Case | Outcome |
//! |------|---------|
//! | type never described | `BindError::UnregisteredType` at resolve |
//! | name not declared | `BindError::UnknownProperty` at resolve |
//! | declared value type differs from requested | `BindError::ValueType` at first accessor use |
//! | duplicate name in one `describe` | panic at registration (programmer error) |

use std::any::{Any, TypeId, type_name};
use std::error::Error;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::AHashMap;

use crate::error::{BindError, BindResult};
use crate::host::HostCore;
use crate::notify::PropertySignal;
use crate::signal::Changed;

/// A type whose properties can be bound by name.
pub trait Model: Any {
    /// Declares the bindable surface. Runs at most once per process.
    fn describe(schema: &mut Schema<Self>)
    where
        Self: Sized;

    /// Host types (widgets, windows) return their embedded core here so
    /// items over them can carry a data context and a binding scope.
    fn host_core(&self) -> Option<&HostCore> {
        None
    }
}

/// How changes to a resolved property are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStrategy {
    /// The type publishes a structured `Signal<PropertyChange>`; attach
    /// goes through the change router.
    Structured,
    /// The type publishes a dedicated `Changed` signal for this property.
    NamedSignal,
    /// No notification; the property only syncs on demand.
    OnDemand,
}

// ─── hooks ───────────────────────────────────────────────────────────────

type GetHook = Box<dyn Fn(&dyn Any) -> Box<dyn Any> + Send + Sync>;
type SetHook = Box<dyn Fn(&mut dyn Any, Box<dyn Any>) -> Result<(), SetFailure> + Send + Sync>;
type NotifierHook = Arc<dyn Fn(&dyn Any) -> PropertySignal + Send + Sync>;
type ChangedHook = Arc<dyn Fn(&dyn Any) -> Changed + Send + Sync>;

/// Why a set hook refused a write.
pub(crate) enum SetFailure {
    /// The boxed value was not the registered value type.
    ValueType,
    /// The application setter rejected the value.
    Rejected(Box<dyn Error>),
}

pub(crate) struct PropertyVtable {
    pub(crate) value_type: &'static str,
    pub(crate) value_type_id: TypeId,
    pub(crate) get: GetHook,
    /// `None` for read-only properties: writes are accepted and dropped.
    pub(crate) set: Option<SetHook>,
}

struct TypeTable {
    type_name: &'static str,
    properties: AHashMap<&'static str, Arc<PropertyVtable>>,
    notifier: Option<NotifierHook>,
    changed: AHashMap<&'static str, ChangedHook>,
}

/// Memoized resolution of one `(type, name)` pair.
pub(crate) struct ResolvedSlot {
    pub(crate) type_name: &'static str,
    pub(crate) property: &'static str,
    pub(crate) vtable: Arc<PropertyVtable>,
    pub(crate) route: ChangeRoute,
}

pub(crate) enum ChangeRoute {
    Structured(NotifierHook),
    Named(ChangedHook),
    OnDemand,
}

impl ChangeRoute {
    pub(crate) fn strategy(&self) -> ChangeStrategy {
        match self {
            ChangeRoute::Structured(_) => ChangeStrategy::Structured,
            ChangeRoute::Named(_) => ChangeStrategy::NamedSignal,
            ChangeRoute::OnDemand => ChangeStrategy::OnDemand,
        }
    }
}

// ─── schema builder ──────────────────────────────────────────────────────

/// Builder handed to [`Model::describe`].
pub struct Schema<T: 'static> {
    type_name: &'static str,
    properties: AHashMap<&'static str, Arc<PropertyVtable>>,
    notifier: Option<NotifierHook>,
    changed: AHashMap<&'static str, ChangedHook>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: 'static> Schema<T> {
    fn new() -> Self {
        Self {
            type_name: type_name::<T>(),
            properties: AHashMap::new(),
            notifier: None,
            changed: AHashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Declares a read/write property with an infallible setter.
    ///
    /// Setter hooks only write state; after a framework-driven write the
    /// framework emits the discovered change signal itself.
    pub fn property<V: Clone + 'static>(
        &mut self,
        name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> &mut Self {
        self.try_property(name, get, move |t, v| {
            set(t, v);
            Ok::<(), std::convert::Infallible>(())
        })
    }

    /// Declares a read/write property whose setter can reject the value.
    /// Rejections surface as [`BindError::Propagation`] carrying `E`.
    pub fn try_property<V: Clone + 'static, E: Error + 'static>(
        &mut self,
        name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) -> Result<(), E> + Send + Sync + 'static,
    ) -> &mut Self {
        let set_hook: SetHook = Box::new(move |any, boxed| {
            let Some(target) = any.downcast_mut::<T>() else {
                unreachable!("resolved slot used with a different concrete type");
            };
            let value = match boxed.downcast::<V>() {
                Ok(v) => *v,
                Err(_) => return Err(SetFailure::ValueType),
            };
            set(target, value).map_err(|e| SetFailure::Rejected(Box::new(e)))
        });
        self.insert(name, get, Some(set_hook))
    }

    /// Declares a read-only property. Writes through a binding are
    /// accepted and dropped.
    pub fn read_only<V: Clone + 'static>(
        &mut self,
        name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
    ) -> &mut Self {
        self.insert(name, get, None)
    }

    /// Publishes the type's structured change signal. Properties without
    /// a dedicated named signal route their change subscriptions through
    /// it.
    pub fn notifier(
        &mut self,
        hook: impl Fn(&T) -> PropertySignal + Send + Sync + 'static,
    ) -> &mut Self {
        self.notifier = Some(Arc::new(move |any: &dyn Any| {
            let Some(target) = any.downcast_ref::<T>() else {
                unreachable!("resolved slot used with a different concrete type");
            };
            hook(target)
        }));
        self
    }

    /// Publishes a dedicated change signal for one property. When the
    /// type also registers a structured notifier, the notifier wins and
    /// this signal is not consulted.
    pub fn changed_signal(
        &mut self,
        name: &'static str,
        hook: impl Fn(&T) -> Changed + Send + Sync + 'static,
    ) -> &mut Self {
        let wrapped: ChangedHook = Arc::new(move |any: &dyn Any| {
            let Some(target) = any.downcast_ref::<T>() else {
                unreachable!("resolved slot used with a different concrete type");
            };
            hook(target)
        });
        self.changed.insert(name, wrapped);
        self
    }

    fn insert<V: Clone + 'static>(
        &mut self,
        name: &'static str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: Option<SetHook>,
    ) -> &mut Self {
        let get_hook: GetHook = Box::new(move |any| {
            let Some(target) = any.downcast_ref::<T>() else {
                unreachable!("resolved slot used with a different concrete type");
            };
            Box::new(get(target)) as Box<dyn Any>
        });
        let vtable = PropertyVtable {
            value_type: type_name::<V>(),
            value_type_id: TypeId::of::<V>(),
            get: get_hook,
            set,
        };
        if self.properties.insert(name, Arc::new(vtable)).is_some() {
            panic!(
                "duplicate bindable property `{name}` on type `{}`",
                self.type_name
            );
        }
        self
    }

    fn into_table(self) -> TypeTable {
        TypeTable {
            type_name: self.type_name,
            properties: self.properties,
            notifier: self.notifier,
            changed: self.changed,
        }
    }
}

// ─── registry ────────────────────────────────────────────────────────────

struct Registry {
    tables: AHashMap<TypeId, Arc<TypeTable>>,
    slots: AHashMap<(TypeId, &'static str), Arc<ResolvedSlot>>,
}

static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();

fn registry() -> &'static RwLock<Registry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(Registry {
            tables: AHashMap::new(),
            slots: AHashMap::new(),
        })
    })
}

// User code never runs under the lock, so a poisoned guard can only
// follow an allocation panic; the map contents stay coherent.
fn read_registry() -> RwLockReadGuard<'static, Registry> {
    match registry().read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_registry() -> RwLockWriteGuard<'static, Registry> {
    match registry().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Registers `T`'s schema if it is not registered yet. Items call this on
/// construction; calling it ahead of time is allowed and cheap.
pub fn ensure_registered<T: Model>() {
    let key = TypeId::of::<T>();
    if read_registry().tables.contains_key(&key) {
        return;
    }

    let mut schema = Schema::<T>::new();
    T::describe(&mut schema);
    let table = Arc::new(schema.into_table());

    let mut registry = write_registry();
    if registry.tables.contains_key(&key) {
        // Lost the race; the first writer's table stands.
        return;
    }
    tracing::debug!(
        type_name = table.type_name,
        properties = table.properties.len(),
        "registered bindable type"
    );
    registry.tables.insert(key, table);
}

/// Resolves `(type, name)` to its memoized slot.
pub(crate) fn resolve(
    type_id: TypeId,
    item_type_name: &'static str,
    property: &'static str,
) -> BindResult<Arc<ResolvedSlot>> {
    let memo_key = (type_id, property);
    if let Some(slot) = read_registry().slots.get(&memo_key) {
        return Ok(Arc::clone(slot));
    }

    let table = read_registry()
        .tables
        .get(&type_id)
        .cloned()
        .ok_or(BindError::UnregisteredType {
            type_name: item_type_name,
            property,
        })?;
    let vtable =
        table
            .properties
            .get(property)
            .cloned()
            .ok_or(BindError::UnknownProperty {
                type_name: table.type_name,
                property,
            })?;

    let route = if let Some(notifier) = &table.notifier {
        ChangeRoute::Structured(Arc::clone(notifier))
    } else if let Some(changed) = table.changed.get(property) {
        ChangeRoute::Named(Arc::clone(changed))
    } else {
        ChangeRoute::OnDemand
    };
    let slot = Arc::new(ResolvedSlot {
        type_name: table.type_name,
        property,
        vtable,
        route,
    });
    tracing::trace!(
        type_name = table.type_name,
        property,
        strategy = ?slot.route.strategy(),
        "resolved bindable property"
    );

    let mut registry = write_registry();
    let kept = registry.slots.entry(memo_key).or_insert(slot);
    Ok(Arc::clone(kept))
}

// ─── tests ───────────────────────────────────────────────────────────────
