#![forbid(unsafe_code)]

//! Structured change notification and the change router.
//!
//! Types that publish one [`PropertySignal`] for all of their properties
//! (the structured strategy) do not get one subscription per bound
//! property. The [`router`](self) keeps exactly one upstream subscription
//! per item and fans each [`PropertyChange`] out to the consumers
//! registered for that name.
//!
//! The router is a thread-local singleton, matching the crate's
//! single-threaded contract; two threads get independent routers.
//!
//! # Invariants
//!
//! 1. At most one upstream subscription per item, attached on first use.
//! 2. Consumers are tracked by token: duplicate callbacks for one name
//!    coexist, and removal only removes the token's own entry.
//! 3. The upstream subscription is torn down when the item's last
//!    consumer is removed.
//! 4. Fan-out snapshots the consumer list first: consumers may detach or
//!    subscribe during dispatch.
//! 5. Detach after thread-local teardown is a no-op.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::BindResult;
use crate::item::{Item, ItemId};
use crate::model::{self, ChangeRoute, ResolvedSlot};
use crate::signal::{Signal, Subscription};

/// Payload of a structured change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyChange {
    pub name: &'static str,
}

/// Signal a type publishes once for all of its properties.
pub type PropertySignal = Signal<PropertyChange>;

impl Signal<PropertyChange> {
    /// Emits a change for one property name.
    pub fn notify(&self, name: &'static str) {
        self.emit(&PropertyChange { name });
    }
}

/// Live router counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouterStats {
    /// Items with an active upstream subscription.
    pub items: usize,
    /// Registered consumer callbacks across all items and names.
    pub consumers: usize,
}

thread_local! {
    static ROUTER: ChangeRouter = ChangeRouter::new();
}

/// Subscribes `callback` to changes of `property` on `item`, routed
/// through whatever change capability the item's type registered. Types
/// without one get an inert token.
pub fn subscribe(
    item: &Item,
    property: &'static str,
    callback: impl Fn() + 'static,
) -> BindResult<Subscription> {
    let slot = model::resolve(item.type_id(), item.type_name(), property)?;
    Ok(attach_route(item, &slot, Rc::new(callback)))
}

/// This thread's router counters.
#[must_use]
pub fn stats() -> RouterStats {
    ROUTER.try_with(ChangeRouter::stats).unwrap_or_default()
}

/// Attaches `callback` along the slot's discovered change route.
pub(crate) fn attach_route(
    item: &Item,
    slot: &ResolvedSlot,
    callback: Rc<dyn Fn()>,
) -> Subscription {
    match &slot.route {
        ChangeRoute::Structured(hook) => {
            let signal = item.with_any(|any| hook(any));
            ROUTER.with(|router| router.watch(item.id(), &signal, slot.property, callback))
        }
        ChangeRoute::Named(hook) => {
            let changed = item.with_any(|any| hook(any));
            changed.subscribe(move |()| callback())
        }
        ChangeRoute::OnDemand => {
            tracing::trace!(
                type_name = slot.type_name,
                property = slot.property,
                "no change capability; property syncs on demand"
            );
            Subscription::inert()
        }
    }
}

// ─── router ──────────────────────────────────────────────────────────────

struct Consumer {
    token: u64,
    callback: Rc<dyn Fn()>,
}

type ConsumerMap = AHashMap<&'static str, Vec<Consumer>>;

struct RouterEntry {
    /// Keeps the upstream callback alive; dropping it detaches.
    _upstream: Subscription,
    consumers: Rc<RefCell<ConsumerMap>>,
}

struct ChangeRouter {
    entries: RefCell<AHashMap<ItemId, RouterEntry>>,
    next_token: Cell<u64>,
}

impl ChangeRouter {
    fn new() -> Self {
        Self {
            entries: RefCell::new(AHashMap::new()),
            next_token: Cell::new(0),
        }
    }

    fn watch(
        &self,
        id: ItemId,
        signal: &PropertySignal,
        name: &'static str,
        callback: Rc<dyn Fn()>,
    ) -> Subscription {
        let token = self.next_token.get();
        self.next_token.set(token + 1);

        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(id).or_insert_with(|| {
            let consumers: Rc<RefCell<ConsumerMap>> = Rc::new(RefCell::new(AHashMap::new()));
            let fan = Rc::clone(&consumers);
            let upstream = signal.subscribe(move |change: &PropertyChange| {
                // Snapshot before calling out; consumers may detach or
                // subscribe during dispatch.
                let snapshot: Vec<Rc<dyn Fn()>> = fan
                    .borrow()
                    .get(change.name)
                    .map(|list| list.iter().map(|c| Rc::clone(&c.callback)).collect())
                    .unwrap_or_default();
                for consumer in snapshot {
                    consumer();
                }
            });
            tracing::trace!(item = ?id, "router attached upstream subscription");
            RouterEntry {
                _upstream: upstream,
                consumers,
            }
        });
        entry
            .consumers
            .borrow_mut()
            .entry(name)
            .or_default()
            .push(Consumer { token, callback });

        Subscription::new(move || release(id, name, token))
    }

    fn remove(&self, id: ItemId, name: &'static str, token: u64) {
        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries.get_mut(&id) else {
            return;
        };
        let now_empty = {
            let mut consumers = entry.consumers.borrow_mut();
            if let Some(list) = consumers.get_mut(name) {
                list.retain(|c| c.token != token);
                if list.is_empty() {
                    consumers.remove(name);
                }
            }
            consumers.is_empty()
        };
        if now_empty {
            entries.remove(&id);
            tracing::trace!(item = ?id, "router released upstream subscription");
        }
    }

    fn stats(&self) -> RouterStats {
        let entries = self.entries.borrow();
        RouterStats {
            items: entries.len(),
            consumers: entries
                .values()
                .map(|e| e.consumers.borrow().values().map(Vec::len).sum::<usize>())
                .sum(),
        }
    }
}

fn release(id: ItemId, name: &'static str, token: u64) {
    // The router may already be gone during thread teardown.
    let _ = ROUTER.try_with(|router| router.remove(id, name, token));
}

// ─── tests ───────────────────────────────────────────────────────────────
