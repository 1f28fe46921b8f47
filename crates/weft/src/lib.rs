#![forbid(unsafe_code)]

//! Data-binding and change-propagation core for UI toolkits.
//!
//! `weft` keeps two stateful endpoints — a view-model property, a widget
//! attribute, a computed value — synchronized without either side knowing
//! about the other's concrete type:
//!
//! - [`Accessor`]: reads, writes, and watches one property of an [`Item`]
//!   supplied per call. [`Property`] resolves by name against a registered
//!   [`Model`] schema; [`FnAccessor`] is the closure-driven building block.
//! - [`Endpoint`]: a self-contained bindable value. [`Bound`] pairs an
//!   accessor with a rebindable item; [`constant`] and [`FnEndpoint`] are
//!   the free-standing factories.
//! - [`Link`]: the synchronization engine between two endpoints, with four
//!   [`LinkMode`]s and echo suppression via an explicit two-state machine.
//! - [`HostCore`] / [`HostBinding`]: the contract for context-carrying
//!   host objects (widgets, windows) and the per-property bind/transform
//!   surface on top of it.
//! - [`Command`]: the triggerable-action contract.
//!
//! # Architecture
//!
//! Single-threaded by contract: every handle is built on `Rc`/`RefCell`
//! and is `!Send`. The only process-wide state is the type registry
//! ([`model`]), which user code never runs under; the change router
//! ([`notify`]) is thread-local. There is no queueing or coalescing — an
//! update is a synchronous read-then-write on the caller's thread.
//!
//! # Invariants
//!
//! 1. Resolution failures (unknown type, unknown property, wrong value
//!    type) fail loud at first use, naming the type and the property.
//! 2. One external write propagates across a link exactly once; the
//!    write's own echo never re-enters propagation.
//! 3. Replacing a bound item always detaches the old subscription before
//!    attaching the new one: stale items never keep notifying.
//! 4. Unbinding anything twice is a no-op, never an error.

pub mod accessor;
pub mod bound;
pub mod command;
pub mod endpoint;
pub mod error;
pub mod host;
pub mod item;
pub mod link;
pub mod model;
pub mod notify;
pub mod property;
pub mod signal;

pub use accessor::{Accessor, AccessorExt, ChildAccessor, FnAccessor};
pub use bound::Bound;
pub use command::{Command, FnCommand, invoke};
pub use endpoint::{Constant, Endpoint, FnEndpoint, constant};
pub use error::{BindError, BindResult};
pub use host::{BindingScope, HostBinding, HostCore};
pub use item::{Item, ItemId};
pub use link::{Direction, Link, LinkMode};
pub use model::{ChangeStrategy, Model, Schema};
pub use notify::{PropertyChange, PropertySignal, RouterStats};
pub use property::{Property, prop};
pub use signal::{Changed, Signal, Subscription, Unbind};

/// The common surface, for glob import in application code.
pub mod prelude {
    pub use crate::accessor::{Accessor, AccessorExt, FnAccessor};
    pub use crate::bound::Bound;
    pub use crate::command::{Command, FnCommand, invoke};
    pub use crate::endpoint::{Endpoint, FnEndpoint, constant};
    pub use crate::error::{BindError, BindResult};
    pub use crate::host::{HostBinding, HostCore};
    pub use crate::item::Item;
    pub use crate::link::{Direction, Link, LinkMode};
    pub use crate::model::{Model, Schema};
    pub use crate::notify::PropertySignal;
    pub use crate::property::{Property, prop};
    pub use crate::signal::{Changed, Subscription, Unbind};
}
