#![forbid(unsafe_code)]

//! Notification primitives.
//!
//! - [`Signal`]: a shared emitter delivering a borrowed payload to
//!   subscriber callbacks.
//! - [`Changed`]: payload-free alias used for "this value changed" events.
//! - [`Subscription`]: RAII guard that detaches its callback on drop.
//! - [`Unbind`]: the severable-binding trait shared by subscriptions,
//!   links, and scopes.
//!
//! # Architecture
//!
//! `Signal<A>` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Subscribers are stored as `Weak` function pointers; the strong callback
//! is owned by the returned [`Subscription`], so detaching never mutates
//! the signal and is safe at any point, including mid-emission. Dead
//! entries are pruned lazily during emission.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. Emission iterates a snapshot: callbacks may subscribe, detach, or
//!    re-emit the same signal without corrupting the list. A callback
//!    detached mid-emission still receives the in-flight payload; it is
//!    gone by the next emission.
//! 3. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle. Explicit [`Subscription::unbind`] is idempotent.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Severs a binding or subscription, leaving it permanently inert.
///
/// Implementations must be idempotent: a second call is a no-op, and
/// unbinding something whose underlying source is already gone must not
/// fail.
pub trait Unbind {
    fn unbind(&self);
}

impl<T: Unbind + ?Sized> Unbind for Rc<T> {
    fn unbind(&self) {
        (**self).unbind();
    }
}

// ─── Subscription ────────────────────────────────────────────────────────

/// RAII detach token returned by [`Signal::subscribe`] and every attach
/// operation in the crate.
///
/// Dropping the token or calling [`unbind`](Subscription::unbind) releases
/// the underlying callback; both paths are idempotent.
#[must_use = "dropping a Subscription immediately detaches its callback"]
pub struct Subscription {
    release: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    /// Wraps a release action to run once, on drop or explicit unbind.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: RefCell::new(Some(Box::new(release))),
        }
    }

    /// A token with nothing to release. Used where attach is a no-op.
    #[must_use]
    pub fn inert() -> Self {
        Self {
            release: RefCell::new(None),
        }
    }

    /// True when there is nothing left to release.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.release.borrow().is_none()
    }

    /// Merges two tokens into one that releases both, in order.
    pub fn and(self, other: Subscription) -> Subscription {
        Subscription::new(move || {
            self.release_now();
            other.release_now();
        })
    }

    /// Detaches now instead of at drop. Safe to call more than once.
    pub fn unbind(&self) {
        self.release_now();
    }

    fn release_now(&self) {
        if let Some(release) = self.release.borrow_mut().take() {
            release();
        }
    }
}

impl Unbind for Subscription {
    fn unbind(&self) {
        self.release_now();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.get_mut().take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("inert", &self.is_inert())
            .finish()
    }
}

// ─── Signal ──────────────────────────────────────────────────────────────

/// A shared emitter. Clones are handles onto the same subscriber list.
pub struct Signal<A: 'static> {
    inner: Rc<SignalInner<A>>,
}

struct SignalInner<A: 'static> {
    subscribers: RefCell<Vec<Weak<dyn Fn(&A)>>>,
}

impl<A: 'static> Signal<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SignalInner {
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Registers `callback` and returns its detach token.
    pub fn subscribe(&self, callback: impl Fn(&A) + 'static) -> Subscription {
        let strong: Rc<dyn Fn(&A)> = Rc::new(callback);
        self.inner
            .subscribers
            .borrow_mut()
            .push(Rc::downgrade(&strong));
        Subscription::new(move || drop(strong))
    }

    /// Delivers `payload` to every live subscriber, in registration order.
    pub fn emit(&self, payload: &A) {
        // Snapshot before calling out: callbacks may subscribe, detach, or
        // re-enter emit on this same signal.
        let snapshot: Vec<Rc<dyn Fn(&A)>> = {
            let mut subscribers = self.inner.subscribers.borrow_mut();
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in snapshot {
            callback(payload);
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// True when both handles share one subscriber list.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A: 'static> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Payload-free change event.
pub type Changed = Signal<()>;

impl Signal<()> {
    /// Emits the unit payload.
    pub fn notify(&self) {
        self.emit(&());
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
