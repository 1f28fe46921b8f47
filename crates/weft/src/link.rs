#![forbid(unsafe_code)]

//! Endpoint synchronization.
//!
//! A [`Link`] keeps a `source` and a `destination` endpoint in sync
//! according to a [`LinkMode`]. Construction wires the change
//! subscriptions the mode asks for and performs one initial update in the
//! primary direction, so the linked pair starts consistent.
//!
//! # Invariants
//!
//! 1. Propagation is an explicit two-state machine, `Idle` and
//!    `Propagating`. A change notification arriving as a side effect of
//!    the propagating write itself is ignored; one external write never
//!    recurses.
//! 2. Two-way initial sync favors source over destination. When the two
//!    ends disagree at construction, the source's value wins.
//! 3. `unbind` is idempotent and leaves the link permanently inert; so
//!    does dropping the last handle.
//!
//! Updates run synchronously on the caller's thread. Nothing is queued or
//! coalesced: the link only ever sees the value present when it actually
//! reads.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::endpoint::Endpoint;
use crate::error::BindResult;
use crate::signal::{Subscription, Unbind};

/// Which subscriptions a link wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Destination follows source.
    ToDestination,
    /// Source follows destination.
    ToSource,
    /// Each end follows the other.
    TwoWay,
    /// No subscriptions and no initial sync; data moves only on
    /// [`Link::update`] / [`Link::refresh`].
    Manual,
}

impl LinkMode {
    fn follows_source(self) -> bool {
        matches!(self, LinkMode::ToDestination | LinkMode::TwoWay)
    }

    fn follows_destination(self) -> bool {
        matches!(self, LinkMode::ToSource | LinkMode::TwoWay)
    }

    /// Direction of the initial sync and of [`Link::refresh`].
    #[must_use]
    pub fn primary_direction(self) -> Direction {
        match self {
            LinkMode::ToSource => Direction::ToSource,
            _ => Direction::ToDestination,
        }
    }
}

/// One hop of propagation: which endpoint is read and which is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToDestination,
    ToSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Idle,
    Propagating,
}

/// Resets the state flag even when a setter panics out of `update`.
struct StateReset<'a>(&'a Cell<LinkState>);

impl Drop for StateReset<'_> {
    fn drop(&mut self) {
        self.0.set(LinkState::Idle);
    }
}

/// A live connection between two endpoints. See the module docs.
pub struct Link<V: 'static> {
    source: Box<dyn Endpoint<V>>,
    destination: Box<dyn Endpoint<V>>,
    mode: LinkMode,
    state: Cell<LinkState>,
    unbound: Cell<bool>,
    watchers: RefCell<Vec<Subscription>>,
}

impl<V: 'static> Link<V> {
    /// Connects `source` to `destination`, wires the mode's subscriptions,
    /// and performs the initial sync. Fails if the initial update fails;
    /// nothing stays attached in that case.
    pub fn new(
        source: impl Endpoint<V> + 'static,
        destination: impl Endpoint<V> + 'static,
        mode: LinkMode,
    ) -> BindResult<Rc<Self>> {
        let link = Rc::new(Self {
            source: Box::new(source),
            destination: Box::new(destination),
            mode,
            state: Cell::new(LinkState::Idle),
            unbound: Cell::new(false),
            watchers: RefCell::new(Vec::new()),
        });

        if mode.follows_source() {
            let weak = Rc::downgrade(&link);
            let sub = link.source.changed().subscribe(move |()| {
                if let Some(link) = weak.upgrade() {
                    link.change_driven(Direction::ToDestination);
                }
            });
            link.watchers.borrow_mut().push(sub);
        }
        if mode.follows_destination() {
            let weak = Rc::downgrade(&link);
            let sub = link.destination.changed().subscribe(move |()| {
                if let Some(link) = weak.upgrade() {
                    link.change_driven(Direction::ToSource);
                }
            });
            link.watchers.borrow_mut().push(sub);
        }

        if mode != LinkMode::Manual {
            link.update(mode.primary_direction())?;
        }
        Ok(link)
    }

    #[must_use]
    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// True while an update's write is in flight.
    #[must_use]
    pub fn is_propagating(&self) -> bool {
        self.state.get() == LinkState::Propagating
    }

    #[must_use]
    pub fn is_unbound(&self) -> bool {
        self.unbound.get()
    }

    /// Reads the origin endpoint and writes the target. An `Ok` no-op
    /// while a propagation is already in flight (the write's own echo) and
    /// after `unbind`.
    pub fn update(&self, direction: Direction) -> BindResult<()> {
        if self.unbound.get() || self.state.get() == LinkState::Propagating {
            return Ok(());
        }
        self.state.set(LinkState::Propagating);
        let _reset = StateReset(&self.state);
        match direction {
            Direction::ToDestination => {
                let value = self.source.get()?;
                self.destination.set(value)
            }
            Direction::ToSource => {
                let value = self.destination.get()?;
                self.source.set(value)
            }
        }
    }

    /// One update in the mode's primary direction.
    pub fn refresh(&self) -> BindResult<()> {
        self.update(self.mode.primary_direction())
    }

    /// Drops both change subscriptions and unbinds both endpoints.
    /// Idempotent; subsequent writes at either end no longer propagate.
    pub fn unbind(&self) {
        if self.unbound.replace(true) {
            return;
        }
        self.watchers.borrow_mut().clear();
        self.source.unbind();
        self.destination.unbind();
        tracing::trace!(mode = ?self.mode, "link unbound");
    }

    fn change_driven(&self, direction: Direction) {
        // Change callbacks have no Result channel; a failing propagation
        // here is surfaced to the code that raised the change.
        if let Err(err) = self.update(direction) {
            match direction {
                Direction::ToDestination => {
                    panic!("change-driven write to destination failed: {err}")
                }
                Direction::ToSource => panic!("change-driven write to source failed: {err}"),
            }
        }
    }
}

impl<V: 'static> Unbind for Link<V> {
    fn unbind(&self) {
        Link::unbind(self);
    }
}

impl<V: 'static> Drop for Link<V> {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl<V: 'static> fmt::Debug for Link<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("mode", &self.mode)
            .field("propagating", &self.is_propagating())
            .field("unbound", &self.is_unbound())
            .finish()
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{FnEndpoint, constant};
    use std::cell::{Cell, RefCell};

    fn cell_endpoint(cell: &Rc<RefCell<i64>>) -> FnEndpoint<i64> {
        let read = cell.clone();
        let write = cell.clone();
        FnEndpoint::new(move || *read.borrow(), move |v| *write.borrow_mut() = v)
    }

    fn pair(a: i64, b: i64) -> (Rc<RefCell<i64>>, FnEndpoint<i64>, Rc<RefCell<i64>>, FnEndpoint<i64>)
    {
        let src = Rc::new(RefCell::new(a));
        let dst = Rc::new(RefCell::new(b));
        let src_ep = cell_endpoint(&src);
        let dst_ep = cell_endpoint(&dst);
        (src, src_ep, dst, dst_ep)
    }

    #[test]
    fn construction_syncs_destination_from_source() {
        let (_src, src_ep, dst, dst_ep) = pair(10, 0);
        let _link = Link::new(src_ep, dst_ep, LinkMode::ToDestination).unwrap();
        assert_eq!(*dst.borrow(), 10);
    }

    #[test]
    fn to_source_mode_syncs_source_from_destination() {
        let (src, src_ep, _dst, dst_ep) = pair(1, 99);
        let _link = Link::new(src_ep, dst_ep, LinkMode::ToSource).unwrap();
        assert_eq!(*src.borrow(), 99);
    }

    #[test]
    fn two_way_initial_sync_favors_source() {
        let (src, src_ep, dst, dst_ep) = pair(7, 8);
        let _link = Link::new(src_ep, dst_ep, LinkMode::TwoWay).unwrap();
        assert_eq!(*src.borrow(), 7);
        assert_eq!(*dst.borrow(), 7);
    }

    #[test]
    fn source_writes_reach_the_destination() {
        let (_src, src_ep, dst, dst_ep) = pair(0, 0);
        let _link = Link::new(src_ep.clone(), dst_ep, LinkMode::ToDestination).unwrap();

        src_ep.set(42).unwrap();
        assert_eq!(*dst.borrow(), 42);
    }

    #[test]
    fn one_way_never_writes_back() {
        let (src, src_ep, _dst, dst_ep) = pair(1, 0);
        let _link = Link::new(src_ep, dst_ep.clone(), LinkMode::ToDestination).unwrap();

        dst_ep.set(50).unwrap();
        assert_eq!(*src.borrow(), 1);
    }

    #[test]
    fn two_way_propagates_both_directions() {
        let (src, src_ep, dst, dst_ep) = pair(0, 0);
        let _link = Link::new(src_ep.clone(), dst_ep.clone(), LinkMode::TwoWay).unwrap();

        src_ep.set(5).unwrap();
        assert_eq!(*dst.borrow(), 5);

        dst_ep.set(9).unwrap();
        assert_eq!(*src.borrow(), 9);
    }

    #[test]
    fn one_external_write_fires_the_far_end_exactly_once() {
        let (_src, src_ep, _dst, dst_ep) = pair(0, 0);
        let link = Link::new(src_ep.clone(), dst_ep.clone(), LinkMode::TwoWay).unwrap();

        let hits = Rc::new(Cell::new(0u32));
        let h = hits.clone();
        let _probe = dst_ep.changed().subscribe(move |()| h.set(h.get() + 1));

        src_ep.set(3).unwrap();
        assert_eq!(hits.get(), 1);
        assert!(!link.is_propagating());
    }

    #[test]
    fn unbind_is_idempotent_and_leaves_the_link_inert() {
        let (_src, src_ep, dst, dst_ep) = pair(0, 0);
        let link = Link::new(src_ep.clone(), dst_ep, LinkMode::TwoWay).unwrap();

        link.unbind();
        link.unbind();
        assert!(link.is_unbound());

        src_ep.set(77).unwrap();
        assert_eq!(*dst.borrow(), 0);
        link.update(Direction::ToDestination).unwrap();
        assert_eq!(*dst.borrow(), 0);
    }

    #[test]
    fn dropping_the_last_handle_unbinds() {
        let (_src, src_ep, dst, dst_ep) = pair(0, 0);
        {
            let _link = Link::new(src_ep.clone(), dst_ep, LinkMode::ToDestination).unwrap();
            src_ep.set(5).unwrap();
            assert_eq!(*dst.borrow(), 5);
        }
        src_ep.set(100).unwrap();
        assert_eq!(*dst.borrow(), 5);
    }

    #[test]
    fn manual_mode_moves_data_only_on_demand() {
        let (_src, src_ep, dst, dst_ep) = pair(6, 0);
        let link = Link::new(src_ep.clone(), dst_ep, LinkMode::Manual).unwrap();

        // No initial sync, no subscriptions.
        assert_eq!(*dst.borrow(), 0);
        src_ep.set(8).unwrap();
        assert_eq!(*dst.borrow(), 0);

        link.refresh().unwrap();
        assert_eq!(*dst.borrow(), 8);
    }

    #[test]
    fn update_while_propagating_is_a_noop() {
        let (_src, src_ep, dst, dst_ep) = pair(0, 0);
        let link = Link::new(src_ep, dst_ep.clone(), LinkMode::ToDestination).unwrap();

        // The destination's own change callback observing the propagating
        // write must not restart propagation.
        let inner = Rc::clone(&link);
        let reentered = Rc::new(Cell::new(false));
        let r = reentered.clone();
        let _probe = dst_ep.changed().subscribe(move |()| {
            r.set(inner.is_propagating());
            inner.update(Direction::ToSource).unwrap();
        });

        link.update(Direction::ToDestination).unwrap();
        assert!(reentered.get());
        assert_eq!(*dst.borrow(), 0);
    }

    #[test]
    fn constant_source_seeds_the_destination() {
        let dst = Rc::new(RefCell::new(0));
        let dst_ep = {
            let write = dst.clone();
            let read = dst.clone();
            FnEndpoint::new(move || *read.borrow(), move |v| *write.borrow_mut() = v)
        };
        let _link = Link::new(constant(123), dst_ep, LinkMode::ToDestination).unwrap();
        assert_eq!(*dst.borrow(), 123);
    }

    #[test]
    fn refresh_follows_the_primary_direction() {
        let (src, src_ep, dst, dst_ep) = pair(0, 40);
        let link = Link::new(src_ep, dst_ep, LinkMode::ToSource).unwrap();
        assert_eq!(*src.borrow(), 40);

        // Silent mutation on the destination side, picked up on refresh.
        *dst.borrow_mut() = 41;
        link.refresh().unwrap();
        assert_eq!(*src.borrow(), 41);
    }
}
