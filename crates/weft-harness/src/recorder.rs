#![forbid(unsafe_code)]

//! Change-callback counting.

use std::cell::Cell;
use std::rc::Rc;

/// Counts how often a change callback fires. Clones share the counter.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    hits: Rc<Cell<usize>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Invocations so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.hits.get()
    }

    /// Resets the counter, for per-phase assertions.
    pub fn reset(&self) {
        self.hits.set(0);
    }

    /// A callback for accessor `attach` hooks.
    #[must_use]
    pub fn hook(&self) -> Rc<dyn Fn()> {
        let hits = Rc::clone(&self.hits);
        Rc::new(move || hits.set(hits.get() + 1))
    }

    /// A callback for `Changed::subscribe`.
    #[must_use]
    pub fn on_changed(&self) -> impl Fn(&()) + 'static {
        let hits = Rc::clone(&self.hits);
        move |()| hits.set(hits.get() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_resets() {
        let recorder = Recorder::new();
        let hook = recorder.hook();
        hook();
        hook();
        assert_eq!(recorder.count(), 2);

        recorder.reset();
        assert_eq!(recorder.count(), 0);
    }

    #[test]
    fn clones_share_the_counter() {
        let recorder = Recorder::new();
        let alias = recorder.clone();
        alias.hook()();
        assert_eq!(recorder.count(), 1);
    }
}
