#![forbid(unsafe_code)]

//! Proptest strategies for link property tests.

use proptest::prelude::*;

/// One external write against a linked pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkWrite {
    /// Write this value through the source endpoint.
    Source(i64),
    /// Write this value through the destination endpoint.
    Destination(i64),
}

impl LinkWrite {
    /// The value the write carries, whichever end it targets.
    #[must_use]
    pub fn value(self) -> i64 {
        match self {
            LinkWrite::Source(v) | LinkWrite::Destination(v) => v,
        }
    }
}

/// A random interleaving of source- and destination-side writes.
pub fn link_writes() -> impl Strategy<Value = Vec<LinkWrite>> {
    let write = prop_oneof![
        (-1000i64..1000).prop_map(LinkWrite::Source),
        (-1000i64..1000).prop_map(LinkWrite::Destination),
    ];
    proptest::collection::vec(write, 0..32)
}

/// Short printable names for string-valued properties.
pub fn short_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z ]{0,11}"
}
