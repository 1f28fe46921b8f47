#![forbid(unsafe_code)]

//! Reference fixtures and proptest strategies for exercising `weft`.
//!
//! The fixtures are small stand-ins for the two sides of a real binding:
//! view-model types ([`Person`], [`Document`]) covering each
//! change-notification strategy, and host stubs ([`TextStub`],
//! [`LabelStub`]) standing in for an editable widget and a display widget.
//! [`Recorder`] counts change-callback invocations, and [`strategy`]
//! supplies random write sequences for link property tests.

pub mod fixtures;
pub mod recorder;
pub mod strategy;

pub use fixtures::{
    Document, LabelStub, Person, TextStub, ValidationError, document_title_changed, label_title,
    person_props, rename, retitle, set_text, text_props,
};
pub use recorder::Recorder;
