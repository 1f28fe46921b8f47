#![forbid(unsafe_code)]

//! Reference models and host stubs.
//!
//! - [`Person`] publishes a structured notifier; its `email` setter can
//!   reject values, for exercising propagation failures and `catch`.
//! - [`Document`] publishes a per-property named signal for `title` and
//!   nothing for `words`, covering the remaining two change strategies.
//! - [`TextStub`] and [`LabelStub`] are host types: an editable text
//!   widget stand-in and a display widget stand-in.
//!
//! The free helpers mutate a fixture through its item and emit the
//! matching change signal afterwards, the way application code is expected
//! to announce its own writes.

use std::error::Error;
use std::fmt;

use weft::{Changed, HostCore, Item, Model, PropertySignal, Schema};

/// Rejection raised by fixture setters with validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.reason)
    }
}

impl Error for ValidationError {}

// ─── view-model fixtures ─────────────────────────────────────────────────

/// View-model fixture with a structured notifier.
///
/// Bindable surface: `name` and `age` (plain), `email` (rejects values
/// without an `@`), `partner` (a nested item, for child paths).
#[derive(Default)]
pub struct Person {
    pub name: String,
    pub age: u32,
    pub email: String,
    pub partner: Option<Item>,
    props: PropertySignal,
}

impl Person {
    #[must_use]
    pub fn new(name: &str, age: u32) -> Self {
        Self {
            name: name.into(),
            age,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn item(self) -> Item {
        Item::new(self)
    }
}

impl Model for Person {
    fn describe(schema: &mut Schema<Self>) {
        schema
            .property("name", |p: &Person| p.name.clone(), |p, v| p.name = v)
            .property("age", |p: &Person| p.age, |p, v| p.age = v)
            .try_property(
                "email",
                |p: &Person| p.email.clone(),
                |p, v: String| {
                    if !v.contains('@') {
                        return Err(ValidationError {
                            field: "email",
                            reason: "missing @",
                        });
                    }
                    p.email = v;
                    Ok(())
                },
            )
            .property(
                "partner",
                |p: &Person| p.partner.clone(),
                |p, v| p.partner = v,
            )
            .notifier(|p: &Person| p.props.clone());
    }
}

/// The structured notifier of a [`Person`] item.
#[must_use]
pub fn person_props(item: &Item) -> PropertySignal {
    item.with(|p: &Person| p.props.clone())
        .expect("item is not a Person")
}

/// Renames a person the way application code would: write, then announce.
pub fn rename(item: &Item, name: &str) {
    item.with_mut(|p: &mut Person| p.name = name.into());
    person_props(item).notify("name");
}

/// View-model fixture with a named signal for `title` and no change
/// capability for `words`.
#[derive(Default)]
pub struct Document {
    pub title: String,
    pub words: u32,
    title_changed: Changed,
}

impl Document {
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn item(self) -> Item {
        Item::new(self)
    }
}

impl Model for Document {
    fn describe(schema: &mut Schema<Self>) {
        schema
            .property("title", |d: &Document| d.title.clone(), |d, v| d.title = v)
            .property("words", |d: &Document| d.words, |d, v| d.words = v)
            .changed_signal("title", |d: &Document| d.title_changed.clone());
    }
}

/// The `title` change signal of a [`Document`] item.
#[must_use]
pub fn document_title_changed(item: &Item) -> Changed {
    item.with(|d: &Document| d.title_changed.clone())
        .expect("item is not a Document")
}

/// Retitles a document and announces the change.
pub fn retitle(item: &Item, title: &str) {
    item.with_mut(|d: &mut Document| d.title = title.into());
    document_title_changed(item).notify();
}

// ─── host stubs ──────────────────────────────────────────────────────────

/// Editable-widget stand-in: a host with a bindable `text` property.
#[derive(Default)]
pub struct TextStub {
    pub text: String,
    core: HostCore,
    props: PropertySignal,
}

impl TextStub {
    #[must_use]
    pub fn item() -> Item {
        Item::new(Self::default())
    }
}

impl Model for TextStub {
    fn describe(schema: &mut Schema<Self>) {
        schema
            .property("text", |t: &TextStub| t.text.clone(), |t, v| t.text = v)
            .notifier(|t: &TextStub| t.props.clone());
    }

    fn host_core(&self) -> Option<&HostCore> {
        Some(&self.core)
    }
}

/// The structured notifier of a [`TextStub`] item.
#[must_use]
pub fn text_props(item: &Item) -> PropertySignal {
    item.with(|t: &TextStub| t.props.clone())
        .expect("item is not a TextStub")
}

/// Simulates the user typing into a [`TextStub`].
pub fn set_text(item: &Item, text: &str) {
    item.with_mut(|t: &mut TextStub| t.text = text.into());
    text_props(item).notify("text");
}

/// Display-widget stand-in: a host with a bindable `title` property.
#[derive(Default)]
pub struct LabelStub {
    pub title: String,
    core: HostCore,
    props: PropertySignal,
}

impl LabelStub {
    #[must_use]
    pub fn item() -> Item {
        Item::new(Self::default())
    }
}

impl Model for LabelStub {
    fn describe(schema: &mut Schema<Self>) {
        schema
            .property(
                "title",
                |l: &LabelStub| l.title.clone(),
                |l, v| l.title = v,
            )
            .notifier(|l: &LabelStub| l.props.clone());
    }

    fn host_core(&self) -> Option<&HostCore> {
        Some(&self.core)
    }
}

/// Reads the currently displayed title of a [`LabelStub`].
#[must_use]
pub fn label_title(item: &Item) -> String {
    item.with(|l: &LabelStub| l.title.clone())
        .expect("item is not a LabelStub")
}
