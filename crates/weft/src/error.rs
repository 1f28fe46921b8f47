#![forbid(unsafe_code)]

//! Error taxonomy for binding operations.
//!
//! Two families matter to callers:
//!
//! - **Resolution** errors ([`BindError::UnregisteredType`],
//!   [`BindError::UnknownProperty`], [`BindError::ValueType`]) are
//!   programmer errors: a name or value type that does not match the
//!   registered schema. They surface at the first use of the offending
//!   accessor, which for anything that attaches means bind time.
//! - **Propagation** errors ([`BindError::Propagation`]) wrap a failure
//!   raised by an application setter during a write. On the direct API they
//!   come back as `Err`; inside a change-driven update they panic, because
//!   the change callback's caller has no `Result` channel. `catch` on a
//!   host binding is the sanctioned recovery point.
//!
//! Detaching a subscription whose source is already gone is never an error.

use std::error::Error;
use std::fmt;

/// Result alias used throughout the crate.
pub type BindResult<T> = Result<T, BindError>;

/// Failure raised by a binding operation.
#[derive(Debug)]
pub enum BindError {
    /// The item's concrete type was never described to the registry.
    UnregisteredType {
        type_name: &'static str,
        property: &'static str,
    },
    /// The type is registered but declares no property with this name.
    UnknownProperty {
        type_name: &'static str,
        property: &'static str,
    },
    /// The property resolved, but its registered value type differs from
    /// the one the accessor was built with.
    ValueType {
        type_name: &'static str,
        property: &'static str,
        requested: &'static str,
        registered: &'static str,
    },
    /// An application setter failed during a write.
    Propagation {
        type_name: Option<&'static str>,
        property: Option<&'static str>,
        source: Box<dyn Error>,
    },
    /// A host binding was requested on an item whose type exposes no
    /// host core.
    HostRequired { type_name: &'static str },
}

impl BindError {
    /// Wraps an application setter failure.
    pub fn propagation(
        type_name: impl Into<Option<&'static str>>,
        property: impl Into<Option<&'static str>>,
        source: impl Error + 'static,
    ) -> Self {
        BindError::Propagation {
            type_name: type_name.into(),
            property: property.into(),
            source: Box::new(source),
        }
    }

    /// True for schema-mismatch failures (unknown type, unknown property,
    /// wrong value type).
    #[must_use]
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            BindError::UnregisteredType { .. }
                | BindError::UnknownProperty { .. }
                | BindError::ValueType { .. }
        )
    }

    /// The application error carried by a [`BindError::Propagation`],
    /// downcast to `E`. `None` for other variants or foreign error types.
    #[must_use]
    pub fn source_as<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            BindError::Propagation { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// The property name involved, when the failure is tied to one.
    #[must_use]
    pub fn property(&self) -> Option<&'static str> {
        match self {
            BindError::UnregisteredType { property, .. }
            | BindError::UnknownProperty { property, .. }
            | BindError::ValueType { property, .. } => Some(property),
            BindError::Propagation { property, .. } => *property,
            BindError::HostRequired { .. } => None,
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::UnregisteredType {
                type_name,
                property,
            } => write!(
                f,
                "type `{type_name}` has no registered bindable properties \
                 (while resolving `{property}`)"
            ),
            BindError::UnknownProperty {
                type_name,
                property,
            } => write!(f, "no bindable property `{property}` on type `{type_name}`"),
            BindError::ValueType {
                type_name,
                property,
                requested,
                registered,
            } => write!(
                f,
                "property `{property}` on type `{type_name}` stores \
                 `{registered}`, requested `{requested}`"
            ),
            BindError::Propagation {
                type_name,
                property,
                source,
            } => match (type_name, property) {
                (Some(t), Some(p)) => {
                    write!(f, "write to `{p}` on type `{t}` failed: {source}")
                }
                _ => write!(f, "endpoint write failed: {source}"),
            },
            BindError::HostRequired { type_name } => {
                write!(f, "type `{type_name}` does not expose a host core")
            }
        }
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BindError::Propagation { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Rejected(&'static str);

    impl fmt::Display for Rejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "rejected: {}", self.0)
        }
    }

    impl Error for Rejected {}

    #[test]
    fn resolution_errors_name_type_and_property() {
        let err = BindError::UnknownProperty {
            type_name: "Person",
            property: "title",
        };
        let text = err.to_string();
        assert!(text.contains("Person"));
        assert!(text.contains("title"));
        assert!(err.is_resolution());
        assert_eq!(err.property(), Some("title"));
    }

    #[test]
    fn unregistered_type_is_a_resolution_error() {
        let err = BindError::UnregisteredType {
            type_name: "Opaque",
            property: "x",
        };
        assert!(err.is_resolution());
        assert!(err.to_string().contains("Opaque"));
    }

    #[test]
    fn value_type_mismatch_reports_both_sides() {
        let err = BindError::ValueType {
            type_name: "Person",
            property: "age",
            requested: "alloc::string::String",
            registered: "u32",
        };
        let text = err.to_string();
        assert!(text.contains("u32"));
        assert!(text.contains("String"));
    }

    #[test]
    fn propagation_carries_a_downcastable_source() {
        let err = BindError::propagation("Person", "name", Rejected("empty"));
        assert!(!err.is_resolution());
        assert_eq!(err.source_as::<Rejected>(), Some(&Rejected("empty")));
        assert!(err.source_as::<std::fmt::Error>().is_none());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("rejected: empty"));
    }

    #[test]
    fn anonymous_propagation_still_displays_the_cause() {
        let err = BindError::propagation(None, None, Rejected("nope"));
        let text = err.to_string();
        assert!(text.contains("endpoint write failed"));
        assert!(text.contains("nope"));
    }
}
