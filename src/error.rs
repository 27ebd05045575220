//! Error types for the property graph.
//!
//! Every fallible operation returns a `PropertyError`. Removing something
//! that is not there is never an error; it reports `false` instead.

use crate::graph::PropertyKey;
use crate::modifier::ModifierId;
use crate::property_id::PropertyId;
use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[PropertyId]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors reported by [`PropertyGraph`](crate::PropertyGraph).
///
/// # Examples
///
/// ```rust
/// use zzprop::{PropertyError, PropertyId};
///
/// let err = PropertyError::Cycle {
///     path: vec![PropertyId::new("a"), PropertyId::new("b"), PropertyId::new("a")],
/// };
/// assert_eq!(err.to_string(), "Cycle detected: a -> b -> a");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropertyError {
    /// A dependency edge was rejected because it would close a cycle.
    ///
    /// The path is given in data-flow order and ends where it starts. For
    /// `b` depending on `a`, asking `a` to depend on `b` yields `[a, b, a]`.
    #[error("Cycle detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<PropertyId> },

    /// The key does not address a live property of this graph.
    ///
    /// Keys go stale when their property is removed; a stale key stays
    /// invalid even after its arena slot is reused.
    #[error("Unknown property: {0}")]
    UnknownProperty(PropertyKey),

    /// A modifier carried bounds that cannot be applied.
    #[error("Invalid modifier {0}: {1}")]
    InvalidModifier(ModifierId, String),

    /// Graph configuration was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::Modifier;

    #[test]
    fn test_cycle_error_display() {
        let a = PropertyId::new("A");
        let b = PropertyId::new("B");
        let c = PropertyId::new("C");
        let err = PropertyError::Cycle {
            path: vec![a.clone(), b, c, a],
        };
        assert_eq!(err.to_string(), "Cycle detected: A -> B -> C -> A");
    }

    #[test]
    fn test_empty_cycle_display() {
        let err = PropertyError::Cycle { path: Vec::new() };
        assert!(err.to_string().contains("(empty cycle)"));
    }

    #[test]
    fn test_invalid_modifier_display() {
        let modifier = Modifier::random_range(5.0, 1.0);
        let err = PropertyError::InvalidModifier(modifier.id(), "min above max".into());
        let display = err.to_string();
        assert!(display.starts_with("Invalid modifier mod#"));
        assert!(display.ends_with("min above max"));
    }
}
