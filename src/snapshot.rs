//! Property snapshots.
//!
//! A `PropertySnapshot` is the minimal state needed to rebuild a property:
//! its label, base value and modifiers. Dependency wiring is not captured;
//! callers re-add dependencies after [`PropertyGraph::restore`](crate::PropertyGraph::restore).

use crate::modifier::Modifier;
use crate::property_id::PropertyId;
use serde::{Deserialize, Serialize};

/// Reconstructable state of one property.
///
/// # Examples
///
/// ```rust
/// use zzprop::{Modifier, PropertyGraph};
///
/// let mut graph = PropertyGraph::new();
/// let armor = graph.create_property("armor", 10.0);
/// graph.add_modifier(armor, Modifier::additive(5.0)).unwrap();
///
/// let snapshot = graph.snapshot(armor).unwrap();
/// let json = serde_json::to_string(&snapshot).unwrap();
///
/// let mut other = PropertyGraph::new();
/// let restored = other.restore(&serde_json::from_str(&json).unwrap()).unwrap();
/// assert_eq!(other.value(restored).unwrap(), 15.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub id: PropertyId,
    pub base_value: f64,

    /// Modifiers in insertion order.
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}
