//! Display labels for properties.
//!
//! A label is for people: it shows up in logs, error messages, breakdowns
//! and snapshots. It does not identify anything. The graph addresses nodes
//! only through [`PropertyKey`](crate::PropertyKey), never looks a node up
//! by label, and does not require labels to be unique or even non-empty.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Caller-chosen, non-identifying label of a property node.
///
/// Equality compares text only. Two nodes carrying equal labels are still
/// distinct nodes with distinct keys.
///
/// # Examples
///
/// ```rust
/// use zzprop::{PropertyGraph, PropertyId};
///
/// let mut graph = PropertyGraph::new();
/// let left = graph.create_property("hand.grip", 1.0);
/// let right = graph.create_property("hand.grip", 2.0);
///
/// assert_ne!(left, right);
/// assert_eq!(graph.property(left).unwrap().id(), &PropertyId::new("hand.grip"));
/// assert_eq!(graph.value(right).unwrap(), 2.0);
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct PropertyId(Arc<str>);

impl PropertyId {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(Arc::from(label.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Labels travel as bare strings so snapshots stay readable.
impl Serialize for PropertyId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PropertyId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(PropertyId::from)
    }
}

impl From<&str> for PropertyId {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for PropertyId {
    fn from(label: String) -> Self {
        Self(Arc::from(label))
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
