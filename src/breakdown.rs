//! Value breakdowns.
//!
//! A `ValueBreakdown` explains how a property's effective value came about:
//! its base value, then the value after each strategy group in application
//! order. Useful for tooltips and for debugging modifier stacks.

use crate::modifier::ModifierKind;
use crate::property_id::PropertyId;
use serde::{Deserialize, Serialize};

/// One applied strategy group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownStep {
    /// Kind of the modifiers in this group.
    pub kind: ModifierKind,

    /// Description of the strategy that folded them.
    pub strategy: String,

    /// Number of modifiers in the group.
    pub modifiers: usize,

    /// Accumulator after the group was applied.
    pub value: f64,
}

/// How a property's value was computed.
///
/// Breakdowns of volatile properties are independent samples: the value may
/// differ from the one [`PropertyGraph::value`](crate::PropertyGraph::value)
/// returned last.
///
/// # Examples
///
/// ```rust
/// use zzprop::{Modifier, ModifierKind, PropertyGraph};
///
/// let mut graph = PropertyGraph::new();
/// let hp = graph.create_property("hp", 100.0);
/// graph.add_modifier(hp, Modifier::additive(20.0)).unwrap();
/// graph.add_modifier(hp, Modifier::multiplicative(1.5)).unwrap();
///
/// let breakdown = graph.breakdown(hp).unwrap();
/// assert_eq!(breakdown.base_value, 100.0);
/// assert_eq!(breakdown.steps.len(), 2);
/// assert_eq!(breakdown.steps[0].kind, ModifierKind::Additive);
/// assert_eq!(breakdown.steps[0].value, 120.0);
/// assert_eq!(breakdown.value, 180.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBreakdown {
    pub property: PropertyId,
    pub base_value: f64,
    pub steps: Vec<BreakdownStep>,
    pub value: f64,
}

impl ValueBreakdown {
    pub(crate) fn new(property: PropertyId, base_value: f64) -> Self {
        Self {
            property,
            base_value,
            steps: Vec::new(),
            value: base_value,
        }
    }

    pub(crate) fn push_step(
        &mut self,
        kind: ModifierKind,
        strategy: impl Into<String>,
        modifiers: usize,
        value: f64,
    ) {
        self.steps.push(BreakdownStep {
            kind,
            strategy: strategy.into(),
            modifiers,
            value,
        });
        self.value = value;
    }

    /// The step for `kind`, if any modifier of that kind contributed.
    pub fn step(&self, kind: ModifierKind) -> Option<&BreakdownStep> {
        self.steps.iter().find(|step| step.kind == kind)
    }
}
