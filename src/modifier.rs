//! Modifiers and the per-property modifier collection.
//!
//! A modifier is a typed numeric transform. Its [`ModifierKind`] picks the
//! strategy that folds it into a property value and, through the strategy
//! registry's rank table, where in the pipeline that happens.
//!
//! Modifiers have identity. Every constructor hands out a fresh
//! [`ModifierId`]; clones share it, so a buff can keep a copy of the modifier
//! it attached and later remove exactly that one, even when another modifier
//! with the same payload sits on the same property.

use crate::error::PropertyError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MODIFIER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModifierId(u64);

impl ModifierId {
    fn next() -> Self {
        Self(NEXT_MODIFIER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, unique within the process.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mod#{}", self.0)
    }
}

/// The closed set of modifier types.
///
/// Declaration order carries no meaning; application order comes from the
/// rank table of [`StrategyRegistry`](crate::StrategyRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    /// Flat bonus, summed.
    Additive,
    /// Percentage bonus, summed then applied as `× (1 + sum)`.
    PercentAdditive,
    /// Factor, multiplied together then applied once.
    Multiplicative,
    /// Replaces the value outright; highest priority wins.
    Override,
    /// Adds a fresh uniform sample from a range on every evaluation.
    RandomRange,
    /// Bounds the value.
    Clamp,
}

impl ModifierKind {
    /// Every kind, in declaration order.
    pub const ALL: [ModifierKind; 6] = [
        ModifierKind::Additive,
        ModifierKind::PercentAdditive,
        ModifierKind::Multiplicative,
        ModifierKind::Override,
        ModifierKind::RandomRange,
        ModifierKind::Clamp,
    ];
}

/// Payload of a modifier, interpreted per kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierOp {
    Additive { value: f64 },
    /// `0.10` means +10%.
    PercentAdditive { value: f64 },
    Multiplicative { factor: f64 },
    Override { value: f64 },
    /// Inclusive bounds of the sampled offset.
    RandomRange { min: f64, max: f64 },
    /// `None` leaves that side unbounded.
    Clamp { min: Option<f64>, max: Option<f64> },
}

impl ModifierOp {
    pub fn kind(&self) -> ModifierKind {
        match self {
            ModifierOp::Additive { .. } => ModifierKind::Additive,
            ModifierOp::PercentAdditive { .. } => ModifierKind::PercentAdditive,
            ModifierOp::Multiplicative { .. } => ModifierKind::Multiplicative,
            ModifierOp::Override { .. } => ModifierKind::Override,
            ModifierOp::RandomRange { .. } => ModifierKind::RandomRange,
            ModifierOp::Clamp { .. } => ModifierKind::Clamp,
        }
    }
}

/// A typed numeric transform with identity and an optional priority.
///
/// # Examples
///
/// ```rust
/// use zzprop::{Modifier, ModifierKind};
///
/// let flat = Modifier::additive(5.0);
/// let doubled = Modifier::multiplicative(2.0);
/// let set_to = Modifier::r#override(1.0).with_priority(10);
///
/// assert_eq!(flat.kind(), ModifierKind::Additive);
/// assert_eq!(set_to.priority(), 10);
///
/// // Clones are the same modifier; constructing again is a new one.
/// let copy = flat;
/// assert_eq!(copy.id(), flat.id());
/// assert_ne!(doubled.id(), Modifier::multiplicative(2.0).id());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Modifier {
    #[serde(skip, default = "ModifierId::next")]
    id: ModifierId,
    op: ModifierOp,
    #[serde(default)]
    priority: i32,
}

impl Modifier {
    /// Wrap a payload in a new modifier with priority 0.
    pub fn new(op: ModifierOp) -> Self {
        Self {
            id: ModifierId::next(),
            op,
            priority: 0,
        }
    }

    /// Flat bonus, summed with the other additive modifiers.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{Modifier, PropertyGraph};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let armor = graph.create_property("armor", 10.0);
    /// graph.add_modifier(armor, Modifier::additive(5.0)).unwrap();
    /// graph.add_modifier(armor, Modifier::additive(-2.0)).unwrap();
    /// assert_eq!(graph.value(armor).unwrap(), 13.0);
    /// ```
    pub fn additive(value: f64) -> Self {
        Self::new(ModifierOp::Additive { value })
    }

    /// Percentage bonus; `0.25` means +25%.
    pub fn percent_additive(value: f64) -> Self {
        Self::new(ModifierOp::PercentAdditive { value })
    }

    /// Scale by `factor`. Several multiplicative modifiers compound.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{Modifier, PropertyGraph};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let speed = graph.create_property("speed", 10.0);
    /// graph.add_modifier(speed, Modifier::multiplicative(2.0)).unwrap();
    /// graph.add_modifier(speed, Modifier::multiplicative(1.5)).unwrap();
    /// assert_eq!(graph.value(speed).unwrap(), 30.0);
    /// ```
    pub fn multiplicative(factor: f64) -> Self {
        Self::new(ModifierOp::Multiplicative { factor })
    }

    /// Replace the value outright. Combine with [`with_priority`](Self::with_priority)
    /// when several overrides can be active at once.
    pub fn r#override(value: f64) -> Self {
        Self::new(ModifierOp::Override { value })
    }

    /// Bound the value to `[min, max]`. Clamps run after every other kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{Modifier, PropertyGraph};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let hp = graph.create_property("hp", 150.0);
    /// graph.add_modifier(hp, Modifier::clamp(0.0, 100.0)).unwrap();
    /// assert_eq!(graph.value(hp).unwrap(), 100.0);
    ///
    /// assert!(Modifier::clamp(5.0, 1.0).validate().is_err());
    /// ```
    pub fn clamp(min: f64, max: f64) -> Self {
        Self::new(ModifierOp::Clamp {
            min: Some(min),
            max: Some(max),
        })
    }

    /// Lower bound only.
    pub fn clamp_min(min: f64) -> Self {
        Self::new(ModifierOp::Clamp {
            min: Some(min),
            max: None,
        })
    }

    /// Upper bound only.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{Modifier, PropertyGraph};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let hp = graph.create_property("hp", -5.0);
    /// graph.add_modifier(hp, Modifier::clamp_max(50.0)).unwrap();
    /// assert_eq!(graph.value(hp).unwrap(), -5.0);
    ///
    /// graph.add_modifier(hp, Modifier::clamp_min(0.0)).unwrap();
    /// assert_eq!(graph.value(hp).unwrap(), 0.0);
    /// ```
    pub fn clamp_max(max: f64) -> Self {
        Self::new(ModifierOp::Clamp {
            min: None,
            max: Some(max),
        })
    }

    /// Adds a uniform sample from `[min, max]` each time the property is
    /// evaluated. Properties holding one are volatile.
    pub fn random_range(min: f64, max: f64) -> Self {
        Self::new(ModifierOp::RandomRange { min, max })
    }

    /// Set the priority, keeping identity.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Identity used to detach this modifier. Copies share it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{Modifier, PropertyGraph};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let hp = graph.create_property("hp", 10.0);
    /// let buff = Modifier::additive(5.0);
    /// graph.add_modifier(hp, buff).unwrap();
    ///
    /// assert!(graph.remove_modifier(hp, buff.id()).unwrap());
    /// assert_eq!(graph.value(hp).unwrap(), 10.0);
    /// ```
    pub fn id(&self) -> ModifierId {
        self.id
    }

    /// The payload.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{Modifier, ModifierOp};
    ///
    /// let modifier = Modifier::clamp_min(0.0);
    /// assert_eq!(
    ///     modifier.op(),
    ///     &ModifierOp::Clamp { min: Some(0.0), max: None }
    /// );
    /// ```
    pub fn op(&self) -> &ModifierOp {
        &self.op
    }

    /// Which strategy folds this modifier.
    pub fn kind(&self) -> ModifierKind {
        self.op.kind()
    }

    /// Tie-breaker between overrides; the highest wins. Defaults to 0.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Check that range-shaped payloads describe a usable range.
    ///
    /// Scalar payloads are not checked; non-finite factors or values are the
    /// caller's responsibility.
    pub fn validate(&self) -> Result<(), PropertyError> {
        let invalid = |reason: String| -> Result<(), PropertyError> {
            Err(PropertyError::InvalidModifier(self.id, reason))
        };
        match self.op {
            ModifierOp::RandomRange { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    return invalid(format!("random range bounds must be finite ({min}, {max})"));
                }
                if min > max {
                    return invalid(format!("random range min {min} is above max {max}"));
                }
                if !(max - min).is_finite() {
                    return invalid(format!("random range width overflows ({min}, {max})"));
                }
            }
            ModifierOp::Clamp { min, max } => {
                if min.is_some_and(f64::is_nan) || max.is_some_and(f64::is_nan) {
                    return invalid("clamp bounds must not be NaN".to_string());
                }
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return invalid(format!("clamp min {min} is above max {max}"));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Modifiers attached to one property.
///
/// Keeps insertion order for iteration and snapshots, and a per-kind bucket
/// so a strategy gets all modifiers of its kind without scanning. Each
/// attached modifier sits in exactly one bucket.
#[derive(Debug, Clone, Default)]
pub struct ModifierSet {
    order: Vec<Modifier>,
    buckets: HashMap<ModifierKind, Vec<Modifier>>,
}

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a modifier. Returns `false` if this very modifier (same
    /// identity) is already attached.
    pub fn insert(&mut self, modifier: Modifier) -> bool {
        if self.contains(modifier.id()) {
            return false;
        }
        self.order.push(modifier);
        self.buckets.entry(modifier.kind()).or_default().push(modifier);
        true
    }

    /// Detach by identity.
    pub fn remove(&mut self, id: ModifierId) -> Option<Modifier> {
        let position = self.order.iter().position(|m| m.id() == id)?;
        let modifier = self.order.remove(position);
        let kind = modifier.kind();
        if let Some(bucket) = self.buckets.get_mut(&kind) {
            bucket.retain(|m| m.id() != id);
            if bucket.is_empty() {
                self.buckets.remove(&kind);
            }
        }
        Some(modifier)
    }

    pub fn contains(&self, id: ModifierId) -> bool {
        self.order.iter().any(|m| m.id() == id)
    }

    /// Detach everything, returning the modifiers in insertion order.
    pub fn clear(&mut self) -> Vec<Modifier> {
        self.buckets.clear();
        std::mem::take(&mut self.order)
    }

    /// All modifiers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
        self.order.iter()
    }

    /// Modifiers of one kind, in insertion order.
    pub fn of_kind(&self, kind: ModifierKind) -> &[Modifier] {
        self.buckets.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_map_to_kinds() {
        assert_eq!(Modifier::additive(1.0).kind(), ModifierKind::Additive);
        assert_eq!(Modifier::percent_additive(0.1).kind(), ModifierKind::PercentAdditive);
        assert_eq!(Modifier::multiplicative(2.0).kind(), ModifierKind::Multiplicative);
        assert_eq!(Modifier::r#override(3.0).kind(), ModifierKind::Override);
        assert_eq!(Modifier::random_range(0.0, 1.0).kind(), ModifierKind::RandomRange);
        assert_eq!(Modifier::clamp(0.0, 1.0).kind(), ModifierKind::Clamp);
        assert_eq!(Modifier::clamp_min(0.0).kind(), ModifierKind::Clamp);
        assert_eq!(Modifier::clamp_max(1.0).kind(), ModifierKind::Clamp);
    }

    #[test]
    fn test_identity_survives_clone_and_priority() {
        let modifier = Modifier::additive(5.0);
        let copy = modifier;
        let prioritized = modifier.with_priority(3);
        assert_eq!(copy.id(), modifier.id());
        assert_eq!(prioritized.id(), modifier.id());
        assert_ne!(Modifier::additive(5.0).id(), modifier.id());
    }

    #[test]
    fn test_validate_ranges() {
        assert!(Modifier::random_range(1.0, 2.0).validate().is_ok());
        assert!(Modifier::random_range(2.0, 2.0).validate().is_ok());
        assert!(Modifier::random_range(3.0, 2.0).validate().is_err());
        assert!(Modifier::random_range(f64::NEG_INFINITY, 2.0).validate().is_err());
        // finite bounds whose width is not
        assert!(Modifier::random_range(-1e308, 1e308).validate().is_err());
        assert!(Modifier::random_range(-1e300, 1e300).validate().is_ok());
        assert!(Modifier::clamp(0.0, 10.0).validate().is_ok());
        assert!(Modifier::clamp(10.0, 0.0).validate().is_err());
        assert!(Modifier::clamp_min(f64::NAN).validate().is_err());
        assert!(Modifier::new(ModifierOp::Clamp { min: None, max: None })
            .validate()
            .is_ok());
    }

    #[test]
    fn test_set_buckets_by_kind() {
        let mut set = ModifierSet::new();
        let a = Modifier::additive(1.0);
        let m = Modifier::multiplicative(2.0);
        let b = Modifier::additive(3.0);
        assert!(set.insert(a));
        assert!(set.insert(m));
        assert!(set.insert(b));

        let additive: Vec<_> = set.of_kind(ModifierKind::Additive).iter().map(|m| m.id()).collect();
        assert_eq!(additive, vec![a.id(), b.id()]);
        assert_eq!(set.of_kind(ModifierKind::Multiplicative).len(), 1);
        assert!(set.of_kind(ModifierKind::Clamp).is_empty());

        let order: Vec<_> = set.iter().map(|m| m.id()).collect();
        assert_eq!(order, vec![a.id(), m.id(), b.id()]);
    }

    #[test]
    fn test_set_rejects_same_identity_twice() {
        let mut set = ModifierSet::new();
        let a = Modifier::additive(1.0);
        assert!(set.insert(a));
        assert!(!set.insert(a));
        assert!(set.insert(Modifier::additive(1.0)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_set_remove_keeps_buckets_consistent() {
        let mut set = ModifierSet::new();
        let a = Modifier::additive(1.0);
        let b = Modifier::additive(2.0);
        set.insert(a);
        set.insert(b);

        assert_eq!(set.remove(a.id()).map(|m| m.id()), Some(a.id()));
        assert!(set.remove(a.id()).is_none());
        assert_eq!(set.of_kind(ModifierKind::Additive).len(), 1);

        set.remove(b.id());
        assert!(set.is_empty());
        assert!(set.of_kind(ModifierKind::Additive).is_empty());
    }

    #[test]
    fn test_set_clear_returns_insertion_order() {
        let mut set = ModifierSet::new();
        let a = Modifier::clamp_max(10.0);
        let b = Modifier::additive(2.0);
        set.insert(a);
        set.insert(b);

        let drained: Vec<_> = set.clear().iter().map(|m| m.id()).collect();
        assert_eq!(drained, vec![a.id(), b.id()]);
        assert!(set.is_empty());
        assert!(set.of_kind(ModifierKind::Clamp).is_empty());
    }

    #[test]
    fn test_modifier_serde_assigns_fresh_identity() {
        let original = Modifier::clamp(0.0, 100.0).with_priority(2);
        let json = serde_json::to_string(&original).unwrap();
        assert!(!json.contains("\"id\""));

        let restored: Modifier = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.op(), original.op());
        assert_eq!(restored.priority(), 2);
        assert_ne!(restored.id(), original.id());
    }
}
