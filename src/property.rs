//! Property node state.
//!
//! A `PropertyNode` is the data behind one property: its base value, the
//! cached effective value, the dirty and volatile flags, its modifiers and
//! its handler lists. Nodes live inside a [`PropertyGraph`](crate::PropertyGraph)
//! and are mutated only through it; callers (and calculators) see them
//! read-only.

use crate::modifier::{Modifier, ModifierId, ModifierKind, ModifierSet};
use crate::notify::Listeners;
use crate::property_id::PropertyId;
use std::fmt;

/// One property of a [`PropertyGraph`](crate::PropertyGraph).
///
/// The cache is sound whenever the node is neither dirty nor volatile:
/// `cached_value` then equals the base value folded through the modifiers.
pub struct PropertyNode {
    id: PropertyId,
    base_value: f64,
    cached_value: f64,
    dirty: bool,
    volatile: bool,
    non_deterministic: usize,
    modifiers: ModifierSet,
    pub(crate) listeners: Listeners,
    pub(crate) generation: u32,
}

impl PropertyNode {
    pub(crate) fn new(id: PropertyId, base_value: f64) -> Self {
        Self {
            id,
            base_value,
            cached_value: base_value,
            dirty: false,
            volatile: false,
            non_deterministic: 0,
            modifiers: ModifierSet::new(),
            listeners: Listeners::default(),
            generation: 0,
        }
    }

    /// Caller-assigned label.
    pub fn id(&self) -> &PropertyId {
        &self.id
    }

    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// Last computed effective value. Only trustworthy when the node is
    /// neither dirty nor volatile; use [`PropertyGraph::value`](crate::PropertyGraph::value)
    /// to read a fresh one.
    pub fn cached_value(&self) -> f64 {
        self.cached_value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the node holds, or transitively depends on, a
    /// non-deterministic modifier.
    pub fn is_volatile(&self) -> bool {
        self.volatile
    }

    /// Whether the node itself holds a non-deterministic modifier.
    pub fn has_non_deterministic_modifiers(&self) -> bool {
        self.non_deterministic > 0
    }

    pub fn modifiers(&self) -> &ModifierSet {
        &self.modifiers
    }

    pub(crate) fn set_base_value(&mut self, value: f64) -> f64 {
        std::mem::replace(&mut self.base_value, value)
    }

    /// Store a freshly computed value, returning the previous cache. The
    /// dirty flag is cleared unless the node is volatile.
    pub(crate) fn store_value(&mut self, value: f64) -> f64 {
        if !self.volatile {
            self.dirty = false;
        }
        std::mem::replace(&mut self.cached_value, value)
    }

    /// Returns `true` on a clean → dirty transition.
    pub(crate) fn mark_dirty(&mut self) -> bool {
        !std::mem::replace(&mut self.dirty, true)
    }

    /// Returns `true` if the flag flipped.
    pub(crate) fn set_volatile(&mut self, volatile: bool) -> bool {
        std::mem::replace(&mut self.volatile, volatile) != volatile
    }

    pub(crate) fn attach(&mut self, modifier: Modifier, non_deterministic: bool) -> bool {
        if !self.modifiers.insert(modifier) {
            return false;
        }
        if non_deterministic {
            self.non_deterministic += 1;
        }
        true
    }

    pub(crate) fn detach(
        &mut self,
        id: ModifierId,
        is_non_deterministic: impl Fn(ModifierKind) -> bool,
    ) -> Option<Modifier> {
        let modifier = self.modifiers.remove(id)?;
        if is_non_deterministic(modifier.kind()) {
            self.non_deterministic = self.non_deterministic.saturating_sub(1);
        }
        Some(modifier)
    }

    pub(crate) fn detach_all(&mut self) -> Vec<Modifier> {
        self.non_deterministic = 0;
        self.modifiers.clear()
    }
}

impl fmt::Debug for PropertyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyNode")
            .field("id", &self.id)
            .field("base_value", &self.base_value)
            .field("cached_value", &self.cached_value)
            .field("dirty", &self.dirty)
            .field("volatile", &self.volatile)
            .field("modifiers", &self.modifiers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_clean_with_cache_at_base() {
        let node = PropertyNode::new(PropertyId::new("hp"), 100.0);
        assert_eq!(node.base_value(), 100.0);
        assert_eq!(node.cached_value(), 100.0);
        assert!(!node.is_dirty());
        assert!(!node.is_volatile());
        assert!(node.modifiers().is_empty());
    }

    #[test]
    fn test_mark_dirty_reports_transition_once() {
        let mut node = PropertyNode::new(PropertyId::new("hp"), 1.0);
        assert!(node.mark_dirty());
        assert!(!node.mark_dirty());
        node.store_value(2.0);
        assert!(!node.is_dirty());
        assert!(node.mark_dirty());
    }

    #[test]
    fn test_volatile_node_stays_dirty_after_store() {
        let mut node = PropertyNode::new(PropertyId::new("dmg"), 1.0);
        node.set_volatile(true);
        node.mark_dirty();
        let previous = node.store_value(4.0);
        assert_eq!(previous, 1.0);
        assert!(node.is_dirty());
    }

    #[test]
    fn test_non_deterministic_count_follows_attach_and_detach() {
        let mut node = PropertyNode::new(PropertyId::new("roll"), 0.0);
        let random = Modifier::random_range(1.0, 6.0);
        let flat = Modifier::additive(1.0);
        let is_random = |kind: ModifierKind| kind == ModifierKind::RandomRange;

        assert!(node.attach(random, true));
        assert!(!node.attach(random, true));
        assert!(node.attach(flat, false));
        assert!(node.has_non_deterministic_modifiers());

        node.detach(flat.id(), is_random);
        assert!(node.has_non_deterministic_modifiers());
        node.detach(random.id(), is_random);
        assert!(!node.has_non_deterministic_modifiers());

        node.attach(random, true);
        assert_eq!(node.detach_all().len(), 1);
        assert!(!node.has_non_deterministic_modifiers());
    }
}
