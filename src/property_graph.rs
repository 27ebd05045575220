//! The property graph.
//!
//! `PropertyGraph` is the public face of the crate. It owns every property,
//! the dependency edges between them, the strategy registry used to fold
//! modifiers and the random source used by non-deterministic strategies.
//!
//! Reads are lazy: a clean, non-volatile property answers from its cache.
//! Writes are eager: setting a base value recomputes the property at once
//! and pushes the new value into its dependents.

use crate::breakdown::ValueBreakdown;
use crate::config::GraphConfig;
use crate::error::PropertyError;
use crate::graph::{Calculator, DependencyGraph, EdgeChange, PropertyKey};
use crate::modifier::{Modifier, ModifierId};
use crate::notify::{ChangeHandler, DirtyHandler, ValueChange};
use crate::property::PropertyNode;
use crate::property_id::PropertyId;
use crate::snapshot::PropertySnapshot;
use crate::strategy::StrategyRegistry;
use petgraph::stable_graph::NodeIndex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// A graph of reactive numeric properties.
///
/// # Examples
///
/// ```rust
/// use zzprop::{Modifier, PropertyGraph};
///
/// let mut graph = PropertyGraph::new();
/// let strength = graph.create_property("strength", 10.0);
/// let attack = graph.create_property("attack", 0.0);
///
/// // attack's base is always twice strength
/// graph.add_dependency_with(attack, strength, |_, v| v * 2.0).unwrap();
/// graph.add_modifier(attack, Modifier::additive(5.0)).unwrap();
///
/// graph.set_base_value(strength, 12.0).unwrap();
/// assert_eq!(graph.base_value(attack).unwrap(), 24.0);
/// assert_eq!(graph.value(attack).unwrap(), 29.0);
/// ```
pub struct PropertyGraph {
    pub(crate) graph: DependencyGraph,
    pub(crate) registry: Arc<StrategyRegistry>,
    pub(crate) config: GraphConfig,
    pub(crate) rng: StdRng,
    // nodes whose dependencies are being pulled, and whether a push already
    // refolded them meanwhile
    pulling: HashMap<NodeIndex, bool>,
}

impl PropertyGraph {
    /// Empty graph with the standard strategies and default configuration.
    pub fn new() -> Self {
        Self::build(GraphConfig::default(), Arc::new(StrategyRegistry::standard()))
    }

    /// Empty graph with the standard strategies.
    pub fn with_config(config: GraphConfig) -> Result<Self, PropertyError> {
        Self::with_registry(config, Arc::new(StrategyRegistry::standard()))
    }

    /// Empty graph folding modifiers through `registry`.
    ///
    /// A registry can be shared by any number of graphs.
    pub fn with_registry(
        config: GraphConfig,
        registry: Arc<StrategyRegistry>,
    ) -> Result<Self, PropertyError> {
        config.validate()?;
        Ok(Self::build(config, registry))
    }

    fn build(config: GraphConfig, registry: Arc<StrategyRegistry>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            graph: DependencyGraph::new(),
            registry,
            config,
            rng,
            pulling: HashMap::new(),
        }
    }

    /// Configuration the graph was built with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Strategies used to fold modifiers. Clone the `Arc` to share them
    /// with another graph.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use zzprop::{GraphConfig, PropertyGraph};
    ///
    /// let first = PropertyGraph::new();
    /// let second =
    ///     PropertyGraph::with_registry(GraphConfig::new(), Arc::clone(first.registry())).unwrap();
    /// assert!(Arc::ptr_eq(first.registry(), second.registry()));
    /// ```
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Read-only view of the nodes and edges.
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Number of live properties.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Whether `key` still names a live property of this graph.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::PropertyGraph;
    ///
    /// let mut graph = PropertyGraph::new();
    /// let hp = graph.create_property("hp", 10.0);
    /// assert!(graph.contains(hp));
    /// assert_eq!(graph.len(), 1);
    ///
    /// graph.remove_property(hp).unwrap();
    /// assert!(!graph.contains(hp));
    /// assert!(graph.is_empty());
    /// ```
    pub fn contains(&self, key: PropertyKey) -> bool {
        self.graph.contains(key)
    }

    /// Add a property with no modifiers and no edges. It starts clean with
    /// its cache at `base_value`.
    pub fn create_property(&mut self, id: impl Into<PropertyId>, base_value: f64) -> PropertyKey {
        let id = id.into();
        debug!(property = %id, base_value, "property created");
        self.graph.insert(PropertyNode::new(id, base_value))
    }

    /// Remove a property together with all of its edges.
    ///
    /// Former dependents keep their base values; their volatility is
    /// re-derived.
    pub fn remove_property(&mut self, key: PropertyKey) -> Result<PropertyNode, PropertyError> {
        let index = self.graph.index_of(key)?;
        let dependents = self.graph.dependents(index);
        let node = self
            .graph
            .remove(index)
            .ok_or(PropertyError::UnknownProperty(key))?;
        for dependent in dependents {
            self.refresh_volatility(dependent);
        }
        debug!(property = %node.id(), "property removed");
        Ok(node)
    }

    /// Read-only view of a property.
    pub fn property(&self, key: PropertyKey) -> Result<&PropertyNode, PropertyError> {
        self.graph.node(key)
    }

    /// Base value of a property, before modifiers. Never recomputes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{Modifier, PropertyGraph};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let hp = graph.create_property("hp", 10.0);
    /// graph.add_modifier(hp, Modifier::multiplicative(3.0)).unwrap();
    ///
    /// assert_eq!(graph.base_value(hp).unwrap(), 10.0);
    /// assert_eq!(graph.value(hp).unwrap(), 30.0);
    /// ```
    pub fn base_value(&self, key: PropertyKey) -> Result<f64, PropertyError> {
        self.graph.node(key).map(PropertyNode::base_value)
    }

    /// Set the base value and recompute at once.
    ///
    /// A value within epsilon of the current base is ignored. Otherwise the
    /// property is marked dirty, base-value handlers fire, the property is
    /// recomputed and, if its value moved, the change is pushed into its
    /// dependents.
    ///
    /// Returns the graph so writes can be chained.
    ///
    /// # Errors
    ///
    /// [`PropertyError::UnknownProperty`] if `key` was removed or belongs to
    /// another graph.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::PropertyGraph;
    ///
    /// let mut graph = PropertyGraph::new();
    /// let strength = graph.create_property("strength", 10.0);
    /// let carry = graph.create_property("carry", 0.0);
    /// graph.add_dependency_with(carry, strength, |_, v| v * 5.0).unwrap();
    ///
    /// graph.set_base_value(strength, 12.0).unwrap();
    /// assert_eq!(graph.base_value(carry).unwrap(), 60.0);
    /// assert_eq!(graph.value(carry).unwrap(), 60.0);
    /// ```
    #[instrument(level = "trace", skip(self))]
    pub fn set_base_value(
        &mut self,
        key: PropertyKey,
        value: f64,
    ) -> Result<&mut Self, PropertyError> {
        let index = self.graph.index_of(key)?;
        if let Some(change) = self.push_base_value(index, value) {
            self.trigger_dependent_updates(index, change.new);
        }
        Ok(self)
    }

    /// Effective value of a property.
    ///
    /// Clean, non-volatile properties answer from their cache. Otherwise
    /// dependencies are brought up to date first, the base value is folded
    /// through the modifiers, and a value that moved by more than epsilon is
    /// announced and pushed into dependents.
    ///
    /// Takes `&mut self` because a read can refresh caches and fire handlers.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{Modifier, PropertyGraph};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let attack = graph.create_property("attack", 10.0);
    /// graph.add_modifier(attack, Modifier::additive(5.0)).unwrap();
    /// graph.add_modifier(attack, Modifier::percent_additive(1.0)).unwrap();
    /// assert_eq!(graph.value(attack).unwrap(), 30.0);
    ///
    /// let dice = graph.create_property("dice", 0.0);
    /// graph.add_modifier(dice, Modifier::random_range(1.0, 6.0)).unwrap();
    /// let roll = graph.value(dice).unwrap();
    /// assert!((1.0..=6.0).contains(&roll));
    /// ```
    pub fn value(&mut self, key: PropertyKey) -> Result<f64, PropertyError> {
        let index = self.graph.index_of(key)?;
        Ok(self.evaluate(index))
    }

    /// Attach a modifier. Returns `false` if a modifier with the same
    /// identity is already attached.
    pub fn add_modifier(
        &mut self,
        key: PropertyKey,
        modifier: Modifier,
    ) -> Result<bool, PropertyError> {
        let index = self.graph.index_of(key)?;
        modifier.validate()?;
        if !self.attach(index, modifier) {
            return Ok(false);
        }
        self.modifiers_changed(index);
        Ok(true)
    }

    /// Attach several modifiers. Nothing is attached unless every modifier
    /// is valid. Returns how many were new.
    pub fn add_modifiers(
        &mut self,
        key: PropertyKey,
        modifiers: impl IntoIterator<Item = Modifier>,
    ) -> Result<usize, PropertyError> {
        let index = self.graph.index_of(key)?;
        let modifiers: Vec<Modifier> = modifiers.into_iter().collect();
        for modifier in &modifiers {
            modifier.validate()?;
        }
        let added = modifiers
            .into_iter()
            .filter(|modifier| self.attach(index, *modifier))
            .count();
        if added > 0 {
            self.modifiers_changed(index);
        }
        Ok(added)
    }

    /// Detach a modifier by identity. Returns `false` if it was not attached.
    pub fn remove_modifier(
        &mut self,
        key: PropertyKey,
        modifier: ModifierId,
    ) -> Result<bool, PropertyError> {
        let index = self.graph.index_of(key)?;
        if !self.detach(index, modifier) {
            return Ok(false);
        }
        self.modifiers_changed(index);
        Ok(true)
    }

    /// Detach several modifiers. Returns how many were attached.
    pub fn remove_modifiers(
        &mut self,
        key: PropertyKey,
        modifiers: impl IntoIterator<Item = ModifierId>,
    ) -> Result<usize, PropertyError> {
        let index = self.graph.index_of(key)?;
        let removed = modifiers
            .into_iter()
            .filter(|id| self.detach(index, *id))
            .count();
        if removed > 0 {
            self.modifiers_changed(index);
        }
        Ok(removed)
    }

    /// Detach every modifier, returning them in insertion order.
    ///
    /// The property drops back to its base value and stops being volatile
    /// unless a dependency still is.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{Modifier, PropertyGraph};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let hp = graph.create_property("hp", 10.0);
    /// let buff = Modifier::additive(5.0);
    /// graph.add_modifiers(hp, [buff, Modifier::random_range(0.0, 1.0)]).unwrap();
    /// assert!(graph.property(hp).unwrap().is_volatile());
    ///
    /// let removed = graph.clear_modifiers(hp).unwrap();
    /// assert_eq!(removed.len(), 2);
    /// assert_eq!(removed[0].id(), buff.id());
    /// assert!(!graph.property(hp).unwrap().is_volatile());
    /// assert_eq!(graph.value(hp).unwrap(), 10.0);
    /// ```
    pub fn clear_modifiers(&mut self, key: PropertyKey) -> Result<Vec<Modifier>, PropertyError> {
        let index = self.graph.index_of(key)?;
        let removed = self.graph.node_at_mut(index).detach_all();
        if !removed.is_empty() {
            trace!(count = removed.len(), "modifiers cleared");
            self.modifiers_changed(index);
        }
        Ok(removed)
    }

    /// Make `node` depend on `dependency` without a calculator: changes to
    /// `dependency` only invalidate and recompute `node`.
    ///
    /// Fails with [`PropertyError::Cycle`] if `dependency` already depends,
    /// directly or not, on `node`.
    pub fn add_dependency(
        &mut self,
        node: PropertyKey,
        dependency: PropertyKey,
    ) -> Result<(), PropertyError> {
        self.connect(node, dependency, None)
    }

    /// Make `node` depend on `dependency`; whenever `dependency`'s value
    /// changes, `node`'s base value is set to `calculator(dependency, value)`.
    ///
    /// Calling this again for the same pair only replaces the calculator.
    /// The calculator receives the source node and its fresh value.
    ///
    /// # Errors
    ///
    /// [`PropertyError::Cycle`] with the offending path, in data-flow order,
    /// if the edge would close a loop. The graph is left unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{PropertyError, PropertyGraph};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let level = graph.create_property("level", 1.0);
    /// let max_hp = graph.create_property("max_hp", 0.0);
    /// graph.add_dependency_with(max_hp, level, |_, v| 50.0 + 10.0 * v).unwrap();
    ///
    /// graph.set_base_value(level, 3.0).unwrap();
    /// assert_eq!(graph.value(max_hp).unwrap(), 80.0);
    ///
    /// let err = graph.add_dependency_with(level, max_hp, |_, v| v).unwrap_err();
    /// assert!(matches!(err, PropertyError::Cycle { .. }));
    /// ```
    pub fn add_dependency_with(
        &mut self,
        node: PropertyKey,
        dependency: PropertyKey,
        calculator: impl Fn(&PropertyNode, f64) -> f64 + 'static,
    ) -> Result<(), PropertyError> {
        self.connect(node, dependency, Some(Box::new(calculator)))
    }

    /// Drop the edge from `dependency` to `node`. Returns `false` if there
    /// was none.
    ///
    /// `node` keeps its current base value; only future pushes stop.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::PropertyGraph;
    ///
    /// let mut graph = PropertyGraph::new();
    /// let level = graph.create_property("level", 1.0);
    /// let max_hp = graph.create_property("max_hp", 0.0);
    /// graph.add_dependency_with(max_hp, level, |_, v| v * 10.0).unwrap();
    /// graph.set_base_value(level, 2.0).unwrap();
    ///
    /// assert!(graph.remove_dependency(max_hp, level).unwrap());
    /// assert!(!graph.remove_dependency(max_hp, level).unwrap());
    ///
    /// graph.set_base_value(level, 5.0).unwrap();
    /// assert_eq!(graph.value(max_hp).unwrap(), 20.0);
    /// ```
    pub fn remove_dependency(
        &mut self,
        node: PropertyKey,
        dependency: PropertyKey,
    ) -> Result<bool, PropertyError> {
        let dependent = self.graph.index_of(node)?;
        let source = self.graph.index_of(dependency)?;
        if !self.graph.remove_edge(source, dependent) {
            return Ok(false);
        }
        debug!(
            source = %self.graph.node_at(source).id(),
            dependent = %self.graph.node_at(dependent).id(),
            "dependency removed"
        );
        self.refresh_volatility(dependent);
        Ok(true)
    }

    /// Properties `key` depends on, in the order they were added.
    pub fn dependencies(&self, key: PropertyKey) -> Result<Vec<PropertyKey>, PropertyError> {
        self.graph.dependencies_of(key)
    }

    /// Properties depending on `key`, in the order they were added.
    pub fn dependents(&self, key: PropertyKey) -> Result<Vec<PropertyKey>, PropertyError> {
        self.graph.dependents_of(key)
    }

    /// Call `handler` on every clean → dirty transition of `key`.
    ///
    /// Returns `false` if this exact handler is already registered.
    pub fn on_dirty(&mut self, key: PropertyKey, handler: DirtyHandler) -> Result<bool, PropertyError> {
        let index = self.graph.index_of(key)?;
        Ok(self.graph.node_at_mut(index).listeners.dirty.add(handler))
    }

    /// Unregister a dirty handler by `Rc` identity. Returns `false` if it was
    /// not registered.
    pub fn remove_on_dirty(
        &mut self,
        key: PropertyKey,
        handler: &DirtyHandler,
    ) -> Result<bool, PropertyError> {
        let index = self.graph.index_of(key)?;
        Ok(self.graph.node_at_mut(index).listeners.dirty.remove(handler))
    }

    /// Call `handler` whenever the effective value of `key` moves by more
    /// than epsilon.
    ///
    /// Handlers run in registration order. Returns `false` if this exact
    /// handler (same `Rc`) is already registered.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use zzprop::{ChangeHandler, Modifier, PropertyGraph, ValueChange};
    ///
    /// let mut graph = PropertyGraph::new();
    /// let hp = graph.create_property("hp", 10.0);
    ///
    /// let seen = Rc::new(RefCell::new(Vec::new()));
    /// let sink = Rc::clone(&seen);
    /// let handler: ChangeHandler =
    ///     Rc::new(move |change: &ValueChange| sink.borrow_mut().push((change.old, change.new)));
    /// assert!(graph.on_value_changed(hp, Rc::clone(&handler)).unwrap());
    /// assert!(!graph.on_value_changed(hp, Rc::clone(&handler)).unwrap());
    ///
    /// graph.add_modifier(hp, Modifier::additive(5.0)).unwrap();
    /// graph.value(hp).unwrap();
    /// assert_eq!(*seen.borrow(), vec![(10.0, 15.0)]);
    ///
    /// assert!(graph.remove_on_value_changed(hp, &handler).unwrap());
    /// graph.set_base_value(hp, 20.0).unwrap();
    /// assert_eq!(seen.borrow().len(), 1);
    /// ```
    pub fn on_value_changed(
        &mut self,
        key: PropertyKey,
        handler: ChangeHandler,
    ) -> Result<bool, PropertyError> {
        let index = self.graph.index_of(key)?;
        Ok(self.graph.node_at_mut(index).listeners.value_changed.add(handler))
    }

    /// Unregister a value-changed handler by `Rc` identity. Returns `false`
    /// if it was not registered.
    pub fn remove_on_value_changed(
        &mut self,
        key: PropertyKey,
        handler: &ChangeHandler,
    ) -> Result<bool, PropertyError> {
        let index = self.graph.index_of(key)?;
        Ok(self
            .graph
            .node_at_mut(index)
            .listeners
            .value_changed
            .remove(handler))
    }

    /// Call `handler` on every accepted base value write to `key`, including
    /// writes made by calculators.
    pub fn on_base_value_changed(
        &mut self,
        key: PropertyKey,
        handler: ChangeHandler,
    ) -> Result<bool, PropertyError> {
        let index = self.graph.index_of(key)?;
        Ok(self.graph.node_at_mut(index).listeners.base_changed.add(handler))
    }

    /// Unregister a base-value handler by `Rc` identity. Returns `false` if
    /// it was not registered.
    pub fn remove_on_base_value_changed(
        &mut self,
        key: PropertyKey,
        handler: &ChangeHandler,
    ) -> Result<bool, PropertyError> {
        let index = self.graph.index_of(key)?;
        Ok(self
            .graph
            .node_at_mut(index)
            .listeners
            .base_changed
            .remove(handler))
    }

    /// Explain the value of `key` step by step.
    ///
    /// Dependencies are refreshed first. For a volatile property the
    /// breakdown is a fresh sample and does not touch the cache.
    pub fn breakdown(&mut self, key: PropertyKey) -> Result<ValueBreakdown, PropertyError> {
        let index = self.graph.index_of(key)?;
        self.evaluate(index);

        let node = self.graph.node_at(index);
        let (_, steps) =
            self.registry
                .fold_with_steps(node.base_value(), node.modifiers(), &mut self.rng);
        let mut breakdown = ValueBreakdown::new(node.id().clone(), node.base_value());
        for (kind, strategy, modifiers, value) in steps {
            breakdown.push_step(kind, strategy, modifiers, value);
        }
        Ok(breakdown)
    }

    /// Label, base value and modifiers of `key`. Edges are not captured.
    pub fn snapshot(&self, key: PropertyKey) -> Result<PropertySnapshot, PropertyError> {
        let node = self.graph.node(key)?;
        Ok(PropertySnapshot {
            id: node.id().clone(),
            base_value: node.base_value(),
            modifiers: node.modifiers().iter().copied().collect(),
        })
    }

    /// Create a new property from a snapshot. Nothing is created unless every
    /// modifier is valid.
    pub fn restore(&mut self, snapshot: &PropertySnapshot) -> Result<PropertyKey, PropertyError> {
        for modifier in &snapshot.modifiers {
            modifier.validate()?;
        }
        let key = self.create_property(snapshot.id.clone(), snapshot.base_value);
        let index = self.graph.index_of(key)?;
        let added = snapshot
            .modifiers
            .iter()
            .filter(|modifier| self.attach(index, **modifier))
            .count();
        if added > 0 {
            self.modifiers_changed(index);
        }
        Ok(key)
    }

    /// Refresh `index` and push a moved value into its dependents.
    pub(crate) fn evaluate(&mut self, index: NodeIndex) -> f64 {
        if let Some(change) = self.refresh(index) {
            self.trigger_dependent_updates(index, change.new);
        }
        self.graph.node_at(index).cached_value()
    }

    /// Recompute `index` if needed and announce a moved value. Dependents
    /// are left to the caller.
    pub(crate) fn refresh(&mut self, index: NodeIndex) -> Option<ValueChange> {
        let change = self.recompute(index)?;
        for handler in self.graph.node_at(index).listeners.value_changed.snapshot() {
            handler(&change);
        }
        Some(change)
    }

    /// Write a base value coming from a caller or a calculator, then
    /// refresh. Returns the value change, if any.
    pub(crate) fn push_base_value(&mut self, index: NodeIndex, value: f64) -> Option<ValueChange> {
        let node = self.graph.node_at_mut(index);
        if (value - node.base_value()).abs() <= self.config.epsilon {
            return None;
        }
        let old = node.set_base_value(value);
        self.mark_dirty(index);

        let change = ValueChange {
            property: self.graph.key_of(index),
            old,
            new: value,
        };
        for handler in self.graph.node_at(index).listeners.base_changed.snapshot() {
            handler(&change);
        }
        self.refresh(index)
    }

    fn recompute(&mut self, index: NodeIndex) -> Option<ValueChange> {
        if !self.needs_recompute(index) {
            return None;
        }
        // A volatile dependency resamples on every pull and pushes into this
        // node again; the nested recompute then folds without pulling.
        if self.graph.has_dependencies(index) && !self.pulling.contains_key(&index) {
            self.pulling.insert(index, false);
            for dependency in self.graph.dependencies(index) {
                self.evaluate(dependency);
            }
            let refolded = self.pulling.remove(&index).unwrap_or(false);
            // a push from a dependency already folded and announced this node
            if refolded || !self.needs_recompute(index) {
                return None;
            }
        }

        let node = self.graph.node_at(index);
        let value = self
            .registry
            .fold(node.base_value(), node.modifiers(), &mut self.rng);
        let old = self.graph.node_at_mut(index).store_value(value);
        if let Some(refolded) = self.pulling.get_mut(&index) {
            *refolded = true;
        }
        trace!(property = %self.graph.node_at(index).id(), old, new = value, "recomputed");

        if (value - old).abs() > self.config.epsilon {
            Some(ValueChange {
                property: self.graph.key_of(index),
                old,
                new: value,
            })
        } else {
            None
        }
    }

    fn needs_recompute(&self, index: NodeIndex) -> bool {
        let node = self.graph.node_at(index);
        node.is_dirty() || node.is_volatile()
    }

    fn attach(&mut self, index: NodeIndex, modifier: Modifier) -> bool {
        let non_deterministic = self.registry.is_volatile(modifier.kind());
        let attached = self
            .graph
            .node_at_mut(index)
            .attach(modifier, non_deterministic);
        if attached {
            trace!(modifier = %modifier.id(), kind = ?modifier.kind(), "modifier attached");
        }
        attached
    }

    fn detach(&mut self, index: NodeIndex, id: ModifierId) -> bool {
        let registry = &self.registry;
        let detached = self
            .graph
            .node_at_mut(index)
            .detach(id, |kind| registry.is_volatile(kind));
        if detached.is_some() {
            trace!(modifier = %id, "modifier detached");
        }
        detached.is_some()
    }

    fn modifiers_changed(&mut self, index: NodeIndex) {
        self.refresh_volatility(index);
        self.mark_dirty(index);
    }

    fn connect(
        &mut self,
        node: PropertyKey,
        dependency: PropertyKey,
        calculator: Option<Calculator>,
    ) -> Result<(), PropertyError> {
        let dependent = self.graph.index_of(node)?;
        let source = self.graph.index_of(dependency)?;
        match self.graph.add_edge(source, dependent, calculator) {
            Ok(EdgeChange::Installed) => {
                debug!(
                    source = %self.graph.node_at(source).id(),
                    dependent = %self.graph.node_at(dependent).id(),
                    "dependency added"
                );
                self.mark_dirty(dependent);
                self.refresh_volatility(dependent);
                Ok(())
            }
            Ok(EdgeChange::CalculatorReplaced) => {
                debug!(
                    source = %self.graph.node_at(source).id(),
                    dependent = %self.graph.node_at(dependent).id(),
                    "calculator replaced"
                );
                Ok(())
            }
            Err(err) => {
                warn!(%err, "dependency rejected");
                Err(err)
            }
        }
    }
}

impl Default for PropertyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyGraph")
            .field("properties", &self.graph.len())
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}
