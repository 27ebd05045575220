//! Dependency graph module.
//!
//! Provides the `DependencyGraph`, the arena that owns every property node
//! and the directed edges between them. An edge `source -> dependent` means
//! the dependent is recomputed (and possibly re-based) when the source
//! changes. Each edge exists once in the arena, so "`dependent` is among the
//! dependents of `source`" and "`source` is among the dependencies of
//! `dependent`" can never disagree.
//!
//! The graph is kept acyclic: an edge that would close a cycle is refused
//! before anything is changed.

use crate::error::PropertyError;
use crate::property::PropertyNode;
use crate::property_id::PropertyId;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Computes a dependent's new base value from its source.
///
/// Called with the source node and the source's freshly computed value.
pub type Calculator = Box<dyn Fn(&PropertyNode, f64) -> f64>;

/// Handle to a property inside a [`PropertyGraph`](crate::PropertyGraph).
///
/// Keys are generational: once the property is removed the key is rejected
/// with [`PropertyError::UnknownProperty`], even if the arena slot is later
/// reused by another property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    index: NodeIndex,
    generation: u32,
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index.index(), self.generation)
    }
}

/// Outcome of [`DependencyGraph::add_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeChange {
    Installed,
    CalculatorReplaced,
}

pub(crate) struct DependencyEdge {
    calculator: Option<Calculator>,
    // insertion order; petgraph iterates adjacency newest-first
    seq: u64,
}

/// Arena of property nodes plus their dependency edges.
///
/// Read access is public; all mutation goes through
/// [`PropertyGraph`](crate::PropertyGraph) so that dirty flags, volatility and
/// notifications stay consistent with the edge set.
pub struct DependencyGraph {
    graph: StableDiGraph<PropertyNode, DependencyEdge>,
    next_generation: u32,
    next_edge_seq: u64,
}

impl DependencyGraph {
    pub(crate) fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            next_generation: 0,
            next_edge_seq: 0,
        }
    }

    /// Number of live properties.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether `key` addresses a live property.
    pub fn contains(&self, key: PropertyKey) -> bool {
        self.index_of(key).is_ok()
    }

    /// Keys of all live properties, in arena order.
    pub fn keys(&self) -> Vec<PropertyKey> {
        self.graph
            .node_indices()
            .map(|index| self.key_of(index))
            .collect()
    }

    /// The node behind `key`.
    pub fn node(&self, key: PropertyKey) -> Result<&PropertyNode, PropertyError> {
        self.index_of(key).map(|index| &self.graph[index])
    }

    /// Properties `key` depends on, in the order the edges were added.
    pub fn dependencies_of(&self, key: PropertyKey) -> Result<Vec<PropertyKey>, PropertyError> {
        let index = self.index_of(key)?;
        Ok(self.keys_of(self.dependencies(index)))
    }

    /// Properties depending on `key`, in the order the edges were added.
    pub fn dependents_of(&self, key: PropertyKey) -> Result<Vec<PropertyKey>, PropertyError> {
        let index = self.index_of(key)?;
        Ok(self.keys_of(self.dependents(index)))
    }

    /// The cycle that making `dependent` depend on `source` would close, if
    /// any, as property labels in data-flow order.
    ///
    /// Walks breadth-first from `source` through its own dependencies looking
    /// for `dependent`. A property depending on itself is the shortest cycle.
    pub fn would_create_cycle(
        &self,
        source: PropertyKey,
        dependent: PropertyKey,
    ) -> Result<Option<Vec<PropertyId>>, PropertyError> {
        let source = self.index_of(source)?;
        let dependent = self.index_of(dependent)?;
        Ok(self.cycle_path(source, dependent))
    }

    pub(crate) fn insert(&mut self, mut node: PropertyNode) -> PropertyKey {
        node.generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let index = self.graph.add_node(node);
        self.key_of(index)
    }

    /// Remove a node together with every edge touching it.
    pub(crate) fn remove(&mut self, index: NodeIndex) -> Option<PropertyNode> {
        self.graph.remove_node(index)
    }

    pub(crate) fn index_of(&self, key: PropertyKey) -> Result<NodeIndex, PropertyError> {
        match self.graph.node_weight(key.index) {
            Some(node) if node.generation == key.generation => Ok(key.index),
            _ => Err(PropertyError::UnknownProperty(key)),
        }
    }

    pub(crate) fn key_of(&self, index: NodeIndex) -> PropertyKey {
        PropertyKey {
            index,
            generation: self.graph[index].generation,
        }
    }

    pub(crate) fn node_at(&self, index: NodeIndex) -> &PropertyNode {
        &self.graph[index]
    }

    pub(crate) fn node_at_mut(&mut self, index: NodeIndex) -> &mut PropertyNode {
        &mut self.graph[index]
    }

    /// Install `source -> dependent`, or replace the calculator if the edge
    /// already exists. Refused with [`PropertyError::Cycle`] if the edge
    /// would close a cycle; the graph is left untouched in that case.
    pub(crate) fn add_edge(
        &mut self,
        source: NodeIndex,
        dependent: NodeIndex,
        calculator: Option<Calculator>,
    ) -> Result<EdgeChange, PropertyError> {
        if let Some(edge) = self.graph.find_edge(source, dependent) {
            self.graph[edge].calculator = calculator;
            return Ok(EdgeChange::CalculatorReplaced);
        }
        if let Some(path) = self.cycle_path(source, dependent) {
            return Err(PropertyError::Cycle { path });
        }
        let seq = self.next_edge_seq;
        self.next_edge_seq += 1;
        self.graph
            .add_edge(source, dependent, DependencyEdge { calculator, seq });
        Ok(EdgeChange::Installed)
    }

    /// Drop `source -> dependent` and its calculator. Returns `false` if
    /// there was no such edge.
    pub(crate) fn remove_edge(&mut self, source: NodeIndex, dependent: NodeIndex) -> bool {
        match self.graph.find_edge(source, dependent) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    pub(crate) fn calculator(&self, source: NodeIndex, dependent: NodeIndex) -> Option<&Calculator> {
        self.graph
            .find_edge(source, dependent)
            .and_then(|edge| self.graph[edge].calculator.as_ref())
    }

    pub(crate) fn dependencies(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.ordered_neighbors(index, Direction::Incoming)
    }

    pub(crate) fn dependents(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.ordered_neighbors(index, Direction::Outgoing)
    }

    pub(crate) fn has_dependencies(&self, index: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(index, Direction::Incoming)
            .next()
            .is_some()
    }

    pub(crate) fn has_dependents(&self, index: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(index, Direction::Outgoing)
            .next()
            .is_some()
    }

    /// Whether any direct dependency is volatile.
    pub(crate) fn has_volatile_dependency(&self, index: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(index, Direction::Incoming)
            .any(|dependency| self.graph[dependency].is_volatile())
    }

    fn ordered_neighbors(&self, index: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut edges: Vec<(u64, NodeIndex)> = self
            .graph
            .edges_directed(index, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                (edge.weight().seq, other)
            })
            .collect();
        edges.sort_unstable_by_key(|(seq, _)| *seq);
        edges.into_iter().map(|(_, other)| other).collect()
    }

    fn keys_of(&self, indices: Vec<NodeIndex>) -> Vec<PropertyKey> {
        indices.into_iter().map(|index| self.key_of(index)).collect()
    }

    fn cycle_path(&self, source: NodeIndex, dependent: NodeIndex) -> Option<Vec<PropertyId>> {
        if source == dependent {
            let id = self.graph[source].id().clone();
            return Some(vec![id.clone(), id]);
        }

        // BFS upstream from source; parents point back towards source
        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([source]);
        while let Some(current) = queue.pop_front() {
            for upstream in self.dependencies(current) {
                if upstream == source || parents.contains_key(&upstream) {
                    continue;
                }
                parents.insert(upstream, current);
                if upstream == dependent {
                    return Some(self.close_cycle(dependent, source, &parents));
                }
                queue.push_back(upstream);
            }
        }
        None
    }

    /// Walk parent links from `dependent` down to `source`, which is exactly
    /// data-flow order, then close the loop with the would-be edge.
    fn close_cycle(
        &self,
        dependent: NodeIndex,
        source: NodeIndex,
        parents: &HashMap<NodeIndex, NodeIndex>,
    ) -> Vec<PropertyId> {
        let mut path = vec![self.graph[dependent].id().clone()];
        let mut current = dependent;
        while current != source {
            match parents.get(&current) {
                Some(&next) => {
                    path.push(self.graph[next].id().clone());
                    current = next;
                }
                None => break,
            }
        }
        path.push(self.graph[dependent].id().clone());
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(labels: &[&str]) -> (DependencyGraph, Vec<NodeIndex>) {
        let mut graph = DependencyGraph::new();
        let indices = labels
            .iter()
            .map(|label| {
                let key = graph.insert(PropertyNode::new(PropertyId::new(*label), 0.0));
                key.index
            })
            .collect();
        (graph, indices)
    }

    fn ids(path: &[PropertyId]) -> Vec<&str> {
        path.iter().map(PropertyId::as_str).collect()
    }

    #[test]
    fn test_edges_are_symmetric() {
        let (mut graph, n) = graph_with(&["str", "atk"]);
        graph.add_edge(n[0], n[1], None).unwrap();

        assert_eq!(graph.dependents(n[0]), vec![n[1]]);
        assert_eq!(graph.dependencies(n[1]), vec![n[0]]);
        assert!(graph.has_dependents(n[0]));
        assert!(graph.has_dependencies(n[1]));

        assert!(graph.remove_edge(n[0], n[1]));
        assert!(graph.dependents(n[0]).is_empty());
        assert!(graph.dependencies(n[1]).is_empty());
        assert!(!graph.remove_edge(n[0], n[1]));
    }

    #[test]
    fn test_neighbors_keep_insertion_order() {
        let (mut graph, n) = graph_with(&["src", "a", "b", "c"]);
        graph.add_edge(n[0], n[2], None).unwrap();
        graph.add_edge(n[0], n[1], None).unwrap();
        graph.add_edge(n[0], n[3], None).unwrap();

        assert_eq!(graph.dependents(n[0]), vec![n[2], n[1], n[3]]);
    }

    #[test]
    fn test_duplicate_edge_replaces_calculator() {
        let (mut graph, n) = graph_with(&["a", "b"]);
        assert_eq!(graph.add_edge(n[0], n[1], None).unwrap(), EdgeChange::Installed);
        assert!(graph.calculator(n[0], n[1]).is_none());

        let change = graph
            .add_edge(n[0], n[1], Some(Box::new(|_: &PropertyNode, v: f64| v * 2.0)))
            .unwrap();
        assert_eq!(change, EdgeChange::CalculatorReplaced);
        assert_eq!(graph.dependents(n[0]).len(), 1);

        let calculator = graph.calculator(n[0], n[1]).unwrap();
        assert_eq!(calculator(graph.node_at(n[0]), 4.0), 8.0);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let (mut graph, n) = graph_with(&["a"]);
        let err = graph.add_edge(n[0], n[0], None).unwrap_err();
        match err {
            PropertyError::Cycle { path } => assert_eq!(ids(&path), vec!["a", "a"]),
            other => panic!("Expected Cycle error, got {other:?}"),
        }
        assert!(graph.dependents(n[0]).is_empty());
    }

    #[test]
    fn test_two_node_cycle_rejected() {
        let (mut graph, n) = graph_with(&["a", "b"]);
        // b depends on a
        graph.add_edge(n[0], n[1], None).unwrap();
        // a depends on b
        let err = graph.add_edge(n[1], n[0], None).unwrap_err();
        match err {
            PropertyError::Cycle { path } => assert_eq!(ids(&path), vec!["a", "b", "a"]),
            other => panic!("Expected Cycle error, got {other:?}"),
        }
        assert_eq!(graph.dependents(n[0]), vec![n[1]]);
        assert!(graph.dependents(n[1]).is_empty());
    }

    #[test]
    fn test_transitive_cycle_path() {
        let (mut graph, n) = graph_with(&["a", "b", "c", "d"]);
        // a -> b -> c -> d
        graph.add_edge(n[0], n[1], None).unwrap();
        graph.add_edge(n[1], n[2], None).unwrap();
        graph.add_edge(n[2], n[3], None).unwrap();

        // a depending on d closes a -> b -> c -> d -> a
        let err = graph.add_edge(n[3], n[0], None).unwrap_err();
        match err {
            PropertyError::Cycle { path } => {
                assert_eq!(ids(&path), vec!["a", "b", "c", "d", "a"]);
            }
            other => panic!("Expected Cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_path_excludes_unrelated_nodes() {
        let (mut graph, n) = graph_with(&["x", "a", "b", "y"]);
        // x -> a -> b, y -> b
        graph.add_edge(n[0], n[1], None).unwrap();
        graph.add_edge(n[1], n[2], None).unwrap();
        graph.add_edge(n[3], n[2], None).unwrap();

        let err = graph.add_edge(n[2], n[1], None).unwrap_err();
        match err {
            PropertyError::Cycle { path } => {
                assert_eq!(ids(&path), vec!["a", "b", "a"]);
            }
            other => panic!("Expected Cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let (mut graph, n) = graph_with(&["top", "left", "right", "bottom"]);
        graph.add_edge(n[0], n[1], None).unwrap();
        graph.add_edge(n[0], n[2], None).unwrap();
        graph.add_edge(n[1], n[3], None).unwrap();
        assert!(graph.add_edge(n[2], n[3], None).is_ok());
        assert!(graph.cycle_path(n[0], n[3]).is_none());
        assert!(graph.cycle_path(n[3], n[0]).is_some());
    }

    #[test]
    fn test_stale_key_rejected_after_slot_reuse() {
        let mut graph = DependencyGraph::new();
        let old = graph.insert(PropertyNode::new(PropertyId::new("old"), 0.0));
        graph.remove(old.index);
        let new = graph.insert(PropertyNode::new(PropertyId::new("new"), 0.0));

        assert_eq!(old.index, new.index);
        assert!(!graph.contains(old));
        assert!(graph.contains(new));
        assert_eq!(
            graph.node(old).unwrap_err(),
            PropertyError::UnknownProperty(old)
        );
    }

    #[test]
    fn test_removing_node_detaches_edges() {
        let (mut graph, n) = graph_with(&["a", "b", "c"]);
        graph.add_edge(n[0], n[1], None).unwrap();
        graph.add_edge(n[1], n[2], None).unwrap();

        graph.remove(n[1]);
        assert!(graph.dependents(n[0]).is_empty());
        assert!(graph.dependencies(n[2]).is_empty());
        assert_eq!(graph.len(), 2);
    }
}
