//! Propagation through the dependency graph.
//!
//! Three walks run over the edges of a [`PropertyGraph`]:
//!
//! - dirty propagation, which follows clean → dirty transitions downstream
//!   without recomputing anything;
//! - volatility aggregation, which re-derives the volatile flag downstream of
//!   a node whose flag flipped;
//! - the push cascade, which hands a node's new value to its dependents
//!   (through calculators where present) and keeps going through every
//!   dependent whose value moved.
//!
//! All three use an explicit stack and visit dependents in the order their
//! edges were added, depth-first.

use crate::property_graph::PropertyGraph;
use petgraph::stable_graph::NodeIndex;
use tracing::{debug, trace};

impl PropertyGraph {
    /// Mark `index` dirty. Every clean → dirty transition fires the node's
    /// dirty handlers and continues into its dependents.
    pub(crate) fn mark_dirty(&mut self, index: NodeIndex) {
        let mut pending = vec![index];
        while let Some(current) = pending.pop() {
            if !self.graph.node_at_mut(current).mark_dirty() {
                continue;
            }
            let key = self.graph.key_of(current);
            let node = self.graph.node_at(current);
            trace!(property = %node.id(), %key, "marked dirty");
            for handler in node.listeners.dirty.snapshot() {
                handler(key);
            }
            pending.extend(self.graph.dependents(current).into_iter().rev());
        }
    }

    /// Re-derive the volatile flag of `index`, and of everything downstream
    /// while the flag keeps flipping.
    pub(crate) fn refresh_volatility(&mut self, index: NodeIndex) {
        let mut pending = vec![index];
        while let Some(current) = pending.pop() {
            let volatile = self.graph.node_at(current).has_non_deterministic_modifiers()
                || self.graph.has_volatile_dependency(current);
            if !self.graph.node_at_mut(current).set_volatile(volatile) {
                continue;
            }
            debug!(
                property = %self.graph.node_at(current).id(),
                volatile,
                "volatility changed"
            );
            pending.extend(self.graph.dependents(current));
        }
    }

    /// Push `value`, the fresh value of `source`, into its dependents.
    ///
    /// A calculator edge re-bases the dependent with the calculator's
    /// result; a plain edge marks the dependent dirty and recomputes it.
    /// Whenever a dependent's value moves, its own dependents are visited
    /// next, before the remaining siblings.
    pub(crate) fn trigger_dependent_updates(&mut self, source: NodeIndex, value: f64) {
        if !self.graph.has_dependents(source) {
            return;
        }
        let mut pending: Vec<(NodeIndex, NodeIndex, f64)> = Vec::new();
        self.schedule_dependents(&mut pending, source, value);

        while let Some((source, dependent, value)) = pending.pop() {
            trace!(
                source = %self.graph.node_at(source).id(),
                dependent = %self.graph.node_at(dependent).id(),
                value,
                "cascade step"
            );
            let change = match self.graph.calculator(source, dependent) {
                Some(calculator) => {
                    let base = calculator(self.graph.node_at(source), value);
                    self.push_base_value(dependent, base)
                }
                None => {
                    self.mark_dirty(dependent);
                    self.refresh(dependent)
                }
            };
            if let Some(change) = change {
                self.schedule_dependents(&mut pending, dependent, change.new);
            }
        }
    }

    fn schedule_dependents(
        &self,
        pending: &mut Vec<(NodeIndex, NodeIndex, f64)>,
        source: NodeIndex,
        value: f64,
    ) {
        // reversed so the first edge is popped first
        pending.extend(
            self.graph
                .dependents(source)
                .into_iter()
                .rev()
                .map(|dependent| (source, dependent, value)),
        );
    }
}
