//! # zzprop - Reactive Property Graph for Game Stats
//!
//! Mutable numeric properties whose effective value is derived from:
//! - a **base value**,
//! - a set of **modifiers** folded in a fixed, insertion-independent order,
//! - optionally, **dependencies** on other properties in an acyclic graph.
//!
//! ## Core Concepts
//!
//! ### Evaluation
//!
//! ```text
//! base value → [Additive] → [PercentAdditive] → [Multiplicative]
//!            → [Override] → [RandomRange] → [Clamp] → effective value
//! ```
//!
//! Each modifier kind is folded by one strategy from the
//! [`StrategyRegistry`]. The order is a rank table, so two properties with
//! the same modifiers always agree, whatever order the modifiers were added
//! in.
//!
//! ### Push and Pull
//!
//! - **Reads are lazy**: a clean property answers from its cache.
//! - **Writes are eager**: a base value write recomputes the property and
//!   pushes its new value into dependents, through calculators where the
//!   edge has one.
//! - **Volatile** properties (holding, or depending on, a random modifier)
//!   recompute on every read.
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use zzprop::*;
//!
//! let mut graph = PropertyGraph::with_config(GraphConfig::new().with_seed(7)).unwrap();
//! let strength = graph.create_property("strength", 10.0);
//! let attack = graph.create_property("attack", 0.0);
//!
//! // Attack is based on twice the strength, then buffed
//! graph.add_dependency_with(attack, strength, |_, v| v * 2.0).unwrap();
//! graph.add_modifier(attack, Modifier::additive(5.0)).unwrap();
//! graph.add_modifier(attack, Modifier::multiplicative(1.5)).unwrap();
//!
//! graph
//!     .on_value_changed(attack, Rc::new(|change: &ValueChange| {
//!         println!("attack {} -> {}", change.old, change.new);
//!     }))
//!     .unwrap();
//!
//! graph.set_base_value(strength, 20.0).unwrap();
//! assert_eq!(graph.base_value(attack).unwrap(), 40.0);
//! assert_eq!(graph.value(attack).unwrap(), 67.5); // (40 + 5) * 1.5
//!
//! // Cycles are refused and leave the graph untouched
//! let err = graph.add_dependency(strength, attack).unwrap_err();
//! assert!(matches!(err, PropertyError::Cycle { .. }));
//! ```
//!
//! ## Modules
//!
//! - [`property_graph`] - The graph façade
//! - [`property`] - Property node state
//! - [`modifier`] - Modifiers and per-property modifier sets
//! - [`strategy`] - Modifier strategies and their registry
//! - [`graph`] - Dependency arena and cycle detection
//! - [`notify`] - Change notifications
//! - [`breakdown`] - Step-by-step value explanations
//! - [`snapshot`] - Reconstructable property state
//! - [`config`] - Graph configuration
//! - [`error`] - Error types

mod cascade;

pub mod breakdown;
pub mod config;
pub mod error;
pub mod graph;
pub mod modifier;
pub mod notify;
pub mod property;
pub mod property_graph;
pub mod property_id;
pub mod snapshot;
pub mod strategy;

// Re-export main types for convenience
pub use breakdown::{BreakdownStep, ValueBreakdown};
pub use config::GraphConfig;
pub use error::PropertyError;
pub use graph::{Calculator, DependencyGraph, PropertyKey};
pub use modifier::{Modifier, ModifierId, ModifierKind, ModifierOp, ModifierSet};
pub use notify::{ChangeHandler, DirtyHandler, ValueChange};
pub use property::PropertyNode;
pub use property_graph::PropertyGraph;
pub use property_id::PropertyId;
pub use snapshot::PropertySnapshot;

// Re-export strategies
pub use strategy::{
    AdditiveStrategy, ClampStrategy, ModifierStrategy, MultiplicativeStrategy,
    OverrideStrategy, PercentAdditiveStrategy, RandomRangeStrategy, StrategyRegistry,
    STANDARD_RANKS,
};
