//! Modifier strategies and the strategy registry.
//!
//! A strategy folds every modifier of one kind into the running value in a
//! single step. The registry holds one strategy per kind and applies them in
//! a fixed global order taken from an explicit rank table, so two properties
//! with the same modifiers always produce the same value no matter the order
//! the modifiers were attached in.
//!
//! ```text
//! base → Additive → PercentAdditive → Multiplicative → Override → RandomRange → Clamp → value
//! ```

use crate::modifier::{Modifier, ModifierKind, ModifierOp, ModifierSet};
use rand::{Rng, RngCore};

/// Rank table used by [`StrategyRegistry::standard`]. Lower ranks apply first.
pub const STANDARD_RANKS: [(ModifierKind, u8); 6] = [
    (ModifierKind::Additive, 10),
    (ModifierKind::PercentAdditive, 20),
    (ModifierKind::Multiplicative, 30),
    (ModifierKind::Override, 40),
    (ModifierKind::RandomRange, 50),
    (ModifierKind::Clamp, 60),
];

/// Folds all modifiers of one kind into an accumulator.
///
/// Strategies receive only the modifiers of the kind they are registered
/// for, in insertion order. Payloads of other kinds are ignored.
///
/// # Examples
///
/// ```rust
/// use zzprop::strategy::{AdditiveStrategy, ModifierStrategy};
/// use zzprop::Modifier;
///
/// let mut rng = rand::thread_rng();
/// let mut value = 10.0;
/// AdditiveStrategy.apply(&mut value, &[Modifier::additive(2.0), Modifier::additive(3.0)], &mut rng);
/// assert_eq!(value, 15.0);
/// ```
pub trait ModifierStrategy: Send + Sync {
    /// Apply the whole group to `accumulator`.
    fn apply(&self, accumulator: &mut f64, modifiers: &[Modifier], rng: &mut dyn RngCore);

    /// Whether the output is a pure function of the inputs.
    ///
    /// Properties holding a modifier whose strategy is not deterministic are
    /// volatile and never trust their cache.
    fn is_deterministic(&self) -> bool {
        true
    }

    /// Short name used in breakdowns and logs.
    fn description(&self) -> &str;
}

/// Sums flat bonuses and adds them once.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveStrategy;

impl ModifierStrategy for AdditiveStrategy {
    fn apply(&self, accumulator: &mut f64, modifiers: &[Modifier], _rng: &mut dyn RngCore) {
        let sum: f64 = modifiers
            .iter()
            .filter_map(|m| match m.op() {
                ModifierOp::Additive { value } => Some(*value),
                _ => None,
            })
            .sum();
        *accumulator += sum;
    }

    fn description(&self) -> &str {
        "additive"
    }
}

/// Sums percentages and scales by `1 + sum` once.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentAdditiveStrategy;

impl ModifierStrategy for PercentAdditiveStrategy {
    fn apply(&self, accumulator: &mut f64, modifiers: &[Modifier], _rng: &mut dyn RngCore) {
        let percent: f64 = modifiers
            .iter()
            .filter_map(|m| match m.op() {
                ModifierOp::PercentAdditive { value } => Some(*value),
                _ => None,
            })
            .sum();
        *accumulator *= 1.0 + percent;
    }

    fn description(&self) -> &str {
        "percent additive"
    }
}

/// Multiplies factors together and applies the product once.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplicativeStrategy;

impl ModifierStrategy for MultiplicativeStrategy {
    fn apply(&self, accumulator: &mut f64, modifiers: &[Modifier], _rng: &mut dyn RngCore) {
        let product: f64 = modifiers
            .iter()
            .filter_map(|m| match m.op() {
                ModifierOp::Multiplicative { factor } => Some(*factor),
                _ => None,
            })
            .product();
        *accumulator *= product;
    }

    fn description(&self) -> &str {
        "multiplicative"
    }
}

/// Replaces the accumulator with the winning override.
///
/// The highest priority wins; among equal priorities the most recently
/// attached one wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideStrategy;

impl ModifierStrategy for OverrideStrategy {
    fn apply(&self, accumulator: &mut f64, modifiers: &[Modifier], _rng: &mut dyn RngCore) {
        // max_by_key keeps the last of equal maxima
        let winner = modifiers
            .iter()
            .filter_map(|m| match m.op() {
                ModifierOp::Override { value } => Some((m.priority(), *value)),
                _ => None,
            })
            .max_by_key(|(priority, _)| *priority);
        if let Some((_, value)) = winner {
            *accumulator = value;
        }
    }

    fn description(&self) -> &str {
        "override"
    }
}

/// Intersects all clamp bounds and applies the result.
///
/// - `effective_min = max(all mins)`
/// - `effective_max = min(all maxes)`
///
/// The lower bound is applied before the upper one, so disjoint bounds from
/// different modifiers resolve to the upper bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClampStrategy;

impl ModifierStrategy for ClampStrategy {
    fn apply(&self, accumulator: &mut f64, modifiers: &[Modifier], _rng: &mut dyn RngCore) {
        let mut lower: Option<f64> = None;
        let mut upper: Option<f64> = None;
        for modifier in modifiers {
            if let ModifierOp::Clamp { min, max } = *modifier.op() {
                if let Some(min) = min {
                    lower = Some(lower.map_or(min, |current| current.max(min)));
                }
                if let Some(max) = max {
                    upper = Some(upper.map_or(max, |current| current.min(max)));
                }
            }
        }
        if let Some(lower) = lower {
            *accumulator = accumulator.max(lower);
        }
        if let Some(upper) = upper {
            *accumulator = accumulator.min(upper);
        }
    }

    fn description(&self) -> &str {
        "clamp"
    }
}

/// Adds one uniform sample from `[min, max]` per modifier, on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRangeStrategy;

impl ModifierStrategy for RandomRangeStrategy {
    fn apply(&self, accumulator: &mut f64, modifiers: &[Modifier], rng: &mut dyn RngCore) {
        for modifier in modifiers {
            if let ModifierOp::RandomRange { min, max } = *modifier.op() {
                *accumulator += rng.gen_range(min..=max);
            }
        }
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn description(&self) -> &str {
        "random range"
    }
}

struct RegistryEntry {
    kind: ModifierKind,
    rank: u8,
    strategy: Box<dyn ModifierStrategy>,
}

/// One strategy per modifier kind, applied in rank order.
///
/// The registry is an ordinary value: build one, optionally replace
/// strategies, then hand it to a [`PropertyGraph`](crate::PropertyGraph)
/// (several graphs may share one through `Arc`). Strategies are resolved
/// once at construction; folding does no lookup beyond walking the table.
///
/// Kinds with equal rank apply in the order they were registered.
///
/// # Examples
///
/// ```rust
/// use zzprop::{Modifier, ModifierKind, ModifierSet, StrategyRegistry};
///
/// let registry = StrategyRegistry::standard();
/// let mut modifiers = ModifierSet::new();
/// modifiers.insert(Modifier::multiplicative(2.0));
/// modifiers.insert(Modifier::additive(5.0));
///
/// let mut rng = rand::thread_rng();
/// // additive ranks before multiplicative: (10 + 5) * 2
/// assert_eq!(registry.fold(10.0, &modifiers, &mut rng), 30.0);
/// assert!(registry.rank(ModifierKind::Additive) < registry.rank(ModifierKind::Multiplicative));
/// ```
pub struct StrategyRegistry {
    entries: Vec<RegistryEntry>,
}

impl StrategyRegistry {
    /// The built-in strategies under [`STANDARD_RANKS`].
    pub fn standard() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(STANDARD_RANKS.len()),
        };
        for (kind, rank) in STANDARD_RANKS {
            registry.register(kind, rank, standard_strategy(kind));
        }
        registry
    }

    /// Install `strategy` for `kind` at `rank`, replacing any previous entry
    /// for that kind.
    pub fn register(
        &mut self,
        kind: ModifierKind,
        rank: u8,
        strategy: Box<dyn ModifierStrategy>,
    ) -> &mut Self {
        self.entries.retain(|entry| entry.kind != kind);
        self.entries.push(RegistryEntry {
            kind,
            rank,
            strategy,
        });
        // stable: equal ranks keep registration order
        self.entries.sort_by_key(|entry| entry.rank);
        self
    }

    /// The strategy for `kind`.
    pub fn strategy(&self, kind: ModifierKind) -> Option<&dyn ModifierStrategy> {
        self.entry(kind).map(|entry| entry.strategy.as_ref())
    }

    pub fn rank(&self, kind: ModifierKind) -> Option<u8> {
        self.entry(kind).map(|entry| entry.rank)
    }

    /// Kinds in application order.
    pub fn order(&self) -> impl Iterator<Item = ModifierKind> + '_ {
        self.entries.iter().map(|entry| entry.kind)
    }

    /// Whether modifiers of `kind` make their property volatile.
    ///
    /// A kind without a strategy never contributes and is not volatile.
    pub fn is_volatile(&self, kind: ModifierKind) -> bool {
        self.strategy(kind)
            .is_some_and(|strategy| !strategy.is_deterministic())
    }

    /// Fold `base` through every non-empty kind group in rank order.
    pub fn fold(&self, base: f64, modifiers: &ModifierSet, rng: &mut dyn RngCore) -> f64 {
        self.fold_inner(base, modifiers, rng, |_, _, _, _| {})
    }

    /// Like [`fold`](Self::fold), also recording the value after each group
    /// as `(kind, strategy description, group size, value)`.
    pub fn fold_with_steps(
        &self,
        base: f64,
        modifiers: &ModifierSet,
        rng: &mut dyn RngCore,
    ) -> (f64, Vec<(ModifierKind, String, usize, f64)>) {
        let mut steps = Vec::new();
        let value = self.fold_inner(base, modifiers, rng, |kind, description, count, value| {
            steps.push((kind, description.to_string(), count, value));
        });
        (value, steps)
    }

    fn fold_inner(
        &self,
        base: f64,
        modifiers: &ModifierSet,
        rng: &mut dyn RngCore,
        mut on_step: impl FnMut(ModifierKind, &str, usize, f64),
    ) -> f64 {
        let mut accumulator = base;
        if modifiers.is_empty() {
            return accumulator;
        }
        for entry in &self.entries {
            let group = modifiers.of_kind(entry.kind);
            if group.is_empty() {
                continue;
            }
            entry.strategy.apply(&mut accumulator, group, rng);
            on_step(entry.kind, entry.strategy.description(), group.len(), accumulator);
        }
        accumulator
    }

    fn entry(&self, kind: ModifierKind) -> Option<&RegistryEntry> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.kind, entry.rank, entry.strategy.description())),
            )
            .finish()
    }
}

fn standard_strategy(kind: ModifierKind) -> Box<dyn ModifierStrategy> {
    match kind {
        ModifierKind::Additive => Box::new(AdditiveStrategy),
        ModifierKind::PercentAdditive => Box::new(PercentAdditiveStrategy),
        ModifierKind::Multiplicative => Box::new(MultiplicativeStrategy),
        ModifierKind::Override => Box::new(OverrideStrategy),
        ModifierKind::RandomRange => Box::new(RandomRangeStrategy),
        ModifierKind::Clamp => Box::new(ClampStrategy),
    }
}
