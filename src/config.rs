//! Graph configuration.
//!
//! `GraphConfig` carries the tunables of a [`PropertyGraph`](crate::PropertyGraph):
//! the change threshold used to decide whether a value "moved" and the seed
//! for random-range sampling. It can be built in code or loaded from JSON.

use crate::error::PropertyError;
use serde::{Deserialize, Serialize};

/// Default change threshold.
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// Configuration of a [`PropertyGraph`](crate::PropertyGraph).
///
/// Missing fields take their defaults when deserializing.
///
/// # Examples
///
/// ```rust
/// use zzprop::GraphConfig;
///
/// let config = GraphConfig::from_json_str(r#"{ "rng_seed": 42 }"#).unwrap();
/// assert_eq!(config.rng_seed, Some(42));
/// assert_eq!(config.epsilon, 1e-4);
///
/// let config = GraphConfig::new().with_epsilon(0.01).with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base and effective values closer than this are considered unchanged.
    pub epsilon: f64,

    /// Seed for random-range sampling. `None` seeds from OS entropy.
    pub rng_seed: Option<u64>,
}

impl GraphConfig {
    /// Default configuration: epsilon [`DEFAULT_EPSILON`], entropy-seeded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::config::{GraphConfig, DEFAULT_EPSILON};
    ///
    /// let config = GraphConfig::new();
    /// assert_eq!(config.epsilon, DEFAULT_EPSILON);
    /// assert_eq!(config.rng_seed, None);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the change threshold. Not checked until [`validate`](Self::validate)
    /// or graph construction.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{GraphConfig, PropertyGraph};
    ///
    /// let config = GraphConfig::new().with_epsilon(0.5);
    /// let mut graph = PropertyGraph::with_config(config).unwrap();
    /// let hp = graph.create_property("hp", 10.0);
    ///
    /// // moves smaller than epsilon are dropped
    /// graph.set_base_value(hp, 10.2).unwrap();
    /// assert_eq!(graph.base_value(hp).unwrap(), 10.0);
    ///
    /// assert!(PropertyGraph::with_config(GraphConfig::new().with_epsilon(-1.0)).is_err());
    /// ```
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Seed random-range sampling, making volatile values reproducible.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzprop::{GraphConfig, Modifier, PropertyGraph};
    ///
    /// let roll = |seed| {
    ///     let mut graph = PropertyGraph::with_config(GraphConfig::new().with_seed(seed)).unwrap();
    ///     let dice = graph.create_property("dice", 0.0);
    ///     graph.add_modifier(dice, Modifier::random_range(1.0, 6.0)).unwrap();
    ///     (0..3).map(|_| graph.value(dice).unwrap()).collect::<Vec<_>>()
    /// };
    /// assert_eq!(roll(9), roll(9));
    /// ```
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, PropertyError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PropertyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject a negative or non-finite epsilon.
    pub fn validate(&self) -> Result<(), PropertyError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(PropertyError::InvalidConfig(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            rng_seed: None,
        }
    }
}
