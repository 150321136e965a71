//! Configuration for the neural engine.
//!
//! All parameters have defaults matching the reference network and can be
//! overridden from YAML (see [`crate::YamlConfig`]).

use serde::{Deserialize, Serialize};

use super::activation::ActivationFunction;

/// Specification of a single layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Layer name, also used as the layer id.
    pub name: String,
    /// Number of neurons, must be at least 1.
    pub neuron_count: usize,
    /// Transfer function shared by every neuron of the layer.
    pub activation: ActivationFunction,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>, neuron_count: usize, activation: ActivationFunction) -> Self {
        Self {
            name: name.into(),
            neuron_count,
            activation,
        }
    }
}

/// Network topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Ordered layer list; propagation follows this order.
    pub layers: Vec<LayerSpec>,
}

impl NetworkConfig {
    /// The five-layer reference architecture (368 neurons).
    pub fn reference() -> Self {
        Self {
            layers: vec![
                LayerSpec::new("input_layer", 64, ActivationFunction::Linear),
                LayerSpec::new("hidden_layer_1", 128, ActivationFunction::Relu),
                LayerSpec::new("hidden_layer_2", 96, ActivationFunction::Tanh),
                LayerSpec::new("associative_layer", 48, ActivationFunction::Sigmoid),
                LayerSpec::new("output_layer", 32, ActivationFunction::SoftmaxLike),
            ],
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::reference()
    }
}

/// Associative memory bounds and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum short-term records; the oldest record is evicted first.
    pub short_term_capacity: usize,

    /// Maximum long-term records; the oldest record is evicted first.
    pub long_term_capacity: usize,

    /// Maximum stored patterns; the least recently seen pattern is evicted first.
    pub pattern_capacity: usize,

    /// A short-term record must score strictly above this to be recalled.
    pub record_similarity_threshold: f64,

    /// A stored pattern must score strictly above this to be recalled.
    pub pattern_similarity_threshold: f64,

    /// Records are copied to long-term storage when novelty is strictly above this.
    pub promotion_novelty_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: 1000,
            long_term_capacity: 10_000,
            pattern_capacity: 500,
            record_similarity_threshold: 0.3,
            pattern_similarity_threshold: 0.4,
            promotion_novelty_threshold: 0.7,
        }
    }
}

/// Parameters of the bootstrap pass run by `initialize()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Minimum number of seeded patterns (inclusive).
    pub min_patterns: usize,

    /// Maximum number of seeded patterns (inclusive).
    pub max_patterns: usize,

    /// Simulated setup delay before the engine becomes active.
    pub setup_delay_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            min_patterns: 5,
            max_patterns: 13,
            setup_delay_ms: 50,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub network: NetworkConfig,
    pub memory: MemoryConfig,
    pub bootstrap: BootstrapConfig,

    /// Seed for the random source. `None` seeds from OS entropy.
    pub seed: Option<u64>,

    /// Capacity of the outbound event channel.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            memory: MemoryConfig::default(),
            bootstrap: BootstrapConfig::default(),
            seed: None,
            event_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.network.layers.len(), 5);
        let total: usize = config.network.layers.iter().map(|l| l.neuron_count).sum();
        assert_eq!(total, 368);
        assert_eq!(config.network.layers[0].activation, ActivationFunction::Linear);
        assert_eq!(config.network.layers[4].activation, ActivationFunction::SoftmaxLike);

        assert_eq!(config.memory.short_term_capacity, 1000);
        assert!((config.memory.record_similarity_threshold - 0.3).abs() < f64::EPSILON);
        assert!((config.memory.pattern_similarity_threshold - 0.4).abs() < f64::EPSILON);
        assert!((config.memory.promotion_novelty_threshold - 0.7).abs() < f64::EPSILON);

        assert_eq!(config.bootstrap.min_patterns, 5);
        assert_eq!(config.bootstrap.max_patterns, 13);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
memory:
  short_term_capacity: 16
seed: 7
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.memory.short_term_capacity, 16);
        assert_eq!(config.memory.long_term_capacity, 10_000);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.network.layers.len(), 5);
    }

    #[test]
    fn test_layer_yaml() {
        let yaml = r#"
layers:
  - name: input
    neuron_count: 4
    activation: linear
  - name: hidden
    neuron_count: 4
    activation: relu
"#;
        let config: NetworkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.layers.len(), 2);
        assert_eq!(config.layers[1], LayerSpec::new("hidden", 4, ActivationFunction::Relu));
    }
}
