//! Architecture builder.
//!
//! Turns an ordered list of [`LayerSpec`]s into layers of neurons. Topology is
//! fixed once built; only per-neuron state (activation, last firing time)
//! changes afterwards.

use std::collections::HashSet;
use std::ops::Range;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::activation::ActivationFunction;
use super::config::LayerSpec;
use crate::error::{EngineError, EngineResult};

/// Globally unique neuron index (unique across all layers).
pub type NeuronId = usize;

/// Index into a [`ConnectionSet`](super::connections::ConnectionSet).
pub type ConnectionId = usize;

/// Firing thresholds are drawn from this range at creation.
pub const THRESHOLD_RANGE: Range<f64> = 0.3..0.8;

/// Learning rates are drawn from this range at creation.
pub const LEARNING_RATE_RANGE: Range<f64> = 0.005..0.015;

/// A unit holding an activation value and a firing threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neuron {
    pub id: NeuronId,
    /// Activation computed by the most recent propagation, in `[0, 1]`.
    pub activation: f64,
    pub threshold: f64,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub learning_rate: f64,
    pub outgoing_connection_ids: Vec<ConnectionId>,
}

/// An ordered group of neurons sharing one activation function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub order_index: usize,
    pub neurons: Vec<Neuron>,
    pub activation: ActivationFunction,
}

impl Layer {
    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }
}

/// Build the ordered layer list described by `specs`.
///
/// # Errors
///
/// - [`EngineError::EmptyArchitecture`] if `specs` is empty
/// - [`EngineError::Configuration`] for a zero-sized layer, an empty layer
///   name or a duplicated layer name
pub fn build_architecture<R: Rng + ?Sized>(
    specs: &[LayerSpec],
    rng: &mut R,
) -> EngineResult<Vec<Layer>> {
    if specs.is_empty() {
        return Err(EngineError::EmptyArchitecture);
    }

    let mut seen = HashSet::new();
    for spec in specs {
        if spec.name.trim().is_empty() {
            return Err(EngineError::Configuration(
                "layer name must not be empty".to_string(),
            ));
        }
        if spec.neuron_count == 0 {
            return Err(EngineError::Configuration(format!(
                "layer '{}' must have at least one neuron",
                spec.name
            )));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(EngineError::Configuration(format!(
                "duplicate layer name '{}'",
                spec.name
            )));
        }
    }

    let mut next_id: NeuronId = 0;
    let layers: Vec<Layer> = specs
        .iter()
        .enumerate()
        .map(|(order_index, spec)| {
            let neurons = (0..spec.neuron_count)
                .map(|_| {
                    let id = next_id;
                    next_id += 1;
                    Neuron {
                        id,
                        activation: 0.0,
                        threshold: rng.gen_range(THRESHOLD_RANGE),
                        last_fired_at: None,
                        learning_rate: rng.gen_range(LEARNING_RATE_RANGE),
                        outgoing_connection_ids: Vec::new(),
                    }
                })
                .collect();

            debug!(
                layer = %spec.name,
                neurons = spec.neuron_count,
                activation = %spec.activation,
                "Built layer"
            );

            Layer {
                id: spec.name.clone(),
                order_index,
                neurons,
                activation: spec.activation,
            }
        })
        .collect();

    Ok(layers)
}

/// Total neuron count across all layers.
pub fn neuron_count(layers: &[Layer]) -> usize {
    layers.iter().map(Layer::len).sum()
}
