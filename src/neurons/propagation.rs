//! Forward propagation engine.
//!
//! One sequential pass through the layers in construction order. Each
//! neuron's raw input is
//!
//! ```text
//! raw = 0.1 + distribution[layer] × intensity × 0.4 + connection_term
//! ```
//!
//! where `connection_term` is a random draw in `[0, 0.3)` for neurons with
//! outgoing connections and a flat `0.1` for the last layer. Upstream
//! activations are not read: layer `i + 1` does not depend on what layer `i`
//! just computed, and connection weights do not enter the formula.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::architecture::{Layer, NeuronId};
use crate::encoding::NeuralInput;
use crate::error::{EngineError, EngineResult};

const BASE_INPUT: f64 = 0.1;
const INPUT_GAIN: f64 = 0.4;
const MAX_CONNECTION_TERM: f64 = 0.3;
const TERMINAL_CONNECTION_TERM: f64 = 0.1;

/// Activation of one neuron in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeuronActivation {
    pub neuron_id: NeuronId,
    pub activation: f64,
    pub fired: bool,
}

/// Per-layer outcome of a propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerOutput {
    pub layer_id: String,
    pub activations: Vec<NeuronActivation>,
    pub total_activation: f64,
    pub max_activation: f64,
    pub fire_count: usize,
}

impl LayerOutput {
    pub fn neuron_count(&self) -> usize {
        self.activations.len()
    }

    /// Mean activation, 0 for an empty layer.
    pub fn avg_activation(&self) -> f64 {
        if self.activations.is_empty() {
            0.0
        } else {
            self.total_activation / self.activations.len() as f64
        }
    }

    /// Fraction of neurons that fired.
    pub fn firing_rate(&self) -> f64 {
        if self.activations.is_empty() {
            0.0
        } else {
            self.fire_count as f64 / self.activations.len() as f64
        }
    }
}

/// Result of one forward pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationResult {
    pub id: Uuid,
    pub input_id: Uuid,
    /// One entry per layer, in architecture order.
    pub layer_outputs: Vec<LayerOutput>,
    pub total_activity: f64,
    pub max_activation: f64,
    pub completed_at: DateTime<Utc>,
}

impl PropagationResult {
    pub fn layer_output(&self, layer_id: &str) -> Option<&LayerOutput> {
        self.layer_outputs.iter().find(|o| o.layer_id == layer_id)
    }

    pub fn layer_count(&self) -> usize {
        self.layer_outputs.len()
    }

    /// Ids of every neuron that fired during this pass.
    pub fn fired_neurons(&self) -> impl Iterator<Item = NeuronId> + '_ {
        self.layer_outputs
            .iter()
            .flat_map(|o| o.activations.iter())
            .filter(|a| a.fired)
            .map(|a| a.neuron_id)
    }
}

/// Drive `input` through `layers`, updating each neuron's activation and
/// last firing time.
///
/// # Errors
///
/// [`EngineError::EmptyArchitecture`] if `layers` is empty.
pub fn propagate<R: Rng + ?Sized>(
    input: &NeuralInput,
    layers: &mut [Layer],
    rng: &mut R,
) -> EngineResult<PropagationResult> {
    if layers.is_empty() {
        return Err(EngineError::EmptyArchitecture);
    }

    let now = Utc::now();
    let mut layer_outputs = Vec::with_capacity(layers.len());

    for layer in layers.iter_mut() {
        let input_term = input.weight_for(&layer.id) * input.intensity * INPUT_GAIN;
        let function = layer.activation;

        let mut activations = Vec::with_capacity(layer.neurons.len());
        let mut total_activation = 0.0;
        let mut max_activation = 0.0_f64;
        let mut fire_count = 0;

        for neuron in layer.neurons.iter_mut() {
            let connection_term = if neuron.outgoing_connection_ids.is_empty() {
                TERMINAL_CONNECTION_TERM
            } else {
                rng.gen_range(0.0..MAX_CONNECTION_TERM)
            };
            let raw = BASE_INPUT + input_term + connection_term;
            let activation = function.apply(raw).clamp(0.0, 1.0);
            let fired = activation > neuron.threshold;

            neuron.activation = activation;
            if fired {
                neuron.last_fired_at = Some(now);
                fire_count += 1;
            }

            total_activation += activation;
            max_activation = max_activation.max(activation);
            activations.push(NeuronActivation {
                neuron_id: neuron.id,
                activation,
                fired,
            });
        }

        debug!(
            layer = %layer.id,
            total = total_activation,
            max = max_activation,
            fired = fire_count,
            "Propagated layer"
        );

        layer_outputs.push(LayerOutput {
            layer_id: layer.id.clone(),
            activations,
            total_activation,
            max_activation,
            fire_count,
        });
    }

    let total_activity = layer_outputs.iter().map(|o| o.total_activation).sum();
    let max_activation = layer_outputs
        .iter()
        .map(|o| o.max_activation)
        .fold(0.0, f64::max);

    Ok(PropagationResult {
        id: Uuid::new_v4(),
        input_id: input.id,
        layer_outputs,
        total_activity,
        max_activation,
        completed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{EmotionalSignal, EncodedSignal, SemanticSignal};
    use crate::neurons::activation::ActivationFunction;
    use crate::neurons::architecture::build_architecture;
    use crate::neurons::config::{LayerSpec, NetworkConfig};
    use crate::neurons::connections::connect;
    use crate::neurons::random::seeded_rng;
    use std::collections::BTreeMap;

    fn input_for(layers: &[Layer], intensity: f64, weight: f64) -> NeuralInput {
        NeuralInput {
            id: Uuid::new_v4(),
            encoded: EncodedSignal {
                request_type: "test".to_string(),
                complexity: 0.0,
                emotional: EmotionalSignal {
                    positive: 0.0,
                    negative: 0.0,
                    neutral: 1.0,
                },
                semantic: SemanticSignal::default(),
            },
            intensity,
            distribution: layers.iter().map(|l| (l.id.clone(), weight)).collect::<BTreeMap<_, _>>(),
            created_at: Utc::now(),
        }
    }

    fn network(specs: &[LayerSpec], seed: u64) -> Vec<Layer> {
        let mut rng = seeded_rng(Some(seed));
        let mut layers = build_architecture(specs, &mut rng).unwrap();
        connect(&mut layers, &mut rng);
        layers
    }

    #[test]
    fn test_empty_architecture_fails() {
        let input = input_for(&[], 0.5, 0.5);
        let err = propagate(&input, &mut [], &mut seeded_rng(Some(1))).unwrap_err();
        assert!(matches!(err, EngineError::EmptyArchitecture));
    }

    #[test]
    fn test_layer_outputs_follow_architecture_order() {
        let mut layers = network(&NetworkConfig::reference().layers, 4);
        let input = input_for(&layers, 0.6, 0.5);
        let result = propagate(&input, &mut layers, &mut seeded_rng(Some(4))).unwrap();

        let ids: Vec<&str> = result.layer_outputs.iter().map(|o| o.layer_id.as_str()).collect();
        let expected: Vec<&str> = layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, expected);
        for (output, layer) in result.layer_outputs.iter().zip(&layers) {
            assert_eq!(output.neuron_count(), layer.len());
        }
    }

    #[test]
    fn test_activations_bounded() {
        let mut layers = network(&NetworkConfig::reference().layers, 12);
        let input = input_for(&layers, 1.0, 0.74);
        let result = propagate(&input, &mut layers, &mut seeded_rng(Some(12))).unwrap();
        for a in result.layer_outputs.iter().flat_map(|o| &o.activations) {
            assert!((0.0..=1.0).contains(&a.activation));
        }
        for n in layers.iter().flat_map(|l| &l.neurons) {
            assert!((0.0..=1.0).contains(&n.activation));
        }
    }

    #[test]
    fn test_terminal_layer_uses_flat_connection_term() {
        let specs = vec![
            LayerSpec::new("input", 3, ActivationFunction::Linear),
            LayerSpec::new("output", 3, ActivationFunction::Linear),
        ];
        let mut layers = network(&specs, 2);
        let input = input_for(&layers, 0.5, 0.5);
        let result = propagate(&input, &mut layers, &mut seeded_rng(Some(2))).unwrap();

        // 0.1 + 0.5 * 0.5 * 0.4 + 0.1
        let expected = 0.3;
        for a in &result.layer_outputs[1].activations {
            assert!((a.activation - expected).abs() < 1e-12);
        }
        // first layer: 0.2 + U[0, 0.3)
        for a in &result.layer_outputs[0].activations {
            assert!(a.activation >= 0.2 && a.activation < 0.5);
        }
    }

    #[test]
    fn test_firing_compares_against_threshold() {
        let mut layers = network(&NetworkConfig::reference().layers, 7);
        let input = input_for(&layers, 0.8, 0.6);
        let result = propagate(&input, &mut layers, &mut seeded_rng(Some(7))).unwrap();

        for (output, layer) in result.layer_outputs.iter().zip(&layers) {
            let mut fired = 0;
            for (a, neuron) in output.activations.iter().zip(&layer.neurons) {
                assert_eq!(a.neuron_id, neuron.id);
                assert_eq!(a.fired, a.activation > neuron.threshold);
                assert_eq!(a.fired, neuron.last_fired_at.is_some());
                if a.fired {
                    fired += 1;
                }
            }
            assert_eq!(output.fire_count, fired);
        }
        assert_eq!(
            result.fired_neurons().count(),
            result.layer_outputs.iter().map(|o| o.fire_count).sum::<usize>()
        );
    }

    #[test]
    fn test_totals() {
        let mut layers = network(&NetworkConfig::reference().layers, 9);
        let input = input_for(&layers, 0.5, 0.5);
        let result = propagate(&input, &mut layers, &mut seeded_rng(Some(9))).unwrap();

        let sum: f64 = result.layer_outputs.iter().map(|o| o.total_activation).sum();
        assert!((result.total_activity - sum).abs() < 1e-9);
        let max = result
            .layer_outputs
            .iter()
            .map(|o| o.max_activation)
            .fold(0.0, f64::max);
        assert_eq!(result.max_activation, max);
        for output in &result.layer_outputs {
            let layer_sum: f64 = output.activations.iter().map(|a| a.activation).sum();
            assert!((output.total_activation - layer_sum).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let specs = NetworkConfig::reference().layers;
        let mut layers_a = network(&specs, 31);
        let mut layers_b = network(&specs, 31);
        let input = input_for(&layers_a, 0.55, 0.4);

        let a = propagate(&input, &mut layers_a, &mut seeded_rng(Some(100))).unwrap();
        let b = propagate(&input, &mut layers_b, &mut seeded_rng(Some(100))).unwrap();
        assert_eq!(a.layer_outputs, b.layer_outputs);
        assert_eq!(a.total_activity, b.total_activity);
        assert_eq!(a.max_activation, b.max_activation);
    }
}
