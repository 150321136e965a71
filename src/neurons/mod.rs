//! Layered neuron simulation
//!
//! Builds a multi-layer network (layers of thresholded neurons with complete
//! bipartite connections between adjacent layers) and drives encoded input
//! through it one layer at a time.
//!
//! All stochastic parameters come from the caller's RNG, so a seeded
//! [`NeuralRng`] makes construction and propagation reproducible.

pub mod activation;
pub mod architecture;
pub mod config;
pub mod connections;
pub mod propagation;
pub mod random;

pub use activation::ActivationFunction;
pub use architecture::{build_architecture, neuron_count, ConnectionId, Layer, Neuron, NeuronId};
pub use config::{BootstrapConfig, EngineConfig, LayerSpec, MemoryConfig, NetworkConfig};
pub use connections::{connect, Connection, ConnectionSet};
pub use propagation::{propagate, LayerOutput, NeuronActivation, PropagationResult};
pub use random::{seeded_rng, NeuralRng};
