//! Input encoding
//!
//! Converts an incoming [`RequestShape`] into a [`NeuralInput`]: an intensity
//! scalar, a per-layer distribution, and semantic / emotional / complexity
//! sub-signals.

pub mod encoder;
pub mod request;

pub use encoder::{EmotionalSignal, EncodedSignal, InputEncoder, NeuralInput, SemanticSignal};
pub use request::RequestShape;
