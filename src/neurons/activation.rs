//! Activation function library.
//!
//! Pure numeric transfer functions applied to a neuron's raw input. The
//! shapes are fixed for compatibility with existing activation profiles:
//! sigmoid and tanh are re-centred on `0.5` so that raw inputs in `[0, 1]`
//! span most of the output range.

use serde::{Deserialize, Serialize};

/// Transfer function assigned to every neuron of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    /// Identity, `f(x) = x`.
    Linear,
    /// `f(x) = max(0, x)`.
    Relu,
    /// Logistic curve centred on 0.5: `1 / (1 + e^-(6x - 3))`.
    Sigmoid,
    /// Hyperbolic tangent centred on 0.5: `tanh(2x - 1)`.
    Tanh,
    /// `e^x / (e^x + 1)` applied to each neuron independently.
    ///
    /// This is *not* a normalized softmax: outputs of a layer do not sum to 1
    /// and are never compared with their siblings.
    SoftmaxLike,
}

impl ActivationFunction {
    /// Apply the transfer function to a raw input.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-(6.0 * x - 3.0)).exp()),
            Self::Tanh => (2.0 * x - 1.0).tanh(),
            Self::SoftmaxLike => {
                let e = x.exp();
                e / (e + 1.0)
            }
        }
    }

    /// Configuration name of the function.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Relu => "relu",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::SoftmaxLike => "softmax_like",
        }
    }
}

impl std::fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_linear_and_relu() {
        assert!(close(ActivationFunction::Linear.apply(0.42), 0.42));
        assert!(close(ActivationFunction::Linear.apply(-1.5), -1.5));
        assert!(close(ActivationFunction::Relu.apply(-0.3), 0.0));
        assert!(close(ActivationFunction::Relu.apply(0.7), 0.7));
    }

    #[test]
    fn test_sigmoid_is_centred_on_half() {
        assert!(close(ActivationFunction::Sigmoid.apply(0.5), 0.5));
        assert!(ActivationFunction::Sigmoid.apply(1.0) > 0.95);
        assert!(ActivationFunction::Sigmoid.apply(0.0) < 0.05);
    }

    #[test]
    fn test_tanh_is_centred_on_half() {
        assert!(close(ActivationFunction::Tanh.apply(0.5), 0.0));
        assert!(close(ActivationFunction::Tanh.apply(1.0), 1.0_f64.tanh()));
        assert!(ActivationFunction::Tanh.apply(0.2) < 0.0);
    }

    #[test]
    fn test_softmax_like_is_per_neuron_logistic() {
        assert!(close(ActivationFunction::SoftmaxLike.apply(0.0), 0.5));
        let expected = 1.0_f64.exp() / (1.0_f64.exp() + 1.0);
        assert!(close(ActivationFunction::SoftmaxLike.apply(1.0), expected));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ActivationFunction::SoftmaxLike).unwrap();
        assert_eq!(json, "\"softmax_like\"");
        let parsed: ActivationFunction = serde_json::from_str("\"tanh\"").unwrap();
        assert_eq!(parsed, ActivationFunction::Tanh);
        assert_eq!(ActivationFunction::Relu.to_string(), "relu");
    }
}
