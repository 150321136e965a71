//! Reinforcement & capability adaptation.
//!
//! After every cycle the capability vector is nudged by small fixed deltas
//! (never more than 0.005 per field per cycle, never above 1.0) and the
//! neural activity gauge follows an exponential moving average of the
//! cycle's normalized activity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::memory::AssociationResult;
use crate::metrics::MetricsProvider;

const PLASTICITY_STRENGTH_THRESHOLD: f64 = 0.6;
const PLASTICITY_DELTA: f64 = 0.005;
const RECOGNITION_FIRING_THRESHOLD: f64 = 0.5;
const RECOGNITION_DELTA: f64 = 0.003;
const ASSOCIATIVE_DELTA: f64 = 0.002;
const EMERGENT_DELTA: f64 = 0.001;
const ADAPTIVE_DELTA: f64 = 0.001;

/// EMA weight kept from the previous gauge value.
const ACTIVITY_DECAY: f64 = 0.8;
/// Activity per layer that maps to a gauge sample of 1.0.
const ACTIVITY_PER_LAYER: f64 = 50.0;

/// Slowly adapting heuristic competence scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapabilityVector {
    pub pattern_recognition: f64,
    pub associative_memory: f64,
    pub adaptive_learning: f64,
    pub emergent_intelligence: f64,
    pub neural_plasticity: f64,
}

impl Default for CapabilityVector {
    fn default() -> Self {
        Self {
            pattern_recognition: 0.85,
            associative_memory: 0.80,
            adaptive_learning: 0.75,
            emergent_intelligence: 0.60,
            neural_plasticity: 0.90,
        }
    }
}

impl CapabilityVector {
    /// Named fields, for metrics and status output.
    pub fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("pattern_recognition", self.pattern_recognition),
            ("associative_memory", self.associative_memory),
            ("adaptive_learning", self.adaptive_learning),
            ("emergent_intelligence", self.emergent_intelligence),
            ("neural_plasticity", self.neural_plasticity),
        ]
    }
}

fn nudge(value: f64, delta: f64) -> f64 {
    (value + delta).clamp(0.0, 1.0)
}

/// Smoothed scalar summarizing recent network activity, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityGauge {
    value: f64,
}

impl ActivityGauge {
    pub fn new(value: f64) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// `gauge' = 0.8·gauge + 0.2·sample`, with the sample clamped to `[0, 1]`.
    pub fn updated(self, sample: f64) -> Self {
        let sample = sample.clamp(0.0, 1.0);
        Self {
            value: ACTIVITY_DECAY * self.value + (1.0 - ACTIVITY_DECAY) * sample,
        }
    }
}

/// Normalized activity sample: `total / (layers · 50)`.
pub fn activity_sample(total_activity: f64, layer_count: usize) -> f64 {
    if layer_count == 0 {
        return 0.0;
    }
    total_activity / (layer_count as f64 * ACTIVITY_PER_LAYER)
}

/// Applies reinforcement rules and reports the results as metrics.
pub struct ReinforcementAdapter {
    metrics: Arc<dyn MetricsProvider>,
    promotion_novelty_threshold: f64,
}

impl ReinforcementAdapter {
    pub fn new(metrics: Arc<dyn MetricsProvider>, promotion_novelty_threshold: f64) -> Self {
        Self {
            metrics,
            promotion_novelty_threshold,
        }
    }

    /// Reinforce capabilities from a completed association.
    ///
    /// - strength > 0.6 → `neural_plasticity += 0.005`
    /// - first pattern's firing rate > 0.5 → `pattern_recognition += 0.003`
    /// - at least one recalled memory → `associative_memory += 0.002`
    /// - record promoted to long-term → `emergent_intelligence += 0.001`
    pub fn reinforce(
        &self,
        association: &AssociationResult,
        capabilities: CapabilityVector,
    ) -> CapabilityVector {
        let mut next = capabilities;

        if association.strength > PLASTICITY_STRENGTH_THRESHOLD {
            next.neural_plasticity = nudge(next.neural_plasticity, PLASTICITY_DELTA);
        }
        if association
            .patterns
            .first()
            .is_some_and(|p| p.firing_rate > RECOGNITION_FIRING_THRESHOLD)
        {
            next.pattern_recognition = nudge(next.pattern_recognition, RECOGNITION_DELTA);
        }
        if !association.memories.is_empty() {
            next.associative_memory = nudge(next.associative_memory, ASSOCIATIVE_DELTA);
        }
        if association.novelty > self.promotion_novelty_threshold {
            next.emergent_intelligence = nudge(next.emergent_intelligence, EMERGENT_DELTA);
        }

        self.report(&next);
        next
    }

    /// Adaptation after a failed cycle: `adaptive_learning += 0.001`.
    pub fn adapt_to_error(&self, capabilities: CapabilityVector) -> CapabilityVector {
        let mut next = capabilities;
        next.adaptive_learning = nudge(next.adaptive_learning, ADAPTIVE_DELTA);
        self.report(&next);
        next
    }

    /// Fold the association's activity into the gauge.
    pub fn update_activity(
        &self,
        gauge: ActivityGauge,
        association: &AssociationResult,
    ) -> ActivityGauge {
        let sample = activity_sample(association.total_activity, association.patterns.len());
        let next = gauge.updated(sample);
        self.metrics.record_gauge("neural.activity", next.value());
        debug!(sample, activity = next.value(), "Updated neural activity");
        next
    }

    fn report(&self, capabilities: &CapabilityVector) {
        for (name, value) in capabilities.fields() {
            self.metrics
                .record_gauge(&format!("capability.{name}"), value);
        }
    }
}
