//! Associative memory store.
//!
//! Three bounded stores:
//! - **short-term**: every completed (or failed) cycle, oldest evicted first
//! - **long-term**: copies of short-term records whose novelty exceeded the
//!   promotion threshold, oldest evicted first
//! - **patterns**: per-layer activation patterns, least recently seen evicted
//!   first
//!
//! Association is read-only; writes go through [`AssociativeMemory::retain`],
//! [`AssociativeMemory::record_error`] and [`AssociativeMemory::observe`].

use std::collections::VecDeque;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::models::*;
use super::signature::activation_signature;
use crate::neurons::{Layer, LayerOutput, MemoryConfig, PropagationResult};

/// Weight of the deterministic proximity term in similarity scores; the
/// remainder is random noise.
const PROXIMITY_WEIGHT: f64 = 0.8;
const NOISE_WEIGHT: f64 = 0.2;

/// Bootstrap activations at or above this level count as fired.
const BOOTSTRAP_FIRING_LEVEL: f64 = 0.5;

/// Outcome of [`AssociativeMemory::retain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Retention {
    /// Whether the record was also copied into long-term storage.
    pub promoted: bool,
    /// Records evicted from either store to make room.
    pub evicted: usize,
}

/// Short-term, long-term and pattern stores.
#[derive(Debug, Clone)]
pub struct AssociativeMemory {
    config: MemoryConfig,
    short_term: VecDeque<MemoryRecord>,
    long_term: VecDeque<MemoryRecord>,
    patterns: Vec<StoredPattern>,
}

impl AssociativeMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            short_term: VecDeque::new(),
            long_term: VecDeque::new(),
            patterns: Vec::new(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            short_term: self.short_term.len(),
            long_term: self.long_term.len(),
            patterns: self.patterns.len(),
        }
    }

    /// Short-term records, oldest first.
    pub fn short_term(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.short_term.iter()
    }

    /// Long-term records, oldest first.
    pub fn long_term(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.long_term.iter()
    }

    pub fn patterns(&self) -> &[StoredPattern] {
        &self.patterns
    }

    pub fn find_short_term(&self, id: Uuid) -> Option<&MemoryRecord> {
        self.short_term.iter().find(|r| r.id == id)
    }

    pub fn find_long_term(&self, id: Uuid) -> Option<&MemoryRecord> {
        self.long_term.iter().find(|r| r.id == id)
    }

    /// Associate a propagation with stored memories.
    ///
    /// `activity_gauge` is the neural activity gauge *before* this cycle's
    /// update. Random draws happen in store order (short-term records oldest
    /// first, then patterns), one per compared candidate.
    pub fn associate<R: Rng + ?Sized>(
        &self,
        propagation: &PropagationResult,
        activity_gauge: f64,
        rng: &mut R,
    ) -> AssociationResult {
        let patterns: Vec<PatternSummary> =
            propagation.layer_outputs.iter().map(summarize_layer).collect();

        let mut memories = Vec::new();

        for record in self.short_term.iter().filter(|r| !r.is_error_trace()) {
            let similarity = record_similarity(propagation, &record.neural_data, rng.gen());
            if similarity > self.config.record_similarity_threshold {
                memories.push(MemoryMatch {
                    source: MemorySource::ShortTerm {
                        record_id: record.id,
                    },
                    similarity,
                });
            }
        }

        for stored in &self.patterns {
            let Some(current) = patterns.iter().find(|p| p.layer_id == stored.layer_id) else {
                continue;
            };
            let similarity = pattern_similarity(current, stored, rng);
            if similarity > self.config.pattern_similarity_threshold {
                memories.push(MemoryMatch {
                    source: MemorySource::Pattern {
                        pattern_id: stored.id,
                        layer_id: stored.layer_id.clone(),
                    },
                    similarity,
                });
            }
        }

        memories.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let novelty = novelty(propagation, activity_gauge);
        let strength = strength(propagation);

        debug!(
            patterns = patterns.len(),
            memories = memories.len(),
            novelty,
            strength,
            "Association complete"
        );

        AssociationResult {
            id: Uuid::new_v4(),
            propagation_id: propagation.id,
            patterns,
            memories,
            novelty,
            strength,
            total_activity: propagation.total_activity,
        }
    }

    /// Store a completed-cycle record in short-term memory and, when
    /// `novelty` exceeds the promotion threshold, a copy in long-term memory.
    pub fn retain(&mut self, record: MemoryRecord, novelty: f64) -> Retention {
        let promoted = novelty > self.config.promotion_novelty_threshold;
        let mut evicted = 0;

        if promoted {
            evicted += push_bounded(
                &mut self.long_term,
                record.clone(),
                self.config.long_term_capacity,
            );
        }
        evicted += push_bounded(&mut self.short_term, record, self.config.short_term_capacity);

        if evicted > 0 {
            debug!(evicted, "Evicted oldest memory records");
        }

        Retention { promoted, evicted }
    }

    /// Store an error-trace record in short-term memory only.
    pub fn record_error(&mut self, record: MemoryRecord) {
        if !record.is_error_trace() {
            warn!(record_id = %record.id, "record_error called with a non-error record");
        }
        push_bounded(&mut self.short_term, record, self.config.short_term_capacity);
    }

    /// Record observed layer patterns. A known `(layer, signature)` pair has
    /// its occurrence count bumped instead of being inserted again.
    pub fn observe(&mut self, summaries: &[PatternSummary]) -> usize {
        let mut inserted = 0;
        for summary in summaries {
            let existing = self
                .patterns
                .iter_mut()
                .find(|p| p.layer_id == summary.layer_id && p.signature == summary.signature);
            match existing {
                Some(pattern) => {
                    pattern.occurrences += 1;
                    pattern.last_seen_at = Utc::now();
                }
                None => {
                    self.insert_pattern(StoredPattern::from_summary(summary, PatternOrigin::Observed));
                    inserted += 1;
                }
            }
        }
        inserted
    }

    /// Seed `min..=max` random patterns drawn over the given layers.
    pub fn bootstrap<R: Rng + ?Sized>(
        &mut self,
        layers: &[Layer],
        min_patterns: usize,
        max_patterns: usize,
        rng: &mut R,
    ) -> usize {
        if layers.is_empty() {
            return 0;
        }
        let count = rng.gen_range(min_patterns..=max_patterns.max(min_patterns));

        for _ in 0..count {
            let layer = &layers[rng.gen_range(0..layers.len())];
            let activations: Vec<f64> = (0..layer.len()).map(|_| rng.gen::<f64>()).collect();
            let summary = summarize_activations(&layer.id, &activations, |a| {
                a >= BOOTSTRAP_FIRING_LEVEL
            });
            self.insert_pattern(StoredPattern::from_summary(&summary, PatternOrigin::Bootstrap));
        }

        debug!(count, "Seeded bootstrap patterns");
        count
    }

    fn insert_pattern(&mut self, pattern: StoredPattern) {
        if self.config.pattern_capacity == 0 {
            return;
        }
        while self.patterns.len() >= self.config.pattern_capacity {
            let oldest = self
                .patterns
                .iter()
                .enumerate()
                .min_by_key(|(_, p)| p.last_seen_at)
                .map(|(i, _)| i);
            match oldest {
                Some(i) => {
                    self.patterns.remove(i);
                }
                None => break,
            }
        }
        self.patterns.push(pattern);
    }
}

/// Push onto a bounded queue, evicting from the front. Returns the number of
/// evicted records.
fn push_bounded(queue: &mut VecDeque<MemoryRecord>, record: MemoryRecord, capacity: usize) -> usize {
    if capacity == 0 {
        return 0;
    }
    let mut evicted = 0;
    while queue.len() >= capacity {
        queue.pop_front();
        evicted += 1;
    }
    queue.push_back(record);
    evicted
}

/// Summarize a layer's output as a pattern.
pub fn summarize_layer(output: &LayerOutput) -> PatternSummary {
    PatternSummary {
        layer_id: output.layer_id.clone(),
        firing_rate: output.firing_rate(),
        avg_activation: output.avg_activation(),
        max_activation: output.max_activation,
        signature: activation_signature(output.activations.iter().map(|a| a.activation)),
    }
}

fn summarize_activations(
    layer_id: &str,
    activations: &[f64],
    fired: impl Fn(f64) -> bool,
) -> PatternSummary {
    let n = activations.len().max(1) as f64;
    let fire_count = activations.iter().filter(|a| fired(**a)).count();
    PatternSummary {
        layer_id: layer_id.to_string(),
        firing_rate: fire_count as f64 / n,
        avg_activation: activations.iter().sum::<f64>() / n,
        max_activation: activations.iter().copied().fold(0.0, f64::max),
        signature: activation_signature(activations.iter().copied()),
    }
}

/// `min / max`, 1 when both are zero.
fn ratio(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if hi <= 0.0 {
        1.0
    } else {
        (a.min(b) / hi).clamp(0.0, 1.0)
    }
}

/// Similarity of a propagation to a stored record, `noise ∈ [0, 1)`.
fn record_similarity(propagation: &PropagationResult, data: &NeuralData, noise: f64) -> f64 {
    let proximity = (ratio(propagation.total_activity, data.total_activity)
        + ratio(propagation.max_activation, data.max_activation))
        / 2.0;
    PROXIMITY_WEIGHT * proximity + NOISE_WEIGHT * noise
}

/// Similarity of a current layer pattern to a stored one. Identical
/// signatures score 1 without consuming a random draw.
fn pattern_similarity<R: Rng + ?Sized>(
    current: &PatternSummary,
    stored: &StoredPattern,
    rng: &mut R,
) -> f64 {
    if current.signature == stored.signature {
        return 1.0;
    }
    let distance = ((current.firing_rate - stored.firing_rate).abs()
        + (current.avg_activation - stored.avg_activation).abs())
        / 2.0;
    PROXIMITY_WEIGHT * (1.0 - distance).clamp(0.0, 1.0) + NOISE_WEIGHT * rng.gen::<f64>()
}

/// Novelty heuristic: starts at 0.5, +0.3 when total activity exceeds 1.5×
/// the activity gauge, +0.2 when any neuron went above 0.8.
pub fn novelty(propagation: &PropagationResult, activity_gauge: f64) -> f64 {
    let mut novelty: f64 = 0.5;
    if propagation.total_activity > activity_gauge * 1.5 {
        novelty += 0.3;
    }
    if propagation.max_activation > 0.8 {
        novelty += 0.2;
    }
    novelty.clamp(0.0, 1.0)
}

/// Association strength: `0.3 + 0.3·total + 0.2·layers/5`, clamped.
pub fn strength(propagation: &PropagationResult) -> f64 {
    let layers = propagation.layer_count() as f64;
    (0.3 + propagation.total_activity * 0.3 + (layers / 5.0) * 0.2).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::RequestShape;
    use crate::neurons::{seeded_rng, NeuronActivation};
    use crate::EngineError;

    fn layer_output(id: &str, activations: &[f64], threshold: f64) -> LayerOutput {
        let activations: Vec<NeuronActivation> = activations
            .iter()
            .enumerate()
            .map(|(i, a)| NeuronActivation {
                neuron_id: i,
                activation: *a,
                fired: *a > threshold,
            })
            .collect();
        LayerOutput {
            layer_id: id.to_string(),
            total_activation: activations.iter().map(|a| a.activation).sum(),
            max_activation: activations.iter().map(|a| a.activation).fold(0.0, f64::max),
            fire_count: activations.iter().filter(|a| a.fired).count(),
            activations,
        }
    }

    fn propagation(outputs: Vec<LayerOutput>) -> PropagationResult {
        PropagationResult {
            id: Uuid::new_v4(),
            input_id: Uuid::new_v4(),
            total_activity: outputs.iter().map(|o| o.total_activation).sum(),
            max_activation: outputs.iter().map(|o| o.max_activation).fold(0.0, f64::max),
            layer_outputs: outputs,
            completed_at: Utc::now(),
        }
    }

    fn sample_propagation() -> PropagationResult {
        propagation(vec![
            layer_output("input", &[0.2, 0.4, 0.6, 0.9], 0.5),
            layer_output("hidden", &[0.1, 0.3, 0.3, 0.2], 0.5),
        ])
    }

    fn record_for(memory: &AssociativeMemory, prop: &PropagationResult) -> (MemoryRecord, f64) {
        let association = memory.associate(prop, 0.0, &mut seeded_rng(Some(1)));
        let trace = MemoryTrace {
            association_id: association.id,
            strength: association.strength,
            novelty: association.novelty,
            pattern_count: association.patterns.len(),
            memory_count: association.memories.len(),
        };
        let record = MemoryRecord::analysis(&RequestShape::new("ping"), prop, &association, trace);
        (record, association.novelty)
    }

    #[test]
    fn test_empty_store_yields_no_memories() {
        let memory = AssociativeMemory::new(MemoryConfig::default());
        let result = memory.associate(&sample_propagation(), 0.0, &mut seeded_rng(Some(2)));
        assert!(result.memories.is_empty());
        assert_eq!(result.patterns.len(), 2);
    }

    #[test]
    fn test_pattern_summaries() {
        let memory = AssociativeMemory::new(MemoryConfig::default());
        let result = memory.associate(&sample_propagation(), 0.0, &mut seeded_rng(Some(2)));
        let input = &result.patterns[0];
        assert_eq!(input.layer_id, "input");
        assert!((input.firing_rate - 0.5).abs() < 1e-12);
        assert!((input.avg_activation - 0.525).abs() < 1e-12);
        assert!((input.max_activation - 0.9).abs() < 1e-12);
        assert_eq!(input.signature.len(), 8);
    }

    #[test]
    fn test_novelty_rules() {
        let prop = sample_propagation(); // total 3.0, max 0.9
        assert!((novelty(&prop, 0.0) - 1.0).abs() < 1e-12);
        assert!((novelty(&prop, 1.9) - 1.0).abs() < 1e-12);
        assert!((novelty(&prop, 2.5) - 0.7).abs() < 1e-12);

        let calm = propagation(vec![layer_output("input", &[0.2, 0.3], 0.5)]);
        assert!((novelty(&calm, 1.0) - 0.5).abs() < 1e-12);
        assert!((novelty(&calm, 0.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_strength_rule() {
        let tiny = propagation(vec![layer_output("input", &[0.1], 0.5)]);
        // 0.3 + 0.1 * 0.3 + (1 / 5) * 0.2
        assert!((strength(&tiny) - 0.37).abs() < 1e-12);
        assert!((strength(&sample_propagation()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_similar_record_is_recalled() {
        let mut memory = AssociativeMemory::new(MemoryConfig::default());
        let prop = sample_propagation();
        let (record, novelty) = record_for(&memory, &prop);
        let record_id = record.id;
        memory.retain(record, novelty);

        let result = memory.associate(&prop, 0.0, &mut seeded_rng(Some(3)));
        let matched = result
            .memories
            .iter()
            .find(|m| m.record_id() == Some(record_id))
            .expect("identical activity should be recalled");
        assert!(matched.similarity >= PROXIMITY_WEIGHT);
    }

    #[test]
    fn test_memories_sorted_descending() {
        let mut memory = AssociativeMemory::new(MemoryConfig::default());
        for scale in [1.0, 0.9, 0.7, 0.95] {
            let prop = propagation(vec![layer_output(
                "input",
                &[0.2 * scale, 0.4 * scale, 0.6 * scale],
                0.5,
            )]);
            let (record, novelty) = record_for(&memory, &prop);
            memory.retain(record, novelty);
        }
        memory.observe(&[summarize_layer(&layer_output("input", &[0.1, 0.2, 0.3], 0.5))]);

        let current = propagation(vec![layer_output("input", &[0.2, 0.4, 0.6], 0.5)]);
        let result = memory.associate(&current, 0.0, &mut seeded_rng(Some(4)));
        assert!(!result.memories.is_empty());
        for pair in result.memories.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_retain_promotes_only_above_threshold() {
        let mut memory = AssociativeMemory::new(MemoryConfig::default());
        let prop = sample_propagation();

        let (record, _) = record_for(&memory, &prop);
        let outcome = memory.retain(record, 0.7);
        assert!(!outcome.promoted);
        assert_eq!(memory.stats().long_term, 0);

        let (record, _) = record_for(&memory, &prop);
        let id = record.id;
        let outcome = memory.retain(record, 0.71);
        assert!(outcome.promoted);
        assert_eq!(
            memory.find_short_term(id).unwrap().neural_data,
            memory.find_long_term(id).unwrap().neural_data
        );
        assert_eq!(memory.stats().short_term, 2);
        assert_eq!(memory.stats().long_term, 1);
    }

    #[test]
    fn test_short_term_is_bounded_oldest_first() {
        let config = MemoryConfig {
            short_term_capacity: 3,
            ..Default::default()
        };
        let mut memory = AssociativeMemory::new(config);
        let prop = sample_propagation();
        let mut ids = Vec::new();
        let mut evicted = 0;
        for _ in 0..5 {
            let (record, _) = record_for(&memory, &prop);
            ids.push(record.id);
            evicted += memory.retain(record, 0.0).evicted;
        }
        assert_eq!(evicted, 2);
        let kept: Vec<Uuid> = memory.short_term().map(|r| r.id).collect();
        assert_eq!(kept, ids[2..].to_vec());
    }

    #[test]
    fn test_error_traces_are_not_recalled() {
        let mut memory = AssociativeMemory::new(MemoryConfig::default());
        memory.record_error(MemoryRecord::error_trace(
            None,
            &EngineError::InvalidInput("request is null".into()),
        ));
        assert_eq!(memory.stats().short_term, 1);
        assert_eq!(memory.stats().long_term, 0);

        let result = memory.associate(&sample_propagation(), 0.0, &mut seeded_rng(Some(5)));
        assert!(result.memories.is_empty());
    }

    #[test]
    fn test_observe_deduplicates_signatures() {
        let mut memory = AssociativeMemory::new(MemoryConfig::default());
        let summaries: Vec<PatternSummary> = sample_propagation()
            .layer_outputs
            .iter()
            .map(summarize_layer)
            .collect();
        assert_eq!(memory.observe(&summaries), 2);
        assert_eq!(memory.observe(&summaries), 0);
        assert_eq!(memory.stats().patterns, 2);
        assert!(memory.patterns().iter().all(|p| p.occurrences == 2));
    }

    #[test]
    fn test_exact_signature_match_scores_one() {
        let mut memory = AssociativeMemory::new(MemoryConfig::default());
        let prop = sample_propagation();
        let summaries: Vec<PatternSummary> = prop.layer_outputs.iter().map(summarize_layer).collect();
        memory.observe(&summaries);

        let result = memory.associate(&prop, 0.0, &mut seeded_rng(Some(6)));
        let pattern_matches: Vec<&MemoryMatch> = result
            .memories
            .iter()
            .filter(|m| matches!(m.source, MemorySource::Pattern { .. }))
            .collect();
        assert_eq!(pattern_matches.len(), 2);
        assert!(pattern_matches.iter().all(|m| (m.similarity - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_pattern_store_bounded() {
        let config = MemoryConfig {
            pattern_capacity: 2,
            ..Default::default()
        };
        let mut memory = AssociativeMemory::new(config);
        for i in 0..4 {
            let v = 0.1 * (i as f64 + 1.0);
            memory.observe(&[summarize_layer(&layer_output("input", &[v, v], 0.5))]);
        }
        assert_eq!(memory.stats().patterns, 2);
    }

    #[test]
    fn test_bootstrap_seeds_within_bounds() {
        let mut rng = seeded_rng(Some(10));
        let specs = crate::neurons::NetworkConfig::reference().layers;
        let layers = crate::neurons::build_architecture(&specs, &mut rng).unwrap();

        for seed in 0..20 {
            let mut memory = AssociativeMemory::new(MemoryConfig::default());
            let count = memory.bootstrap(&layers, 5, 13, &mut seeded_rng(Some(seed)));
            assert!((5..=13).contains(&count));
            assert_eq!(memory.stats().patterns, count);
            assert!(memory
                .patterns()
                .iter()
                .all(|p| p.origin == PatternOrigin::Bootstrap && layers.iter().any(|l| l.id == p.layer_id)));
        }
    }
}
