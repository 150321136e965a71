//! Output synthesis.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::memory::{AssociationResult, MemoryTrace};

/// Structured summary produced at the end of a processing cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralOutput {
    pub id: Uuid,
    /// Human-readable summary line.
    pub content: String,
    pub pattern_count: usize,
    pub memory_count: usize,
    pub strength: f64,
    pub generated_at: DateTime<Utc>,
    pub memory_trace: MemoryTrace,
}

/// Summarize an association. Content has the form
/// `Neural synthesis: {p} activation patterns, {m} associated memories, strength {s} at {timestamp}`.
pub fn synthesize(association: &AssociationResult) -> NeuralOutput {
    let generated_at = Utc::now();
    let pattern_count = association.patterns.len();
    let memory_count = association.memories.len();

    let content = format!(
        "Neural synthesis: {} activation patterns, {} associated memories, strength {:.3} at {}",
        pattern_count,
        memory_count,
        association.strength,
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );

    NeuralOutput {
        id: Uuid::new_v4(),
        content,
        pattern_count,
        memory_count,
        strength: association.strength,
        generated_at,
        memory_trace: MemoryTrace {
            association_id: association.id,
            strength: association.strength,
            novelty: association.novelty,
            pattern_count,
            memory_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::PatternSummary;

    #[test]
    fn test_synthesis_content() {
        let association = AssociationResult {
            id: Uuid::new_v4(),
            propagation_id: Uuid::new_v4(),
            patterns: vec![
                PatternSummary {
                    layer_id: "input".into(),
                    firing_rate: 0.5,
                    avg_activation: 0.5,
                    max_activation: 0.7,
                    signature: "0000abcd".into(),
                };
                3
            ],
            memories: vec![],
            novelty: 0.8,
            strength: 0.91234,
            total_activity: 12.0,
        };

        let output = synthesize(&association);
        assert!(output
            .content
            .starts_with("Neural synthesis: 3 activation patterns, 0 associated memories, strength 0.912 at "));
        assert_eq!(output.pattern_count, 3);
        assert_eq!(output.memory_count, 0);
        assert_eq!(output.memory_trace.association_id, association.id);
        assert!((output.memory_trace.novelty - 0.8).abs() < f64::EPSILON);
    }
}
