//! Associative memory data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::encoding::RequestShape;
use crate::error::EngineError;
use crate::neurons::PropagationResult;

/// Activity figures persisted with each memory record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NeuralData {
    pub total_activity: f64,
    pub max_activation: f64,
    pub pattern_count: usize,
}

/// Compact trace of an association, stored alongside its record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryTrace {
    pub association_id: Uuid,
    pub strength: f64,
    pub novelty: f64,
    pub pattern_count: usize,
    pub memory_count: usize,
}

/// What a memory record remembers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordKind {
    /// A completed processing cycle.
    Analysis,
    /// A failed processing cycle, written as an adaptation side effect.
    ErrorTrace {
        error_kind: String,
        message: String,
    },
}

/// A short-term or long-term memory. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    pub kind: RecordKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_snapshot: Option<RequestShape>,
    pub neural_data: NeuralData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<MemoryTrace>,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Record of a completed cycle.
    pub fn analysis(
        request: &RequestShape,
        propagation: &PropagationResult,
        association: &AssociationResult,
        trace: MemoryTrace,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: RecordKind::Analysis,
            request_snapshot: Some(request.clone()),
            neural_data: NeuralData {
                total_activity: propagation.total_activity,
                max_activation: propagation.max_activation,
                pattern_count: association.patterns.len(),
            },
            trace: Some(trace),
            created_at: Utc::now(),
        }
    }

    /// Record of a failed cycle.
    pub fn error_trace(request: Option<&RequestShape>, error: &EngineError) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: RecordKind::ErrorTrace {
                error_kind: error.kind().to_string(),
                message: error.to_string(),
            },
            request_snapshot: request.cloned(),
            neural_data: NeuralData::default(),
            trace: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_error_trace(&self) -> bool {
        matches!(self.kind, RecordKind::ErrorTrace { .. })
    }
}

/// Per-layer summary of an activation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub layer_id: String,
    pub firing_rate: f64,
    pub avg_activation: f64,
    pub max_activation: f64,
    /// Short hex hash of the layer's activation vector.
    pub signature: String,
}

/// Where a stored pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternOrigin {
    /// Seeded by the bootstrap pass during initialization.
    Bootstrap,
    /// Discovered from a real propagation.
    Observed,
}

/// A pattern held by the pattern store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPattern {
    pub id: Uuid,
    pub layer_id: String,
    pub signature: String,
    pub firing_rate: f64,
    pub avg_activation: f64,
    pub max_activation: f64,
    pub origin: PatternOrigin,
    /// How many times this signature has been seen.
    pub occurrences: u64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl StoredPattern {
    pub fn from_summary(summary: &PatternSummary, origin: PatternOrigin) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            layer_id: summary.layer_id.clone(),
            signature: summary.signature.clone(),
            firing_rate: summary.firing_rate,
            avg_activation: summary.avg_activation,
            max_activation: summary.max_activation,
            origin,
            occurrences: 1,
            first_seen_at: now,
            last_seen_at: now,
        }
    }
}

/// What a recalled memory refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemorySource {
    /// A short-term memory record.
    ShortTerm { record_id: Uuid },
    /// A stored activation pattern.
    Pattern { pattern_id: Uuid, layer_id: String },
}

/// A recalled memory and how similar it is to the current activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMatch {
    pub source: MemorySource,
    pub similarity: f64,
}

impl MemoryMatch {
    /// Id of the matched short-term record, if this is a record match.
    pub fn record_id(&self) -> Option<Uuid> {
        match self.source {
            MemorySource::ShortTerm { record_id } => Some(record_id),
            MemorySource::Pattern { .. } => None,
        }
    }
}

/// Result of associating one propagation with memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationResult {
    pub id: Uuid,
    pub propagation_id: Uuid,
    /// One summary per layer, in architecture order.
    pub patterns: Vec<PatternSummary>,
    /// Recalled memories, most similar first.
    pub memories: Vec<MemoryMatch>,
    pub novelty: f64,
    pub strength: f64,
    pub total_activity: f64,
}

/// Sizes of the memory stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub short_term: usize,
    pub long_term: usize,
    pub patterns: usize,
}
