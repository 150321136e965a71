//! Input encoder: request → normalized neural input signal.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::request::RequestShape;
use crate::error::EngineResult;
use crate::metrics::MetricsProvider;
use crate::neurons::Layer;

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "happy", "love", "wonderful", "amazing", "fantastic",
    "positive", "success", "awesome", "brilliant", "pleased", "joy", "best", "nice",
    "perfect", "thanks", "glad", "beautiful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "sad", "hate", "horrible", "poor", "negative", "failure",
    "angry", "worst", "wrong", "error", "problem", "broken", "fail", "upset", "annoying",
    "disappointed", "ugly",
];

/// Weight added per sentiment-word hit.
const EMOTION_HIT_WEIGHT: f64 = 0.2;
const DEFAULT_PRIORITY: f64 = 0.5;

/// Sentiment sub-signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionalSignal {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// Lexical statistics of the request text.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SemanticSignal {
    pub word_count: usize,
    pub avg_word_length: f64,
    pub unique_words: usize,
    /// `unique_words / word_count`, 0 for empty text.
    pub lexical_density: f64,
}

/// Encoded sub-signals of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedSignal {
    #[serde(rename = "type")]
    pub request_type: String,
    pub complexity: f64,
    pub emotional: EmotionalSignal,
    pub semantic: SemanticSignal,
}

/// Normalized signal driving one propagation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralInput {
    pub id: Uuid,
    pub encoded: EncodedSignal,
    /// Overall drive in `[0, 1]`.
    pub intensity: f64,
    /// Per-layer input weight in `[0, 1]`, keyed by layer id.
    pub distribution: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

impl NeuralInput {
    /// Distribution weight for a layer, 0 if the layer is unknown.
    pub fn weight_for(&self, layer_id: &str) -> f64 {
        self.distribution.get(layer_id).copied().unwrap_or(0.0)
    }
}

/// Converts requests into [`NeuralInput`]s.
pub struct InputEncoder {
    metrics: Arc<dyn MetricsProvider>,
}

impl InputEncoder {
    pub fn new(metrics: Arc<dyn MetricsProvider>) -> Self {
        Self { metrics }
    }

    /// Encode a request for the given architecture.
    ///
    /// Random draws happen in a fixed order (complexity jitter, intensity
    /// jitter, then one distribution weight per layer in layer order), so a
    /// seeded generator yields a reproducible input.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`](crate::EngineError::InvalidInput) if the
    /// request has neither a type nor content.
    pub fn encode<R: Rng + ?Sized>(
        &self,
        request: &RequestShape,
        layers: &[Layer],
        rng: &mut R,
    ) -> EngineResult<NeuralInput> {
        request.validate()?;

        let text = request.text();
        let words = tokenize(text);

        let complexity = complexity(text, request.keywords.len(), rng.gen_range(0.0..0.2));
        let keyword_words: Vec<String> = request
            .keywords
            .iter()
            .flat_map(|k| tokenize(k))
            .collect();
        let emotional = emotional_signal(
            words
                .iter()
                .chain(keyword_words.iter())
                .map(String::as_str),
        );
        let semantic = semantic_signal(&words);

        let priority = request
            .priority
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_PRIORITY);
        let intensity =
            (0.2 + 0.4 * complexity + 0.3 * priority + rng.gen_range(0.0..0.1)).clamp(0.0, 1.0);

        let distribution = layers
            .iter()
            .map(|layer| (layer.id.clone(), rng.gen_range(0.25..0.75)))
            .collect();

        self.metrics.record_gauge("input.complexity", complexity);
        self.metrics.record_gauge("input.intensity", intensity);

        debug!(
            request_type = %request.request_type,
            complexity,
            intensity,
            words = semantic.word_count,
            "Encoded request"
        );

        Ok(NeuralInput {
            id: Uuid::new_v4(),
            encoded: EncodedSignal {
                request_type: request.request_type.clone(),
                complexity,
                emotional,
                semantic,
            },
            intensity,
            distribution,
            created_at: Utc::now(),
        })
    }
}

/// Lowercased words with surrounding punctuation stripped.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn complexity(text: &str, keyword_count: usize, jitter: f64) -> f64 {
    let length_term = (text.chars().count() as f64 / 500.0).min(0.5);
    let keyword_term = (keyword_count as f64 * 0.03).min(0.3);
    (length_term + keyword_term + jitter).clamp(0.0, 1.0)
}

fn emotional_signal<'a>(words: impl Iterator<Item = &'a str>) -> EmotionalSignal {
    let (mut positive_hits, mut negative_hits) = (0usize, 0usize);
    for word in words {
        let word = word.to_lowercase();
        if POSITIVE_WORDS.contains(&word.as_str()) {
            positive_hits += 1;
        } else if NEGATIVE_WORDS.contains(&word.as_str()) {
            negative_hits += 1;
        }
    }
    let positive = (positive_hits as f64 * EMOTION_HIT_WEIGHT).min(1.0);
    let negative = (negative_hits as f64 * EMOTION_HIT_WEIGHT).min(1.0);
    EmotionalSignal {
        positive,
        negative,
        neutral: 1.0 - positive.max(negative),
    }
}

fn semantic_signal(words: &[String]) -> SemanticSignal {
    if words.is_empty() {
        return SemanticSignal::default();
    }
    let word_count = words.len();
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let unique_words = words.iter().collect::<HashSet<_>>().len();
    SemanticSignal {
        word_count,
        avg_word_length: total_chars as f64 / word_count as f64,
        unique_words,
        lexical_density: unique_words as f64 / word_count as f64,
    }
}
