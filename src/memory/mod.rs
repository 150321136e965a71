//! Associative memory
//!
//! Holds short-term records, long-term records and discovered activation
//! patterns, and recalls them by similarity to the current propagation.

pub mod models;
pub mod signature;
pub mod store;

pub use models::{
    AssociationResult, MemoryMatch, MemoryRecord, MemorySource, MemoryStats, MemoryTrace,
    NeuralData, PatternOrigin, PatternSummary, RecordKind, StoredPattern,
};
pub use signature::activation_signature;
pub use store::{novelty, strength, summarize_layer, AssociativeMemory, Retention};
