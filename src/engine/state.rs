//! Lifecycle state and the snapshots returned by engine operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::encoding::NeuralInput;
use crate::memory::{AssociationResult, MemoryStats};
use crate::neurons::PropagationResult;
use crate::reinforcement::CapabilityVector;
use crate::synthesis::NeuralOutput;

/// Engine lifecycle.
///
/// ```text
/// Uninitialized → Initializing → Active ⇄ Processing → ShuttingDown → Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Uninitialized,
    Initializing,
    Active,
    Processing,
    ShuttingDown,
    Stopped,
}

impl ModuleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Active => "active",
            Self::Processing => "processing",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }

    /// Whether initialization has completed and the engine has not stopped.
    pub fn is_initialized(self) -> bool {
        matches!(self, Self::Active | Self::Processing | Self::ShuttingDown)
    }
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the built network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArchitectureSummary {
    pub layer_count: usize,
    pub neuron_count: usize,
    pub connection_count: usize,
}

/// Returned by a successful `initialize()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitSummary {
    pub architecture: ArchitectureSummary,
    pub layer_names: Vec<String>,
    pub bootstrap_patterns: usize,
    pub initialized_at: DateTime<Utc>,
}

/// Everything produced by one processing cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub neural_input: NeuralInput,
    pub propagation: PropagationResult,
    pub association: AssociationResult,
    pub output: NeuralOutput,
    /// Activity gauge after this cycle's update.
    pub neural_activity: f64,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ModuleState,
    pub initialized: bool,
    pub neural_activity: f64,
    pub capabilities: CapabilityVector,
    pub architecture: ArchitectureSummary,
    pub memory: MemoryStats,
    pub processed_requests: u64,
    pub failed_requests: u64,
}
