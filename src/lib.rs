//! Neural Engine
//!
//! A layered neural-simulation core with:
//! - Multi-layer networks of thresholded neurons with complete connections between adjacent layers
//! - Request encoding into intensity and per-layer distribution signals
//! - Associative memory (short-term, long-term and activation patterns) with novelty-driven promotion
//! - Capability reinforcement and a smoothed activity gauge
//! - Injected metrics and an outbound event channel

pub mod encoding;
pub mod engine;
pub mod error;
pub mod events;
pub mod memory;
pub mod metrics;
pub mod neurons;
pub mod reinforcement;
pub mod synthesis;

pub use engine::{ModuleState, NeuralEngine, ProcessingResult, StatusSnapshot};
pub use error::{EngineError, EngineResult};
pub use neurons::EngineConfig;

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "neural-engine.yaml";

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub engine: EngineConfig,
    pub logging: LoggingYamlConfig,
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingYamlConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Configuration resolved from YAML, environment and defaults
///
/// Priority: env var > YAML value > default.
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    pub log_filter: Option<String>,
    pub log_json: bool,
}

impl Config {
    /// Load from the default YAML path and the environment
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from a YAML file with env var overrides.
    ///
    /// A missing or unparsable file falls back to defaults. An env override
    /// that is set but not a valid number is an error.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);
        let mut engine = yaml.engine;

        if let Some(seed) = env_number("NEURAL_ENGINE_SEED")? {
            engine.seed = Some(seed);
        }
        if let Some(capacity) = env_number("NEURAL_ENGINE_SHORT_TERM_CAPACITY")? {
            engine.memory.short_term_capacity = capacity;
        }
        if let Some(delay) = env_number("NEURAL_ENGINE_SETUP_DELAY_MS")? {
            engine.bootstrap.setup_delay_ms = delay;
        }

        Ok(Self {
            engine,
            log_filter: yaml.logging.filter,
            log_json: yaml.logging.json,
        })
    }

    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

fn env_number<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", name, value, e))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}

// ============================================================================
// Tests
// ============================================================================
