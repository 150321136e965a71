//! Error taxonomy for the neural engine.

use crate::engine::ModuleState;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while building, running or stopping the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The layer specification is unusable (zero neurons, bad names, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The architecture contains no layers at all
    #[error("Architecture has no layers")]
    EmptyArchitecture,

    /// The incoming request cannot be encoded
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A failure inside propagation, association or synthesis
    #[error("Processing failed during {stage}: {source}")]
    Processing {
        stage: &'static str,
        #[source]
        source: Box<EngineError>,
    },

    /// The call is not accepted in the current lifecycle state
    #[error("Cannot {operation} while engine is {state}")]
    InvalidState {
        state: ModuleState,
        operation: &'static str,
    },
}

impl EngineError {
    /// Wrap an inner failure with the pipeline stage it happened in.
    pub fn processing(stage: &'static str, source: EngineError) -> Self {
        Self::Processing {
            stage,
            source: Box::new(source),
        }
    }

    /// Short machine-readable tag, used for error-trace records and events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::EmptyArchitecture => "empty_architecture",
            Self::InvalidInput(_) => "invalid_input",
            Self::Processing { .. } => "processing",
            Self::InvalidState { .. } => "invalid_state",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_wraps_source() {
        let err = EngineError::processing("propagation", EngineError::EmptyArchitecture);
        assert_eq!(err.kind(), "processing");
        assert_eq!(
            err.to_string(),
            "Processing failed during propagation: Architecture has no layers"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Architecture has no layers");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = EngineError::InvalidState {
            state: ModuleState::Stopped,
            operation: "process requests",
        };
        assert_eq!(err.to_string(), "Cannot process requests while engine is stopped");
    }
}
