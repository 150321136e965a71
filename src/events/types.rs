//! Engine lifecycle and processing event types

use serde::{Deserialize, Serialize};

/// What happened inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineEventKind {
    /// `initialize()` completed and the engine is accepting requests
    ModuleReady,
    /// A request completed a full processing cycle
    RequestProcessed,
    /// A request failed; an error trace was recorded
    RequestFailed,
    /// The engine stopped; the payload holds the final status
    ModuleShutdown,
}

impl EngineEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ModuleReady => "module-ready",
            Self::RequestProcessed => "request-processed",
            Self::RequestFailed => "request-failed",
            Self::ModuleShutdown => "module-shutdown",
        }
    }
}

impl std::fmt::Display for EngineEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event published on the outbound channel
///
/// Observers only read these; nothing flows back into the engine.
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    pub kind: EngineEventKind,
    /// Event data (status snapshot, result summary, error details)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl EngineEvent {
    /// Create a new event with the current timestamp
    pub fn new(kind: EngineEventKind) -> Self {
        Self {
            kind,
            payload: serde_json::Value::Null,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Set the payload
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Outbound sink for engine events.
///
/// Emitting is fire-and-forget: it must not block and must not fail the
/// operation that produced the event.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: EngineEvent);

    /// Emit an event of `kind` carrying `payload`
    fn emit_kind(&self, kind: EngineEventKind, payload: serde_json::Value) {
        self.emit(EngineEvent::new(kind).with_payload(payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&EngineEventKind::ModuleReady).unwrap(),
            "\"module-ready\""
        );
        assert_eq!(
            serde_json::to_string(&EngineEventKind::RequestFailed).unwrap(),
            "\"request-failed\""
        );
        for kind in [
            EngineEventKind::ModuleReady,
            EngineEventKind::RequestProcessed,
            EngineEventKind::RequestFailed,
            EngineEventKind::ModuleShutdown,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_null_payload_omitted() {
        let event = EngineEvent::new(EngineEventKind::ModuleShutdown);
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("payload").is_none());
        assert_eq!(json["kind"], "module-shutdown");
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let event = EngineEvent::new(EngineEventKind::ModuleReady)
            .with_payload(serde_json::json!({"layers": 5}));
        assert!(chrono::DateTime::parse_from_rfc3339(&event.timestamp).is_ok());
        assert_eq!(event.payload["layers"], 5);
    }
}
