//! Incoming request shape.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A request submitted to the engine.
///
/// Serialized with the wire names `type`, `content`, `priority`, `keywords`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestShape {
    #[serde(rename = "type", default)]
    pub request_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Caller priority in `[0, 1]`; out-of-range values are clamped when encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl RequestShape {
    pub fn new(request_type: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a raw JSON request.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] for `null`, non-object values, malformed
    /// fields, or a request with nothing to encode.
    pub fn from_value(value: serde_json::Value) -> EngineResult<Self> {
        match value {
            serde_json::Value::Null => {
                Err(EngineError::InvalidInput("request is null".to_string()))
            }
            serde_json::Value::Object(_) => {
                let request: RequestShape = serde_json::from_value(value)
                    .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
                request.validate()?;
                Ok(request)
            }
            other => Err(EngineError::InvalidInput(format!(
                "request must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Whether the request has content (text or keywords) to encode.
    pub fn has_content(&self) -> bool {
        self.content
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
            || !self.keywords.is_empty()
    }

    /// A request needs either an explicit type or extractable content.
    pub fn validate(&self) -> EngineResult<()> {
        if self.request_type.trim().is_empty() && !self.has_content() {
            return Err(EngineError::InvalidInput(
                "request has neither a type nor content".to_string(),
            ));
        }
        Ok(())
    }

    /// Text used for encoding; empty when the request carries no content.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
