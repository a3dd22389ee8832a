use serde_json::Value;

/// Normalized result of one backend tool call.
///
/// The backend wraps tool results in an MCP envelope: a `content` array whose
/// first entry is a text item holding a JSON document with a `status` field.
/// This module unwraps that convention exactly once; downstream components
/// only ever see the flat status/payload pair.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub status: OutcomeStatus,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Error,
}

impl ToolOutcome {
    /// Unwrap the `content: [{type: "text", text: "<json>"}]` envelope.
    /// Malformed envelopes normalize to an error outcome, never a panic.
    pub fn from_rpc_result(result: &Value) -> ToolOutcome {
        let text = result
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|items| items.first())
            .and_then(|item| item.get("text"))
            .and_then(|t| t.as_str());

        let Some(text) = text else {
            return ToolOutcome::error("No content in response");
        };

        match serde_json::from_str::<Value>(text) {
            Ok(payload) => {
                let status = match payload.get("status").and_then(|s| s.as_str()) {
                    Some("success") => OutcomeStatus::Success,
                    _ => OutcomeStatus::Error,
                };
                ToolOutcome { status, payload }
            }
            Err(_) => ToolOutcome::error("Invalid JSON in response"),
        }
    }

    pub fn success_with(payload: Value) -> ToolOutcome {
        ToolOutcome {
            status: OutcomeStatus::Success,
            payload,
        }
    }

    pub fn error(message: impl Into<String>) -> ToolOutcome {
        ToolOutcome {
            status: OutcomeStatus::Error,
            payload: serde_json::json!({ "status": "error", "message": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }

    /// Human-readable message, for reporting and error classification.
    pub fn message(&self) -> String {
        self.str_field("message")
            .map(|s| s.to_string())
            .unwrap_or_else(|| self.payload.to_string())
    }

    pub fn element_id(&self) -> Option<&str> {
        self.str_field("element_id")
    }

    pub fn page_source(&self) -> Option<&str> {
        self.str_field("page_source")
    }

    pub fn text(&self) -> Option<&str> {
        self.str_field("text")
    }
}
