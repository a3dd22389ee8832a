use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// One line of the JSONL run trace: a dispatched tool call and how it ended.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: usize,

    pub tool: String,
    pub status: String,

    pub element_id: Option<String>,
    pub message: Option<String>,
}

impl TraceEvent {
    pub fn now(step: usize, tool: &str) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            step,
            tool: tool.to_string(),
            status: "pending".to_string(),
            element_id: None,
            message: None,
        }
    }

    pub fn with_status(mut self, status: impl ToString) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn with_element(mut self, element_id: Option<&str>) -> Self {
        self.element_id = element_id.map(str::to_string);
        self
    }

    pub fn with_message(mut self, message: impl ToString) -> Self {
        self.message = Some(message.to_string());
        self
    }
}
