use std::fmt;

#[derive(Debug)]
pub enum AgentError {
    /// Backend server process failed to spawn
    SubprocessSpawn { command: String, source: std::io::Error },

    /// Reading/writing the backend's stdio failed or the stream closed
    TransportIo(String),

    /// JSON parsing failed (backend response or embedded payload)
    JsonParse { context: String, source: serde_json::Error },

    /// JSON serialization failed (request to the backend)
    JsonSerialize { context: String, source: serde_json::Error },

    /// Backend returned a JSON-RPC error object
    Rpc { method: String, message: String },

    /// Session start/quit failure
    Session(String),

    /// Page source came back empty
    EmptyPageSource,

    /// Page source could not be parsed as XML
    XmlParse(roxmltree::Error),

    /// An action was requested but no element id is available
    NoElement(String),

    /// Stale element detected and every recovery strategy failed
    StaleRecoveryExhausted,

    /// Tap succeeded at the backend but produced no observable page change
    VerificationFailed(String),

    /// Language-model request failed
    LlmRequest(String),

    /// No structured tool call could be extracted from model output
    NoToolCalls,
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::SubprocessSpawn { command, source } => {
                write!(f, "Failed to spawn backend '{}': {}", command, source)
            }
            AgentError::TransportIo(msg) => {
                write!(f, "Transport I/O error: {}", msg)
            }
            AgentError::JsonParse { context, source } => {
                write!(f, "JSON parse error ({}): {}", context, source)
            }
            AgentError::JsonSerialize { context, source } => {
                write!(f, "JSON serialize error ({}): {}", context, source)
            }
            AgentError::Rpc { method, message } => {
                write!(f, "Backend error ({}): {}", method, message)
            }
            AgentError::Session(msg) => {
                write!(f, "Session error: {}", msg)
            }
            AgentError::EmptyPageSource => {
                write!(f, "Empty page source")
            }
            AgentError::XmlParse(source) => {
                write!(f, "Failed to parse page source XML: {}", source)
            }
            AgentError::NoElement(action) => {
                write!(f, "No element ID available for {}", action)
            }
            AgentError::StaleRecoveryExhausted => {
                write!(
                    f,
                    "Element became stale and recovery strategies failed; the UI may have changed significantly"
                )
            }
            AgentError::VerificationFailed(msg) => {
                write!(f, "Tap produced no observable change: {}", msg)
            }
            AgentError::LlmRequest(msg) => {
                write!(f, "Language model request failed: {}", msg)
            }
            AgentError::NoToolCalls => {
                write!(f, "No valid JSON tool call found in the model response")
            }
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgentError::SubprocessSpawn { source, .. } => Some(source),
            AgentError::JsonParse { source, .. } => Some(source),
            AgentError::JsonSerialize { source, .. } => Some(source),
            AgentError::XmlParse(source) => Some(source),
            _ => None,
        }
    }
}

impl AgentError {
    /// Whether a backend-reported message looks like a stale-element failure.
    pub fn message_is_stale(message: &str) -> bool {
        message.contains("StaleElementReference") || message.to_lowercase().contains("stale element")
    }
}
