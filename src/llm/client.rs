use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Text-completion seam. The orchestrator only needs "prompt in, reply out";
/// tests plug in a scripted implementation.
pub trait LlmClient {
    fn complete(&self, prompt: &str) -> Result<String, AgentError>;
}

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaClient {
    pub endpoint: String,
    pub model: String,
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "qwen2.5:1.5b".to_string(),
        }
    }
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        }
    }
}

// ============================================================================
// Scripted Backend
// ============================================================================

/// Canned completion, for tests and offline dry runs.
pub struct ScriptedClient {
    reply: String,
}

impl ScriptedClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl LlmClient for ScriptedClient {
    fn complete(&self, _prompt: &str) -> Result<String, AgentError> {
        Ok(self.reply.clone())
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let client = reqwest::blocking::Client::new();
        let response = client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| AgentError::LlmRequest(e.to_string()))?;

        let body: OllamaResponse = response
            .json()
            .map_err(|e| AgentError::LlmRequest(e.to_string()))?;

        Ok(body.response)
    }
}
