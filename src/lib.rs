//! LLM-driven mobile UI automation.
//!
//! A natural-language prompt is turned into a batch of tool calls by a
//! language model, and each call is dispatched against an Appium-style
//! backend spoken to over newline-delimited JSON-RPC on a child process's
//! stdio. The interesting machinery lives in element resolution (layered
//! fallback matching over a live UI tree) and tap verification (page
//! fingerprint diffing with alternate interaction strategies).

pub mod action;
pub mod chain;
pub mod cli;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod resolve;
pub mod session;
pub mod snapshot;
pub mod trace;
pub mod transport;

use crate::cli::config::AppConfig;
use crate::error::AgentError;
use crate::llm::client::LlmClient;
use crate::llm::prompt::build_prompt;
use crate::orchestrator::parser::extract_tool_calls;
use crate::orchestrator::runner::Orchestrator;
use crate::trace::logger::TraceLogger;
use crate::transport::Backend;

/// Run one prompt end to end against an already-launched backend.
///
/// Convenience entry point for embedding; the CLI wires the same pieces
/// together itself so it can control teardown and debug output.
pub fn run_prompt(
    backend: &mut dyn Backend,
    llm: &dyn LlmClient,
    config: AppConfig,
    prompt: &str,
    platform: Option<&str>,
    device: Option<&str>,
) -> Result<(), AgentError> {
    let reply = llm.complete(&build_prompt(prompt, platform, device))?;
    let calls = extract_tool_calls(&reply)?;

    println!("Found {} tool calls to execute", calls.len());

    let mut orchestrator = Orchestrator::new(backend, config, TraceLogger::disabled());
    let result = orchestrator.execute_calls(&calls);
    orchestrator.ensure_session_closed();
    result
}
