use std::io::{BufRead, Write};

use crate::cli::config::AppConfig;
use crate::llm::client::{LlmClient, OllamaClient};
use crate::llm::prompt::build_prompt;
use crate::orchestrator::parser::{ToolCall, extract_tool_calls};
use crate::orchestrator::runner::Orchestrator;
use crate::trace::logger::TraceLogger;
use crate::transport::client::McpTransport;

const TRACE_PATH: &str = "agent_trace.jsonl";

// ============================================================================
// run subcommand
// ============================================================================

pub fn cmd_run(
    prompt: &str,
    platform: &str,
    device: Option<&str>,
    debug: bool,
    verbose: u8,
    config: &AppConfig,
    ollama_endpoint: Option<&str>,
    ollama_model: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let llm = build_llm(config, ollama_endpoint, ollama_model);

    if verbose > 0 {
        eprintln!("Requesting tool calls for: {}", prompt);
    }

    let full_prompt = build_prompt(prompt, Some(platform), device);
    let reply = llm.complete(&full_prompt)?;
    let calls = extract_tool_calls(&reply)?;

    println!("Found {} tool calls to execute", calls.len());
    execute_batch(&calls, debug, config)
}

// ============================================================================
// repl subcommand
// ============================================================================

pub fn cmd_repl(
    platform: &str,
    device: Option<&str>,
    config: &AppConfig,
    ollama_endpoint: Option<&str>,
    ollama_model: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let llm = build_llm(config, ollama_endpoint, ollama_model);

    let mut transport = McpTransport::launch(&config.backend.command, &config.backend.args, false)?;
    let mut orchestrator =
        Orchestrator::new(&mut transport, config.clone(), TraceLogger::new(TRACE_PATH));

    println!("Interactive mode. Type 'help' for commands, 'quit' to exit.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match input.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "help" => {
                println!("Commands:");
                println!("  help          show this message");
                println!("  screenshot    capture the current screen");
                println!("  quit session  end the backend session");
                println!("  quit          exit");
                println!("  anything else is sent to the model as an instruction");
                continue;
            }
            "screenshot" => {
                let call = ToolCall {
                    name: "appium_take_screenshot".to_string(),
                    args: Default::default(),
                };
                orchestrator.execute_calls(std::slice::from_ref(&call))?;
                continue;
            }
            "quit session" => {
                let call = ToolCall {
                    name: "appium_quit_session".to_string(),
                    args: Default::default(),
                };
                orchestrator.execute_calls(std::slice::from_ref(&call))?;
                continue;
            }
            _ => {}
        }

        let full_prompt = build_prompt(input, Some(platform), device);
        let reply = match llm.complete(&full_prompt) {
            Ok(reply) => reply,
            Err(err) => {
                println!("Model request failed: {}", err);
                continue;
            }
        };
        match extract_tool_calls(&reply) {
            Ok(calls) => {
                println!("Found {} tool calls to execute", calls.len());
                orchestrator.execute_calls(&calls)?;
            }
            Err(err) => println!("{}", err),
        }
    }

    orchestrator.ensure_session_closed();
    drop(orchestrator);
    transport.shutdown();
    Ok(())
}

// ============================================================================
// helpers
// ============================================================================

fn build_llm(
    config: &AppConfig,
    ollama_endpoint: Option<&str>,
    ollama_model: Option<&str>,
) -> OllamaClient {
    let defaults = OllamaClient::default();
    OllamaClient::new(
        ollama_endpoint
            .or(config.ollama.endpoint.as_deref())
            .unwrap_or(&defaults.endpoint),
        ollama_model
            .or(config.ollama.model.as_deref())
            .unwrap_or(&defaults.model),
    )
}

fn execute_batch(
    calls: &[ToolCall],
    debug: bool,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut transport = McpTransport::launch(&config.backend.command, &config.backend.args, debug)?;

    if debug {
        match transport.list_tools() {
            Ok(tools) => println!("Available tools: {}", tools),
            Err(err) => println!("Could not list tools: {}", err),
        }
    }

    let mut orchestrator =
        Orchestrator::new(&mut transport, config.clone(), TraceLogger::new(TRACE_PATH));

    let result = orchestrator.execute_calls(calls);
    orchestrator.ensure_session_closed();
    drop(orchestrator);
    transport.shutdown();

    result?;
    Ok(())
}
