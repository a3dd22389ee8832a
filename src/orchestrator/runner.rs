//! Tool-call dispatch.
//!
//! One call at a time, fully completed before the next starts, with a settle
//! delay in between. A failed call is reported and the loop moves on; only
//! transport loss ends the run early.

use serde_json::{Map, Value, json};

use crate::action::executor;
use crate::cli::config::AppConfig;
use crate::error::AgentError;
use crate::orchestrator::parser::ToolCall;
use crate::resolve::resolver::resolve_element;
use crate::session::apps::AppCatalog;
use crate::session::manager;
use crate::session::state::{ElementRef, SessionState};
use crate::snapshot::extract_elements;
use crate::trace::{TraceEvent, TraceLogger};
use crate::transport::Backend;
use crate::transport::result::ToolOutcome;

pub struct Orchestrator<'a> {
    backend: &'a mut dyn Backend,
    pub state: SessionState,
    catalog: AppCatalog,
    config: AppConfig,
    tracer: TraceLogger,
}

fn str_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// The model sometimes emits the iOS attribute name as a strategy.
fn canonical_strategy(strategy: &str) -> &str {
    if strategy == "name" {
        "accessibility_id"
    } else {
        strategy
    }
}

impl<'a> Orchestrator<'a> {
    pub fn new(backend: &'a mut dyn Backend, config: AppConfig, tracer: TraceLogger) -> Self {
        let catalog = config.apps.build_catalog();
        Self {
            backend,
            state: SessionState::default(),
            catalog,
            config,
            tracer,
        }
    }

    /// Run a batch of tool calls sequentially. Per-call failures are logged
    /// and the loop continues; a transport error stops the batch.
    pub fn execute_calls(&mut self, calls: &[ToolCall]) -> Result<(), AgentError> {
        for (step, call) in calls.iter().enumerate() {
            println!("\nTool call {}/{}: {}", step + 1, calls.len(), call.name);

            match self.dispatch(call) {
                Ok(outcome) => {
                    let status = if outcome.is_success() { "success" } else { "error" };
                    if !outcome.is_success() {
                        println!("Tool '{}' failed: {}", call.name, outcome.message());
                    }
                    self.tracer.log(
                        &TraceEvent::now(step + 1, &call.name)
                            .with_status(status)
                            .with_element(self.state.last_element_id.as_deref())
                            .with_message(outcome.message()),
                    );
                }
                Err(err) => {
                    println!("Error during tool execution: {}", err);
                    self.tracer.log(
                        &TraceEvent::now(step + 1, &call.name)
                            .with_status("error")
                            .with_message(&err),
                    );
                    if matches!(err, AgentError::TransportIo(_)) {
                        return Err(err);
                    }
                }
            }

            if step + 1 < calls.len() {
                std::thread::sleep(std::time::Duration::from_millis(
                    self.config.timing.inter_call_ms,
                ));
            }
        }
        Ok(())
    }

    /// Orderly teardown: quit the backend session if one is still active.
    pub fn ensure_session_closed(&mut self) {
        if self.state.active {
            if let Err(err) = manager::quit_session(self.backend, &mut self.state) {
                eprintln!("Warning: failed to quit session: {}", err);
            }
        }
    }

    fn dispatch(&mut self, call: &ToolCall) -> Result<ToolOutcome, AgentError> {
        let args = &call.args;
        let tool = call.name.strip_prefix("appium_").unwrap_or(&call.name);

        match tool {
            "start_session" => {
                manager::start_session(self.backend, &mut self.state, &self.catalog, args)
            }

            "find_element" => self.find_element(args),

            "tap_element" => {
                let element = ElementRef::decode(str_arg(args, "element_id"));
                executor::tap_with_verification(
                    self.backend,
                    &mut self.state,
                    &self.config.timing,
                    &self.config.verification,
                    &element,
                )
            }

            "get_text" => {
                let element = ElementRef::decode(str_arg(args, "element_id"));
                executor::get_text(self.backend, &mut self.state, &element)
            }

            "input_text" => {
                let Some(text) = str_arg(args, "text") else {
                    return Ok(ToolOutcome::error("No text provided for input"));
                };
                let text = text.to_string();
                let element = ElementRef::decode(str_arg(args, "element_id"));
                let locator = match (str_arg(args, "strategy"), str_arg(args, "value")) {
                    (Some(strategy), Some(value)) => {
                        Some((canonical_strategy(strategy).to_string(), value.to_string()))
                    }
                    _ => None,
                };
                executor::input_text(
                    self.backend,
                    &mut self.state,
                    self.config.snapshot.max_elements,
                    &element,
                    locator.as_ref().map(|(s, v)| (s.as_str(), v.as_str())),
                    &text,
                )
            }

            "scroll" => {
                let direction = str_arg(args, "direction").unwrap_or("down").to_string();
                executor::scroll(self.backend, &self.config.timing, &direction)
            }

            "get_page_source" => {
                let full = args.get("full").and_then(Value::as_bool).unwrap_or(false);
                executor::get_page_source(self.backend, full)
            }

            "take_screenshot" => {
                let filename = str_arg(args, "filename").map(str::to_string);
                executor::take_screenshot(self.backend, filename.as_deref())
            }

            "quit_session" => manager::quit_session(self.backend, &mut self.state),

            "wait" => {
                let seconds = args
                    .get("duration")
                    .and_then(Value::as_f64)
                    .unwrap_or(1.0)
                    .max(0.0);
                Ok(executor::wait((seconds * 1000.0) as u64))
            }

            "wait_for_element" => {
                let strategy = canonical_strategy(
                    str_arg(args, "strategy").unwrap_or("accessibility_id"),
                )
                .to_string();
                let Some(value) = str_arg(args, "value").map(str::to_string) else {
                    return Ok(ToolOutcome::error("No value provided for wait"));
                };
                let timeout_s = args.get("timeout").and_then(Value::as_u64).unwrap_or(10);
                executor::wait_for_element(
                    self.backend,
                    &mut self.state,
                    self.config.snapshot.max_elements,
                    &self.config.timing,
                    &strategy,
                    &value,
                    timeout_s * 1000,
                )
            }

            "extract_selectors_from_page_source" => self.extract_selectors(args),

            "assert_element_exists" => {
                let strategy = canonical_strategy(
                    str_arg(args, "strategy").unwrap_or("accessibility_id"),
                )
                .to_string();
                let Some(value) = str_arg(args, "value").map(str::to_string) else {
                    return Ok(ToolOutcome::error("No value provided for assertion"));
                };
                let resolution = resolve_element(
                    self.backend,
                    &mut self.state,
                    self.config.snapshot.max_elements,
                    &strategy,
                    &value,
                    None,
                )?;
                Ok(match resolution.element_id {
                    Some(_) => ToolOutcome::success_with(json!({
                        "message": format!("Element '{}' exists", value)
                    })),
                    None => ToolOutcome::error(format!("Element '{}' does not exist", value)),
                })
            }

            "assert_text_contains" => {
                let element = ElementRef::decode(str_arg(args, "element_id"));
                let Some(expected) = str_arg(args, "expected_text").map(str::to_string) else {
                    return Ok(ToolOutcome::error("No expected_text provided"));
                };
                let outcome = executor::get_text(self.backend, &mut self.state, &element)?;
                if !outcome.is_success() {
                    return Ok(outcome);
                }
                let actual = outcome.text().unwrap_or("");
                Ok(if actual.contains(&expected) {
                    ToolOutcome::success_with(json!({
                        "message": format!("Text contains '{}'", expected)
                    }))
                } else {
                    ToolOutcome::error(format!(
                        "Text '{}' does not contain '{}'",
                        actual, expected
                    ))
                })
            }

            "assert" | "assert_value" | "assert_equals" | "validate" | "check" => {
                Ok(generic_assert(args))
            }

            "assert_contains" => {
                let mut args = args.clone();
                args.entry("comparison".to_string()).or_insert(json!("contains"));
                Ok(generic_assert(&args))
            }

            // Anything else goes straight through to the backend
            _ => {
                println!("Passing tool '{}' through to the backend", call.name);
                self.backend.call_tool(&call.name, Value::Object(args.clone()))
            }
        }
    }

    fn find_element(&mut self, args: &Map<String, Value>) -> Result<ToolOutcome, AgentError> {
        let strategy = canonical_strategy(
            str_arg(args, "strategy").unwrap_or("accessibility_id"),
        )
        .to_string();
        let Some(value) = str_arg(args, "value")
            .or_else(|| str_arg(args, "selector"))
            .map(str::to_string)
        else {
            return Ok(ToolOutcome::error("No value provided for find"));
        };
        let description = str_arg(args, "description").map(str::to_string);

        let resolution = resolve_element(
            self.backend,
            &mut self.state,
            self.config.snapshot.max_elements,
            &strategy,
            &value,
            description.as_deref(),
        )?;
        if resolution.element_id.is_some() {
            return Ok(resolution.outcome);
        }

        println!("Element not found, trying to scroll to find it...");
        executor::scroll_to_find(
            self.backend,
            &mut self.state,
            self.config.snapshot.max_elements,
            &self.config.timing,
            &strategy,
            &value,
            description.as_deref(),
        )
    }

    fn extract_selectors(&mut self, args: &Map<String, Value>) -> Result<ToolOutcome, AgentError> {
        let max_elements = args
            .get("max_elements")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(25);

        let elements = match extract_elements(self.backend, max_elements) {
            Ok(elements) => elements,
            Err(err) => return Ok(ToolOutcome::error(err.to_string())),
        };

        println!("Found {} elements on page:", elements.len());
        for (i, element) in elements.iter().take(15).enumerate() {
            let clickable = if element.clickable { " [CLICKABLE]" } else { "" };
            println!(
                "  {:2}. {}: '{}'{}",
                i + 1,
                element.tag,
                element.display_name(),
                clickable
            );
        }
        if elements.len() > 15 {
            println!("  ... and {} more elements", elements.len() - 15);
        }

        let payload = serde_json::to_value(&elements).map_err(|e| AgentError::JsonSerialize {
            context: "extracted selectors".into(),
            source: e,
        })?;
        Ok(ToolOutcome::success_with(json!({
            "elements": payload,
            "count": elements.len(),
        })))
    }
}

/// Loosely-typed comparisons the model likes to emit under several names.
fn generic_assert(args: &Map<String, Value>) -> ToolOutcome {
    let actual = str_arg(args, "actual_value")
        .or_else(|| str_arg(args, "actual"))
        .unwrap_or("");
    let expected = str_arg(args, "expected_value")
        .or_else(|| str_arg(args, "expected"))
        .unwrap_or("");
    let comparison = str_arg(args, "comparison").unwrap_or("equals");

    let passed = match comparison {
        "equals" | "==" | "eq" => actual == expected,
        "contains" | "in" => actual.contains(expected),
        "not_equals" | "!=" | "ne" => actual != expected,
        other => {
            return ToolOutcome::success_with(json!({
                "message": format!("Unrecognized comparison '{}', skipping", other)
            }));
        }
    };

    if passed {
        ToolOutcome::success_with(json!({
            "message": format!("Assertion passed: '{}' {} '{}'", actual, comparison, expected)
        }))
    } else {
        ToolOutcome::error(format!(
            "Assertion failed: '{}' {} '{}'",
            actual, comparison, expected
        ))
    }
}
