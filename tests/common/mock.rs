use serde_json::{Value, json};

use mobile_agent::cli::config::TimingConfig;
use mobile_agent::error::AgentError;
use mobile_agent::transport::Backend;
use mobile_agent::transport::result::ToolOutcome;

/// A scripted backend. Rules are checked in registration order; the first
/// live match answers the call. Every call is recorded for assertions.
pub struct MockBackend {
    rules: Vec<Rule>,
    pub calls: Vec<(String, Value)>,
}

struct Rule {
    tool: String,
    arg: Option<(String, String)>,
    outcome: ToolOutcome,
    once: bool,
    used: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Answer every call to `tool` with `outcome`.
    pub fn on(mut self, tool: &str, outcome: ToolOutcome) -> Self {
        self.rules.push(Rule {
            tool: tool.to_string(),
            arg: None,
            outcome,
            once: false,
            used: false,
        });
        self
    }

    /// Answer calls to `tool` whose serialized `key` argument contains
    /// `fragment`.
    pub fn on_arg(mut self, tool: &str, key: &str, fragment: &str, outcome: ToolOutcome) -> Self {
        self.rules.push(Rule {
            tool: tool.to_string(),
            arg: Some((key.to_string(), fragment.to_string())),
            outcome,
            once: false,
            used: false,
        });
        self
    }

    /// Like `on`, but consumed after its first match.
    pub fn once(mut self, tool: &str, outcome: ToolOutcome) -> Self {
        self.rules.push(Rule {
            tool: tool.to_string(),
            arg: None,
            outcome,
            once: true,
            used: false,
        });
        self
    }

    /// How many calls were made to `tool`.
    pub fn count(&self, tool: &str) -> usize {
        self.calls.iter().filter(|(name, _)| name == tool).count()
    }

    /// Arguments of the `n`th call to `tool` (zero-based).
    pub fn call_args(&self, tool: &str, n: usize) -> Option<&Value> {
        self.calls
            .iter()
            .filter(|(name, _)| name == tool)
            .nth(n)
            .map(|(_, args)| args)
    }
}

impl Backend for MockBackend {
    fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutcome, AgentError> {
        self.calls.push((name.to_string(), arguments.clone()));

        for rule in self.rules.iter_mut() {
            if rule.tool != name || (rule.once && rule.used) {
                continue;
            }
            if let Some((key, fragment)) = &rule.arg {
                let matches = arguments
                    .get(key)
                    .map(|v| v.to_string().contains(fragment.as_str()))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
            }
            rule.used = true;
            return Ok(rule.outcome.clone());
        }

        Ok(fail(&format!("No scripted response for '{}'", name)))
    }
}

// ---- Outcome builders ----

pub fn ok(payload: Value) -> ToolOutcome {
    ToolOutcome::success_with(payload)
}

pub fn found(element_id: &str) -> ToolOutcome {
    ok(json!({ "status": "success", "element_id": element_id }))
}

pub fn page(source: &str) -> ToolOutcome {
    ok(json!({ "status": "success", "page_source": source }))
}

pub fn text(value: &str) -> ToolOutcome {
    ok(json!({ "status": "success", "text": value }))
}

pub fn fail(message: &str) -> ToolOutcome {
    ToolOutcome::error(message)
}

/// Timing with every delay zeroed so tests run instantly.
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        settle_ms: 0,
        inter_call_ms: 0,
        scroll_ms: 0,
        poll_ms: 0,
        double_tap_pause_ms: 0,
        max_scrolls: 2,
    }
}
