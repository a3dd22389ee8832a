//! Tool-call extraction from model output.
//!
//! The model is told to answer only with fenced JSON blocks, but replies
//! routinely include prose around them and `//` comments inside them. The
//! parser takes every fenced object it can decode and ignores the rest.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::AgentError;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Map<String, Value>,
}

fn block_pattern() -> Option<&'static Regex> {
    static BLOCK: OnceLock<Option<Regex>> = OnceLock::new();
    BLOCK
        .get_or_init(|| Regex::new(r"```(?:json)?\s*(\{[\s\S]*?\})\s*```").ok())
        .as_ref()
}

fn comment_pattern() -> Option<&'static Regex> {
    static COMMENT: OnceLock<Option<Regex>> = OnceLock::new();
    COMMENT.get_or_init(|| Regex::new(r"//[^\n]*").ok()).as_ref()
}

/// Pull every `{tool, args}` object out of a model reply, in order.
/// Blocks that fail to parse are skipped; an empty result is `NoToolCalls`.
pub fn extract_tool_calls(reply: &str) -> Result<Vec<ToolCall>, AgentError> {
    let Some(block) = block_pattern() else {
        return Err(AgentError::NoToolCalls);
    };

    let mut calls = Vec::new();
    for caps in block.captures_iter(reply) {
        let Some(raw) = caps.get(1) else { continue };

        let cleaned = match comment_pattern() {
            Some(comment) => comment.replace_all(raw.as_str(), "").into_owned(),
            None => raw.as_str().to_string(),
        };

        let Ok(value) = serde_json::from_str::<Value>(&cleaned) else {
            continue;
        };

        let Some(name) = value.get("tool").and_then(Value::as_str) else {
            continue;
        };
        let args = value
            .get("args")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        calls.push(ToolCall {
            name: name.to_string(),
            args,
        });
    }

    if calls.is_empty() {
        return Err(AgentError::NoToolCalls);
    }
    Ok(calls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_multiple_blocks_in_order() {
        let reply = r#"First I'll start the session:
```json
{"tool": "appium_start_session", "args": {"platform": "iOS", "app": "Settings"}}
```
Then find the cell:
```json
{"tool": "appium_find_element", "args": {"strategy": "accessibility_id", "value": "General"}}
```"#;
        let calls = extract_tool_calls(reply).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "appium_start_session");
        assert_eq!(calls[1].name, "appium_find_element");
        assert_eq!(
            calls[1].args.get("value").and_then(Value::as_str),
            Some("General")
        );
    }

    #[test]
    fn strips_line_comments() {
        let reply = r#"```json
{
  "tool": "appium_scroll", // scroll to reveal more cells
  "args": {"direction": "down"}
}
```"#;
        let calls = extract_tool_calls(reply).unwrap();
        assert_eq!(calls[0].name, "appium_scroll");
    }

    #[test]
    fn unfenced_reply_is_no_tool_calls() {
        let err = extract_tool_calls("I tapped the button for you.").unwrap_err();
        assert!(matches!(err, AgentError::NoToolCalls));
    }

    #[test]
    fn malformed_block_is_skipped() {
        let reply = r#"```json
{"tool": }
```
```json
{"tool": "appium_quit_session", "args": {}}
```"#;
        let calls = extract_tool_calls(reply).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "appium_quit_session");
    }

    #[test]
    fn plain_fence_without_json_tag_works() {
        let reply = "```\n{\"tool\": \"wait\", \"args\": {\"duration\": 2}}\n```";
        let calls = extract_tool_calls(reply).unwrap();
        assert_eq!(calls[0].name, "wait");
    }

    #[test]
    fn missing_args_defaults_to_empty() {
        let reply = "```json\n{\"tool\": \"appium_quit_session\"}\n```";
        let calls = extract_tool_calls(reply).unwrap();
        assert!(calls[0].args.is_empty());
    }
}
