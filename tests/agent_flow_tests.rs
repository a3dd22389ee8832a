use serde_json::json;

use mobile_agent::cli::config::AppConfig;
use mobile_agent::error::AgentError;
use mobile_agent::llm::ScriptedClient;
use mobile_agent::run_prompt;

use crate::common::mock::{MockBackend, fast_timing, found, ok};
mod common;

fn fast_config() -> AppConfig {
    AppConfig {
        timing: fast_timing(),
        ..AppConfig::default()
    }
}

// ============================================================================
// Prompt to backend, end to end
// ============================================================================

#[test]
fn a_prompt_drives_the_backend_and_tears_down() {
    let reply = r#"I'll open Settings and find the General cell.
```json
{"tool": "appium_start_session", "args": {"platform": "ios", "app": "settings"}}
```
```json
{"tool": "appium_find_element", "args": {"strategy": "name", "value": "General"}}
```"#;

    let mut backend = MockBackend::new()
        .on("appium_start_session", ok(json!({ "status": "success" })))
        .on_arg("appium_find_element", "value", "General", found("el-1"))
        .on("appium_quit_session", ok(json!({ "status": "success" })));

    run_prompt(
        &mut backend,
        &ScriptedClient::new(reply),
        fast_config(),
        "open settings and tap General",
        Some("ios"),
        None,
    )
    .unwrap();

    // Session opened, element resolved, and the leftover session was closed
    assert_eq!(backend.count("appium_start_session"), 1);
    assert_eq!(
        backend.call_args("appium_start_session", 0).unwrap()["bundle_id"],
        json!("com.apple.Preferences")
    );
    assert_eq!(backend.count("appium_quit_session"), 1);

    let find = backend.call_args("appium_find_element", 0).unwrap();
    assert_eq!(find["strategy"], json!("accessibility_id"));
}

#[test]
fn a_reply_without_tool_calls_is_an_error() {
    let mut backend = MockBackend::new();

    let result = run_prompt(
        &mut backend,
        &ScriptedClient::new("Sure, I tapped it for you."),
        fast_config(),
        "tap the button",
        Some("ios"),
        None,
    );

    assert!(matches!(result, Err(AgentError::NoToolCalls)));
    assert!(backend.calls.is_empty());
}
