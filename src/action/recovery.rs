//! Stale-element text recovery.
//!
//! iOS Settings rewrites its table cells underneath us, so a get-text on a
//! previously found "Name" cell routinely comes back stale. Three strategies
//! run in order, each rejecting results that merely echo the label.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use crate::chain::first_success;
use crate::error::AgentError;
use crate::transport::Backend;
use crate::transport::result::ToolOutcome;

const LABEL: &str = "Name";

/// Sibling/value xpaths reaching the value cell next to a "Name" label.
const RECOVERY_XPATHS: &[&str] = &[
    "//XCUIElementTypeCell[@name='Name']//XCUIElementTypeStaticText[2]",
    "//XCUIElementTypeStaticText[@name='Name']/following-sibling::XCUIElementTypeStaticText[1]",
    "//XCUIElementTypeCell[.//XCUIElementTypeStaticText[@name='Name']]//XCUIElementTypeStaticText[position()>1]",
    "//*[@name='Name']/..//XCUIElementTypeStaticText[not(@name='Name')]",
];

/// Raw-markup patterns pulling the value adjacent to a "Name" label.
const RECOVERY_PATTERNS: &[&str] = &[
    r#"(?is)name=["']Name["'][^>]*>.*?name=["']([^"']+)["']"#,
    r#"(?is)label=["']Name["'][^>]*>.*?value=["']([^"']+)["']"#,
    r#"(?is)<[^>]*name=["']Name["'][^>]*>.*?<[^>]*>([^<]+)</[^>]*>"#,
    r#"(?is)Name.*?<[^>]*>([^<]+)</[^>]*>"#,
];

/// Run the recovery chain. Returns a success outcome carrying the recovered
/// text, or `StaleRecoveryExhausted` once every strategy has failed.
pub fn recover_stale_text(backend: &mut dyn Backend) -> Result<ToolOutcome, AgentError> {
    println!("Stale element detected, attempting recovery strategies...");

    type Strategy = fn(&mut dyn Backend) -> Result<Option<String>, AgentError>;
    let strategies: [Strategy; 3] = [
        recover_via_label_cell,
        recover_via_xpath,
        recover_via_page_source,
    ];

    match first_success(&strategies, |strategy| strategy(backend)) {
        Some(text) => Ok(ToolOutcome::success_with(json!({
            "text": text,
            "message": format!("Recovered text: {}", text),
        }))),
        None => Err(AgentError::StaleRecoveryExhausted),
    }
}

fn informative(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty() && trimmed != LABEL).then(|| trimmed.to_string())
}

/// Strategy 1: re-find the label cell fresh and read its text.
fn recover_via_label_cell(backend: &mut dyn Backend) -> Result<Option<String>, AgentError> {
    println!("Attempting to find {} cell directly...", LABEL);

    let found = backend.call_tool(
        "appium_find_element",
        json!({ "strategy": "accessibility_id", "value": LABEL }),
    )?;
    if !found.is_success() {
        return Ok(None);
    }
    let Some(element_id) = found.element_id() else {
        return Ok(None);
    };

    let read = backend.call_tool("appium_get_text", json!({ "element_id": element_id }))?;
    if !read.is_success() {
        return Ok(None);
    }

    Ok(read.text().and_then(informative))
}

/// Strategy 2: structural xpaths aimed at the value cell.
fn recover_via_xpath(backend: &mut dyn Backend) -> Result<Option<String>, AgentError> {
    println!("Attempting xpath-based recovery...");

    Ok(first_success(RECOVERY_XPATHS, |xpath| {
        let found = backend.call_tool(
            "appium_find_element",
            json!({ "strategy": "xpath", "value": xpath }),
        )?;
        if !found.is_success() {
            return Ok(None);
        }
        let Some(element_id) = found.element_id() else {
            return Ok(None);
        };

        let read = backend.call_tool("appium_get_text", json!({ "element_id": element_id }))?;
        if !read.is_success() {
            return Ok(None);
        }
        Ok(read.text().and_then(informative))
    }))
}

/// Strategy 3: scrape the value straight out of raw markup.
fn recover_via_page_source(backend: &mut dyn Backend) -> Result<Option<String>, AgentError> {
    println!("Attempting page source parsing recovery...");

    let outcome = backend.call_tool("appium_get_page_source", json!({ "full": false }))?;
    if !outcome.is_success() {
        return Ok(None);
    }
    let source = outcome.page_source().unwrap_or("");

    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        RECOVERY_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    });

    for pattern in patterns {
        if let Some(text) = pattern
            .captures(source)
            .and_then(|c| c.get(1))
            .and_then(|m| informative(m.as_str()))
        {
            return Ok(Some(text));
        }
    }

    Ok(None)
}
