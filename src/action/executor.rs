//! Action execution with change verification.
//!
//! The backend will happily report a tap as successful even when nothing on
//! screen moved. Every tap is therefore bracketed by page fingerprints, and a
//! tap that produced no observable change runs through a chain of alternate
//! interaction methods before being declared a failure.

use std::time::{Duration, Instant};

use serde_json::json;

use crate::action::fingerprint::{DiffThresholds, PageFingerprint, page_changed};
use crate::action::recovery::recover_stale_text;
use crate::chain::first_success;
use crate::cli::config::TimingConfig;
use crate::error::AgentError;
use crate::resolve::resolver::resolve_element;
use crate::resolve::web::is_web_context;
use crate::session::state::{ElementRef, SessionState};
use crate::transport::Backend;
use crate::transport::result::ToolOutcome;

fn pause(ms: u64) {
    if ms > 0 {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

// ============================================================================
// Tap with verification
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum AlternateTap {
    ScriptClick,
    DoubleTap,
    ScrollAndTap,
    SimilarElement,
}

const ALTERNATE_TAPS: [AlternateTap; 4] = [
    AlternateTap::ScriptClick,
    AlternateTap::DoubleTap,
    AlternateTap::ScrollAndTap,
    AlternateTap::SimilarElement,
];

/// Tap an element and verify the page actually changed.
///
/// A backend-level tap failure is returned untouched. A tap the backend
/// accepted but which left the page fingerprint unchanged runs the alternate
/// chain; each alternate is itself re-verified before it counts.
pub fn tap_with_verification(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    timing: &TimingConfig,
    thresholds: &DiffThresholds,
    element: &ElementRef,
) -> Result<ToolOutcome, AgentError> {
    let Some(element_id) = element.resolve(state).map(str::to_string) else {
        return Err(AgentError::NoElement("tap".into()));
    };

    let before = PageFingerprint::capture(backend)?;

    println!("Tapping element: {}", element_id);
    let outcome = backend.call_tool("appium_tap_element", json!({ "element_id": element_id }))?;
    if !outcome.is_success() {
        return Ok(outcome);
    }

    pause(timing.settle_ms);
    let after = PageFingerprint::capture(backend)?;

    if page_changed(&before, &after, thresholds) {
        return Ok(ToolOutcome::success_with(json!({
            "message": "Tap successful"
        })));
    }

    println!("Tap did not change the page, trying alternative methods...");

    let verified = first_success(&ALTERNATE_TAPS, |method| {
        try_alternate_tap(backend, state, timing, thresholds, &element_id, &before, *method)
    });

    match verified {
        Some(outcome) => Ok(outcome),
        None => Err(AgentError::VerificationFailed(
            "direct tap and all alternative methods failed".into(),
        )),
    }
}

fn try_alternate_tap(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    timing: &TimingConfig,
    thresholds: &DiffThresholds,
    element_id: &str,
    before: &PageFingerprint,
    method: AlternateTap,
) -> Result<Option<ToolOutcome>, AgentError> {
    let tapped = match method {
        AlternateTap::ScriptClick => {
            if !is_web_context(backend) {
                return Ok(None);
            }
            println!("Trying script-based click...");
            let outcome = backend.call_tool(
                "appium_execute_script",
                json!({ "script": "arguments[0].click();", "element_id": element_id }),
            )?;
            outcome.is_success()
        }
        AlternateTap::DoubleTap => {
            println!("Trying double tap...");
            backend.call_tool("appium_tap_element", json!({ "element_id": element_id }))?;
            pause(timing.double_tap_pause_ms);
            let second =
                backend.call_tool("appium_tap_element", json!({ "element_id": element_id }))?;
            if second.is_success() {
                pause(timing.settle_ms);
            }
            second.is_success()
        }
        AlternateTap::ScrollAndTap => {
            println!("Trying scroll and tap...");
            backend.call_tool("appium_scroll", json!({ "direction": "up" }))?;
            pause(timing.scroll_ms);
            let retap =
                backend.call_tool("appium_tap_element", json!({ "element_id": element_id }))?;
            if retap.is_success() {
                pause(timing.settle_ms);
            }
            retap.is_success()
        }
        AlternateTap::SimilarElement => {
            println!("Trying elements with the same text...");
            tap_similar_element(backend, state, element_id)?
        }
    };

    if !tapped {
        return Ok(None);
    }

    let after = PageFingerprint::capture(backend)?;
    if page_changed(before, &after, thresholds) {
        Ok(Some(ToolOutcome::success_with(json!({
            "message": "Tap successful via alternative method"
        }))))
    } else {
        Ok(None)
    }
}

/// Look for a different element sharing the stuck element's visible text and
/// tap the first one whose tap the backend accepts.
fn tap_similar_element(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    element_id: &str,
) -> Result<bool, AgentError> {
    let read = backend.call_tool("appium_get_text", json!({ "element_id": element_id }))?;
    let Some(text) = read.text().map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(false);
    };
    let text = text.to_string();

    let patterns = [
        format!("//*[text()='{}']", text),
        format!("//*[contains(text(), '{}')]", text),
        format!("//button[text()='{}']", text),
        format!("//a[text()='{}']", text),
    ];

    let hit = first_success(&patterns, |xpath| {
        let found = backend.call_tool(
            "appium_find_element",
            json!({ "strategy": "xpath", "value": xpath }),
        )?;
        if !found.is_success() {
            return Ok(None);
        }
        let Some(alt_id) = found.element_id().map(str::to_string) else {
            return Ok(None);
        };
        if alt_id == element_id {
            return Ok(None);
        }

        println!("Trying alternative element: {}", alt_id);
        let tap = backend.call_tool("appium_tap_element", json!({ "element_id": alt_id }))?;
        if tap.is_success() {
            state.last_element_id = Some(alt_id);
            Ok(Some(()))
        } else {
            Ok(None)
        }
    });

    Ok(hit.is_some())
}

// ============================================================================
// Text read with stale recovery
// ============================================================================

pub fn get_text(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    element: &ElementRef,
) -> Result<ToolOutcome, AgentError> {
    let Some(element_id) = element.resolve(state).map(str::to_string) else {
        return Err(AgentError::NoElement("get text".into()));
    };

    println!("Getting text from element: {}", element_id);
    let outcome = backend.call_tool("appium_get_text", json!({ "element_id": element_id }))?;

    if !outcome.is_success() && AgentError::message_is_stale(&outcome.message()) {
        return recover_stale_text(backend);
    }

    Ok(outcome)
}

// ============================================================================
// Text input
// ============================================================================

/// Type text. Target selection, in order of preference: an explicit element
/// reference, a strategy/value pair resolved on the spot, or the focused
/// element when neither is given.
pub fn input_text(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    max_snapshot_elements: usize,
    element: &ElementRef,
    locator: Option<(&str, &str)>,
    text: &str,
) -> Result<ToolOutcome, AgentError> {
    // Preference order: explicit id, then a locator resolved on the spot,
    // then whatever element was last found.
    let target = match (element, locator) {
        (ElementRef::Explicit(id), _) => Some(id.clone()),
        (_, Some((strategy, value))) => {
            println!("Finding element for input using {}='{}'", strategy, value);
            let resolution =
                resolve_element(backend, state, max_snapshot_elements, strategy, value, None)?;
            match resolution.element_id {
                Some(id) => Some(id),
                None => return Ok(resolution.outcome),
            }
        }
        _ => element.resolve(state).map(str::to_string),
    };

    let args = match &target {
        Some(id) => {
            println!("Inputting text to element {}: '{}'", id, text);
            json!({ "element_id": id, "text": text })
        }
        None => {
            println!("Inputting text directly: '{}'", text);
            json!({ "text": text })
        }
    };

    backend.call_tool("appium_input_text", args)
}

// ============================================================================
// Gestures, waits, and simple passthroughs
// ============================================================================

pub fn scroll(
    backend: &mut dyn Backend,
    timing: &TimingConfig,
    direction: &str,
) -> Result<ToolOutcome, AgentError> {
    let outcome = backend.call_tool("appium_scroll", json!({ "direction": direction }))?;
    pause(timing.scroll_ms);
    Ok(outcome)
}

pub fn take_screenshot(
    backend: &mut dyn Backend,
    filename: Option<&str>,
) -> Result<ToolOutcome, AgentError> {
    let args = match filename {
        Some(name) => json!({ "filename": name }),
        None => json!({}),
    };
    backend.call_tool("appium_take_screenshot", args)
}

pub fn get_page_source(backend: &mut dyn Backend, full: bool) -> Result<ToolOutcome, AgentError> {
    backend.call_tool("appium_get_page_source", json!({ "full": full }))
}

/// Scroll down repeatedly, retrying resolution after each scroll.
pub fn scroll_to_find(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    max_snapshot_elements: usize,
    timing: &TimingConfig,
    strategy: &str,
    value: &str,
    description: Option<&str>,
) -> Result<ToolOutcome, AgentError> {
    for attempt in 0..timing.max_scrolls {
        println!("Scroll attempt {}/{}", attempt + 1, timing.max_scrolls);

        let resolution =
            resolve_element(backend, state, max_snapshot_elements, strategy, value, description)?;
        if resolution.element_id.is_some() {
            return Ok(resolution.outcome);
        }

        backend.call_tool("appium_scroll", json!({ "direction": "down" }))?;
        pause(timing.scroll_ms);
    }

    Ok(ToolOutcome::error(format!(
        "Element '{}' not found after {} scrolls",
        value, timing.max_scrolls
    )))
}

/// Poll for an element until it appears or the timeout elapses. Timing out
/// yields a not-found result, not an error.
pub fn wait_for_element(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    max_snapshot_elements: usize,
    timing: &TimingConfig,
    strategy: &str,
    value: &str,
    timeout_ms: u64,
) -> Result<ToolOutcome, AgentError> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let resolution =
            resolve_element(backend, state, max_snapshot_elements, strategy, value, None)?;
        if resolution.element_id.is_some() {
            return Ok(resolution.outcome);
        }

        if Instant::now() >= deadline {
            return Ok(ToolOutcome::error(format!(
                "Element '{}' did not appear within {}ms",
                value, timeout_ms
            )));
        }
        pause(timing.poll_ms);
    }
}

/// Plain sleep, exposed as a tool so the model can wait out animations.
pub fn wait(duration_ms: u64) -> ToolOutcome {
    println!("Waiting {}ms", duration_ms);
    pause(duration_ms);
    ToolOutcome::success_with(json!({ "message": format!("Waited {}ms", duration_ms) }))
}
