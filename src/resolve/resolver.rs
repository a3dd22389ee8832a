use serde_json::json;

use crate::chain::first_success;
use crate::error::AgentError;
use crate::resolve::matching::rank_candidates;
use crate::resolve::web;
use crate::session::state::SessionState;
use crate::snapshot::{ElementDescriptor, extract_elements};
use crate::transport::Backend;
use crate::transport::result::ToolOutcome;

/// Outcome of one resolution call. `element_id` is set iff the outcome is a
/// success; a not-found comes back as an error-status outcome, never an Err,
/// so callers can branch on it (scroll-and-retry does).
#[derive(Debug)]
pub struct Resolution {
    pub element_id: Option<String>,
    pub outcome: ToolOutcome,
}

impl Resolution {
    pub fn found(element_id: String, outcome: ToolOutcome) -> Resolution {
        Resolution {
            element_id: Some(element_id),
            outcome,
        }
    }

    pub fn not_found(message: String) -> Resolution {
        Resolution {
            element_id: None,
            outcome: ToolOutcome::error(message),
        }
    }
}

/// Locate an element, trying progressively looser approaches.
///
/// 1. The caller's strategy/value verbatim.
/// 2. If the current view is a web page, the web strategy builder takes over.
/// 3. Otherwise a snapshot is taken and ranked candidates are trialled.
pub fn resolve_element(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    max_snapshot_elements: usize,
    strategy: &str,
    value: &str,
    description: Option<&str>,
) -> Result<Resolution, AgentError> {
    println!(
        "Looking for element: {} using {}",
        description.unwrap_or(value),
        strategy
    );

    if web::is_web_context(backend) {
        return web::resolve_web_element(
            backend,
            state,
            max_snapshot_elements,
            strategy,
            value,
            description,
        );
    }

    if let Some(resolution) = try_locator(backend, state, strategy, value, description)? {
        return Ok(resolution);
    }

    println!("Direct search failed, inspecting page for: {}", value);
    resolve_by_inspection(backend, state, max_snapshot_elements, value, description)
}

/// Snapshot the UI tree, rank elements against the target text, and trial
/// each candidate's locators in tier order.
pub fn resolve_by_inspection(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    max_snapshot_elements: usize,
    target_text: &str,
    description: Option<&str>,
) -> Result<Resolution, AgentError> {
    let elements = match extract_elements(backend, max_snapshot_elements) {
        Ok(elements) => elements,
        Err(err) => {
            return Ok(Resolution::not_found(format!(
                "Failed to inspect page: {}",
                err
            )));
        }
    };

    let candidates = rank_candidates(&elements, target_text);
    if candidates.is_empty() {
        return Ok(Resolution::not_found(format!(
            "Element '{}' not found",
            target_text
        )));
    }

    for (tier, element) in &candidates {
        println!(
            "Trying {:?} match: '{}'",
            tier,
            element.display_name()
        );
        if let Some(resolution) = try_candidate(backend, state, element, description) {
            return Ok(resolution);
        }
    }

    Ok(Resolution::not_found(format!(
        "Could not find element '{}' with any strategy",
        target_text
    )))
}

/// Trial the up-to-four locators a descriptor yields. Individual attempt
/// failures, transport included, are swallowed so the chain keeps moving.
fn try_candidate(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    element: &ElementDescriptor,
    description: Option<&str>,
) -> Option<Resolution> {
    let locators: Vec<(&str, &str)> = [
        ("accessibility_id", element.accessibility_id.as_deref()),
        ("xpath", Some(element.xpath.as_str())),
        ("id", element.id.as_deref()),
        ("class_name", element.class_name.as_deref()),
    ]
    .into_iter()
    .filter_map(|(strategy, value)| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| (strategy, v))
    })
    .collect();

    first_success(&locators, |(strategy, value)| {
        try_locator(backend, state, strategy, value, description)
    })
}

/// One backend find-element call. `Ok(None)` means "did not match"; a success
/// with a valid id updates session state and returns the resolution.
pub fn try_locator(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    strategy: &str,
    value: &str,
    description: Option<&str>,
) -> Result<Option<Resolution>, AgentError> {
    let outcome = backend.call_tool(
        "appium_find_element",
        json!({ "strategy": strategy, "value": value }),
    )?;

    if !outcome.is_success() {
        return Ok(None);
    }

    let Some(element_id) = outcome.element_id().map(str::to_string) else {
        return Ok(None);
    };
    if !backend.element_id_looks_valid(&element_id) {
        return Ok(None);
    }

    let key = description.unwrap_or(value);
    state.record_element(key, &element_id);
    println!("Found using {}='{}': {}", strategy, value, element_id);

    Ok(Some(Resolution::found(element_id, outcome)))
}
