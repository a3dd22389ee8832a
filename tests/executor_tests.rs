use serde_json::json;

use mobile_agent::action::executor::{
    input_text, scroll_to_find, tap_with_verification, wait_for_element,
};
use mobile_agent::action::fingerprint::DiffThresholds;
use mobile_agent::action::recovery::recover_stale_text;
use mobile_agent::error::AgentError;
use mobile_agent::session::state::{ElementRef, SessionState};

use crate::common::mock::{MockBackend, fail, fast_timing, found, ok, page, text};
mod common;

const PAGE_A: &str = "<AppiumAUT><cell name='General'/></AppiumAUT>";
const PAGE_B: &str = "<AppiumAUT><cell name='About'/><cell name='Software'/></AppiumAUT>";

fn state_with_last(id: &str) -> SessionState {
    let mut state = SessionState::default();
    state.last_element_id = Some(id.to_string());
    state
}

// ============================================================================
// Tap verification
// ============================================================================

#[test]
fn verified_tap_succeeds_on_the_first_attempt() {
    let mut backend = MockBackend::new()
        .once("appium_get_page_source", page(PAGE_A))
        .once("appium_get_page_source", page(PAGE_B))
        .on("appium_tap_element", ok(json!({ "status": "success" })));
    let mut state = state_with_last("el-1");

    let outcome = tap_with_verification(
        &mut backend,
        &mut state,
        &fast_timing(),
        &DiffThresholds::default(),
        &ElementRef::UseLast,
    )
    .unwrap();

    assert!(outcome.is_success());
    assert_eq!(backend.count("appium_tap_element"), 1);
}

#[test]
fn backend_tap_failure_is_returned_untouched() {
    let mut backend = MockBackend::new()
        .on("appium_get_page_source", page(PAGE_A))
        .on("appium_tap_element", fail("tap refused"));
    let mut state = state_with_last("el-1");

    let outcome = tap_with_verification(
        &mut backend,
        &mut state,
        &fast_timing(),
        &DiffThresholds::default(),
        &ElementRef::UseLast,
    )
    .unwrap();

    assert!(!outcome.is_success());
    assert!(outcome.message().contains("tap refused"));
    // No after-fingerprint, no alternates
    assert_eq!(backend.count("appium_get_page_source"), 1);
}

#[test]
fn unchanged_page_falls_through_to_a_similar_element() {
    // Five identical captures: before, after the direct tap, the web-context
    // probe, and the double-tap and scroll-and-tap re-checks. The sixth, after
    // tapping the look-alike element, finally shows a change.
    let mut backend = MockBackend::new()
        .once("appium_get_page_source", page(PAGE_A))
        .once("appium_get_page_source", page(PAGE_A))
        .once("appium_get_page_source", page(PAGE_A))
        .once("appium_get_page_source", page(PAGE_A))
        .once("appium_get_page_source", page(PAGE_A))
        .on("appium_get_page_source", page(PAGE_B))
        .on("appium_tap_element", ok(json!({ "status": "success" })))
        .on("appium_scroll", ok(json!({ "status": "success" })))
        .on_arg("appium_get_text", "element_id", "el-1", text("Login"))
        .on_arg(
            "appium_find_element",
            "value",
            "//*[text()='Login']",
            found("el-2"),
        );
    let mut state = state_with_last("el-1");

    let outcome = tap_with_verification(
        &mut backend,
        &mut state,
        &fast_timing(),
        &DiffThresholds::default(),
        &ElementRef::UseLast,
    )
    .unwrap();

    assert!(outcome.is_success());
    assert!(outcome.message().contains("alternative"));
    assert_eq!(state.last_element_id.as_deref(), Some("el-2"));

    // direct + double tap (2) + scroll retap + look-alike
    assert_eq!(backend.count("appium_tap_element"), 5);
    assert_eq!(
        backend.call_args("appium_scroll", 0).unwrap()["direction"],
        json!("up")
    );
}

#[test]
fn exhausted_alternates_are_a_verification_failure() {
    let mut backend = MockBackend::new()
        .on("appium_get_page_source", page(PAGE_A))
        .on("appium_tap_element", ok(json!({ "status": "success" })))
        .on("appium_scroll", ok(json!({ "status": "success" })));
    let mut state = state_with_last("el-1");

    let result = tap_with_verification(
        &mut backend,
        &mut state,
        &fast_timing(),
        &DiffThresholds::default(),
        &ElementRef::UseLast,
    );

    assert!(matches!(result, Err(AgentError::VerificationFailed(_))));
}

#[test]
fn tap_without_a_target_is_rejected() {
    let mut backend = MockBackend::new();
    let mut state = SessionState::default();

    let result = tap_with_verification(
        &mut backend,
        &mut state,
        &fast_timing(),
        &DiffThresholds::default(),
        &ElementRef::None,
    );

    assert!(matches!(result, Err(AgentError::NoElement(_))));
    assert!(backend.calls.is_empty());
}

// ============================================================================
// Stale-text recovery
// ============================================================================

#[test]
fn first_recovery_strategy_short_circuits_the_rest() {
    let mut backend = MockBackend::new()
        .on_arg(
            "appium_find_element",
            "strategy",
            "accessibility_id",
            found("cell-1"),
        )
        .on_arg("appium_get_text", "element_id", "cell-1", text("Test iPhone"));

    let outcome = recover_stale_text(&mut backend).unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.text(), Some("Test iPhone"));
    // One accessibility-id lookup; the xpath and page-source strategies
    // never ran
    assert_eq!(backend.count("appium_find_element"), 1);
    assert_eq!(backend.count("appium_get_page_source"), 0);
}

#[test]
fn label_echoes_are_rejected_and_the_chain_continues() {
    // The re-found cell just repeats "Name"; the first structural xpath
    // reaches the value cell.
    let mut backend = MockBackend::new()
        .on_arg(
            "appium_find_element",
            "strategy",
            "accessibility_id",
            found("cell-1"),
        )
        .on_arg("appium_get_text", "element_id", "cell-1", text("Name"))
        .on_arg(
            "appium_find_element",
            "value",
            "XCUIElementTypeCell[@name='Name']",
            found("cell-2"),
        )
        .on_arg("appium_get_text", "element_id", "cell-2", text("Pixel 8"));

    let outcome = recover_stale_text(&mut backend).unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.text(), Some("Pixel 8"));
}

#[test]
fn recovery_can_scrape_the_raw_markup() {
    let source = r#"<XCUIElementTypeCell name="Name"><XCUIElementTypeStaticText name="Test iPad"/></XCUIElementTypeCell>"#;
    let mut backend = MockBackend::new().on("appium_get_page_source", page(source));

    let outcome = recover_stale_text(&mut backend).unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.text(), Some("Test iPad"));
}

#[test]
fn exhausted_recovery_is_an_error() {
    let mut backend = MockBackend::new();

    let result = recover_stale_text(&mut backend);

    assert!(matches!(result, Err(AgentError::StaleRecoveryExhausted)));
}

// ============================================================================
// Text input targeting
// ============================================================================

#[test]
fn explicit_element_wins_over_a_locator() {
    let mut backend = MockBackend::new()
        .on("appium_input_text", ok(json!({ "status": "success" })));
    let mut state = SessionState::default();

    input_text(
        &mut backend,
        &mut state,
        50,
        &ElementRef::Explicit("el-7".to_string()),
        Some(("accessibility_id", "username field")),
        "alice",
    )
    .unwrap();

    let args = backend.call_args("appium_input_text", 0).unwrap();
    assert_eq!(args["element_id"], json!("el-7"));
    assert_eq!(args["text"], json!("alice"));
    assert_eq!(backend.count("appium_find_element"), 0);
}

#[test]
fn locator_is_resolved_when_no_element_is_given() {
    let mut backend = MockBackend::new()
        .on_arg("appium_find_element", "value", "username", found("el-8"))
        .on("appium_input_text", ok(json!({ "status": "success" })));
    let mut state = SessionState::default();

    input_text(
        &mut backend,
        &mut state,
        50,
        &ElementRef::None,
        Some(("accessibility_id", "username")),
        "alice",
    )
    .unwrap();

    let args = backend.call_args("appium_input_text", 0).unwrap();
    assert_eq!(args["element_id"], json!("el-8"));
}

#[test]
fn bare_input_goes_to_the_focused_element() {
    let mut backend = MockBackend::new()
        .on("appium_input_text", ok(json!({ "status": "success" })));
    let mut state = SessionState::default();

    input_text(&mut backend, &mut state, 50, &ElementRef::None, None, "alice").unwrap();

    let args = backend.call_args("appium_input_text", 0).unwrap();
    assert!(args.get("element_id").is_none());
    assert_eq!(args["text"], json!("alice"));
}

// ============================================================================
// Scroll search and waits
// ============================================================================

#[test]
fn scroll_search_gives_up_after_the_configured_attempts() {
    let mut backend = MockBackend::new();
    let mut state = SessionState::default();

    let outcome = scroll_to_find(
        &mut backend,
        &mut state,
        50,
        &fast_timing(),
        "accessibility_id",
        "Bluetooth",
        None,
    )
    .unwrap();

    assert!(!outcome.is_success());
    assert!(outcome.message().contains("2 scrolls"));
    assert_eq!(backend.count("appium_scroll"), 2);
}

#[test]
fn wait_for_element_times_out_with_a_result() {
    let mut backend = MockBackend::new();
    let mut state = SessionState::default();

    let outcome = wait_for_element(
        &mut backend,
        &mut state,
        50,
        &fast_timing(),
        "accessibility_id",
        "Bluetooth",
        0,
    )
    .unwrap();

    assert!(!outcome.is_success());
    assert!(outcome.message().contains("did not appear"));
}

#[test]
fn wait_for_element_returns_as_soon_as_it_resolves() {
    let mut backend = MockBackend::new()
        .on_arg("appium_find_element", "value", "Bluetooth", found("el-3"));
    let mut state = SessionState::default();

    let outcome = wait_for_element(
        &mut backend,
        &mut state,
        50,
        &fast_timing(),
        "accessibility_id",
        "Bluetooth",
        5_000,
    )
    .unwrap();

    assert!(outcome.is_success());
    assert_eq!(state.last_element_id.as_deref(), Some("el-3"));
    assert_eq!(backend.count("appium_find_element"), 1);
}
