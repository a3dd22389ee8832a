use serde_json::{Map, Value, json};

use mobile_agent::session::apps::AppCatalog;
use mobile_agent::session::manager::{normalize_session_args, quit_session, start_session};
use mobile_agent::session::state::{ElementRef, Platform, SessionState};

use crate::common::mock::{MockBackend, ok};
mod common;

fn args(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect()
}

// ============================================================================
// Session argument normalization
// ============================================================================

#[test]
fn app_name_resolves_through_the_catalog() {
    let normalized = normalize_session_args(
        &args(&[
            ("platform", "ios"),
            ("device_name", "iPhone 15"),
            ("app", "Settings"),
        ]),
        &AppCatalog::default(),
    );

    assert_eq!(normalized["bundle_id"], json!("com.apple.Preferences"));
    assert_eq!(normalized["device_name"], json!("iPhone 15"));
}

#[test]
fn safari_on_simulator_omits_the_bundle_id() {
    // Without the bundle id the backend auto-detects browser mode
    let normalized = normalize_session_args(
        &args(&[("platform", "ios"), ("app", "safari")]),
        &AppCatalog::default(),
    );

    assert!(!normalized.contains_key("bundle_id"));
    assert!(!normalized.contains_key("browser_name"));
}

#[test]
fn safari_on_a_real_device_keeps_the_bundle_id() {
    let normalized = normalize_session_args(
        &args(&[
            ("platform", "ios"),
            ("app", "safari"),
            ("udid", "00008110-001A"),
        ]),
        &AppCatalog::default(),
    );

    assert_eq!(normalized["bundle_id"], json!("com.apple.mobilesafari"));
    assert_eq!(normalized["browser_name"], json!("Safari"));
    assert_eq!(normalized["udid"], json!("00008110-001A"));
}

#[test]
fn android_infers_the_main_activity() {
    let normalized = normalize_session_args(
        &args(&[("platform", "android"), ("app", "com.example.shop")]),
        &AppCatalog::default(),
    );

    assert_eq!(normalized["app_package"], json!("com.example.shop"));
    assert_eq!(normalized["app_activity"], json!("com.example.shop.MainActivity"));
}

#[test]
fn explicit_activity_is_not_overwritten() {
    let normalized = normalize_session_args(
        &args(&[
            ("platform", "android"),
            ("app", "com.example.shop"),
            ("app_activity", ".LoginActivity"),
        ]),
        &AppCatalog::default(),
    );

    assert_eq!(normalized["app_activity"], json!(".LoginActivity"));
}

#[test]
fn camel_case_aliases_are_renamed() {
    let normalized = normalize_session_args(
        &args(&[
            ("platform", "android"),
            ("deviceName", "Pixel 8"),
            ("appPackage", "com.example.shop"),
            ("platformVersion", "14"),
        ]),
        &AppCatalog::default(),
    );

    assert_eq!(normalized["device_name"], json!("Pixel 8"));
    assert_eq!(normalized["platform_version"], json!("14"));
    assert_eq!(normalized["app_package"], json!("com.example.shop"));
    assert!(!normalized.contains_key("deviceName"));
}

#[test]
fn filesystem_paths_become_app_path() {
    let normalized = normalize_session_args(
        &args(&[("platform", "ios"), ("app", "/builds/MyApp.app")]),
        &AppCatalog::default(),
    );

    assert_eq!(normalized["app_path"], json!("/builds/MyApp.app"));
    assert!(!normalized.contains_key("bundle_id"));
}

#[test]
fn unknown_app_names_pass_nothing_through() {
    let normalized = normalize_session_args(
        &args(&[("platform", "ios"), ("app", "frobnicator")]),
        &AppCatalog::default(),
    );

    assert!(!normalized.contains_key("bundle_id"));
    assert!(!normalized.contains_key("app_path"));
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[test]
fn successful_start_marks_the_session_active() {
    let mut backend = MockBackend::new()
        .on("appium_start_session", ok(json!({ "status": "success" })));
    let mut state = SessionState::default();

    let outcome = start_session(
        &mut backend,
        &mut state,
        &AppCatalog::default(),
        &args(&[("platform", "ios"), ("app", "settings")]),
    )
    .unwrap();

    assert!(outcome.is_success());
    assert!(state.active);
    assert_eq!(state.platform, Some(Platform::Ios));
}

#[test]
fn failed_start_leaves_the_session_inactive() {
    let mut backend = MockBackend::new();
    let mut state = SessionState::default();

    let outcome = start_session(
        &mut backend,
        &mut state,
        &AppCatalog::default(),
        &args(&[("platform", "ios"), ("app", "settings")]),
    )
    .unwrap();

    assert!(!outcome.is_success());
    assert!(!state.active);
    assert!(state.platform.is_none());
}

#[test]
fn quit_clears_all_session_state() {
    let mut backend = MockBackend::new()
        .on("appium_quit_session", ok(json!({ "status": "success" })));
    let mut state = SessionState::default();
    state.active = true;
    state.platform = Platform::parse("android");
    state.record_element("login button", "el-1");

    quit_session(&mut backend, &mut state).unwrap();

    assert!(!state.active);
    assert!(state.platform.is_none());
    assert!(state.last_element_id.is_none());
    assert!(state.element_store.is_empty());
}

// ============================================================================
// Element references
// ============================================================================

#[test]
fn placeholder_ids_decode_to_use_last() {
    assert_eq!(
        ElementRef::decode(Some("element_id_from_previous_step")),
        ElementRef::UseLast
    );
    assert_eq!(ElementRef::decode(Some("null")), ElementRef::UseLast);
    assert_eq!(ElementRef::decode(Some("   ")), ElementRef::UseLast);
    assert_eq!(
        ElementRef::decode(Some("el-42")),
        ElementRef::Explicit("el-42".to_string())
    );
    assert_eq!(ElementRef::decode(None), ElementRef::None);
}

#[test]
fn references_resolve_against_the_last_element() {
    let mut state = SessionState::default();
    state.last_element_id = Some("el-9".to_string());

    assert_eq!(ElementRef::UseLast.resolve(&state), Some("el-9"));
    assert_eq!(ElementRef::None.resolve(&state), Some("el-9"));
    assert_eq!(
        ElementRef::Explicit("el-1".to_string()).resolve(&state),
        Some("el-1")
    );

    state.last_element_id = None;
    assert_eq!(ElementRef::UseLast.resolve(&state), None);
}

// ============================================================================
// App catalog
// ============================================================================

#[test]
fn catalog_lookup_ignores_case_and_supports_overrides() {
    let mut catalog = AppCatalog::default();
    assert_eq!(
        catalog.lookup(Platform::Ios, "Settings"),
        Some("com.apple.Preferences")
    );
    assert_eq!(catalog.lookup(Platform::Android, "nosuchapp"), None);

    let overrides = [("settings".to_string(), "com.custom.settings".to_string())]
        .into_iter()
        .collect();
    catalog.extend(Platform::Android, &overrides);
    assert_eq!(
        catalog.lookup(Platform::Android, "settings"),
        Some("com.custom.settings")
    );
}
