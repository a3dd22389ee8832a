use serde_json::{Map, Value, json};

use crate::error::AgentError;
use crate::session::apps::AppCatalog;
use crate::session::state::{Platform, SessionState};
use crate::transport::Backend;
use crate::transport::result::ToolOutcome;

const SAFARI_BUNDLE: &str = "com.apple.mobilesafari";

/// Keys under which callers have historically supplied the app identifier.
const APP_KEYS: &[&str] = &[
    "app",
    "bundle_id",
    "bundleId",
    "app_package",
    "appPackage",
    "app_path",
    "appPath",
];

/// Optional session parameters copied through, camelCase aliases renamed to
/// their snake_case canonical form.
const OPTIONAL_FIELDS: &[(&str, &str)] = &[
    ("platform_version", "platformVersion"),
    ("app_activity", "appActivity"),
    ("start_url", "startUrl"),
    ("udid", "udid"),
    ("xcode_org_id", "xcodeOrgId"),
    ("wda_bundle_id", "wdaBundleId"),
    ("xcode_signing_id", "xcodeSigningId"),
];

#[derive(Debug, Default)]
struct AppIdentifier {
    bundle_id: Option<String>,
    app_path: Option<String>,
    app_name: Option<String>,
}

fn string_field<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str()).filter(|s| !s.trim().is_empty())
}

fn classify_app_identifier(args: &Map<String, Value>) -> AppIdentifier {
    let mut ident = AppIdentifier::default();

    for key in APP_KEYS {
        let Some(value) = string_field(args, key) else {
            continue;
        };
        let lower = value.to_lowercase();
        let lower = lower.trim();

        if lower.contains('.')
            && (lower.starts_with("com.") || lower.starts_with("org.") || lower.starts_with("io."))
        {
            // Bundle ids keep their original case
            ident.bundle_id = Some(value.trim().to_string());
        } else if lower.ends_with(".app") || lower.ends_with(".apk") || lower.contains('/') {
            ident.app_path = Some(value.trim().to_string());
        } else {
            ident.app_name = Some(lower.to_string());
        }
    }

    ident
}

/// Normalize loosely-typed session arguments into the backend's expected shape.
///
/// Resolves bare app names through the catalog, renames legacy camelCase keys,
/// and applies the two platform quirks: the Safari bundle-id workaround for
/// backend browser auto-detection, and Android MainActivity inference.
pub fn normalize_session_args(args: &Map<String, Value>, catalog: &AppCatalog) -> Map<String, Value> {
    let platform = string_field(args, "platform")
        .and_then(Platform::parse);

    let mut ident = classify_app_identifier(args);

    if ident.bundle_id.is_none() {
        if let (Some(platform), Some(name)) = (platform, ident.app_name.as_deref()) {
            ident.bundle_id = catalog.lookup(platform, name).map(|s| s.to_string());
        }
    }

    let mut normalized = Map::new();
    if let Some(p) = args.get("platform") {
        normalized.insert("platform".into(), p.clone());
    }
    if let Some(device) = string_field(args, "device_name").or_else(|| string_field(args, "deviceName")) {
        normalized.insert("device_name".into(), json!(device));
    }

    for (canonical, alias) in OPTIONAL_FIELDS {
        if let Some(value) = string_field(args, canonical).or_else(|| string_field(args, alias)) {
            normalized.insert(canonical.to_string(), json!(value));
        }
    }

    match platform {
        Some(Platform::Ios) => {
            if let Some(bundle) = &ident.bundle_id {
                if bundle == SAFARI_BUNDLE {
                    // The backend auto-detects browser mode when no bundle id
                    // is sent; only real devices need it spelled out.
                    let has_real_device_params = ["udid", "xcode_org_id", "wda_bundle_id"]
                        .iter()
                        .any(|k| string_field(args, k).is_some());
                    if has_real_device_params {
                        normalized.insert("bundle_id".into(), json!(bundle));
                        normalized.insert("browser_name".into(), json!("Safari"));
                    }
                } else {
                    normalized.insert("bundle_id".into(), json!(bundle));
                }
            } else if let Some(path) = &ident.app_path {
                normalized.insert("app_path".into(), json!(path));
            }
        }
        Some(Platform::Android) => {
            if let Some(bundle) = &ident.bundle_id {
                normalized.insert("app_package".into(), json!(bundle));
                if !normalized.contains_key("app_activity") {
                    normalized.insert("app_activity".into(), json!(format!("{}.MainActivity", bundle)));
                }
            } else if let Some(path) = &ident.app_path {
                normalized.insert("app_path".into(), json!(path));
            }
        }
        None => {}
    }

    normalized
}

/// Start a backend session. On success the session state records the active
/// flag and lower-cased platform; failures come back as structured outcomes.
pub fn start_session(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    catalog: &AppCatalog,
    args: &Map<String, Value>,
) -> Result<ToolOutcome, AgentError> {
    let normalized = normalize_session_args(args, catalog);
    println!(
        "Starting session: {}",
        serde_json::to_string(&normalized).unwrap_or_default()
    );

    let outcome = backend.call_tool("appium_start_session", Value::Object(normalized.clone()))?;

    if outcome.is_success() {
        state.active = true;
        state.platform = string_field(&normalized, "platform").and_then(Platform::parse);
    }

    Ok(outcome)
}

/// End the session and clear all session state.
pub fn quit_session(
    backend: &mut dyn Backend,
    state: &mut SessionState,
) -> Result<ToolOutcome, AgentError> {
    let outcome = backend.call_tool("appium_quit_session", json!({}))?;
    state.reset();
    Ok(outcome)
}
