//! Browser-context element resolution.
//!
//! Inside a web view the caller's locator is often a native-flavored xpath
//! that means nothing to the DOM. The approach here: pull a human-meaningful
//! text fragment out of whatever the caller sent, classify it by UI role, and
//! generate role-specific locator candidates covering the id/name/placeholder
//! conventions real pages use.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;

use crate::error::AgentError;
use crate::resolve::resolver::{Resolution, resolve_by_inspection, try_locator};
use crate::session::state::SessionState;
use crate::transport::Backend;

/// A web page in the foreground shows up as HTML markup in the page source.
pub fn is_web_context(backend: &mut dyn Backend) -> bool {
    let Ok(outcome) = backend.call_tool("appium_get_page_source", json!({ "full": false })) else {
        return false;
    };
    if !outcome.is_success() {
        return false;
    }
    let source = outcome.page_source().unwrap_or("");
    source.contains("<html") || source.contains("<body")
}

pub fn resolve_web_element(
    backend: &mut dyn Backend,
    state: &mut SessionState,
    max_snapshot_elements: usize,
    strategy: &str,
    value: &str,
    description: Option<&str>,
) -> Result<Resolution, AgentError> {
    let target_text = extract_target_text(value);
    println!("Web context detected, target text: '{}'", target_text);

    let target_lower = target_text.to_lowercase().trim().to_string();

    let mut locators: Vec<(String, String)> = Vec::new();

    // The caller's own locator goes first, unless it's an xpath (those are
    // usually native-tree paths that cannot match the DOM).
    if !strategy.is_empty() && !value.is_empty() && strategy != "xpath" {
        locators.push((strategy.to_string(), value.to_string()));
    }

    locators.extend(role_strategies(&target_lower, &target_text));

    // Generic fallbacks, original value last.
    locators.push(("link text".into(), target_text.clone()));
    locators.push(("partial link text".into(), target_text.clone()));
    locators.push((
        "xpath".into(),
        format!("//a[contains(text(), '{}')]", target_text),
    ));
    locators.push((
        "xpath".into(),
        format!("//*[contains(text(), '{}')]", target_text),
    ));
    locators.push(("xpath".into(), value.to_string()));

    for (web_strategy, web_value) in &locators {
        match try_locator(backend, state, web_strategy, web_value, description) {
            Ok(Some(resolution)) => return Ok(resolution),
            Ok(None) | Err(_) => continue,
        }
    }

    println!("All direct web strategies failed, inspecting page...");
    resolve_by_inspection(backend, state, max_snapshot_elements, &target_text, description)
}

// ---- Role classification ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WebRole {
    UsernameField,
    PasswordField,
    SubmitButton,
    NavigationLink,
    MenuToggle,
    Generic,
}

const USERNAME_KEYWORDS: &[&str] = &[
    "username", "user", "email", "login", "account", "userid", "user_name", "user-name",
];
const PASSWORD_KEYWORDS: &[&str] = &["password", "pass", "pwd", "passcode", "passphrase"];
const BUTTON_KEYWORDS: &[&str] = &[
    "login", "submit", "sign in", "log in", "continue", "next", "enter", "go", "send", "confirm",
];
const LINK_KEYWORDS: &[&str] = &[
    "logout", "sign out", "log out", "exit", "quit", "home", "back", "menu", "settings",
];
const MENU_KEYWORDS: &[&str] = &["menu", "hamburger", "burger", "nav", "navigation", "toggle"];

fn classify(target_lower: &str) -> Vec<WebRole> {
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| target_lower.contains(k));

    let mut roles = Vec::new();
    if contains_any(USERNAME_KEYWORDS) {
        roles.push(WebRole::UsernameField);
    }
    if contains_any(PASSWORD_KEYWORDS) {
        roles.push(WebRole::PasswordField);
    }
    if contains_any(BUTTON_KEYWORDS) {
        roles.push(WebRole::SubmitButton);
    }
    if contains_any(LINK_KEYWORDS) {
        roles.push(WebRole::NavigationLink);
    }
    if contains_any(MENU_KEYWORDS) {
        roles.push(WebRole::MenuToggle);
    }
    if roles.is_empty() {
        roles.push(WebRole::Generic);
    }
    roles
}

fn role_strategies(target_lower: &str, target_text: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let push = |out: &mut Vec<(String, String)>, strategy: &str, value: String| {
        out.push((strategy.to_string(), value));
    };

    for role in classify(target_lower) {
        match role {
            WebRole::UsernameField => {
                for id in ["username", "user", "email", "login", "user-name", "user_name", "userid", "account"] {
                    push(&mut out, "id", id.into());
                }
                for name in ["username", "user", "email", "login", "user-name", "user_name", "userid"] {
                    push(&mut out, "name", name.into());
                }
                push(&mut out, "xpath", "//input[@type='text'][1]".into());
                push(&mut out, "xpath", "//input[@type='email']".into());
                push(&mut out, "xpath", "//input[contains(@placeholder, 'username') or contains(@placeholder, 'user') or contains(@placeholder, 'email') or contains(@placeholder, 'login')]".into());
                push(&mut out, "xpath", "//input[contains(@data-test, 'username') or contains(@data-test, 'user') or contains(@data-test, 'login')]".into());
                push(&mut out, "xpath", "//input[contains(@class, 'username') or contains(@class, 'user') or contains(@class, 'email') or contains(@class, 'login')]".into());
            }
            WebRole::PasswordField => {
                for id in ["password", "pass", "pwd", "passcode"] {
                    push(&mut out, "id", id.into());
                    push(&mut out, "name", id.into());
                }
                // Highest-confidence signal for any password field
                push(&mut out, "xpath", "//input[@type='password']".into());
                push(&mut out, "xpath", "//input[contains(@placeholder, 'password') or contains(@placeholder, 'pass')]".into());
                push(&mut out, "xpath", "//input[contains(@data-test, 'password') or contains(@data-test, 'pass')]".into());
                push(&mut out, "xpath", "//input[contains(@class, 'password') or contains(@class, 'pass')]".into());
            }
            WebRole::SubmitButton => {
                for id in ["login", "submit", "signin", "login-button", "submit-button", "continue", "next", "send"] {
                    push(&mut out, "id", id.into());
                    push(&mut out, "name", id.into());
                }
                push(&mut out, "xpath", "//input[@type='submit']".into());
                push(&mut out, "xpath", "//button[@type='submit']".into());
                push(&mut out, "xpath", format!("//input[@value='{}' or contains(@value, '{}')]", target_text, target_lower));
                push(&mut out, "xpath", format!("//button[text()='{}' or contains(text(), '{}')]", target_text, target_text));
                push(&mut out, "xpath", "//button[contains(@class, 'btn') or contains(@class, 'button')]".into());
                push(&mut out, "xpath", format!("//button[contains(@class, '{}')]", target_lower));
                push(&mut out, "xpath", format!("//button[contains(@data-test, '{}') or contains(@data-testid, '{}')]", target_lower, target_lower));
            }
            WebRole::NavigationLink => {
                push(&mut out, "link text", target_text.into());
                push(&mut out, "partial link text", target_text.into());
                push(&mut out, "id", target_lower.into());
                push(&mut out, "id", target_lower.replace(' ', "-"));
                push(&mut out, "id", target_lower.replace(' ', "_"));
                push(&mut out, "xpath", format!("//a[contains(text(), '{}') or @title='{}']", target_text, target_text));
                push(&mut out, "xpath", format!("//a[contains(@href, '{}') or contains(@class, '{}')]", target_lower, target_lower));
                push(&mut out, "xpath", format!("//a[contains(@data-test, '{}') or contains(@data-testid, '{}')]", target_lower, target_lower));
            }
            WebRole::MenuToggle => {
                for id in ["menu", "nav", "hamburger", "toggle", "menu-button", "menu-toggle"] {
                    push(&mut out, "id", id.into());
                }
                push(&mut out, "xpath", "//button[contains(@class, 'menu') or contains(@class, 'burger') or contains(@class, 'hamburger')]".into());
                push(&mut out, "xpath", "//div[contains(@class, 'menu') or contains(@class, 'burger') or contains(@class, 'hamburger')]".into());
                push(&mut out, "xpath", "//button[@aria-label='Menu' or contains(@aria-label, 'menu')]".into());
            }
            WebRole::Generic => {
                let dashed = target_lower.replace(' ', "-");
                let underscored = target_lower.replace(' ', "_");
                push(&mut out, "id", target_lower.into());
                push(&mut out, "id", dashed.clone());
                push(&mut out, "id", underscored.clone());
                push(&mut out, "name", target_lower.into());
                push(&mut out, "name", dashed.clone());
                push(&mut out, "name", underscored);
                push(&mut out, "xpath", format!("//*[contains(@class, '{}') or contains(@class, '{}')]", target_lower, dashed));
                push(&mut out, "xpath", format!("//*[contains(@data-test, '{}') or contains(@data-testid, '{}')]", target_lower, target_lower));
                push(&mut out, "xpath", format!("//*[contains(text(), '{}') or @title='{}' or @alt='{}']", target_text, target_text, target_text));
            }
        }
    }

    out
}

// ---- Target text extraction ----

fn extraction_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Ordered by reliability; attribute values first, bare quotes last
        [
            r#"(?i)@id\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@name\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@class\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@data-test\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@data-testid\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@placeholder\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@value\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@type\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@href\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@title\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@alt\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@text\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@label\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@content-desc\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)@resource-id\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)contains\(text\(\),\s*['"]([^'"]+)['"]"#,
            r#"(?i)text\(\)\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)normalize-space\(text\(\)\)\s*=\s*['"]([^'"]+)['"]"#,
            r#"(?i)contains\(@text,\s*['"]([^'"]+)['"]"#,
            r#"(?i)contains\(@label,\s*['"]([^'"]+)['"]"#,
            r#"(?i)contains\(@name,\s*['"]([^'"]+)['"]"#,
            r#"(?i)contains\(@class,\s*['"]([^'"]+)['"]"#,
            r#"(?i)contains\(@id,\s*['"]([^'"]+)['"]"#,
            r#"(?i)contains\(@data-test,\s*['"]([^'"]+)['"]"#,
            r#"(?i)contains\(@placeholder,\s*['"]([^'"]+)['"]"#,
            r#"'([^']+)'"#,
            r#""([^"]+)""#,
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Pull a human-meaningful text fragment out of a locator value.
///
/// Plain text passes through untouched; locator expressions go through the
/// pattern ladder above, each hit filtered by the meaningfulness check, and a
/// structural decomposition runs as the last resort. If nothing better turns
/// up the original value comes back unchanged.
pub fn extract_target_text(value: &str) -> String {
    const SPECIAL: &[char] = &['@', '/', '[', ']', '(', ')', '"', '\''];
    if !value.contains(SPECIAL) {
        return value.trim().to_string();
    }

    for pattern in extraction_patterns() {
        for caps in pattern.captures_iter(value) {
            if let Some(m) = caps.get(1) {
                let candidate = m.as_str().trim();
                if !candidate.is_empty() && is_meaningful_text(candidate) {
                    return candidate.to_string();
                }
            }
        }
    }

    let parsed = structural_parse(value);
    if parsed != value {
        return parsed;
    }

    value.to_string()
}

/// Reject technical-looking tokens; accept short strings or ones that carry
/// common UI vocabulary.
fn is_meaningful_text(text: &str) -> bool {
    static TECHNICAL: OnceLock<Vec<Regex>> = OnceLock::new();
    let technical = TECHNICAL.get_or_init(|| {
        [
            r"^[a-f0-9]{8,}$",
            r"^[0-9]{8,}$",
            r"^[a-z0-9_-]{20,}$",
            r"^\w+\.\w+\.\w+",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });

    let lower = text.to_lowercase();
    if technical.iter().any(|p| p.is_match(&lower)) {
        return false;
    }

    const UI_VOCABULARY: &[&str] = &[
        "username", "password", "login", "email", "submit", "button", "menu", "logout", "sign",
        "user", "pass", "name", "text", "search", "click", "tap", "press", "next", "back", "home",
        "settings", "profile", "account", "continue", "cancel", "ok",
    ];

    UI_VOCABULARY.iter().any(|k| lower.contains(k)) || text.len() <= 15
}

/// Last-resort decomposition of compound locator expressions.
fn structural_parse(value: &str) -> String {
    // Bracket contents of the most specific xpath step
    if value.contains("//") && value.contains('[') {
        if let Some(last_step) = value.split("//").last() {
            static BRACKET: OnceLock<Option<Regex>> = OnceLock::new();
            let bracket = BRACKET.get_or_init(|| Regex::new(r"\[([^\]]+)\]").ok());
            if let Some(caps) = bracket.as_ref().and_then(|r| r.captures(last_step)) {
                if let Some(inner) = caps.get(1) {
                    let extracted = extract_target_text(inner.as_str());
                    if extracted != inner.as_str() || is_meaningful_text(&extracted) {
                        return extracted;
                    }
                }
            }
        }
    }

    // key=value pairs
    if value.contains('=') {
        if let Some(tail) = value.rsplit('=').next() {
            let candidate = tail.trim().trim_matches(['\'', '"']);
            if is_meaningful_text(candidate) {
                return candidate.to_string();
            }
        }
    }

    // Bare alphabetic words
    static WORD: OnceLock<Option<Regex>> = OnceLock::new();
    let word = WORD.get_or_init(|| Regex::new(r"\b[a-zA-Z]{3,}\b").ok());
    if let Some(word) = word {
        for m in word.find_iter(value) {
            if is_meaningful_text(m.as_str()) {
                return m.as_str().to_string();
            }
        }
    }

    value.to_string()
}
