//! Page-state fingerprinting for tap verification.
//!
//! A tap that the backend reports as successful may still have done nothing
//! visible. The fingerprint captures enough of the page to tell "same screen"
//! from "changed screen" without being specific to any one app or site.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha1::{Digest, Sha1};

use crate::error::AgentError;
use crate::transport::Backend;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFingerprint {
    pub content_hash: String,
    pub source_length: usize,
    pub element_count: usize,
    pub form_count: usize,
    pub button_count: usize,
    pub link_count: usize,
    pub input_count: usize,
    pub title: String,
    pub has_forms: bool,
    pub has_navigation: bool,
    pub unique_ids: Vec<String>,
    pub unique_classes: Vec<String>,
    pub text_snippets: Vec<String>,
}

/// Tunable cutoffs for the count-based change signals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiffThresholds {
    /// Relative element-count change that counts as significant.
    pub element_count_ratio: f64,
    /// Absolute button-count delta that counts as significant.
    pub button_delta: usize,
    /// Ids added or removed (either direction) that counts as significant.
    pub id_delta: usize,
    /// Symmetric-difference size of text snippets that counts as significant.
    pub snippet_delta: usize,
}

impl Default for DiffThresholds {
    fn default() -> Self {
        DiffThresholds {
            element_count_ratio: 0.1,
            button_delta: 2,
            id_delta: 2,
            snippet_delta: 5,
        }
    }
}

const MAX_UNIQUE_IDS: usize = 10;
const MAX_UNIQUE_CLASSES: usize = 10;
const MAX_TEXT_SNIPPETS: usize = 20;

fn regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

impl PageFingerprint {
    /// Fetch the current page source and fingerprint it.
    pub fn capture(backend: &mut dyn Backend) -> Result<PageFingerprint, AgentError> {
        let outcome = backend.call_tool("appium_get_page_source", json!({ "full": false }))?;
        if !outcome.is_success() {
            return Err(AgentError::Session(format!(
                "Failed to fingerprint page: {}",
                outcome.message()
            )));
        }
        Ok(PageFingerprint::compute(outcome.page_source().unwrap_or("")))
    }

    /// Pure fingerprint computation over raw markup.
    pub fn compute(source: &str) -> PageFingerprint {
        let lower = source.to_lowercase();

        let mut hasher = Sha1::new();
        hasher.update(source.as_bytes());

        PageFingerprint {
            content_hash: format!("{:x}", hasher.finalize()),
            source_length: source.len(),
            element_count: count_elements(source),
            form_count: lower.matches("<form").count(),
            button_count: lower.matches("<button").count()
                + lower.matches("type=\"submit\"").count(),
            link_count: lower.matches("<a href").count(),
            input_count: lower.matches("<input").count(),
            title: extract_title(source),
            has_forms: lower.contains("<form"),
            has_navigation: ["nav", "menu", "header"].iter().any(|n| lower.contains(n)),
            unique_ids: extract_attribute_values(source, r#"(?i)id=["']([^"']+)["']"#, MAX_UNIQUE_IDS),
            unique_classes: extract_classes(source),
            text_snippets: extract_text_snippets(source),
        }
    }
}

fn count_elements(source: &str) -> usize {
    static TAG: OnceLock<Option<Regex>> = OnceLock::new();
    regex(&TAG, r"<[^/!][^>]*>")
        .map(|r| r.find_iter(source).count())
        .unwrap_or(0)
}

fn extract_title(source: &str) -> String {
    static TITLE: OnceLock<Option<Regex>> = OnceLock::new();
    regex(&TITLE, r"(?i)<title[^>]*>([^<]+)</title>")
        .and_then(|r| r.captures(source))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Dedup in first-seen document order, capped. Set-based dedup would make the
/// id-delta signal depend on iteration order.
fn extract_attribute_values(source: &str, pattern: &str, cap: usize) -> Vec<String> {
    let Ok(re) = Regex::new(pattern) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for caps in re.captures_iter(source) {
        if let Some(m) = caps.get(1) {
            if seen.insert(m.as_str()) {
                values.push(m.as_str().to_string());
                if values.len() >= cap {
                    break;
                }
            }
        }
    }
    values
}

fn extract_classes(source: &str) -> Vec<String> {
    static CLASS: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = regex(&CLASS, r#"(?i)class=["']([^"']+)["']"#) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut classes = Vec::new();
    'outer: for caps in re.captures_iter(source) {
        if let Some(attr) = caps.get(1) {
            for class in attr.as_str().split_whitespace() {
                if seen.insert(class.to_string()) {
                    classes.push(class.to_string());
                    if classes.len() >= MAX_UNIQUE_CLASSES {
                        break 'outer;
                    }
                }
            }
        }
    }
    classes
}

fn extract_text_snippets(source: &str) -> Vec<String> {
    static SCRIPT: OnceLock<Option<Regex>> = OnceLock::new();
    static STYLE: OnceLock<Option<Regex>> = OnceLock::new();
    static TAG: OnceLock<Option<Regex>> = OnceLock::new();

    let mut clean = source.to_string();
    if let Some(re) = regex(&SCRIPT, r"(?is)<script[^>]*>.*?</script>") {
        clean = re.replace_all(&clean, "").into_owned();
    }
    if let Some(re) = regex(&STYLE, r"(?is)<style[^>]*>.*?</style>") {
        clean = re.replace_all(&clean, "").into_owned();
    }
    if let Some(re) = regex(&TAG, r"<[^>]+>") {
        clean = re.replace_all(&clean, " ").into_owned();
    }

    clean
        .split_whitespace()
        .filter(|w| {
            w.len() > 2
                && !w.chars().all(|c| c.is_ascii_digit())
                && w.chars().all(|c| c.is_alphanumeric())
        })
        .take(MAX_TEXT_SNIPPETS)
        .map(str::to_string)
        .collect()
}

/// Did the page change between two fingerprints? Any single signal suffices.
pub fn page_changed(
    before: &PageFingerprint,
    after: &PageFingerprint,
    thresholds: &DiffThresholds,
) -> bool {
    if before.content_hash != after.content_hash {
        println!("Page content hash changed");
        return true;
    }

    if before.element_count > 0 {
        let change = (before.element_count as f64 - after.element_count as f64).abs()
            / before.element_count as f64;
        if change > thresholds.element_count_ratio {
            println!(
                "Element count changed: {} -> {}",
                before.element_count, after.element_count
            );
            return true;
        }
    }

    if before.title != after.title {
        println!("Page title changed: '{}' -> '{}'", before.title, after.title);
        return true;
    }

    if before.form_count != after.form_count {
        println!(
            "Form count changed: {} -> {}",
            before.form_count, after.form_count
        );
        return true;
    }

    if before.button_count.abs_diff(after.button_count) > thresholds.button_delta {
        println!(
            "Button count changed: {} -> {}",
            before.button_count, after.button_count
        );
        return true;
    }

    let before_ids: HashSet<&str> = before.unique_ids.iter().map(String::as_str).collect();
    let after_ids: HashSet<&str> = after.unique_ids.iter().map(String::as_str).collect();
    let added = after_ids.difference(&before_ids).count();
    let removed = before_ids.difference(&after_ids).count();
    if added > thresholds.id_delta || removed > thresholds.id_delta {
        println!("Significant id changes: +{} -{}", added, removed);
        return true;
    }

    let before_text: HashSet<&str> = before.text_snippets.iter().map(String::as_str).collect();
    let after_text: HashSet<&str> = after.text_snippets.iter().map(String::as_str).collect();
    let text_changes = before_text.symmetric_difference(&after_text).count();
    if text_changes > thresholds.snippet_delta {
        println!("Significant text changes: {} snippets differ", text_changes);
        return true;
    }

    false
}
