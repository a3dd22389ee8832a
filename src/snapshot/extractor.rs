use serde::Serialize;
use serde_json::json;

use crate::error::AgentError;
use crate::transport::Backend;

/// One useful node from the UI tree, flattened for matching.
///
/// Created fresh on every snapshot, never mutated, discarded after the
/// resolution attempt that consumed it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ElementDescriptor {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessibility_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub xpath: String,
    pub clickable: bool,
    pub enabled: bool,
}

impl ElementDescriptor {
    /// Best identifier for operator-facing output.
    pub fn display_name(&self) -> &str {
        self.text
            .as_deref()
            .or(self.accessibility_id.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("No identifier")
    }
}

/// Structural container tags that carry no information on their own.
const DENY_TAGS: &[&str] = &[
    "hierarchy",
    "AppiumAUT",
    "android.widget.FrameLayout",
    "XCUIElementTypeApplication",
    "XCUIElementTypeWindow",
    "XCUIElementTypeOther",
];

/// Fetch the page source and flatten it into at most `max_elements`
/// descriptors.
pub fn extract_elements(
    backend: &mut dyn Backend,
    max_elements: usize,
) -> Result<Vec<ElementDescriptor>, AgentError> {
    let outcome = backend.call_tool("appium_get_page_source", json!({ "full": true }))?;
    if !outcome.is_success() {
        return Err(AgentError::Session(format!(
            "Failed to get page source: {}",
            outcome.message()
        )));
    }

    let source = outcome.page_source().unwrap_or("");
    flatten_page_source(source, max_elements)
}

/// Flatten UI-tree XML into element descriptors.
///
/// Depth-first in document order; collection stops at `max_elements` but
/// non-qualifying nodes are still descended into, so the traversal may visit
/// more nodes than it collects.
pub fn flatten_page_source(
    source: &str,
    max_elements: usize,
) -> Result<Vec<ElementDescriptor>, AgentError> {
    if source.trim().is_empty() {
        return Err(AgentError::EmptyPageSource);
    }

    let doc = roxmltree::Document::parse(source).map_err(AgentError::XmlParse)?;

    let mut elements = Vec::new();
    collect(doc.root_element(), max_elements, &mut elements);
    Ok(elements)
}

fn collect(node: roxmltree::Node, max_elements: usize, out: &mut Vec<ElementDescriptor>) {
    if out.len() >= max_elements {
        return;
    }

    if let Some(descriptor) = describe(node) {
        out.push(descriptor);
    }

    for child in node.children().filter(|c| c.is_element()) {
        if out.len() >= max_elements {
            break;
        }
        collect(child, max_elements, out);
    }
}

fn describe(node: roxmltree::Node) -> Option<ElementDescriptor> {
    let tag = node.tag_name().name().to_string();
    let attr = |name: &str| {
        node.attribute(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let mut info = ElementDescriptor {
        xpath: format!("//{}", tag),
        enabled: true,
        ..ElementDescriptor::default()
    };

    // Direct text content takes priority over any attribute
    info.text = node
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    // iOS attributes
    if let Some(name) = attr("name") {
        info.accessibility_id = Some(name);
    }
    if let Some(label) = attr("label") {
        if info.text.is_none() {
            info.text = Some(label.clone());
        }
        info.label = Some(label);
    }
    if info.text.is_none() {
        info.text = attr("value");
    }
    if let Some(accessible) = node.attribute("accessible") {
        info.clickable = accessible.eq_ignore_ascii_case("true");
    }

    // Android attributes
    if let Some(desc) = attr("content-desc") {
        info.accessibility_id = Some(desc);
    }
    if let Some(resource_id) = attr("resource-id") {
        info.id = Some(resource_id);
    }
    if let Some(class) = attr("class") {
        info.class_name = Some(class);
    }
    if info.text.is_none() {
        info.text = attr("text");
    }
    if let Some(clickable) = node.attribute("clickable") {
        info.clickable = clickable.eq_ignore_ascii_case("true");
    }
    if let Some(enabled) = node.attribute("enabled") {
        info.enabled = enabled.eq_ignore_ascii_case("true");
    }

    let has_useful_info = info.text.is_some()
        || info.accessibility_id.is_some()
        || info.id.is_some()
        || info.label.is_some()
        || !DENY_TAGS.contains(&tag.as_str());

    if !has_useful_info {
        return None;
    }

    info.tag = tag;
    Some(info)
}
