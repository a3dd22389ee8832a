use std::collections::HashMap;

/// Process-wide automation state for the single active session.
///
/// Owned by the orchestrator and passed explicitly to every component call.
/// `last_element_id` is the short-term memory of "what the model is currently
/// talking about": every successful resolution writes it, and any action that
/// omits an explicit target reads it.
#[derive(Debug, Default)]
pub struct SessionState {
    pub active: bool,
    pub platform: Option<Platform>,
    pub last_element_id: Option<String>,

    /// Best-effort cache from human-readable key to backend element id.
    /// Keys are not guaranteed unique over a long session.
    pub element_store: HashMap<String, String>,
}

impl SessionState {
    pub fn record_element(&mut self, key: &str, element_id: &str) {
        self.last_element_id = Some(element_id.to_string());
        self.element_store.insert(key.to_string(), element_id.to_string());
    }

    /// Clear everything. Called on quit_session.
    pub fn reset(&mut self) {
        self.active = false;
        self.platform = None;
        self.last_element_id = None;
        self.element_store.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn parse(s: &str) -> Option<Platform> {
        match s.trim().to_lowercase().as_str() {
            "ios" => Some(Platform::Ios),
            "android" => Some(Platform::Android),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

/// How a tool call refers to an element.
///
/// Language models routinely emit placeholder phrases instead of real ids
/// ("element_id_from_previous_step" and friends). Those are decoded once, at
/// the orchestrator boundary, into `UseLast` — execution paths never do string
/// sentinel matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementRef {
    Explicit(String),
    UseLast,
    None,
}

const PLACEHOLDER_PHRASES: &[&str] = &[
    "element_id_from_previous_step",
    "previous_element_id",
    "found_element_id",
    "current_element_id",
    "last_element_id",
    "element_from_previous_step",
    "previous_element",
    "null",
];

impl ElementRef {
    pub fn decode(raw: Option<&str>) -> ElementRef {
        match raw {
            None => ElementRef::None,
            Some(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || PLACEHOLDER_PHRASES.contains(&trimmed) {
                    ElementRef::UseLast
                } else {
                    ElementRef::Explicit(trimmed.to_string())
                }
            }
        }
    }

    /// Resolve against the session's last element. `None` also falls back to
    /// the last element so bare taps after a find keep working.
    pub fn resolve<'a>(&'a self, state: &'a SessionState) -> Option<&'a str> {
        match self {
            ElementRef::Explicit(id) => Some(id.as_str()),
            ElementRef::UseLast | ElementRef::None => state.last_element_id.as_deref(),
        }
    }
}
