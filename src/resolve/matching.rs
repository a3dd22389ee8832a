use crate::snapshot::ElementDescriptor;

/// How closely a snapshot element matched the target text. Ordering is the
/// trial order: exact candidates are always tried before looser ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    PlatformSpecial,
    WordBoundary,
    Contains,
    PartialWord,
    Fuzzy,
}

/// UI section names that get synonym treatment: a target naming one of these
/// matches any field containing it. Covers the recurring iOS Settings case
/// where "General" shows up embedded in longer cell labels.
const SPECIAL_SECTIONS: &[&str] = &[
    "general",
    "privacy",
    "accessibility",
    "bluetooth",
    "display",
    "notifications",
];

/// Rank snapshot elements against a target string.
///
/// Each element is compared on its text, accessibility id, and label fields,
/// in that order, all lowercased and trimmed. The result is sorted by tier
/// with ties keeping traversal order, so an exact hit is always tried first
/// regardless of where it sat in the tree.
pub fn rank_candidates<'a>(
    elements: &'a [ElementDescriptor],
    target: &str,
) -> Vec<(MatchTier, &'a ElementDescriptor)> {
    let target = target.to_lowercase();
    let target = target.trim();

    let mut candidates: Vec<(MatchTier, &ElementDescriptor)> = elements
        .iter()
        .filter_map(|element| match_tier(element, target).map(|tier| (tier, element)))
        .collect();

    candidates.sort_by_key(|(tier, _)| *tier);
    candidates
}

fn match_tier(element: &ElementDescriptor, target: &str) -> Option<MatchTier> {
    if target.is_empty() {
        return None;
    }

    let fields: Vec<String> = [
        element.text.as_deref(),
        element.accessibility_id.as_deref(),
        element.label.as_deref(),
    ]
    .iter()
    .filter_map(|f| *f)
    .map(|f| f.trim().to_lowercase())
    .filter(|f| !f.is_empty())
    .collect();

    if fields.is_empty() {
        return None;
    }

    if fields.iter().any(|f| f == target) {
        return Some(MatchTier::Exact);
    }

    if SPECIAL_SECTIONS.contains(&target) && fields.iter().any(|f| f.contains(target)) {
        return Some(MatchTier::PlatformSpecial);
    }

    let padded_target = format!(" {} ", target);
    if fields
        .iter()
        .any(|f| format!(" {} ", f).contains(&padded_target))
    {
        return Some(MatchTier::WordBoundary);
    }

    if fields.iter().any(|f| f.contains(target)) {
        return Some(MatchTier::Contains);
    }

    let words: Vec<&str> = target.split_whitespace().filter(|w| w.len() > 2).collect();
    if !words.is_empty()
        && fields
            .iter()
            .any(|f| words.iter().any(|w| f.contains(w)))
    {
        return Some(MatchTier::PartialWord);
    }

    let stripped_target = strip_non_alphanumeric(target);
    if stripped_target.len() > 2
        && fields
            .iter()
            .any(|f| strip_non_alphanumeric(f).contains(&stripped_target))
    {
        return Some(MatchTier::Fuzzy);
    }

    None
}

fn strip_non_alphanumeric(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).collect()
}
