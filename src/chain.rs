use crate::error::AgentError;

/// Try each step in order, stopping at the first that yields a value.
///
/// A step that errors or yields `None` is skipped and the chain continues.
/// Candidate locator trials, alternate tap methods, and stale-text recovery
/// all share this shape, so the skip-and-continue loop lives here once.
pub fn first_success<S, T>(
    steps: &[S],
    mut attempt: impl FnMut(&S) -> Result<Option<T>, AgentError>,
) -> Option<T> {
    for step in steps {
        match attempt(step) {
            Ok(Some(value)) => return Some(value),
            Ok(None) | Err(_) => continue,
        }
    }
    None
}
