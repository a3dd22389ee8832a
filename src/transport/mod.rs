use serde_json::Value;

use crate::error::AgentError;
use crate::transport::result::ToolOutcome;

pub mod client;
pub mod result;

/// The capability seam between the automation core and the backend server.
///
/// Everything the core needs is "call a named tool with JSON arguments and get
/// a normalized outcome back". Element-id formats are backend-specific, so the
/// validity check lives behind this trait instead of in the resolver.
pub trait Backend {
    fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutcome, AgentError>;

    /// Predicate for ids returned by find-element. The default only rejects
    /// empty ids; a concrete backend may know more about its own format.
    fn element_id_looks_valid(&self, id: &str) -> bool {
        !id.trim().is_empty()
    }
}
