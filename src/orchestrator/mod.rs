pub mod parser;
pub mod runner;

pub use parser::{ToolCall, extract_tool_calls};
pub use runner::Orchestrator;
