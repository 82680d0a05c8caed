//! The `Tool` trait implemented by everything the model can call.

use crate::context::ToolContext;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt::Debug;
use steward_rs_protocol::ToolError;

/// What the model is told about a tool: its function name, when to use it,
/// and a JSON schema for its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Schema for a tool that takes no arguments.
pub fn empty_parameters() -> Value {
    json!({ "type": "object", "properties": {} })
}

#[async_trait]
pub trait Tool: Send + Sync + Debug {
    /// Function name the model uses to request this tool. Unique per registry.
    fn name(&self) -> &str;

    /// Guidance the model reads when deciding whether to call the tool.
    fn description(&self) -> &str;

    /// JSON schema (`type: object`) for the call arguments.
    fn parameters(&self) -> Value {
        empty_parameters()
    }

    /// True when calls have no side effects that depend on ordering, so a
    /// batch made only of such tools may run concurrently.
    fn supports_parallel(&self) -> bool {
        false
    }

    /// Run one call. `args` is the decoded JSON the model sent, or `Null`.
    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}
