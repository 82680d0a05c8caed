//! Tools over the user's long-term memory document.

use crate::builtins::utils::{parse_args, schema_from_str};
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use autoagents_core::tool::ToolInputT;
use autoagents_derive::ToolInput;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use steward_rs_memory::{MemoryStore, SemanticIndex};
use steward_rs_protocol::ToolError;

fn memory_store(ctx: &ToolContext) -> Result<&Arc<MemoryStore>, ToolError> {
    ctx.services
        .memory
        .as_ref()
        .ok_or_else(|| ToolError::ExecutionFailed("memory store not configured".to_string()))
}

fn memory_index(ctx: &ToolContext) -> Result<&Arc<SemanticIndex>, ToolError> {
    ctx.services
        .index
        .as_ref()
        .ok_or_else(|| ToolError::ExecutionFailed("memory index not configured".to_string()))
}

/// Read one key, or the whole mapping, from long-term memory.
#[derive(Debug, Default)]
pub struct GetUserMemoryTool;

#[async_trait]
impl Tool for GetUserMemoryTool {
    fn name(&self) -> &str {
        "get_user_memory"
    }

    fn description(&self) -> &str {
        "Retrieve information from the user's long-term memory. \
         Pass a key to read one entry, or omit it to return all memory."
    }

    fn parameters(&self) -> Value {
        schema_from_str(GetUserMemoryArgs::io_schema())
    }

    fn supports_parallel(&self) -> bool {
        true
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: GetUserMemoryArgs = parse_args(args)?;
        let store = memory_store(ctx)?;
        let lookup = store.lookup(input.key.as_deref());
        Ok(Value::String(lookup.render()))
    }
}

/// Create or overwrite one memory entry.
#[derive(Debug, Default)]
pub struct UpdateUserMemoryTool;

#[async_trait]
impl Tool for UpdateUserMemoryTool {
    fn name(&self) -> &str {
        "update_user_memory"
    }

    fn description(&self) -> &str {
        "Update or add a piece of information about the user in long-term memory."
    }

    fn parameters(&self) -> Value {
        schema_from_str(UpdateUserMemoryArgs::io_schema())
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: UpdateUserMemoryArgs = parse_args(args)?;
        if input.key.trim().is_empty() {
            return Err(ToolError::InvalidArguments("key cannot be empty".to_string()));
        }
        let store = Arc::clone(memory_store(ctx)?);
        info!(
            "updating user memory (key={}, session_id={})",
            input.key, ctx.session_id
        );
        // The write holds the store lock across file IO.
        let confirmation = tokio::task::spawn_blocking(move || store.set(&input.key, &input.value))
            .await
            .map_err(|err| ToolError::ExecutionFailed(format!("memory write task failed: {err}")))?
            .map_err(|err| ToolError::ExecutionFailed(err.to_string()))?;
        Ok(Value::String(confirmation))
    }
}

/// Semantic search over memory entries.
#[derive(Debug, Default)]
pub struct SearchMemoryTool;

#[async_trait]
impl Tool for SearchMemoryTool {
    fn name(&self) -> &str {
        "search_memory"
    }

    fn description(&self) -> &str {
        "Search the user's long-term memory for relevant information. Use this tool \
         when you need to recall specific details about the user that might be stored \
         in memory, rather than guessing or asking the user again."
    }

    fn parameters(&self) -> Value {
        schema_from_str(SearchMemoryArgs::io_schema())
    }

    fn supports_parallel(&self) -> bool {
        true
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: SearchMemoryArgs = parse_args(args)?;
        let index = memory_index(ctx)?;
        let k = input.k.unwrap_or(ctx.services.search_k);
        let outcome = index
            .search(&input.query, k)
            .await
            .map_err(|err| ToolError::ExecutionFailed(err.to_string()))?;
        Ok(Value::String(outcome.render()))
    }
}

/// Arguments for GetUserMemoryTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct GetUserMemoryArgs {
    #[input(description = "The specific key to retrieve. If omitted, returns all memory.")]
    #[serde(default)]
    key: Option<String>,
}

/// Arguments for UpdateUserMemoryTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct UpdateUserMemoryArgs {
    #[input(description = "The category or key of the information, for example name, preference or hobby.")]
    key: String,
    #[input(description = "The detailed information to store.")]
    value: String,
}

/// Arguments for SearchMemoryTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct SearchMemoryArgs {
    #[input(description = "The search query, for example the user's favorite food or birthday.")]
    query: String,
    #[input(description = "Number of results to return (default: 3).")]
    #[serde(default)]
    k: Option<usize>,
}
