//! Helpers shared by built-in tools.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use steward_rs_protocol::ToolError;
use crate::tool::empty_parameters;

/// Parse JSON args into a typed struct for tool calls.
pub(super) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|err| ToolError::InvalidArguments(err.to_string()))
}

/// Parse a derived `io_schema()` string, falling back to an open object schema.
pub(super) fn schema_from_str(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| empty_parameters())
}
