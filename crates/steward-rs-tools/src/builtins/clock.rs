use crate::{Tool, ToolContext};
use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use steward_rs_protocol::ToolError;

/// Local wall-clock time in `%Y-%m-%d %H:%M:%S`.
#[derive(Debug, Default)]
pub struct GetCurrentTimeTool;

#[async_trait]
impl Tool for GetCurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time and date."
    }

    fn supports_parallel(&self) -> bool {
        true
    }

    async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
        Ok(Value::String(
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::GetCurrentTimeTool;
    use crate::{Tool, ToolContext, TurnServices};
    use chrono::NaiveDateTime;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn returns_formatted_local_time() {
        let ctx = ToolContext::new(Uuid::new_v4(), Arc::new(TurnServices::default()));
        let value = GetCurrentTimeTool
            .call(&ctx, json!({}))
            .await
            .expect("time");
        let text = value.as_str().expect("string");
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").expect("format");
    }
}
