use crate::builtins::utils::{parse_args, schema_from_str};
use crate::{Tool, ToolContext};
use async_trait::async_trait;
use autoagents_core::tool::ToolInputT;
use autoagents_derive::ToolInput;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use steward_rs_protocol::ToolError;

/// Current weather for a named place.
///
/// Lookup failures are returned as ordinary text so the model can explain them.
#[derive(Debug, Default)]
pub struct GetWeatherTool;

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a specific location."
    }

    fn parameters(&self) -> Value {
        schema_from_str(GetWeatherArgs::io_schema())
    }

    fn supports_parallel(&self) -> bool {
        true
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let input: GetWeatherArgs = parse_args(args)?;
        let provider = ctx.services.weather.as_ref().ok_or_else(|| {
            ToolError::ExecutionFailed("weather provider not configured".to_string())
        })?;
        info!("weather lookup (location={})", input.location);
        let text = match provider.current_weather(&input.location).await {
            Ok(report) => report.to_string(),
            Err(err) => err.to_string(),
        };
        Ok(Value::String(text))
    }
}

/// Arguments for GetWeatherTool.
#[derive(Debug, Serialize, Deserialize, ToolInput)]
struct GetWeatherArgs {
    #[input(description = "The name of the city or region, for example Beijing or New York.")]
    location: String,
}
