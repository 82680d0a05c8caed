use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use steward_rs_protocol::ToolError;
use steward_rs_tools::{Tool, ToolContext, empty_parameters};

#[derive(Debug, Clone)]
pub struct DummyTool {
    name: String,
    description: String,
    parameters: Value,
    result: Value,
    parallel: bool,
    /// Arguments received on each call.
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl DummyTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "dummy".to_string(),
            parameters: empty_parameters(),
            result: json!("ok"),
            parallel: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[async_trait]
impl Tool for DummyTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    fn supports_parallel(&self) -> bool {
        self.parallel
    }

    async fn call(&self, _ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        self.calls.lock().push(args);
        Ok(self.result.clone())
    }
}

/// Tool that always fails with an execution error.
#[derive(Debug, Clone)]
pub struct FailingTool {
    name: String,
    message: String,
}

impl FailingTool {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "always fails"
    }

    async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, ToolError> {
        Err(ToolError::ExecutionFailed(self.message.clone()))
    }
}

/// Tool that sleeps before answering and records when calls start and end.
#[derive(Debug, Clone)]
pub struct SlowTool {
    name: String,
    delay: Duration,
    parallel: bool,
    /// `"start:<tag>"` / `"end:<tag>"` markers, where the tag is the `tag` argument.
    pub trace: Arc<Mutex<Vec<String>>>,
}

impl SlowTool {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
            parallel: false,
            trace: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "answers after a delay"
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": { "tag": { "type": "string" } } })
    }

    fn supports_parallel(&self) -> bool {
        self.parallel
    }

    async fn call(&self, _ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let tag = args
            .get("tag")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.trace.lock().push(format!("start:{tag}"));
        tokio::time::sleep(self.delay).await;
        self.trace.lock().push(format!("end:{tag}"));
        Ok(Value::String(format!("done {tag}")))
    }
}
