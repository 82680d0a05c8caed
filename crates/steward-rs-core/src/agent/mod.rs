//! Agent node: one chat-model invocation per call.

pub mod llm;
pub mod prompt;
pub(crate) mod tool_messages;

use crate::error::StewardCoreError;
use crate::types::{Message, SessionId, ToolInvocation};
use autoagents_llm::chat::{FunctionTool, Tool};
use autoagents_llm::{LLMProvider, ToolCall};
use log::{debug, warn};
use prompt::{PromptState, SystemPrompt};
use serde_json::{Value, json};
use std::sync::Arc;
use steward_rs_tools::ToolSpec;
use tool_messages::{history_to_chat, text_message};
use uuid::Uuid;

/// What a single agent invocation decided.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    /// Final answer; the turn ends.
    Terminal { content: String },
    /// One or more tool calls, with any accompanying text.
    ToolRequest {
        thought: String,
        calls: Vec<ToolInvocation>,
    },
}

impl AgentOutput {
    /// Classify a model response. An empty tool-call list is terminal.
    pub fn from_parts(text: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        let text = text.unwrap_or_default();
        let calls: Vec<ToolInvocation> = tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(invocation_from_call)
            .collect();
        if calls.is_empty() {
            AgentOutput::Terminal { content: text }
        } else {
            AgentOutput::ToolRequest {
                thought: text,
                calls,
            }
        }
    }

    /// History message recording this output.
    pub fn to_message(&self) -> Message {
        match self {
            AgentOutput::Terminal { content } => Message::assistant(content.clone()),
            AgentOutput::ToolRequest { thought, calls } => {
                Message::tool_request(thought.clone(), calls.clone())
            }
        }
    }

    /// Text produced alongside the decision.
    pub fn text(&self) -> &str {
        match self {
            AgentOutput::Terminal { content } => content,
            AgentOutput::ToolRequest { thought, .. } => thought,
        }
    }
}

fn invocation_from_call(call: ToolCall) -> ToolInvocation {
    let id = if call.id.trim().is_empty() {
        format!("call_{}", Uuid::new_v4().simple())
    } else {
        call.id
    };
    let raw = call.function.arguments.trim();
    let arguments = if raw.is_empty() {
        json!({})
    } else {
        serde_json::from_str(raw).unwrap_or_else(|err| {
            warn!(
                "tool call arguments are not JSON (tool_name={}): {}",
                call.function.name, err
            );
            Value::String(raw.to_string())
        })
    };
    ToolInvocation {
        id,
        name: call.function.name,
        arguments,
    }
}

/// Invokes the chat model with the system instruction and the history.
pub struct AgentNode {
    llm: Arc<dyn LLMProvider>,
    prompt: Arc<dyn SystemPrompt>,
    tools: Vec<Tool>,
    tool_names: Vec<String>,
}

impl AgentNode {
    pub fn new(llm: Arc<dyn LLMProvider>, prompt: Arc<dyn SystemPrompt>, specs: Vec<ToolSpec>) -> Self {
        let tool_names = specs.iter().map(|spec| spec.name.clone()).collect();
        let tools = specs.into_iter().map(spec_to_chat_tool).collect();
        Self {
            llm,
            prompt,
            tools,
            tool_names,
        }
    }

    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    /// Call the model once. Errors are returned as-is; there is no retry here.
    pub async fn invoke(
        &self,
        session_id: SessionId,
        history: &[Message],
    ) -> Result<AgentOutput, StewardCoreError> {
        let instruction = self.prompt.render(&PromptState {
            session_id,
            history,
            tool_names: &self.tool_names,
            now: chrono::Local::now(),
        });
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(text_message(
            autoagents_llm::chat::ChatRole::System,
            &instruction,
        ));
        messages.extend(history_to_chat(history));
        debug!(
            "invoking model (session_id={}, messages={}, tools={})",
            session_id,
            messages.len(),
            self.tools.len()
        );

        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.as_slice())
        };
        let response = self
            .llm
            .chat_with_tools(&messages, tools, None)
            .await
            .map_err(|err| StewardCoreError::Model(err.to_string()))?;
        Ok(AgentOutput::from_parts(response.text(), response.tool_calls()))
    }
}

fn spec_to_chat_tool(spec: ToolSpec) -> Tool {
    Tool {
        tool_type: "function".to_string(),
        function: FunctionTool {
            name: spec.name,
            description: spec.description,
            parameters: spec.parameters,
        },
    }
}
