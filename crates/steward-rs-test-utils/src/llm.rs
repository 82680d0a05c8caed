//! Chat model doubles.
//!
//! Only `chat_with_tools` matters to the agent; the other provider traits
//! are filled in by `provider_scaffold!`.

use async_trait::async_trait;
use autoagents_llm::chat::{
    ChatMessage, ChatProvider, ChatResponse, StructuredOutputFormat, Tool,
};
use autoagents_llm::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use autoagents_llm::embedding::EmbeddingProvider;
use autoagents_llm::error::LLMError;
use autoagents_llm::models::ModelsProvider;
use autoagents_llm::{FunctionCall, LLMProvider, ToolCall};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

type ChatResult = Result<Box<dyn ChatResponse>, LLMError>;

/// Completion always fails; embedding delegates to `self.embedding_for(&input)`.
macro_rules! provider_scaffold {
    ($ty:ty) => {
        #[async_trait]
        impl CompletionProvider for $ty {
            async fn complete(
                &self,
                _req: &CompletionRequest,
                _json_schema: Option<StructuredOutputFormat>,
            ) -> Result<CompletionResponse, LLMError> {
                Err(LLMError::ProviderError(format!(
                    "{} has no completion endpoint",
                    stringify!($ty)
                )))
            }
        }

        #[async_trait]
        impl EmbeddingProvider for $ty {
            async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
                self.embedding_for(&input)
            }
        }

        #[async_trait]
        impl ModelsProvider for $ty {}

        impl LLMProvider for $ty {}
    };
}

/// A function-type tool call as the model would emit it.
pub fn tool_call(
    id: impl Into<String>,
    name: impl Into<String>,
    arguments: impl Into<String>,
) -> ToolCall {
    ToolCall {
        id: id.into(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.into(),
            arguments: arguments.into(),
        },
    }
}

/// A canned model reply: optional text plus optional tool calls.
#[derive(Debug, Clone, Default)]
pub struct FixedChatResponse {
    text: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

impl FixedChatResponse {
    /// Final answer with no tool calls.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Some(tool_calls),
        }
    }

    pub fn tool_calls_only(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for FixedChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text.as_deref().unwrap_or(""))
    }
}

impl ChatResponse for FixedChatResponse {
    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn tool_calls(&self) -> Option<Vec<ToolCall>> {
        self.tool_calls.clone()
    }
}

fn reply(response: FixedChatResponse) -> ChatResult {
    Ok(Box::new(response))
}

/// Answers every request with the same text and embeds everything to one vector.
#[derive(Debug, Clone)]
pub struct FixedLLM {
    answer: String,
    embedding: Vec<f32>,
}

impl FixedLLM {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            embedding: vec![1.0, 0.0],
        }
    }

    pub fn with_embedding(self, embedding: Vec<f32>) -> Self {
        Self { embedding, ..self }
    }

    fn embedding_for(&self, input: &[String]) -> Result<Vec<Vec<f32>>, LLMError> {
        Ok(vec![self.embedding.clone(); input.len()])
    }
}

#[async_trait]
impl ChatProvider for FixedLLM {
    async fn chat_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> ChatResult {
        reply(FixedChatResponse::new(self.answer.as_str()))
    }
}

provider_scaffold!(FixedLLM);

/// Plays back queued replies in order and records each request.
///
/// An empty queue fails the call, so a tool loop that runs longer than the
/// test expects shows up as a provider error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLLM {
    queue: Arc<Mutex<VecDeque<FixedChatResponse>>>,
    /// Message lists received, one entry per call.
    pub requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    /// Tool names offered on the latest call.
    pub seen_tools: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLLM {
    pub fn new(responses: Vec<FixedChatResponse>) -> Self {
        let scripted = Self::default();
        scripted.queue.lock().extend(responses);
        scripted
    }

    pub fn repeating(response: FixedChatResponse, times: usize) -> Self {
        Self::new(std::iter::repeat_n(response, times).collect())
    }

    /// Append a reply; clones share the queue.
    pub fn push(&self, response: FixedChatResponse) {
        self.queue.lock().push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }

    fn embedding_for(&self, input: &[String]) -> Result<Vec<Vec<f32>>, LLMError> {
        Ok(vec![vec![1.0, 0.0]; input.len()])
    }
}

#[async_trait]
impl ChatProvider for ScriptedLLM {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> ChatResult {
        self.requests.lock().push(messages.to_vec());
        let offered = tools
            .into_iter()
            .flatten()
            .map(|tool| tool.function.name.clone())
            .collect();
        *self.seen_tools.lock() = offered;
        let next = self.queue.lock().pop_front();
        next.map_or_else(
            || Err(LLMError::ProviderError("script exhausted".to_string())),
            reply,
        )
    }
}

provider_scaffold!(ScriptedLLM);

/// Fixed answer; keeps the messages of the latest call for inspection.
#[derive(Debug, Clone)]
pub struct RecordingChatLLM {
    answer: String,
    pub last_messages: Arc<Mutex<Vec<ChatMessage>>>,
}

impl RecordingChatLLM {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            last_messages: Arc::default(),
        }
    }

    fn embedding_for(&self, _input: &[String]) -> Result<Vec<Vec<f32>>, LLMError> {
        Err(LLMError::ProviderError("RecordingChatLLM does not embed".to_string()))
    }
}

#[async_trait]
impl ChatProvider for RecordingChatLLM {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> ChatResult {
        *self.last_messages.lock() = messages.to_vec();
        reply(FixedChatResponse::new(self.answer.as_str()))
    }
}

provider_scaffold!(RecordingChatLLM);

/// Every call fails with the given provider error.
#[derive(Debug, Clone)]
pub struct FailingLLM {
    reason: String,
}

impl FailingLLM {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> LLMError {
        LLMError::ProviderError(self.reason.clone())
    }

    fn embedding_for(&self, _input: &[String]) -> Result<Vec<Vec<f32>>, LLMError> {
        Err(self.error())
    }
}

#[async_trait]
impl ChatProvider for FailingLLM {
    async fn chat_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> ChatResult {
        Err(self.error())
    }
}

provider_scaffold!(FailingLLM);
