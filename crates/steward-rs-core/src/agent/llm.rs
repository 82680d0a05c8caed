//! LLM provider wrappers used by the agent node.

use crate::agent::tool_messages::ensure_tool_results;
use async_trait::async_trait;
use autoagents_llm::LLMProvider;
use autoagents_llm::chat::{
    ChatMessage, ChatProvider, ChatResponse, MessageType, StructuredOutputFormat, Tool,
};
use autoagents_llm::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use autoagents_llm::embedding::EmbeddingProvider;
use autoagents_llm::error::LLMError;
use autoagents_llm::models::ModelsProvider;
use log::warn;
use std::sync::Arc;
use steward_rs_memory::{Embedder, MemoryError, embedder::normalize};

/// Wrap a provider so every request carries a result for each tool request.
pub fn guard_llm_provider(llm: Arc<dyn LLMProvider>) -> Arc<dyn LLMProvider> {
    Arc::new(GuardedChat::new(llm))
}

#[derive(Clone)]
struct GuardedChat {
    inner: Arc<dyn LLMProvider>,
}

impl GuardedChat {
    fn new(inner: Arc<dyn LLMProvider>) -> Self {
        Self { inner }
    }

    fn sanitize_messages(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        if messages.iter().all(|message| {
            !matches!(
                message.message_type,
                MessageType::ToolUse(_) | MessageType::ToolResult(_)
            )
        }) {
            return messages.to_vec();
        }
        ensure_tool_results(messages.to_vec())
    }
}

#[async_trait]
impl ChatProvider for GuardedChat {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        let sanitized = self.sanitize_messages(messages);
        self.inner
            .chat_with_tools(&sanitized, tools, json_schema)
            .await
    }
}

#[async_trait]
impl CompletionProvider for GuardedChat {
    async fn complete(
        &self,
        req: &CompletionRequest,
        json_schema: Option<StructuredOutputFormat>,
    ) -> Result<CompletionResponse, LLMError> {
        self.inner.complete(req, json_schema).await
    }
}

#[async_trait]
impl EmbeddingProvider for GuardedChat {
    async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        self.inner.embed(input).await
    }
}

#[async_trait]
impl ModelsProvider for GuardedChat {}

impl LLMProvider for GuardedChat {}

/// Stand-in provider used when no API key is configured.
///
/// Construction succeeds so the rest of the system can start; every model
/// call fails with a provider error naming the missing variable.
#[derive(Debug, Clone)]
pub struct MissingCredentialsLLM {
    env_var: String,
}

impl MissingCredentialsLLM {
    pub fn new(env_var: impl Into<String>) -> Self {
        let env_var = env_var.into();
        warn!("{} not found in environment; model calls will fail", env_var);
        Self { env_var }
    }

    fn error(&self) -> LLMError {
        LLMError::ProviderError(format!(
            "missing API key: set the {} environment variable",
            self.env_var
        ))
    }
}

#[async_trait]
impl ChatProvider for MissingCredentialsLLM {
    async fn chat_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        Err(self.error())
    }
}

#[async_trait]
impl CompletionProvider for MissingCredentialsLLM {
    async fn complete(
        &self,
        _req: &CompletionRequest,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<CompletionResponse, LLMError> {
        Err(self.error())
    }
}

#[async_trait]
impl EmbeddingProvider for MissingCredentialsLLM {
    async fn embed(&self, _input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
        Err(self.error())
    }
}

#[async_trait]
impl ModelsProvider for MissingCredentialsLLM {}

impl LLMProvider for MissingCredentialsLLM {}

/// Memory embedder backed by the provider's embedding endpoint.
pub struct LlmEmbedder {
    llm: Arc<dyn LLMProvider>,
}

impl LlmEmbedder {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Embedder for LlmEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, MemoryError> {
        let mut vectors = self
            .llm
            .embed(texts)
            .await
            .map_err(|err| MemoryError::Embedding(err.to_string()))?;
        for vector in &mut vectors {
            normalize(vector);
        }
        Ok(vectors)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::{LlmEmbedder, MissingCredentialsLLM, guard_llm_provider};
    use crate::agent::tool_messages::TOOL_RESULT_PLACEHOLDER;
    use autoagents_llm::chat::{ChatMessage, ChatProvider, ChatRole, MessageType};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use steward_rs_memory::Embedder;
    use steward_rs_test_utils::{FixedLLM, RecordingChatLLM, tool_call};

    #[tokio::test]
    async fn guarded_chat_passes_plain_messages_through() {
        let inner = Arc::new(RecordingChatLLM::new("ok"));
        let wrapped = guard_llm_provider(inner.clone());
        let messages = vec![ChatMessage {
            role: ChatRole::User,
            message_type: MessageType::Text,
            content: "hi".to_string(),
        }];

        wrapped
            .chat_with_tools(&messages, None, None)
            .await
            .expect("chat");

        let captured = inner.last_messages.lock().clone();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].content, "hi");
    }

    #[tokio::test]
    async fn guarded_chat_fills_missing_results() {
        let inner = Arc::new(RecordingChatLLM::new("ok"));
        let wrapped = guard_llm_provider(inner.clone());
        let tool_use = ChatMessage {
            role: ChatRole::Assistant,
            message_type: MessageType::ToolUse(vec![tool_call("call_1", "get_weather", "{}")]),
            content: String::new(),
        };

        wrapped
            .chat_with_tools(&[tool_use], None, None)
            .await
            .expect("chat");

        let captured = inner.last_messages.lock().clone();
        assert_eq!(captured.len(), 2);
        match &captured[1].message_type {
            MessageType::ToolResult(results) => {
                assert_eq!(results[0].function.name, "get_weather");
                assert_eq!(results[0].function.arguments, TOOL_RESULT_PLACEHOLDER);
            }
            other => panic!("unexpected message type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_credentials_names_the_variable() {
        let llm = MissingCredentialsLLM::new("DEEPSEEK_API_KEY");
        let err = llm
            .chat_with_tools(&[], None, None)
            .await
            .expect_err("no key");
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
    }

    #[tokio::test]
    async fn llm_embedder_normalizes_vectors() {
        let llm = Arc::new(FixedLLM::new("unused").with_embedding(vec![3.0, 4.0]));
        let embedder = LlmEmbedder::new(llm);
        let vectors = embedder
            .embed(vec!["name: Alice".to_string()])
            .await
            .expect("embed");
        assert_eq!(vectors, vec![vec![0.6, 0.8]]);
        assert_eq!(embedder.name(), "llm");
    }
}
