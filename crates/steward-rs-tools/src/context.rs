//! Tool execution context and the services tools share during a turn.

use crate::Tool;
use crate::weather::WeatherProvider;
use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use steward_rs_memory::{MemoryStore, SemanticIndex};
use steward_rs_protocol::{
    EventMsg, EventPayload, EventSink, SessionId, ToolCallId, ToolError, TurnId,
};

/// Default number of hits returned by `search_memory`.
pub const DEFAULT_SEARCH_K: usize = 3;

/// Shared service dependencies for a turn (constructed once, shared via Arc).
#[derive(Clone)]
pub struct TurnServices {
    /// Long-term memory document.
    pub memory: Option<Arc<MemoryStore>>,
    /// Semantic index over `memory`.
    pub index: Option<Arc<SemanticIndex>>,
    pub weather: Option<Arc<dyn WeatherProvider>>,
    /// Default `k` for memory search.
    pub search_k: usize,
    /// Upper bound for a single tool call.
    pub call_timeout: Option<Duration>,
    pub event_sink: Option<Arc<dyn EventSink>>,
}

impl Default for TurnServices {
    fn default() -> Self {
        Self {
            memory: None,
            index: None,
            weather: None,
            search_k: DEFAULT_SEARCH_K,
            call_timeout: None,
            event_sink: None,
        }
    }
}

impl TurnServices {
    /// Copy of these services that reports tool events to `sink`.
    pub fn with_event_sink(&self, sink: Arc<dyn EventSink>) -> Self {
        Self {
            event_sink: Some(sink),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for TurnServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnServices")
            .field("memory", &self.memory.as_ref().map(|store| store.path()))
            .field("index", &self.index.is_some())
            .field("weather", &self.weather.is_some())
            .field("search_k", &self.search_k)
            .field("call_timeout", &self.call_timeout)
            .field("event_sink", &self.event_sink.is_some())
            .finish()
    }
}

/// Shared context passed to tools during execution.
///
/// Per-invocation identity fields are stored directly; shared services live
/// behind an `Arc<TurnServices>` so cloning per tool call stays cheap.
#[derive(Clone)]
pub struct ToolContext {
    pub session_id: SessionId,
    pub turn_id: Option<TurnId>,
    /// Model-issued correlation id of the current call.
    pub tool_call_id: Option<ToolCallId>,
    pub tool_name: Option<String>,
    pub services: Arc<TurnServices>,
}

impl ToolContext {
    /// Context for a session outside of any particular call.
    pub fn new(session_id: SessionId, services: Arc<TurnServices>) -> Self {
        Self {
            session_id,
            turn_id: None,
            tool_call_id: None,
            tool_name: None,
            services,
        }
    }

    /// Context scoped to one tool call within a turn.
    pub fn for_call(
        &self,
        turn_id: TurnId,
        tool_call_id: impl Into<ToolCallId>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            session_id: self.session_id,
            turn_id: Some(turn_id),
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
            services: self.services.clone(),
        }
    }

    /// Emit a tool-call started event when a turn and sink are attached.
    pub fn emit_tool_started(&self, args: &Value) {
        let (Some(turn_id), Some(sink)) = (self.turn_id, self.services.event_sink.as_ref()) else {
            return;
        };
        sink.emit(EventMsg::new(
            self.session_id,
            EventPayload::ToolCallStarted {
                turn_id,
                tool_call_id: self.tool_call_id.clone().unwrap_or_default(),
                tool_name: self.tool_name.clone().unwrap_or_default(),
                arguments: args.clone(),
            },
        ));
    }

    /// Emit a tool-call finished event when a turn and sink are attached.
    pub fn emit_tool_finished(&self, result: &str, success: bool) {
        let (Some(turn_id), Some(sink)) = (self.turn_id, self.services.event_sink.as_ref()) else {
            return;
        };
        sink.emit(EventMsg::new(
            self.session_id,
            EventPayload::ToolCallFinished {
                turn_id,
                tool_call_id: self.tool_call_id.clone().unwrap_or_default(),
                tool_name: self.tool_name.clone().unwrap_or_default(),
                result: result.to_string(),
                success,
            },
        ));
    }

    /// Run `tool` with started/finished events and the configured call timeout.
    pub async fn execute_tool(&mut self, tool: &dyn Tool, args: Value) -> Result<Value, ToolError> {
        self.tool_name = Some(tool.name().to_string());
        self.emit_tool_started(&args);

        let outcome = match self.services.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, tool.call(self, args)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        "tool call timed out (tool_name={}, session_id={}, limit_secs={})",
                        tool.name(),
                        self.session_id,
                        limit.as_secs()
                    );
                    Err(ToolError::Timeout(limit))
                }
            },
            None => tool.call(self, args).await,
        };

        match &outcome {
            Ok(value) => {
                debug!(
                    "tool call finished (tool_name={}, session_id={})",
                    tool.name(),
                    self.session_id
                );
                self.emit_tool_finished(&render_output(value), true);
            }
            Err(err) => {
                warn!(
                    "tool call failed (tool_name={}, session_id={}): {}",
                    tool.name(),
                    self.session_id,
                    err
                );
                self.emit_tool_finished(&err.to_result_content(), false);
            }
        }
        outcome
    }
}

/// Text form of a tool result: strings verbatim, other JSON serialised.
pub fn render_output(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("session_id", &self.session_id)
            .field("turn_id", &self.turn_id)
            .field("tool_call_id", &self.tool_call_id)
            .field("tool_name", &self.tool_name)
            .finish()
    }
}
