//! Identifiers and the event stream shared by the orchestrator, the tools
//! and front-ends.

mod tool;

pub use tool::ToolError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type SessionId = Uuid;
/// One user input and everything the assistant does in response.
pub type TurnId = Uuid;
/// Correlation id issued by the model for a tool invocation.
pub type ToolCallId = String;

/// An event stamped with its session and creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMsg {
    pub id: Uuid,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub payload: EventPayload,
}

impl EventMsg {
    pub fn new(session_id: SessionId, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            created_at: Utc::now(),
            payload,
        }
    }
}

/// Progress of a turn, in emission order.
///
/// Every turn starts with `TurnStarted` and ends with exactly one of
/// `TurnCompleted`, `TurnCancelled` or `Error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum EventPayload {
    TurnStarted { turn_id: TurnId },
    /// Text produced by the agent node (final answer or tool-request thought).
    AgentMessage { turn_id: TurnId, content: String },
    /// Emitted just before a tool runs, including unknown tools.
    ToolCallStarted {
        turn_id: TurnId,
        tool_call_id: ToolCallId,
        tool_name: String,
        arguments: Value,
    },
    /// `result` is the text the model will see; `success` is false for error results.
    ToolCallFinished {
        turn_id: TurnId,
        tool_call_id: ToolCallId,
        tool_name: String,
        result: String,
        success: bool,
    },
    /// The per-turn agent invocation cap was reached.
    IterationLimitReached { turn_id: TurnId, limit: usize },
    /// The turn was abandoned by the caller between transitions.
    TurnCancelled { turn_id: TurnId },
    /// `message` is the final answer.
    TurnCompleted { turn_id: TurnId, message: String },
    /// A turn failed, or the session could not be loaded (`turn_id` is `None`).
    Error {
        turn_id: Option<TurnId>,
        message: String,
    },
}

impl EventPayload {
    /// Turn id carried by the payload, if any.
    pub fn turn_id(&self) -> Option<TurnId> {
        match self {
            EventPayload::TurnStarted { turn_id }
            | EventPayload::AgentMessage { turn_id, .. }
            | EventPayload::ToolCallStarted { turn_id, .. }
            | EventPayload::ToolCallFinished { turn_id, .. }
            | EventPayload::IterationLimitReached { turn_id, .. }
            | EventPayload::TurnCancelled { turn_id }
            | EventPayload::TurnCompleted { turn_id, .. } => Some(*turn_id),
            EventPayload::Error { turn_id, .. } => *turn_id,
        }
    }

    /// Whether no further events follow for this turn.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventPayload::TurnCompleted { .. }
                | EventPayload::TurnCancelled { .. }
                | EventPayload::Error { .. }
        )
    }
}

/// Receiver for events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EventMsg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn event_payload_uses_tagged_snake_case() {
        let turn_id = Uuid::new_v4();
        let payload = EventPayload::ToolCallStarted {
            turn_id,
            tool_call_id: "call_1".to_string(),
            tool_name: "get_weather".to_string(),
            arguments: json!({ "location": "Paris" }),
        };
        let encoded = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(encoded["type"], "tool_call_started");
        assert_eq!(encoded["payload"]["tool_call_id"], "call_1");

        let decoded: EventPayload = serde_json::from_value(encoded).expect("deserialize");
        assert_eq!(decoded, payload);
    }

    #[test]
    fn terminal_payloads_are_flagged() {
        let turn_id = Uuid::new_v4();
        assert!(
            EventPayload::TurnCompleted {
                turn_id,
                message: "done".to_string()
            }
            .is_terminal()
        );
        assert!(!EventPayload::TurnStarted { turn_id }.is_terminal());
        assert_eq!(
            EventPayload::Error {
                turn_id: None,
                message: "boom".to_string()
            }
            .turn_id(),
            None
        );
    }
}
