//! Conversation types shared across the orchestrator API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
pub use steward_rs_protocol::{SessionId, ToolCallId, TurnId};

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-generated message.
    System,
    /// User-authored message.
    User,
    /// Assistant-authored message (final answer or tool request).
    Assistant,
    /// Result of a tool invocation.
    Tool,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    /// Parse a role from a lowercase string; unknown values read as user.
    pub fn parse(value: &str) -> Self {
        match value {
            "system" => Role::System,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            _ => Role::User,
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Role::parse(value))
    }
}

/// A model-issued request to call a named tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    /// Correlation id; the matching result carries the same id.
    pub id: ToolCallId,
    pub name: String,
    pub arguments: Value,
}

/// Message stored in a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role that produced the message.
    pub role: Role,
    /// Message content. For tool requests this is the optional "thought".
    pub content: String,
    /// Tool requests carried by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
    /// Correlation id of the request a tool result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<ToolCallId>,
    /// Tool name for tool results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Timestamp for the message.
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool_request(thought: impl Into<String>, calls: Vec<ToolInvocation>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::new(Role::Assistant, thought)
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<ToolCallId>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Whether this is an assistant message carrying tool requests.
    pub fn is_tool_request(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// Full session transcript with messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Ordered list of messages in the session.
    pub messages: Vec<Message>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Summary view of a session for listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Count of messages stored.
    pub message_count: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent checkpoint.
    pub updated_at: DateTime<Utc>,
}

impl From<crate::state::SessionRecord> for Session {
    fn from(record: crate::state::SessionRecord) -> Self {
        Self {
            id: record.id,
            messages: record.messages,
            created_at: record.created_at,
        }
    }
}

impl From<crate::state::SessionSummaryRecord> for SessionSummary {
    fn from(record: crate::state::SessionSummaryRecord) -> Self {
        Self {
            id: record.id,
            message_count: record.message_count,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Message, Role, ToolInvocation};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn role_parses_and_formats() {
        assert_eq!(Role::parse("system"), Role::System);
        assert_eq!(Role::parse("assistant"), Role::Assistant);
        assert_eq!(Role::parse("tool"), Role::Tool);
        assert_eq!(Role::parse("anything"), Role::User);
        assert_eq!(Role::Tool.as_str(), "tool");
    }

    #[test]
    fn plain_messages_omit_tool_fields() {
        let encoded = serde_json::to_value(Message::user("hi")).expect("serialize");
        assert_eq!(encoded.get("tool_calls"), None);
        assert_eq!(encoded.get("tool_call_id"), None);
        assert_eq!(encoded["role"], "user");
    }

    #[test]
    fn tool_request_round_trips() {
        let message = Message::tool_request(
            "checking",
            vec![ToolInvocation {
                id: "call_1".to_string(),
                name: "get_weather".to_string(),
                arguments: json!({ "location": "Paris" }),
            }],
        );
        assert!(message.is_tool_request());
        let encoded = serde_json::to_string(&message).expect("serialize");
        let decoded: Message = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, message);
        assert!(!Message::assistant("done").is_tool_request());
    }
}
