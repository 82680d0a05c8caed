//! Conversion of stored history into provider chat messages.

use crate::types::{Message, Role, ToolInvocation};
use autoagents_llm::chat::{ChatMessage, ChatRole, MessageType};
use autoagents_llm::{FunctionCall, ToolCall};
use log::debug;
use serde_json::Value;
use std::collections::HashMap;

pub(crate) const TOOL_RESULT_PLACEHOLDER: &str = "[tool output omitted]";

/// Map stored history to chat messages, grouping consecutive tool results.
pub(crate) fn history_to_chat(history: &[Message]) -> Vec<ChatMessage> {
    let mut output = Vec::with_capacity(history.len());
    let mut pending_results: Vec<ToolCall> = Vec::new();

    for message in history {
        if message.role != Role::Tool && !pending_results.is_empty() {
            output.push(tool_result_message(std::mem::take(&mut pending_results)));
        }
        match message.role {
            Role::System => {
                debug!("skipping stored system message");
            }
            Role::User => output.push(text_message(ChatRole::User, &message.content)),
            Role::Assistant if message.tool_calls.is_empty() => {
                output.push(text_message(ChatRole::Assistant, &message.content));
            }
            Role::Assistant => output.push(ChatMessage {
                role: ChatRole::Assistant,
                message_type: MessageType::ToolUse(
                    message.tool_calls.iter().map(invocation_to_call).collect(),
                ),
                content: message.content.clone(),
            }),
            Role::Tool => pending_results.push(ToolCall {
                id: message.tool_call_id.clone().unwrap_or_default(),
                call_type: "function".to_string(),
                function: FunctionCall {
                    name: message.name.clone().unwrap_or_default(),
                    arguments: message.content.clone(),
                },
            }),
        }
    }
    if !pending_results.is_empty() {
        output.push(tool_result_message(pending_results));
    }
    output
}

pub(crate) fn text_message(role: ChatRole, content: &str) -> ChatMessage {
    ChatMessage {
        role,
        message_type: MessageType::Text,
        content: content.to_string(),
    }
}

fn tool_result_message(results: Vec<ToolCall>) -> ChatMessage {
    ChatMessage {
        role: ChatRole::Tool,
        message_type: MessageType::ToolResult(results),
        content: String::new(),
    }
}

fn invocation_to_call(invocation: &ToolInvocation) -> ToolCall {
    let arguments = match &invocation.arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };
    ToolCall {
        id: invocation.id.clone(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: invocation.name.clone(),
            arguments,
        },
    }
}

/// Place every request's result directly after it, inserting a placeholder
/// for requests that have none. Orphaned results are dropped.
pub(crate) fn ensure_tool_results(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut result_map = collect_tool_results(&messages);
    let mut output = Vec::with_capacity(messages.len());

    for message in messages {
        match &message.message_type {
            MessageType::ToolUse(calls) => {
                let resolved: Vec<ToolCall> = calls
                    .iter()
                    .map(|call| {
                        result_map
                            .remove(&call.id)
                            .unwrap_or_else(|| placeholder_tool_result(call))
                    })
                    .collect();
                output.push(message);
                if !resolved.is_empty() {
                    output.push(tool_result_message(resolved));
                }
            }
            MessageType::ToolResult(_) => {}
            _ => output.push(message),
        }
    }

    output
}

pub(crate) fn placeholder_tool_result(call: &ToolCall) -> ToolCall {
    ToolCall {
        id: call.id.clone(),
        call_type: call.call_type.clone(),
        function: FunctionCall {
            name: call.function.name.clone(),
            arguments: TOOL_RESULT_PLACEHOLDER.to_string(),
        },
    }
}

fn collect_tool_results(messages: &[ChatMessage]) -> HashMap<String, ToolCall> {
    let mut results = HashMap::new();
    for message in messages {
        if let MessageType::ToolResult(calls) = &message.message_type {
            for call in calls {
                results
                    .entry(call.id.clone())
                    .or_insert_with(|| call.clone());
            }
        }
    }
    results
}
