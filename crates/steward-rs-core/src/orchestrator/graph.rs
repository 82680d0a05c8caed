//! Turn graph: `agent` and `tools` nodes and the transitions between them.

use crate::types::{Message, Role, ToolInvocation};
use std::collections::HashSet;

/// A node of the turn graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Agent,
    Tools,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Agent => "agent",
            NodeKind::Tools => "tools",
        }
    }
}

/// Transition predicate. `None` means the turn has ended.
///
/// `agent` moves to `tools` iff its latest message carries tool requests;
/// `tools` always returns to `agent`.
pub fn next_node(current: NodeKind, history: &[Message]) -> Option<NodeKind> {
    match current {
        NodeKind::Agent => history
            .last()
            .filter(|message| message.is_tool_request())
            .map(|_| NodeKind::Tools),
        NodeKind::Tools => Some(NodeKind::Agent),
    }
}

/// Where an interrupted turn resumes, derived from the stored history.
pub fn pending_node(history: &[Message]) -> Option<NodeKind> {
    let last = history.last()?;
    match last.role {
        Role::User => Some(NodeKind::Agent),
        Role::Assistant if last.is_tool_request() => Some(NodeKind::Tools),
        Role::Tool if !unanswered_calls(history).is_empty() => Some(NodeKind::Tools),
        Role::Tool => Some(NodeKind::Agent),
        Role::Assistant | Role::System => None,
    }
}

/// Calls of the latest tool request that have no result yet, in request order.
pub fn unanswered_calls(history: &[Message]) -> Vec<ToolInvocation> {
    let Some(position) = history.iter().rposition(Message::is_tool_request) else {
        return Vec::new();
    };
    let answered: HashSet<&str> = history[position + 1..]
        .iter()
        .filter(|message| message.role == Role::Tool)
        .filter_map(|message| message.tool_call_id.as_deref())
        .collect();
    history[position]
        .tool_calls
        .iter()
        .filter(|call| !answered.contains(call.id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{NodeKind, next_node, pending_node, unanswered_calls};
    use crate::types::{Message, ToolInvocation};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request(ids: &[&str]) -> Message {
        Message::tool_request(
            "",
            ids.iter()
                .map(|id| ToolInvocation {
                    id: id.to_string(),
                    name: "get_current_time".to_string(),
                    arguments: json!({}),
                })
                .collect(),
        )
    }

    #[test]
    fn agent_routes_on_tool_requests() {
        let with_calls = vec![Message::user("hi"), request(&["a"])];
        assert_eq!(next_node(NodeKind::Agent, &with_calls), Some(NodeKind::Tools));

        let terminal = vec![Message::user("hi"), Message::assistant("hello")];
        assert_eq!(next_node(NodeKind::Agent, &terminal), None);
        assert_eq!(next_node(NodeKind::Tools, &terminal), Some(NodeKind::Agent));
    }

    #[test]
    fn pending_node_follows_the_last_message() {
        assert_eq!(pending_node(&[]), None);
        assert_eq!(pending_node(&[Message::user("hi")]), Some(NodeKind::Agent));
        assert_eq!(
            pending_node(&[Message::user("hi"), request(&["a", "b"])]),
            Some(NodeKind::Tools)
        );
        assert_eq!(
            pending_node(&[
                Message::user("hi"),
                request(&["a", "b"]),
                Message::tool_result("a", "get_current_time", "now"),
            ]),
            Some(NodeKind::Tools)
        );
        assert_eq!(
            pending_node(&[
                Message::user("hi"),
                request(&["a"]),
                Message::tool_result("a", "get_current_time", "now"),
            ]),
            Some(NodeKind::Agent)
        );
        assert_eq!(
            pending_node(&[Message::user("hi"), Message::assistant("done")]),
            None
        );
    }

    #[test]
    fn unanswered_calls_keep_request_order() {
        let history = vec![
            Message::user("hi"),
            request(&["a", "b", "c"]),
            Message::tool_result("b", "get_current_time", "now"),
        ];
        let ids: Vec<_> = unanswered_calls(&history)
            .into_iter()
            .map(|call| call.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
