//! Tool-execution node: resolves a batch of tool requests into results.

use crate::types::{Message, ToolInvocation, TurnId};
use futures_util::future::join_all;
use log::{debug, warn};
use std::sync::Arc;
use steward_rs_protocol::ToolError;
use steward_rs_tools::{Tool, ToolContext, ToolRegistry, render_output};

#[derive(Clone)]
pub(crate) struct ToolNode {
    registry: ToolRegistry,
}

impl ToolNode {
    pub(crate) fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Execute `calls` and return one `Role::Tool` message per call, in
    /// request order. Tool failures become `Error: ...` result text.
    pub(crate) async fn execute(
        &self,
        base: &ToolContext,
        turn_id: TurnId,
        calls: &[ToolInvocation],
    ) -> Vec<Message> {
        let resolved: Vec<(&ToolInvocation, Option<Arc<dyn Tool>>)> = calls
            .iter()
            .map(|call| (call, self.registry.get(&call.name)))
            .collect();
        let parallel = resolved.len() > 1
            && resolved
                .iter()
                .filter_map(|(_, tool)| tool.as_ref())
                .all(|tool| tool.supports_parallel());
        debug!(
            "executing tool batch (session_id={}, calls={}, parallel={})",
            base.session_id,
            resolved.len(),
            parallel
        );

        if parallel {
            join_all(
                resolved
                    .into_iter()
                    .map(|(call, tool)| run_call(base, turn_id, call, tool)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(resolved.len());
            for (call, tool) in resolved {
                results.push(run_call(base, turn_id, call, tool).await);
            }
            results
        }
    }
}

async fn run_call(
    base: &ToolContext,
    turn_id: TurnId,
    call: &ToolInvocation,
    tool: Option<Arc<dyn Tool>>,
) -> Message {
    let mut ctx = base.for_call(turn_id, call.id.clone(), call.name.clone());
    let content = match tool {
        Some(tool) => match ctx.execute_tool(tool.as_ref(), call.arguments.clone()).await {
            Ok(value) => render_output(&value),
            Err(err) => err.to_result_content(),
        },
        None => {
            warn!(
                "model requested unknown tool (tool_name={}, session_id={})",
                call.name, base.session_id
            );
            ctx.emit_tool_started(&call.arguments);
            let content = ToolError::ToolNotFound(call.name.clone()).to_result_content();
            ctx.emit_tool_finished(&content, false);
            content
        }
    };
    Message::tool_result(call.id.clone(), call.name.clone(), content)
}
