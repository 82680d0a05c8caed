//! Turn execution: the agent/tools loop with checkpointing and guards.

use super::graph::{NodeKind, next_node, pending_node, unanswered_calls};
use super::sessions::SessionStore;
use super::tool_node::ToolNode;
use super::RunResult;
use crate::agent::AgentNode;
use crate::error::StewardCoreError;
use crate::types::{Message, SessionId, TurnId};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use steward_rs_protocol::{EventMsg, EventPayload, EventSink};
use steward_rs_tools::{ToolContext, TurnServices};
use uuid::Uuid;

/// Parameters for a single turn execution.
pub(crate) struct TurnParams {
    pub(crate) session_id: SessionId,
    /// New user input; `None` continues an interrupted turn.
    pub(crate) input: Option<String>,
    pub(crate) turn_id: Option<TurnId>,
    pub(crate) event_sink: Option<Arc<dyn EventSink>>,
    pub(crate) cancel: Arc<AtomicBool>,
}

/// Text of the synthetic answer appended when the iteration cap is hit.
pub(crate) fn iteration_limit_message(steps: usize) -> String {
    format!(
        "I stopped working on this request after {steps} steps without reaching an answer. \
         Let me know how you would like to continue."
    )
}

/// Runs turns through the agent and tool nodes.
pub(crate) struct TurnExecutor {
    sessions: SessionStore,
    agent: AgentNode,
    tool_node: ToolNode,
    services: Arc<TurnServices>,
    max_iterations: usize,
    event_sink: Option<Arc<dyn EventSink>>,
}

struct TurnScope<'a> {
    session_id: SessionId,
    turn_id: TurnId,
    sink: Option<&'a Arc<dyn EventSink>>,
}

impl TurnScope<'_> {
    fn emit(&self, payload: EventPayload) {
        if let Some(sink) = self.sink {
            sink.emit(EventMsg::new(self.session_id, payload));
        }
    }
}

impl TurnExecutor {
    pub(crate) fn new(
        sessions: SessionStore,
        agent: AgentNode,
        tool_node: ToolNode,
        services: Arc<TurnServices>,
        max_iterations: usize,
        event_sink: Option<Arc<dyn EventSink>>,
    ) -> Self {
        Self {
            sessions,
            agent,
            tool_node,
            services,
            max_iterations: max_iterations.max(1),
            event_sink,
        }
    }

    /// Execute one turn end-to-end, serialised with other turns of the session.
    pub(crate) async fn run_turn(&self, params: TurnParams) -> Result<RunResult, StewardCoreError> {
        let TurnParams {
            session_id,
            input,
            turn_id,
            event_sink,
            cancel,
        } = params;
        let turn_id = turn_id.unwrap_or_else(Uuid::new_v4);
        let event_sink = event_sink.or_else(|| self.event_sink.clone());
        let scope = TurnScope {
            session_id,
            turn_id,
            sink: event_sink.as_ref(),
        };

        let _turn = self.sessions.lock_turn(session_id).await;
        let mut history = match self.sessions.history(session_id) {
            Ok(history) => history,
            Err(err) => {
                scope.emit(EventPayload::Error {
                    turn_id: Some(turn_id),
                    message: err.to_string(),
                });
                return Err(err);
            }
        };
        let keep = history.len();
        info!(
            "starting turn (session_id={}, turn_id={}, resume={}, history_len={})",
            session_id,
            turn_id,
            input.is_none(),
            keep
        );
        scope.emit(EventPayload::TurnStarted { turn_id });

        let services = match &event_sink {
            Some(sink) => Arc::new(self.services.with_event_sink(sink.clone())),
            None => self.services.clone(),
        };
        let tool_ctx = ToolContext::new(session_id, services);

        let outcome = self
            .drive(&scope, &tool_ctx, &mut history, input, &cancel)
            .await;
        match outcome {
            Ok((response, agent_invocations)) => {
                info!(
                    "turn completed (session_id={}, turn_id={}, agent_invocations={})",
                    session_id, turn_id, agent_invocations
                );
                scope.emit(EventPayload::TurnCompleted {
                    turn_id,
                    message: response.clone(),
                });
                Ok(RunResult {
                    session_id,
                    turn_id,
                    response,
                    agent_invocations,
                })
            }
            Err(StewardCoreError::Cancelled(id)) => {
                warn!(
                    "turn cancelled (session_id={}, turn_id={}, history_len={})",
                    session_id,
                    turn_id,
                    history.len()
                );
                scope.emit(EventPayload::TurnCancelled { turn_id });
                Err(StewardCoreError::Cancelled(id))
            }
            Err(err) => {
                error!(
                    "turn failed (session_id={}, turn_id={}): {}",
                    session_id, turn_id, err
                );
                if let Err(rollback) = self.sessions.abort_turn(session_id, turn_id, keep) {
                    error!(
                        "failed to roll back turn (session_id={}, turn_id={}): {}",
                        session_id, turn_id, rollback
                    );
                }
                scope.emit(EventPayload::Error {
                    turn_id: Some(turn_id),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Run the state machine until the turn ends. Returns the final answer
    /// and the number of agent invocations.
    async fn drive(
        &self,
        scope: &TurnScope<'_>,
        tool_ctx: &ToolContext,
        history: &mut Vec<Message>,
        input: Option<String>,
        cancel: &AtomicBool,
    ) -> Result<(String, usize), StewardCoreError> {
        let (session_id, turn_id) = (scope.session_id, scope.turn_id);
        let start = match input {
            Some(input) => {
                let message = Message::user(input);
                self.record(scope, "input", history, vec![message])?;
                Some(NodeKind::Agent)
            }
            None => pending_node(history),
        };
        let Some(mut node) = start else {
            debug!("nothing to resume (session_id={})", session_id);
            return Ok((last_answer(history), 0));
        };

        let mut invocations = 0;
        loop {
            match node {
                NodeKind::Agent => {
                    if cancel.load(Ordering::SeqCst) {
                        return Err(StewardCoreError::Cancelled(turn_id));
                    }
                    if invocations >= self.max_iterations {
                        warn!(
                            "iteration limit reached (session_id={}, turn_id={}, limit={})",
                            session_id, turn_id, self.max_iterations
                        );
                        let content = iteration_limit_message(self.max_iterations);
                        self.record(scope, "guard", history, vec![Message::assistant(content.clone())])?;
                        scope.emit(EventPayload::IterationLimitReached {
                            turn_id,
                            limit: self.max_iterations,
                        });
                        scope.emit(EventPayload::AgentMessage {
                            turn_id,
                            content: content.clone(),
                        });
                        return Ok((content, invocations));
                    }

                    invocations += 1;
                    let output = self.agent.invoke(session_id, history).await?;
                    let text = output.text().to_string();
                    self.record(scope, NodeKind::Agent.as_str(), history, vec![output.to_message()])?;
                    if !text.is_empty() {
                        scope.emit(EventPayload::AgentMessage {
                            turn_id,
                            content: text.clone(),
                        });
                    }
                    match next_node(NodeKind::Agent, history) {
                        Some(next) => node = next,
                        None => return Ok((text, invocations)),
                    }
                }
                NodeKind::Tools => {
                    let calls = unanswered_calls(history);
                    let results = self.tool_node.execute(tool_ctx, turn_id, &calls).await;
                    self.record(scope, NodeKind::Tools.as_str(), history, results)?;
                    node = next_node(NodeKind::Tools, history).unwrap_or(NodeKind::Agent);
                }
            }
        }
    }

    fn record(
        &self,
        scope: &TurnScope<'_>,
        node: &str,
        history: &mut Vec<Message>,
        messages: Vec<Message>,
    ) -> Result<(), StewardCoreError> {
        self.sessions
            .checkpoint(scope.session_id, scope.turn_id, node, &messages)?;
        history.extend(messages);
        Ok(())
    }
}

fn last_answer(history: &[Message]) -> String {
    history
        .iter()
        .rev()
        .find(|message| message.role == crate::types::Role::Assistant && !message.is_tool_request())
        .map(|message| message.content.clone())
        .unwrap_or_default()
}
