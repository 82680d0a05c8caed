//! Orchestrator Core

pub mod graph;
mod runtime;
mod sessions;
mod tool_node;

use crate::agent::AgentNode;
use crate::agent::llm::guard_llm_provider;
use crate::agent::prompt::PersonaPrompt;
use crate::error::StewardCoreError;
use crate::state::{CheckpointStore, JsonlCheckpointStore};
use crate::types::{Message, Session, SessionId, SessionSummary, TurnId};
use autoagents_llm::LLMProvider;
use directories::BaseDirs;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use steward_rs_config::{SessionsConfig, StewardConfig};
use steward_rs_protocol::{EventMsg, EventSink};
use steward_rs_tools::{ToolRegistry, TurnServices};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use runtime::{TurnExecutor, TurnParams};
use sessions::SessionStore;
use tool_node::ToolNode;

const RUN_STREAM_BUFFER: usize = 512;

/// Result payload for a single turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Session that produced the response.
    pub session_id: SessionId,
    pub turn_id: TurnId,
    /// Final assistant answer.
    pub response: String,
    /// Number of agent-node invocations the turn took.
    pub agent_invocations: usize,
}

/// Streaming handle for a single turn.
pub struct RunStream {
    /// Session that produced the response.
    pub session_id: SessionId,
    /// Turn id associated with the streaming response.
    pub turn_id: TurnId,
    /// Stream of events emitted during the turn.
    pub events: BroadcastStream<EventMsg>,
    handle: JoinHandle<Result<RunResult, StewardCoreError>>,
    cancel: Arc<AtomicBool>,
}

impl RunStream {
    /// Await completion of the turn and return the final result.
    pub async fn finish(self) -> Result<RunResult, StewardCoreError> {
        self.handle
            .await
            .map_err(|err| StewardCoreError::Executor(err.to_string()))?
    }

    /// Ask the turn to stop before its next model call.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Detached handle that can cancel this turn from another task.
    pub fn canceller(&self) -> TurnCanceller {
        TurnCanceller {
            flag: self.cancel.clone(),
        }
    }
}

/// Cancels a running turn. Checkpoints already written are kept.
#[derive(Clone)]
pub struct TurnCanceller {
    flag: Arc<AtomicBool>,
}

impl TurnCanceller {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct RunEventBus {
    sender: broadcast::Sender<EventMsg>,
}

impl RunEventBus {
    fn new(buffer: usize) -> (Self, broadcast::Receiver<EventMsg>) {
        let (sender, receiver) = broadcast::channel(buffer);
        (Self { sender }, receiver)
    }
}

impl EventSink for RunEventBus {
    fn emit(&self, event: EventMsg) {
        let _ = self.sender.send(event);
    }
}

struct FanoutEventSink {
    primary: Option<Arc<dyn EventSink>>,
    secondary: Arc<dyn EventSink>,
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: EventMsg) {
        if let Some(primary) = &self.primary {
            primary.emit(event.clone());
        }
        self.secondary.emit(event);
    }
}

/// Main orchestration facade: owns sessions and runs turns through the
/// agent/tools graph.
pub struct Orchestrator {
    config: Arc<StewardConfig>,
    tools: ToolRegistry,
    session_store: SessionStore,
    executor: Arc<TurnExecutor>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl Orchestrator {
    /// Build an orchestrator.
    ///
    /// An explicit `state_store` always wins; otherwise checkpoints go to
    /// JSONL files when `sessions.enabled` is set and stay in memory if not.
    pub fn new(
        config: StewardConfig,
        llm: Arc<dyn LLMProvider>,
        tools: ToolRegistry,
        services: TurnServices,
        state_store: Option<Arc<dyn CheckpointStore>>,
        event_sink: Option<Arc<dyn EventSink>>,
    ) -> Result<Self, StewardCoreError> {
        let state_store = match state_store {
            Some(store) => Some(store),
            None if config.sessions.enabled => Some(build_default_state_store(&config.sessions)?),
            None => None,
        };
        let session_store = SessionStore::new(state_store);

        let services = TurnServices {
            search_k: config.memory.search_k,
            call_timeout: (config.tools.call_timeout_secs > 0)
                .then(|| Duration::from_secs(config.tools.call_timeout_secs)),
            ..services
        };
        let agent = AgentNode::new(
            guard_llm_provider(llm),
            Arc::new(PersonaPrompt::from_config(&config.orchestrator)),
            tools.specs(),
        );
        info!(
            "orchestrator ready (tools={}, max_iterations={}, persistent_sessions={})",
            tools.len(),
            config.orchestrator.max_iterations,
            session_store.is_persistent()
        );
        let executor = Arc::new(TurnExecutor::new(
            session_store.clone(),
            agent,
            ToolNode::new(tools.clone()),
            Arc::new(services),
            config.orchestrator.max_iterations,
            event_sink.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            tools,
            session_store,
            executor,
            event_sink,
        })
    }

    pub fn config(&self) -> &StewardConfig {
        &self.config
    }

    /// Names of the tools offered to the model.
    pub fn list_tools(&self) -> Vec<String> {
        self.tools.list()
    }

    pub fn create_session(&self) -> Result<SessionId, StewardCoreError> {
        self.session_store.create_session()
    }

    /// Resume `session_id`, starting an empty session under that id if it
    /// does not exist yet.
    pub fn open_session(&self, session_id: SessionId) -> Result<Session, StewardCoreError> {
        self.session_store.open_session(session_id)
    }

    pub fn resume_session(&self, session_id: SessionId) -> Result<Session, StewardCoreError> {
        self.session_store.resume_session(session_id)
    }

    /// Full message history of a session.
    pub fn history(&self, session_id: SessionId) -> Result<Vec<Message>, StewardCoreError> {
        self.session_store.history(session_id)
    }

    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, StewardCoreError> {
        self.session_store.list_sessions()
    }

    /// Run one turn to completion.
    pub async fn run(
        &self,
        session_id: SessionId,
        input: impl Into<String>,
    ) -> Result<RunResult, StewardCoreError> {
        let input = input.into();
        debug!(
            "running turn (session_id={}, prompt_len={})",
            session_id,
            input.len()
        );
        self.executor
            .run_turn(TurnParams {
                session_id,
                input: Some(input),
                turn_id: None,
                event_sink: None,
                cancel: Arc::new(AtomicBool::new(false)),
            })
            .await
    }

    /// Run one turn in the background and stream its events.
    pub fn run_stream(
        &self,
        session_id: SessionId,
        input: impl Into<String>,
    ) -> Result<RunStream, StewardCoreError> {
        self.spawn_turn(session_id, Some(input.into()))
    }

    /// Continue an interrupted turn from its last checkpoint.
    ///
    /// Returns `None` when the session ends on a final answer and there is
    /// nothing to resume.
    pub async fn resume_turn(
        &self,
        session_id: SessionId,
    ) -> Result<Option<RunResult>, StewardCoreError> {
        let history = self.session_store.history(session_id)?;
        if graph::pending_node(&history).is_none() {
            debug!("no pending turn (session_id={})", session_id);
            return Ok(None);
        }
        info!("resuming interrupted turn (session_id={})", session_id);
        self.executor
            .run_turn(TurnParams {
                session_id,
                input: None,
                turn_id: None,
                event_sink: None,
                cancel: Arc::new(AtomicBool::new(false)),
            })
            .await
            .map(Some)
    }

    fn spawn_turn(
        &self,
        session_id: SessionId,
        input: Option<String>,
    ) -> Result<RunStream, StewardCoreError> {
        self.session_store.resume_session(session_id)?;
        let turn_id = Uuid::new_v4();
        let (run_bus, receiver) = RunEventBus::new(RUN_STREAM_BUFFER);
        let fanout: Arc<dyn EventSink> = Arc::new(FanoutEventSink {
            primary: self.event_sink.clone(),
            secondary: Arc::new(run_bus),
        });
        let cancel = Arc::new(AtomicBool::new(false));
        let executor = self.executor.clone();
        let params = TurnParams {
            session_id,
            input,
            turn_id: Some(turn_id),
            event_sink: Some(fanout),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(async move { executor.run_turn(params).await });

        Ok(RunStream {
            session_id,
            turn_id,
            events: BroadcastStream::new(receiver),
            handle,
            cancel,
        })
    }
}

fn build_default_state_store(
    config: &SessionsConfig,
) -> Result<Arc<dyn CheckpointStore>, StewardCoreError> {
    let root = resolve_default_root(config.path.as_ref(), "sessions")?;
    info!("initializing checkpoint store (root={})", root.display());
    let store = JsonlCheckpointStore::new(root)
        .map_err(|err| StewardCoreError::State(err.to_string()))?;
    Ok(Arc::new(store))
}

/// Resolve an absolute storage root for config-specified paths.
fn resolve_default_root(
    path: Option<&String>,
    fallback_dir: &str,
) -> Result<PathBuf, StewardCoreError> {
    let cwd = std::env::current_dir()
        .map_err(|err| StewardCoreError::State(format!("cannot resolve working directory: {err}")))?;
    if let Some(path) = path {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            return Ok(path);
        }
        debug!("resolving storage root against cwd: {}", path.display());
        return Ok(cwd.join(path));
    }

    match BaseDirs::new() {
        Some(dirs) => Ok(dirs.home_dir().join(".steward").join(fallback_dir)),
        None => Ok(cwd.join(".steward").join(fallback_dir)),
    }
}
