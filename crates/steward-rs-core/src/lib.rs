//! Core orchestration for Steward.
//!
//! This crate owns the conversation types, the agent and tool-execution
//! nodes, the turn state machine, and per-session checkpointing.

pub mod agent;
pub mod error;
pub mod orchestrator;
pub mod state;
pub mod types;

pub use agent::llm::{LlmEmbedder, MissingCredentialsLLM, guard_llm_provider};
pub use agent::prompt::{PersonaPrompt, PromptState, SystemPrompt};
pub use agent::{AgentNode, AgentOutput};
pub use error::StewardCoreError;
/// Orchestrator facade and run handles.
pub use orchestrator::{Orchestrator, RunResult, RunStream, TurnCanceller};
pub use state::{CheckpointStore, JsonlCheckpointStore, StateError};
pub use steward_rs_protocol::EventSink;
pub use types::{Message, Role, Session, SessionId, SessionSummary, ToolInvocation, TurnId};
