//! Test helpers shared across Steward crates.

pub mod context;
pub mod events;
pub mod llm;
pub mod tools;
pub mod weather;

pub use context::{base_tool_context, memory_services};
pub use events::CollectingSink;
pub use llm::{
    FailingLLM, FixedChatResponse, FixedLLM, RecordingChatLLM, ScriptedLLM, tool_call,
};
pub use tools::{DummyTool, FailingTool, SlowTool};
pub use weather::StubWeather;
