use std::path::Path;
use std::sync::Arc;
use steward_rs_memory::{HashingEmbedder, MemoryStore, SemanticIndex};
use steward_rs_tools::{ToolContext, TurnServices};
use uuid::Uuid;

/// Services with a memory store at `path` and a hashing-embedder index.
pub fn memory_services(path: impl AsRef<Path>) -> TurnServices {
    let store = Arc::new(MemoryStore::new(path));
    let index = Arc::new(SemanticIndex::new(
        store.clone(),
        Arc::new(HashingEmbedder::default()),
    ));
    TurnServices {
        memory: Some(store),
        index: Some(index),
        ..TurnServices::default()
    }
}

pub fn base_tool_context() -> ToolContext {
    ToolContext::new(Uuid::new_v4(), Arc::new(TurnServices::default()))
}
