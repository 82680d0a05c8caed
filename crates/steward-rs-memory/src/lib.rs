//! Long-term user memory for Steward: a JSON key/value document plus a
//! semantic index that is rebuilt whenever the document changes.

pub mod embedder;
pub mod error;
pub mod index;
pub mod store;

/// Embedding backends used by the semantic index.
#[cfg(feature = "fastembed")]
pub use embedder::FastEmbedder;
pub use embedder::{Embedder, HashingEmbedder};
/// Memory error type.
pub use error::MemoryError;
/// Lazily rebuilt vector index over the memory document.
pub use index::{SearchOutcome, SemanticIndex};
/// File-backed memory document.
pub use store::{DocumentStamp, MemoryDocument, MemoryEntry, MemoryLookup, MemoryStore, NOT_FOUND};
