/// Failures writing the memory document or embedding its entries.
///
/// Reads never produce these: an unreadable document is treated as empty.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("memory document io: {0}")]
    Io(#[from] std::io::Error),
    #[error("memory document encoding: {0}")]
    Serde(#[from] serde_json::Error),
    /// The embedding backend failed or returned the wrong number of vectors.
    #[error("embedding failed: {0}")]
    Embedding(String),
}
