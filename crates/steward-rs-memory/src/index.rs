//! Semantic search over the memory document.
//!
//! The index is a disposable cache: it is rebuilt wholesale whenever the
//! document stamp differs from the one recorded at the last build.

use crate::embedder::{Embedder, dot_product};
use crate::error::MemoryError;
use crate::store::{DocumentStamp, MemoryEntry, MemoryStore};
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Outcome of a semantic search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The document is missing or has no entries.
    Empty,
    /// The index exists but nothing was returned.
    NoMatches,
    /// Ranked `"key: value"` strings, best first.
    Hits(Vec<String>),
}

impl SearchOutcome {
    /// Render the outcome as the text handed back to the model.
    pub fn render(&self) -> String {
        match self {
            SearchOutcome::Empty => "Memory is empty.".to_string(),
            SearchOutcome::NoMatches => "No relevant information found in memory.".to_string(),
            SearchOutcome::Hits(hits) => hits.join("\n"),
        }
    }
}

struct IndexedEntry {
    text: String,
    vector: Vec<f32>,
}

struct CachedIndex {
    stamp: DocumentStamp,
    entries: Vec<IndexedEntry>,
}

/// Vector index over the memory document, shared by all sessions.
pub struct SemanticIndex {
    store: Arc<MemoryStore>,
    embedder: Arc<dyn Embedder>,
    cache: Mutex<Option<CachedIndex>>,
    builds: AtomicU64,
}

impl SemanticIndex {
    pub fn new(store: Arc<MemoryStore>, embedder: Arc<dyn Embedder>) -> Self {
        info!("semantic index ready (embedder={})", embedder.name());
        Self {
            store,
            embedder,
            cache: Mutex::new(None),
            builds: AtomicU64::new(0),
        }
    }

    /// Number of times the index has been (re)built.
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::SeqCst)
    }

    /// Return up to `k` entries ranked by similarity to `query`.
    pub async fn search(&self, query: &str, k: usize) -> Result<SearchOutcome, MemoryError> {
        let mut cache = self.cache.lock().await;

        let Some(stamp) = self.store.stamp() else {
            *cache = None;
            return Ok(SearchOutcome::Empty);
        };
        let fresh = cache.as_ref().is_some_and(|cached| cached.stamp == stamp);
        if !fresh {
            let entries = self.store.entries();
            if entries.is_empty() {
                *cache = None;
                return Ok(SearchOutcome::Empty);
            }
            *cache = Some(self.build(stamp, entries).await?);
        }
        let Some(index) = cache.as_ref() else {
            return Ok(SearchOutcome::Empty);
        };

        let query_vector = self
            .embedder
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::Embedding("no vector returned for query".to_string()))?;

        let mut scored: Vec<(f32, &str)> = index
            .entries
            .iter()
            .map(|entry| (dot_product(&query_vector, &entry.vector), entry.text.as_str()))
            .collect();
        // Stable sort keeps document order between equal scores.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let hits: Vec<String> = scored
            .into_iter()
            .take(k)
            .map(|(_, text)| text.to_string())
            .collect();
        debug!(
            "memory search (query_len={}, k={}, hits={})",
            query.len(),
            k,
            hits.len()
        );
        if hits.is_empty() {
            Ok(SearchOutcome::NoMatches)
        } else {
            Ok(SearchOutcome::Hits(hits))
        }
    }

    async fn build(
        &self,
        stamp: DocumentStamp,
        entries: Vec<MemoryEntry>,
    ) -> Result<CachedIndex, MemoryError> {
        let texts: Vec<String> = entries.iter().map(MemoryEntry::as_document_text).collect();
        let vectors = self.embedder.embed(texts.clone()).await?;
        if vectors.len() != texts.len() {
            return Err(MemoryError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        let builds = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "rebuilt memory index (entries={}, builds={})",
            texts.len(),
            builds
        );
        Ok(CachedIndex {
            stamp,
            entries: texts
                .into_iter()
                .zip(vectors)
                .map(|(text, vector)| IndexedEntry { text, vector })
                .collect(),
        })
    }
}
