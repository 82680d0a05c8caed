//! File-backed user memory document.
//!
//! The document is a single JSON object mapping string keys to string values.
//! Reads never fail: a missing or unreadable document is an empty mapping.
//! Writes replace the whole document atomically through a sibling temp file.

use crate::error::MemoryError;
use indexmap::IndexMap;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Text returned to the model when a requested key is absent.
pub const NOT_FOUND: &str = "Information not found.";

/// In-memory view of the memory document, in document order.
pub type MemoryDocument = IndexMap<String, String>;

/// Single key/value pair from the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: String,
    pub value: String,
}

impl MemoryEntry {
    /// Text embedded by the semantic index for this entry.
    pub fn as_document_text(&self) -> String {
        format!("{}: {}", self.key, self.value)
    }
}

/// Result of a memory read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryLookup {
    /// The value stored under the requested key.
    Value(String),
    /// The requested key is not present.
    NotFound,
    /// No key was requested; the whole mapping.
    All(MemoryDocument),
}

impl MemoryLookup {
    /// Render the lookup as the text handed back to the model.
    pub fn render(&self) -> String {
        match self {
            MemoryLookup::Value(value) => value.clone(),
            MemoryLookup::NotFound => NOT_FOUND.to_string(),
            MemoryLookup::All(document) => {
                serde_json::to_string(document).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }
}

/// Fingerprint of the document used for cache freshness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
    /// Number of writes performed by this process.
    pub revision: u64,
}

/// Durable key/value memory backed by one JSON document.
#[derive(Debug)]
pub struct MemoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    revision: AtomicU64,
}

impl MemoryStore {
    /// Create a store for the document at `path`; nothing is touched on disk yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        info!("initialized memory store (path={})", path.display());
        Self {
            path,
            write_lock: Mutex::new(()),
            revision: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document. Missing or corrupt files read as empty.
    pub fn load(&self) -> MemoryDocument {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("memory document missing (path={})", self.path.display());
                return MemoryDocument::new();
            }
            Err(err) => {
                warn!(
                    "failed to read memory document, treating as empty (path={}, error={})",
                    self.path.display(),
                    err
                );
                return MemoryDocument::new();
            }
        };
        match serde_json::from_str::<IndexMap<String, Value>>(&contents) {
            Ok(raw) => raw
                .into_iter()
                .map(|(key, value)| match value {
                    Value::String(text) => (key, text),
                    other => (key, other.to_string()),
                })
                .collect(),
            Err(err) => {
                warn!(
                    "memory document is not a JSON object, treating as empty (path={}, error={})",
                    self.path.display(),
                    err
                );
                MemoryDocument::new()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.load().get(key).cloned()
    }

    /// Read one key, or the whole mapping when no key (or an empty key) is given.
    pub fn lookup(&self, key: Option<&str>) -> MemoryLookup {
        match key.filter(|key| !key.is_empty()) {
            Some(key) => match self.get(key) {
                Some(value) => MemoryLookup::Value(value),
                None => MemoryLookup::NotFound,
            },
            None => MemoryLookup::All(self.load()),
        }
    }

    /// Create or overwrite `key`, persisting the whole document before returning.
    pub fn set(&self, key: &str, value: &str) -> Result<String, MemoryError> {
        let _guard = self.write_lock.lock();
        let mut document = self.load();
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document)?;
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "memory updated (key={}, entries={}, revision={})",
            key,
            document.len(),
            revision
        );
        Ok(format!("Successfully updated memory: {key} = {value}"))
    }

    /// All entries in document order.
    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.load()
            .into_iter()
            .map(|(key, value)| MemoryEntry { key, value })
            .collect()
    }

    /// Current fingerprint of the document, or `None` when it does not exist.
    pub fn stamp(&self) -> Option<DocumentStamp> {
        let metadata = fs::metadata(&self.path).ok()?;
        Some(DocumentStamp {
            modified: metadata.modified().ok(),
            len: metadata.len(),
            revision: self.revision.load(Ordering::SeqCst),
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_document(&self, document: &MemoryDocument) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.temp_path();
        let mut contents = serde_json::to_string_pretty(document)?;
        contents.push('\n');
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
