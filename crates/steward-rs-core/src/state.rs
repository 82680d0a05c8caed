//! Per-session checkpoint persistence using append-only JSONL files.
//!
//! Each node transition appends one `checkpoint` event carrying the messages
//! it produced. A failed turn appends `turn_aborted`, and replay drops every
//! message tagged with that turn, so a reloaded history never contains a
//! half-finished failure.
//!
//! A crash mid-append can leave a partial final line. Replay skips it and the
//! next append truncates it away; an unparseable line anywhere else is an error.

use crate::types::{Message, SessionId, TurnId};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

const SCHEMA_VERSION: u32 = 1;

/// Messages appended by one node transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointRecord {
    pub turn_id: TurnId,
    /// Node that produced the messages (`input`, `agent`, `tools`, `guard`).
    pub node: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

/// Persisted session record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    /// History with aborted turns removed.
    pub messages: Vec<Message>,
}

/// Summary record used for listing sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummaryRecord {
    pub id: SessionId,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent checkpoint.
    pub updated_at: DateTime<Utc>,
}

/// Durable per-session record of conversation state.
pub trait CheckpointStore: Send + Sync {
    /// Record a new session creation.
    fn record_session(&self, session_id: SessionId, created_at: DateTime<Utc>)
    -> Result<(), StateError>;
    /// Append the messages produced by one transition.
    fn append_checkpoint(
        &self,
        session_id: SessionId,
        checkpoint: &CheckpointRecord,
    ) -> Result<(), StateError>;
    /// Mark every checkpoint of `turn_id` as discarded.
    fn abort_turn(&self, session_id: SessionId, turn_id: TurnId) -> Result<(), StateError>;
    /// Load a session record by id.
    fn load_session(&self, session_id: SessionId) -> Result<Option<SessionRecord>, StateError>;
    /// List all session summaries, most recently updated first.
    fn list_sessions(&self) -> Result<Vec<SessionSummaryRecord>, StateError>;
}

/// Errors returned by the checkpoint store.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported schema version: {0}")]
    UnsupportedSchema(u32),
    #[error("missing session metadata")]
    MissingMetadata,
    #[error("session already exists: {0}")]
    SessionExists(SessionId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CheckpointEvent {
    SchemaVersion {
        version: u32,
    },
    SessionCreated {
        session_id: SessionId,
        created_at: DateTime<Utc>,
    },
    Checkpoint {
        session_id: SessionId,
        turn_id: TurnId,
        node: String,
        messages: Vec<Message>,
        created_at: DateTime<Utc>,
    },
    TurnAborted {
        session_id: SessionId,
        turn_id: TurnId,
        created_at: DateTime<Utc>,
    },
}

#[derive(Default)]
struct Replay {
    version: Option<u32>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    messages: Vec<(TurnId, Message)>,
    aborted: HashSet<TurnId>,
}

impl Replay {
    fn apply(&mut self, event: CheckpointEvent) -> Result<(), StateError> {
        match event {
            CheckpointEvent::SchemaVersion { version } => {
                self.version = Some(version);
                if version > SCHEMA_VERSION {
                    return Err(StateError::UnsupportedSchema(version));
                }
            }
            CheckpointEvent::SessionCreated { created_at, .. } => {
                self.created_at = Some(created_at);
            }
            CheckpointEvent::Checkpoint {
                turn_id,
                messages,
                created_at,
                ..
            } => {
                self.updated_at = Some(created_at);
                self.messages
                    .extend(messages.into_iter().map(|message| (turn_id, message)));
            }
            CheckpointEvent::TurnAborted {
                turn_id,
                created_at,
                ..
            } => {
                self.updated_at = Some(created_at);
                self.aborted.insert(turn_id);
            }
        }
        Ok(())
    }

    fn finish(self, session_id: SessionId) -> Result<SessionRecord, StateError> {
        self.version.ok_or(StateError::MissingMetadata)?;
        let created_at = self.created_at.ok_or(StateError::MissingMetadata)?;
        let aborted = self.aborted;
        Ok(SessionRecord {
            id: session_id,
            created_at,
            messages: self
                .messages
                .into_iter()
                .filter(|(turn_id, _)| !aborted.contains(turn_id))
                .map(|(_, message)| message)
                .collect(),
        })
    }
}

/// JSONL-backed checkpoint store, one file per session.
pub struct JsonlCheckpointStore {
    root: PathBuf,
    /// Serialize write access to checkpoint files.
    write_lock: Mutex<()>,
}

impl JsonlCheckpointStore {
    /// Create a new JSONL store under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StateError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized JSONL checkpoint store (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn session_path(&self, session_id: SessionId) -> PathBuf {
        self.root.join(format!("{session_id}.jsonl"))
    }

    fn write_event(&self, session_id: SessionId, event: &CheckpointEvent) -> Result<(), StateError> {
        let _guard = self.write_lock.lock();
        let path = self.session_path(session_id);
        if !path.exists() {
            return Err(StateError::MissingMetadata);
        }
        trim_torn_tail(&path)?;
        let mut file = OpenOptions::new().append(true).open(path)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn write_new_session(
        &self,
        session_id: SessionId,
        event: &CheckpointEvent,
    ) -> Result<(), StateError> {
        let _guard = self.write_lock.lock();
        let path = self.session_path(session_id);
        if path.exists() {
            return Err(StateError::SessionExists(session_id));
        }
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)?;
        let header = serde_json::to_string(&CheckpointEvent::SchemaVersion {
            version: SCHEMA_VERSION,
        })?;
        writeln!(file, "{header}")?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn replay(&self, session_id: SessionId) -> Result<Option<(SessionRecord, DateTime<Utc>)>, StateError> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();
        let mut replay = Replay::default();
        for (index, line) in lines.iter().enumerate() {
            let event: CheckpointEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(err) if index + 1 == lines.len() => {
                    warn!(
                        "skipping torn final checkpoint line (session_id={}, error={})",
                        session_id, err
                    );
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            replay.apply(event)?;
        }
        let updated_at = replay.updated_at;
        let record = replay.finish(session_id)?;
        let updated_at = updated_at.unwrap_or(record.created_at);
        Ok(Some((record, updated_at)))
    }
}

/// Cut a partial last line left by an interrupted append, so the next event
/// starts on a line of its own.
fn trim_torn_tail(path: &Path) -> Result<(), StateError> {
    let bytes = fs::read(path)?;
    if bytes.last().is_none_or(|byte| *byte == b'\n') {
        return Ok(());
    }
    let keep = bytes
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map_or(0, |newline| newline + 1);
    warn!(
        "truncating torn checkpoint line (path={}, bytes={})",
        path.display(),
        bytes.len() - keep
    );
    OpenOptions::new()
        .write(true)
        .open(path)?
        .set_len(keep as u64)?;
    Ok(())
}

impl CheckpointStore for JsonlCheckpointStore {
    fn record_session(
        &self,
        session_id: SessionId,
        created_at: DateTime<Utc>,
    ) -> Result<(), StateError> {
        info!("recording session creation (session_id={})", session_id);
        self.write_new_session(
            session_id,
            &CheckpointEvent::SessionCreated {
                session_id,
                created_at,
            },
        )
    }

    fn append_checkpoint(
        &self,
        session_id: SessionId,
        checkpoint: &CheckpointRecord,
    ) -> Result<(), StateError> {
        debug!(
            "appending checkpoint (session_id={}, turn_id={}, node={}, messages={})",
            session_id,
            checkpoint.turn_id,
            checkpoint.node,
            checkpoint.messages.len()
        );
        self.write_event(
            session_id,
            &CheckpointEvent::Checkpoint {
                session_id,
                turn_id: checkpoint.turn_id,
                node: checkpoint.node.clone(),
                messages: checkpoint.messages.clone(),
                created_at: checkpoint.created_at,
            },
        )
    }

    fn abort_turn(&self, session_id: SessionId, turn_id: TurnId) -> Result<(), StateError> {
        info!(
            "recording aborted turn (session_id={}, turn_id={})",
            session_id, turn_id
        );
        self.write_event(
            session_id,
            &CheckpointEvent::TurnAborted {
                session_id,
                turn_id,
                created_at: Utc::now(),
            },
        )
    }

    fn load_session(&self, session_id: SessionId) -> Result<Option<SessionRecord>, StateError> {
        Ok(self.replay(session_id)?.map(|(record, _)| record))
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummaryRecord>, StateError> {
        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(session_id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok())
            else {
                continue;
            };
            match self.replay(session_id) {
                Ok(Some((record, updated_at))) => summaries.push(SessionSummaryRecord {
                    id: record.id,
                    message_count: record.messages.len(),
                    created_at: record.created_at,
                    updated_at,
                }),
                Ok(None) => {}
                Err(err) => warn!(
                    "skipping unreadable session file (path={}, error={})",
                    path.display(),
                    err
                ),
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}
