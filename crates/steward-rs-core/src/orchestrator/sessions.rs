//! In-process session cache with optional checkpoint persistence.

use crate::error::StewardCoreError;
use crate::state::{CheckpointRecord, CheckpointStore};
use crate::types::{Message, Session, SessionId, SessionSummary, TurnId};
use chrono::Utc;
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Session storage used by the orchestrator and the turn executor.
#[derive(Clone)]
pub(crate) struct SessionStore {
    /// In-memory session cache.
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    state_store: Option<Arc<dyn CheckpointStore>>,
    /// One lock per session so turns never interleave.
    turn_locks: Arc<Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>>,
}

fn state_error(err: crate::state::StateError) -> StewardCoreError {
    StewardCoreError::State(err.to_string())
}

impl SessionStore {
    pub(crate) fn new(state_store: Option<Arc<dyn CheckpointStore>>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            state_store,
            turn_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn is_persistent(&self) -> bool {
        self.state_store.is_some()
    }

    /// Mint a new session id and record it.
    pub(crate) fn create_session(&self) -> Result<SessionId, StewardCoreError> {
        let session_id = Uuid::new_v4();
        self.insert_new(session_id)?;
        Ok(session_id)
    }

    /// Resume `session_id`, creating it when it is not known anywhere.
    pub(crate) fn open_session(&self, session_id: SessionId) -> Result<Session, StewardCoreError> {
        match self.resume_session(session_id) {
            Err(StewardCoreError::UnknownSession(_)) => {
                self.insert_new(session_id)?;
                self.resume_session(session_id)
            }
            other => other,
        }
    }

    fn insert_new(&self, session_id: SessionId) -> Result<(), StewardCoreError> {
        let session = Session {
            id: session_id,
            messages: Vec::new(),
            created_at: Utc::now(),
        };
        if let Some(store) = &self.state_store {
            store
                .record_session(session.id, session.created_at)
                .map_err(state_error)?;
        }
        info!("created session (session_id={})", session_id);
        self.sessions.write().insert(session_id, session);
        Ok(())
    }

    /// Resume a session from cache or the checkpoint store.
    pub(crate) fn resume_session(
        &self,
        session_id: SessionId,
    ) -> Result<Session, StewardCoreError> {
        if let Some(session) = self.sessions.read().get(&session_id).cloned() {
            return Ok(session);
        }

        if let Some(store) = &self.state_store
            && let Some(record) = store.load_session(session_id).map_err(state_error)?
        {
            debug!(
                "loaded session from checkpoints (session_id={}, messages={})",
                session_id,
                record.messages.len()
            );
            let session = Session::from(record);
            self.sessions.write().insert(session_id, session.clone());
            return Ok(session);
        }

        Err(StewardCoreError::UnknownSession(session_id))
    }

    pub(crate) fn history(&self, session_id: SessionId) -> Result<Vec<Message>, StewardCoreError> {
        Ok(self.resume_session(session_id)?.messages)
    }

    /// List sessions, most recently updated first.
    pub(crate) fn list_sessions(&self) -> Result<Vec<SessionSummary>, StewardCoreError> {
        if let Some(store) = &self.state_store {
            let records = store.list_sessions().map_err(state_error)?;
            return Ok(records.into_iter().map(SessionSummary::from).collect());
        }

        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .read()
            .values()
            .map(|session| SessionSummary {
                id: session.id,
                message_count: session.messages.len(),
                created_at: session.created_at,
                updated_at: session
                    .messages
                    .last()
                    .map(|message| message.created_at)
                    .unwrap_or(session.created_at),
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Persist the messages produced by one transition, then cache them.
    pub(crate) fn checkpoint(
        &self,
        session_id: SessionId,
        turn_id: TurnId,
        node: &str,
        messages: &[Message],
    ) -> Result<(), StewardCoreError> {
        if messages.is_empty() {
            return Ok(());
        }
        debug!(
            "checkpoint (session_id={}, turn_id={}, node={}, messages={})",
            session_id,
            turn_id,
            node,
            messages.len()
        );
        if let Some(store) = &self.state_store {
            store
                .append_checkpoint(
                    session_id,
                    &CheckpointRecord {
                        turn_id,
                        node: node.to_string(),
                        messages: messages.to_vec(),
                        created_at: Utc::now(),
                    },
                )
                .map_err(state_error)?;
        }
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(&session_id)
            .ok_or(StewardCoreError::UnknownSession(session_id))?;
        session.messages.extend_from_slice(messages);
        Ok(())
    }

    /// Drop everything `turn_id` added: the cache is truncated to `keep`
    /// messages and the store records the abort.
    pub(crate) fn abort_turn(
        &self,
        session_id: SessionId,
        turn_id: TurnId,
        keep: usize,
    ) -> Result<(), StewardCoreError> {
        info!(
            "rolling back turn (session_id={}, turn_id={}, keep={})",
            session_id, turn_id, keep
        );
        if let Some(session) = self.sessions.write().get_mut(&session_id) {
            session.messages.truncate(keep);
        }
        if let Some(store) = &self.state_store {
            store.abort_turn(session_id, turn_id).map_err(state_error)?;
        }
        Ok(())
    }

    /// Wait for exclusive use of `session_id` for one turn.
    pub(crate) async fn lock_turn(&self, session_id: SessionId) -> TurnGuard {
        let lock = self
            .turn_locks
            .lock()
            .entry(session_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        TurnGuard {
            session_id,
            store: self.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Drop the session's lock once no turn holds or awaits it. Persistent
    /// sessions also leave the cache, since the checkpoint store can reload them.
    fn release_turn(&self, session_id: SessionId) {
        let mut locks = self.turn_locks.lock();
        let idle = locks
            .get(&session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if !idle {
            return;
        }
        locks.remove(&session_id);
        if self.is_persistent() {
            self.sessions.write().remove(&session_id);
        }
        debug!("released idle session (session_id={})", session_id);
    }

    #[cfg(test)]
    fn tracked(&self) -> (usize, usize) {
        (self.turn_locks.lock().len(), self.sessions.read().len())
    }
}

/// Exclusive hold on one session for the duration of a turn.
pub(crate) struct TurnGuard {
    session_id: SessionId,
    store: SessionStore,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.store.release_turn(self.session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::SessionStore;
    use crate::error::StewardCoreError;
    use crate::state::JsonlCheckpointStore;
    use crate::types::Message;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[test]
    fn in_memory_sessions_are_listed() {
        let store = SessionStore::new(None);
        let session_id = store.create_session().expect("create");
        store
            .checkpoint(session_id, Uuid::new_v4(), "input", &[Message::user("hi")])
            .expect("checkpoint");
        let summaries = store.list_sessions().expect("list");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, session_id);
        assert_eq!(summaries[0].message_count, 1);
        assert!(!store.is_persistent());
    }

    #[test]
    fn checkpoints_survive_a_new_store() {
        let root = tempdir().expect("root");
        let store = SessionStore::new(Some(Arc::new(
            JsonlCheckpointStore::new(root.path()).expect("state"),
        )));
        let session_id = store.create_session().expect("create");
        let turn = Uuid::new_v4();
        let user = Message::user("hello");
        let reply = Message::assistant("hi");
        store
            .checkpoint(session_id, turn, "input", &[user.clone()])
            .expect("checkpoint");
        store
            .checkpoint(session_id, turn, "agent", &[reply.clone()])
            .expect("checkpoint");

        let reopened = SessionStore::new(Some(Arc::new(
            JsonlCheckpointStore::new(root.path()).expect("state"),
        )));
        let session = reopened.resume_session(session_id).expect("resume");
        assert_eq!(session.messages, vec![user, reply]);
    }

    #[test]
    fn aborted_turns_roll_back_cache_and_store() {
        let root = tempdir().expect("root");
        let store = SessionStore::new(Some(Arc::new(
            JsonlCheckpointStore::new(root.path()).expect("state"),
        )));
        let session_id = store.create_session().expect("create");
        store
            .checkpoint(session_id, Uuid::new_v4(), "input", &[Message::user("first")])
            .expect("checkpoint");
        let failed = Uuid::new_v4();
        store
            .checkpoint(session_id, failed, "input", &[Message::user("second")])
            .expect("checkpoint");
        store.abort_turn(session_id, failed, 1).expect("abort");

        assert_eq!(store.history(session_id).expect("history").len(), 1);
        let reopened = SessionStore::new(Some(Arc::new(
            JsonlCheckpointStore::new(root.path()).expect("state"),
        )));
        assert_eq!(reopened.history(session_id).expect("history").len(), 1);
    }

    #[tokio::test]
    async fn idle_sessions_are_released_after_a_turn() {
        let root = tempdir().expect("root");
        let store = SessionStore::new(Some(Arc::new(
            JsonlCheckpointStore::new(root.path()).expect("state"),
        )));
        let session_id = store.create_session().expect("create");

        let first = store.lock_turn(session_id).await;
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let _turn = store.lock_turn(session_id).await;
                store.history(session_id).expect("history").len()
            })
        };
        while Arc::strong_count(
            store
                .turn_locks
                .lock()
                .get(&session_id)
                .expect("lock entry"),
        ) < 3
        {
            tokio::task::yield_now().await;
        }
        store
            .checkpoint(session_id, Uuid::new_v4(), "input", &[Message::user("hi")])
            .expect("checkpoint");
        drop(first);
        assert_eq!(store.tracked().0, 1);

        assert_eq!(waiter.await.expect("join"), 1);
        assert_eq!(store.tracked(), (0, 0));
        assert_eq!(store.history(session_id).expect("reload").len(), 1);
    }

    #[tokio::test]
    async fn in_memory_sessions_stay_cached_after_a_turn() {
        let store = SessionStore::new(None);
        let session_id = store.create_session().expect("create");
        drop(store.lock_turn(session_id).await);
        assert_eq!(store.tracked(), (0, 1));
        assert!(store.history(session_id).is_ok());
    }

    #[test]
    fn open_session_creates_unknown_ids() {
        let store = SessionStore::new(None);
        let session_id = Uuid::new_v4();
        let err = store.resume_session(session_id).expect_err("unknown");
        assert!(matches!(err, StewardCoreError::UnknownSession(id) if id == session_id));

        let session = store.open_session(session_id).expect("open");
        assert_eq!(session.id, session_id);
        assert!(session.messages.is_empty());
    }
}
