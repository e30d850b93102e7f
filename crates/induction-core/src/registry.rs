//! Session registry
//!
//! Sharded map from session id to a per-session mutex. Operations on one
//! session serialize on its mutex; operations on different sessions never
//! contend beyond a brief shard lookup.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::catalog::TaskBinding;
use crate::session::{Session, SessionId, SessionStatus};
use crate::{InductionError, Result};

/// Shared, individually locked session
pub type SessionHandle = Arc<Mutex<Session>>;

/// Session summary info
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub participant: String,
    pub task_id: String,
    pub status: SessionStatus,
    pub queries_used: usize,
    pub submissions: usize,
}

/// Registry of live sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with a fresh random id and register it
    pub fn create(&self, participant: &str, task: TaskBinding) -> (SessionId, SessionHandle) {
        let mut session = Session::new(participant, task);
        while self.sessions.contains_key(&session.id) {
            session.id = SessionId::new();
        }
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.insert(id.clone(), Arc::clone(&handle));

        tracing::info!("Session created: {}", id);
        (id, handle)
    }

    /// Look up a session; unknown and ended ids are `SessionNotFound`
    pub fn get(&self, id: &SessionId) -> Result<SessionHandle> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| InductionError::SessionNotFound(id.to_string()))
    }

    /// Drop a session from the registry
    pub fn remove(&self, id: &SessionId) -> Result<SessionHandle> {
        self.sessions
            .remove(id)
            .map(|(_, handle)| handle)
            .ok_or_else(|| InductionError::SessionNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Get session count
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Get all registered sessions
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let handles: Vec<SessionHandle> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        handles
            .iter()
            .map(|handle| {
                let session = handle.lock();
                SessionInfo {
                    id: session.id.clone(),
                    participant: session.participant.clone(),
                    task_id: session.task.task_id.clone(),
                    status: session.status(),
                    queries_used: session.queries_used(),
                    submissions: session.submissions().len(),
                }
            })
            .collect()
    }
}
