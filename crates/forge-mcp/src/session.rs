//! Session registry
//!
//! Tracks the open SSE streams. Each session owns an outbound channel; a
//! message posted for a session is routed to exactly that channel, never to
//! another session's.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A message could not be delivered to a session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("missing sessionId query parameter")]
    MissingSessionId,

    #[error("no active session with id {0}")]
    UnknownSession(String),
}

struct SessionEntry {
    sender: mpsc::UnboundedSender<String>,
    opened_at: DateTime<Utc>,
}

/// Snapshot of an open session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub opened_at: DateTime<Utc>,
}

/// Open sessions keyed by id.
///
/// Safe to share between connection handlers behind an `Arc`.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session with a fresh id.
    ///
    /// Messages routed to the session arrive on the returned receiver. The
    /// session stays open until the handle is dropped or it is closed
    /// explicitly.
    pub fn open(self: &Arc<Self>) -> (SessionHandle, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4().to_string();

        self.lock().insert(
            id.clone(),
            SessionEntry {
                sender,
                opened_at: Utc::now(),
            },
        );
        tracing::info!(session = %id, "Session opened");

        let handle = SessionHandle {
            id,
            registry: Arc::downgrade(self),
        };
        (handle, receiver)
    }

    /// Deliver `message` to the session `id`.
    ///
    /// # Errors
    ///
    /// `RoutingError::UnknownSession` if the id was never issued, was closed,
    /// or its receiver is gone.
    pub fn route(&self, id: &str, message: String) -> Result<(), RoutingError> {
        let mut sessions = self.lock();
        let entry = sessions
            .get(id)
            .ok_or_else(|| RoutingError::UnknownSession(id.to_string()))?;

        if entry.sender.send(message).is_err() {
            sessions.remove(id);
            tracing::debug!(session = %id, "Dropped session with closed receiver");
            return Err(RoutingError::UnknownSession(id.to_string()));
        }
        Ok(())
    }

    /// Close one session. Returns whether it was open.
    pub fn close(&self, id: &str) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "Session closed");
        }
        removed
    }

    /// Close every session, ending their streams. Returns how many were open.
    pub fn close_all(&self) -> usize {
        let drained: Vec<String> = self.lock().drain().map(|(id, _)| id).collect();
        for id in &drained {
            tracing::info!(session = %id, "Session closed");
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Open sessions, oldest first.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self
            .lock()
            .iter()
            .map(|(id, entry)| SessionInfo {
                id: id.clone(),
                opened_at: entry.opened_at,
            })
            .collect();
        sessions.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        sessions
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Keeps a session open for as long as it lives.
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    registry: Weak<SessionRegistry>,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.close(&self.id);
        }
    }
}
