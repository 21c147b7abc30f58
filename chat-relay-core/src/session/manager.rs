//! Process-wide store of conversation sessions

use super::store::{Session, Turn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared handle to a single session.
///
/// Holding the lock for the duration of an exchange serializes all
/// exchanges on that session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Owns the mapping from session key to conversation history.
///
/// The store keeps everything in memory and never evicts: every distinct
/// key seen stays resident until the process exits.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a session
    pub fn get_or_create(&self, key: &str) -> SessionHandle {
        if let Some(handle) = self.get(key) {
            return handle;
        }

        let mut sessions = self.sessions.write();
        sessions
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(session_id = key, "Creating session");
                Arc::new(Mutex::new(Session::new(key)))
            })
            .clone()
    }

    /// Get a session if it exists
    pub fn get(&self, key: &str) -> Option<SessionHandle> {
        self.sessions.read().get(key).cloned()
    }

    /// Snapshot of a session's history. Unknown sessions yield an empty
    /// history and are not created.
    pub async fn history(&self, key: &str) -> Vec<Turn> {
        match self.get(key) {
            Some(handle) => handle.lock().await.history().to_vec(),
            None => Vec::new(),
        }
    }

    /// Append turns to a session, creating it first if needed
    pub async fn append<I>(&self, key: &str, turns: I)
    where
        I: IntoIterator<Item = Turn>,
    {
        let handle = self.get_or_create(key);
        handle.lock().await.append(turns);
    }

    /// Reset a session's history to empty.
    ///
    /// Returns whether the session existed. Unknown keys are left alone.
    pub async fn clear(&self, key: &str) -> bool {
        match self.get(key) {
            Some(handle) => {
                handle.lock().await.clear();
                debug!(session_id = key, "Cleared session");
                true
            }
            None => false,
        }
    }

    /// Forget a session entirely. Returns whether it existed.
    ///
    /// An exchange already holding the session's handle finishes against the
    /// detached session; the next request for the key starts empty.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.sessions.write().remove(key).is_some();
        if removed {
            debug!(session_id = key, "Removed session");
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sessions.read().contains_key(key)
    }

    /// Number of known sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Keys of all known sessions, sorted
    pub fn session_ids(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}
