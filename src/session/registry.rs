// src/session/registry.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::session::engine::QuizSession;

/// (student_id, quiz_id)
pub type SessionKey = (i64, i64);

/// Handle to one live session. Cloned out of the registry and locked on its
/// own, so holding a session across a gateway write (pause, submit retries)
/// serializes only that (student, quiz) pair.
pub type SessionHandle = Arc<Mutex<QuizSession>>;

/// Live quiz sessions, one per (student, quiz) pair.
///
/// The outer lock guards only the map and is never held across an await into
/// the store; per-session work happens under the session's own lock. One
/// student's stalled write therefore cannot block another student's purely
/// in-memory operations. Concurrent attempts from two devices on the same
/// pair are not reconciled (last durable write wins).
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<SessionKey, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the session for the key, returning its handle.
    pub async fn insert(&self, key: SessionKey, session: QuizSession) -> SessionHandle {
        let handle = Arc::new(Mutex::new(session));
        self.inner.lock().await.insert(key, handle.clone());
        handle
    }

    /// Handle to the live session, if any. The map lock is released before
    /// the caller locks the session itself.
    pub async fn get(&self, key: SessionKey) -> Option<SessionHandle> {
        self.inner.lock().await.get(&key).cloned()
    }
}
