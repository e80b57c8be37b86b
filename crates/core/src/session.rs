//! Keyed storage of conversation histories.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::history::History;

/// A concurrency-safe store of histories keyed by session id.
///
/// Implementations must never block one session id on another.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the history of a session, which is empty if the session
    /// has never been saved.
    async fn load(&self, session_id: &str) -> History;

    /// Replaces the history of a session as a whole.
    async fn save(&self, session_id: &str, history: History);
}

type Slot = Arc<Mutex<History>>;

/// An in-process [`SessionStore`].
///
/// Every session id owns its own lock, and the map of sessions is only
/// locked for lookup and insertion, so sessions never wait for each other.
/// Saves to the same id are serialized and the last completed save wins.
///
/// # Note
///
/// The store doesn't make a whole turn atomic. Two concurrent turns on the
/// same session both load the same history, and the save that completes
/// last overwrites the other one. Callers that need turn-level atomicity
/// must serialize turns per session themselves.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Slot>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, session_id: &str) -> Option<Slot> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    fn slot_or_insert(&self, session_id: &str) -> Slot {
        if let Some(slot) = self.slot(session_id) {
            return slot;
        }
        let mut sessions =
            self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(session_id.to_owned()).or_insert_with(|| {
            trace!("creating session {session_id}");
            Default::default()
        }))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> History {
        match self.slot(session_id) {
            Some(slot) => slot.lock().await.clone(),
            None => History::new(),
        }
    }

    async fn save(&self, session_id: &str, history: History) {
        let slot = self.slot_or_insert(session_id);
        *slot.lock().await = history;
    }
}
