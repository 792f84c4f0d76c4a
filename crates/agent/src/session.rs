//! In-process session store.
//!
//! Sessions are keyed by `(user_id, session_id)`. Each one sits behind its
//! own async mutex: a second turn on the same session waits for the first,
//! while turns on different sessions run concurrently.

use chrono::{DateTime, Utc};
use sentinel_core::message::{Conversation, ConversationId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionKey {
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub key: SessionKey,
    pub conversation: Conversation,
}

impl Session {
    pub(crate) fn new(key: SessionKey) -> Self {
        let conversation = Conversation::with_id(ConversationId::from(&key.session_id));
        Self { key, conversation }
    }

    pub fn id(&self) -> &str {
        &self.key.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.key.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.conversation.created_at
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Listing row for one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub session_id: String,
    /// `None` while a turn holds the session.
    pub turns: Option<usize>,
    pub busy: bool,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionKey, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session, or return the existing one unchanged.
    pub fn create(&self, user_id: &str, session_id: &str) -> SessionHandle {
        let key = SessionKey::new(user_id, session_id);
        if let Some(existing) = self.get(user_id, session_id) {
            return existing;
        }

        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(user_id, session_id, "Session created");
                Arc::new(Mutex::new(Session::new(key)))
            })
            .clone()
    }

    pub fn get(&self, user_id: &str, session_id: &str) -> Option<SessionHandle> {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.get(&SessionKey::new(user_id, session_id)).cloned()
    }

    pub fn remove(&self, user_id: &str, session_id: &str) -> bool {
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.remove(&SessionKey::new(user_id, session_id)).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All sessions, ordered by user then session id.
    pub fn list(&self) -> Vec<SessionInfo> {
        let handles: Vec<(SessionKey, SessionHandle)> = match self.sessions.read() {
            Ok(guard) => guard.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        let mut infos: Vec<SessionInfo> = handles
            .into_iter()
            .map(|(key, handle)| {
                let turns = handle.try_lock().ok().map(|s| s.conversation.turn_count());
                SessionInfo {
                    user_id: key.user_id,
                    session_id: key.session_id,
                    busy: turns.is_none(),
                    turns,
                }
            })
            .collect();
        infos.sort_by(|a, b| (&a.user_id, &a.session_id).cmp(&(&b.user_id, &b.session_id)));
        infos
    }
}
