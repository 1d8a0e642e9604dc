//! Server-side session tracking.

use std::collections::HashMap;
use std::sync::RwLock;

use shelf_db::RecordId;
use uuid::Uuid;

/// Maps opaque session tokens to the authenticated user's record id.
///
/// Tokens are random v4 UUIDs; the cookie carries the token only, never the
/// user id.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, RecordId>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session for `user_id` and return its token.
    pub fn create(&self, user_id: RecordId) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions
            .write()
            .expect("session lock poisoned")
            .insert(token.clone(), user_id);
        tracing::debug!(%user_id, "session created");
        token
    }

    /// The user id behind a token, if the session is live.
    pub fn resolve(&self, token: &str) -> Option<RecordId> {
        self.sessions
            .read()
            .expect("session lock poisoned")
            .get(token)
            .copied()
    }

    /// End a session. Returns whether the token was live.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .write()
            .expect("session lock poisoned")
            .remove(token)
            .is_some()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.read().expect("session lock poisoned").len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
