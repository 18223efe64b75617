//! The explicit session registry.
//!
//! Maps session ids to actor handles. The registry itself is dumb: it
//! spawns, looks up, and reaps. All game-level decisions (duplicate ids,
//! full sessions, re-attaches) belong to the actors, so a `create` for
//! an existing id just hands back the existing handle and lets the actor
//! rule on the attach.

use std::collections::HashMap;

use fourline_protocol::SessionId;
use tracing::{debug, info};

use crate::{SessionConfig, SessionHandle};

/// Owns the handle for every live session.
pub struct SessionRegistry {
    config: SessionConfig,
    sessions: HashMap<SessionId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    /// The handle for `session_id`, if one is registered.
    pub fn get(&self, session_id: &SessionId) -> Option<SessionHandle> {
        self.sessions.get(session_id).cloned()
    }

    /// The handle for `session_id`, spawning a fresh actor if none
    /// exists. Used on the create path: whether the caller may actually
    /// claim seat 1 is the actor's call.
    pub fn get_or_spawn(&mut self, session_id: &SessionId) -> SessionHandle {
        if let Some(handle) = self.sessions.get(session_id) {
            return handle.clone();
        }
        info!(%session_id, "spawning session");
        let handle = SessionHandle::spawn(session_id.clone(), self.config.clone());
        self.sessions.insert(session_id.clone(), handle.clone());
        handle
    }

    /// Shuts a session down and forgets it.
    pub async fn destroy(&mut self, session_id: &SessionId) {
        if let Some(handle) = self.sessions.remove(session_id) {
            info!(%session_id, "destroying session");
            let _ = handle.shutdown().await;
        }
    }

    /// Drops handles whose actor task has already stopped.
    pub fn reap_closed(&mut self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, handle| !handle.is_closed());
        let reaped = before - self.sessions.len();
        if reaped > 0 {
            debug!(reaped, "reaped closed sessions");
        }
        reaped
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of every registered session, for introspection.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }
}
