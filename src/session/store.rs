// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server Session Store
//!
//! Keyed storage of derived session keys and expiry. Records are immutable
//! once inserted and handed out as `Arc<ServerSession>`, so concurrent
//! lookups of the same session share the read lock and never copy keys.
//!
//! **Security**: sessions are held in memory only and never persisted.
//!
//! `SessionStore` is the pluggable seam; a horizontally-scaled deployment
//! substitutes a shared backend for `InMemorySessionStore`.

use super::{Clock, SessionError};
use crate::crypto::SessionKeys;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Key material and metadata for one established session
#[derive(Clone)]
pub struct ServerSession {
    pub session_id: String,
    /// Raw server public key issued in the handshake
    pub server_public_key: Vec<u8>,
    pub keys: SessionKeys,
    pub pbkdf2_salt: Vec<u8>,
    pub pbkdf2_iterations: u32,
    /// Unix epoch milliseconds
    pub created_at: i64,
    /// Unix epoch milliseconds
    pub expires_at: i64,
}

impl ServerSession {
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at
    }
}

impl fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSession")
            .field("session_id", &self.session_id)
            .field("pbkdf2_iterations", &self.pbkdf2_iterations)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Storage backend for server sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a newly established session
    async fn insert(&self, session: ServerSession) -> Result<Arc<ServerSession>, SessionError>;

    /// Look up a live session; unknown and expired ids are both `UnknownSession`
    async fn get(&self, session_id: &str) -> Result<Arc<ServerSession>, SessionError>;

    /// Remove a session, returning whether it existed
    async fn remove(&self, session_id: &str) -> bool;

    /// Remove every expired session, returning how many were dropped
    async fn purge_expired(&self) -> usize;

    /// Number of stored sessions, including expired ones not yet purged
    async fn count(&self) -> usize;
}

/// Process-local session store
#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<ServerSession>>>>,
    clock: Arc<dyn Clock>,
    max_sessions: usize,
}

impl InMemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
            max_sessions,
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: ServerSession) -> Result<Arc<ServerSession>, SessionError> {
        let now = self.clock.now_millis();
        let mut sessions = self.sessions.write().await;

        if sessions.len() >= self.max_sessions {
            let before = sessions.len();
            sessions.retain(|_, s| !s.is_expired_at(now));
            tracing::debug!(
                "Session store at capacity, evicted {} expired sessions",
                before - sessions.len()
            );
        }
        if sessions.len() >= self.max_sessions {
            tracing::warn!(
                "⚠️  Session store full ({} sessions), rejecting handshake",
                sessions.len()
            );
            return Err(SessionError::StoreFull {
                max: self.max_sessions,
            });
        }

        let session = Arc::new(session);
        sessions.insert(session.session_id.clone(), Arc::clone(&session));
        tracing::info!(
            "🔑 Session stored: {} (total sessions: {})",
            session.session_id,
            sessions.len()
        );
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Arc<ServerSession>, SessionError> {
        let now = self.clock.now_millis();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                None => return Err(SessionError::UnknownSession(session_id.to_string())),
                Some(session) if !session.is_expired_at(now) => return Ok(Arc::clone(session)),
                Some(_) => {}
            }
        }

        // expired: drop it under the write lock unless it was replaced meanwhile
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(session_id)
            .is_some_and(|s| s.is_expired_at(now))
        {
            sessions.remove(session_id);
            tracing::info!("⏰ Session expired and removed: {}", session_id);
        }
        Err(SessionError::UnknownSession(session_id.to_string()))
    }

    async fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(session_id).is_some();
        if removed {
            tracing::info!(
                "🗑️  Session removed: {} (remaining: {})",
                session_id,
                sessions.len()
            );
        }
        removed
    }

    async fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        before - sessions.len()
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Periodically purge expired sessions
///
/// Lookups reject expired sessions on their own; the sweep only bounds
/// memory held by sessions that are never used again.
pub fn spawn_cleanup_task(store: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                tracing::info!("🧹 Purged {} expired sessions", purged);
            }
        }
    })
}
