// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Client Session Manager
//!
//! Owns the client side of a transport session: at most one cached
//! `ClientSession`, lazily re-established when it expires or is reset.
//!
//! ## Concurrency
//!
//! The cache check and the single-flight join happen under one lock, and
//! `SingleFlight::run` registers the pending handshake before anything is
//! awaited. However many tasks call `get_session` at once, exactly one
//! handshake request goes out and every caller receives its outcome.
//!
//! Each reset bumps a generation counter. A handshake started before a reset
//! still resolves for the callers already waiting on it, but its session is
//! not installed in the cache.

use super::{single_flight::SingleFlight, Clock, HandshakeRequest, HandshakeResponse, TransportError};
use crate::api::http_client::{HttpClient, HttpRequest};
use crate::config::ClientConfig;
use crate::crypto::{derive_session_keys, CryptoProvider, SessionKeys};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Established client session, shared read-only by every request
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub session_id: String,
    pub keys: SessionKeys,
    /// Unix epoch milliseconds
    pub expires_at: i64,
}

impl ClientSession {
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        now_millis < self.expires_at
    }

    pub fn ensure_fresh(&self, now_millis: i64) -> Result<(), TransportError> {
        if self.is_valid_at(now_millis) {
            Ok(())
        } else {
            Err(TransportError::SessionExpired)
        }
    }
}

#[derive(Default)]
struct CacheState {
    cached: Option<Arc<ClientSession>>,
    generation: u64,
}

struct Inner {
    config: ClientConfig,
    http: Arc<dyn HttpClient>,
    crypto: Arc<dyn CryptoProvider>,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
    flight: SingleFlight<(), Arc<ClientSession>, TransportError>,
}

/// Cheap to clone; clones share one cache
#[derive(Clone)]
pub struct ClientSessionManager {
    inner: Arc<Inner>,
}

impl ClientSessionManager {
    pub fn new(
        config: ClientConfig,
        http: Arc<dyn HttpClient>,
        crypto: Arc<dyn CryptoProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                http,
                crypto,
                clock,
                state: Mutex::new(CacheState::default()),
                flight: SingleFlight::new(),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn crypto(&self) -> &Arc<dyn CryptoProvider> {
        &self.inner.crypto
    }

    pub fn http(&self) -> &Arc<dyn HttpClient> {
        &self.inner.http
    }

    pub fn now_millis(&self) -> i64 {
        self.inner.clock.now_millis()
    }

    /// Cached session if still valid, otherwise the outcome of one handshake
    pub async fn get_session(&self) -> Result<Arc<ClientSession>, TransportError> {
        let pending = {
            let state = self.inner.state.lock();
            if let Some(session) = &state.cached {
                if session.is_valid_at(self.inner.clock.now_millis()) {
                    return Ok(Arc::clone(session));
                }
                debug!("Client session {} expired, re-handshaking", session.session_id);
            }

            let generation = state.generation;
            let inner = Arc::clone(&self.inner);
            self.inner.flight.run((), move || async move {
                let session = Arc::new(inner.handshake().await?);
                let mut state = inner.state.lock();
                if state.generation == generation {
                    state.cached = Some(Arc::clone(&session));
                } else {
                    debug!(
                        "Discarding session {} from a handshake started before reset",
                        session.session_id
                    );
                }
                Ok(session)
            })
        };

        pending.await
    }

    /// Run a handshake without touching the cache
    pub async fn perform_handshake(&self) -> Result<ClientSession, TransportError> {
        self.inner.handshake().await
    }

    /// Forget the cached session and any pending handshake
    pub fn reset_session(&self) {
        let mut state = self.inner.state.lock();
        state.generation = state.generation.wrapping_add(1);
        if let Some(session) = state.cached.take() {
            info!("🔄 Client session {} reset", session.session_id);
        }
        self.inner.flight.forget(&());
    }

    /// Reset only if `session_id` is still the cached session
    ///
    /// A session another caller already replaced is left alone.
    pub fn invalidate(&self, session_id: &str) -> bool {
        let is_current = self
            .inner
            .state
            .lock()
            .cached
            .as_ref()
            .is_some_and(|s| s.session_id == session_id);
        if is_current {
            self.reset_session();
        }
        is_current
    }

    /// Currently cached session, valid or not
    pub fn cached_session(&self) -> Option<Arc<ClientSession>> {
        self.inner.state.lock().cached.clone()
    }

    pub fn is_handshake_in_flight(&self) -> bool {
        self.inner.flight.is_in_flight(&())
    }
}

impl Inner {
    async fn handshake(&self) -> Result<ClientSession, TransportError> {
        let key_pair = self.crypto.generate_key_pair();
        let request = HandshakeRequest {
            client_public_key: BASE64.encode(key_pair.public_key()),
        };

        let url = self
            .config
            .handshake_url()
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        let body = serde_json::to_string(&request)?;

        debug!("Sending handshake to {}", url);
        let response = self
            .http
            .send(HttpRequest::post_json(url.as_str(), body))
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        if !response.is_success() {
            warn!("⚠️  Handshake rejected with HTTP {}", response.status);
            return Err(TransportError::Handshake(format!(
                "server returned HTTP {}",
                response.status
            )));
        }

        let response: HandshakeResponse = serde_json::from_str(&response.body)
            .map_err(|e| TransportError::Handshake(format!("malformed handshake response: {}", e)))?;

        if response.pbkdf2_iterations < self.config.min_pbkdf2_iterations {
            return Err(TransportError::Handshake(format!(
                "server offered {} PBKDF2 iterations, minimum is {}",
                response.pbkdf2_iterations, self.config.min_pbkdf2_iterations
            )));
        }

        let salt = BASE64
            .decode(&response.pbkdf2_salt)
            .map_err(|e| TransportError::Handshake(format!("invalid salt encoding: {}", e)))?;
        if salt.is_empty() {
            return Err(TransportError::Handshake("server sent an empty salt".to_string()));
        }
        let server_public_key = BASE64
            .decode(&response.server_public_key_b64)
            .map_err(|e| TransportError::Handshake(format!("invalid server key encoding: {}", e)))?;

        let crypto = Arc::clone(&self.crypto);
        let iterations = response.pbkdf2_iterations;
        let keys = tokio::task::spawn_blocking(move || {
            derive_session_keys(
                crypto.as_ref(),
                &key_pair,
                &server_public_key,
                &salt,
                iterations,
            )
        })
        .await
        .map_err(|e| TransportError::Handshake(format!("key derivation task failed: {}", e)))?
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

        info!(
            "🤝 Client session {} established (expires at {})",
            response.session_id, response.expires_at
        );

        Ok(ClientSession {
            session_id: response.session_id,
            keys,
            expires_at: response.expires_at,
        })
    }
}
