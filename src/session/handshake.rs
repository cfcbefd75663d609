// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server Handshake Handler
//!
//! Answers `POST /handshake`: validates the client's ephemeral public key,
//! generates the server's ephemeral pair, salt and session id, derives the
//! same `SessionKeys` the client will derive, and stores them.
//!
//! The server private scalar is dropped as soon as the keys are derived.
//! The response carries public metadata only.

use super::{
    store::{ServerSession, SessionStore},
    Clock, HandshakeRequest, HandshakeResponse, SessionError,
};
use crate::config::TransportConfig;
use crate::crypto::{derive_session_keys, CryptoError, CryptoProvider, RAW_PUBLIC_KEY_LEN};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Random bytes behind each hex session id
pub const SESSION_ID_BYTES: usize = 32;

/// Server-side knobs for new sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeSettings {
    pub session_ttl: Duration,
    pub pbkdf2_iterations: u32,
    pub salt_len: usize,
}

impl From<&TransportConfig> for HandshakeSettings {
    fn from(config: &TransportConfig) -> Self {
        Self {
            session_ttl: config.session_ttl(),
            pbkdf2_iterations: config.pbkdf2_iterations,
            salt_len: config.salt_len,
        }
    }
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

#[derive(Clone)]
pub struct HandshakeHandler {
    crypto: Arc<dyn CryptoProvider>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    settings: HandshakeSettings,
}

impl HandshakeHandler {
    pub fn new(
        crypto: Arc<dyn CryptoProvider>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        settings: HandshakeSettings,
    ) -> Self {
        Self {
            crypto,
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &HandshakeSettings {
        &self.settings
    }

    /// Establish a session for the client in `request`
    ///
    /// # Errors
    ///
    /// - `InvalidPublicKey` if the key is not base64 or not a P-256 point
    /// - `StoreFull` if no capacity remains after evicting expired sessions
    pub async fn handle(&self, request: HandshakeRequest) -> Result<HandshakeResponse, SessionError> {
        let client_public_key = BASE64
            .decode(request.client_public_key.trim())
            .map_err(|e| SessionError::InvalidPublicKey(format!("not base64: {}", e)))?;
        if client_public_key.len() != RAW_PUBLIC_KEY_LEN {
            return Err(SessionError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                RAW_PUBLIC_KEY_LEN,
                client_public_key.len()
            )));
        }

        let server_pair = self.crypto.generate_key_pair();
        let server_public_key = server_pair.public_key().to_vec();

        let mut salt = vec![0u8; self.settings.salt_len];
        self.crypto.random_bytes(&mut salt);

        let mut id_bytes = [0u8; SESSION_ID_BYTES];
        self.crypto.random_bytes(&mut id_bytes);
        let session_id = hex::encode(id_bytes);

        let iterations = self.settings.pbkdf2_iterations;
        debug!(
            "Deriving session keys for {} ({} PBKDF2 iterations)",
            session_id, iterations
        );

        // PBKDF2 at production iteration counts is CPU-bound
        let crypto = Arc::clone(&self.crypto);
        let derive_salt = salt.clone();
        let keys = tokio::task::spawn_blocking(move || {
            derive_session_keys(
                crypto.as_ref(),
                &server_pair,
                &client_public_key,
                &derive_salt,
                iterations,
            )
        })
        .await
        .map_err(|e| SessionError::Internal(format!("key derivation task failed: {}", e)))?
        .map_err(|e| match e {
            CryptoError::InvalidKey { reason, .. } => SessionError::InvalidPublicKey(reason),
            other => SessionError::Crypto(other),
        })
        .inspect_err(|e| warn!("⚠️  Handshake rejected: {}", e))?;

        let created_at = self.clock.now_millis();
        let ttl_millis = i64::try_from(self.settings.session_ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = created_at.saturating_add(ttl_millis);

        let session = self
            .store
            .insert(ServerSession {
                session_id: session_id.clone(),
                server_public_key: server_public_key.clone(),
                keys,
                pbkdf2_salt: salt.clone(),
                pbkdf2_iterations: iterations,
                created_at,
                expires_at,
            })
            .await?;

        info!(
            "🤝 Handshake complete: session {} expires at {}",
            session.session_id, session.expires_at
        );

        Ok(HandshakeResponse {
            session_id,
            server_public_key_b64: BASE64.encode(&server_public_key),
            pbkdf2_salt: BASE64.encode(&salt),
            pbkdf2_iterations: iterations,
            expires_at,
        })
    }
}
