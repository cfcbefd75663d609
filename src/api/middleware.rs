// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decrypting middleware for protected routes
//!
//! `with_encryption(handler)` turns a plain JSON handler into a route whose
//! request and response bodies are `EncryptedEnvelope`s:
//!
//! 1. Parse the body as an envelope (400 if it is not one)
//! 2. Look up the session it names (401 `unknown_session` if unknown or expired)
//! 3. Verify the HMAC, then decrypt (400 `invalid_envelope` on either failure)
//! 4. Parse the plaintext as JSON and run the handler
//! 5. Seal the handler's JSON result under the same session with a fresh nonce
//!
//! Errors returned by the handler itself go back as plaintext `ErrorResponse`
//! JSON with their status code.

use super::errors::{ApiError, ApiErrorResponse};
use super::http_server::AppState;
use crate::crypto::{open, seal, CryptoProvider, EncryptedEnvelope};
use crate::session::{ServerSession, SessionStore};
use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::{post, MethodRouter},
    Json,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decrypted request handed to a protected handler
#[derive(Debug, Clone)]
pub struct ProtectedRequest {
    pub session: Arc<ServerSession>,
    pub payload: Value,
}

impl ProtectedRequest {
    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }
}

/// Envelope unwrap/wrap around a single handler invocation
#[derive(Clone)]
pub struct EncryptionLayer {
    store: Arc<dyn SessionStore>,
    crypto: Arc<dyn CryptoProvider>,
}

impl EncryptionLayer {
    pub fn new(store: Arc<dyn SessionStore>, crypto: Arc<dyn CryptoProvider>) -> Self {
        Self { store, crypto }
    }

    /// Decrypt `body`, run `handler` on the plaintext JSON, encrypt its result
    pub async fn process<F, Fut>(&self, body: &[u8], handler: F) -> Response
    where
        F: FnOnce(ProtectedRequest) -> Fut,
        Fut: Future<Output = Result<Value, ApiError>>,
    {
        let request = match self.unwrap(body).await {
            Ok(request) => request,
            Err(e) => return ApiErrorResponse(e).into_response(),
        };
        let session = Arc::clone(&request.session);

        let result = match handler(request).await {
            Ok(result) => result,
            Err(e) => {
                debug!("Protected handler for {} failed: {}", session.session_id, e);
                return ApiErrorResponse(e).into_response();
            }
        };

        match self.wrap(&session, &result) {
            Ok(envelope) => Json(envelope).into_response(),
            Err(e) => ApiErrorResponse(e).into_response(),
        }
    }

    async fn unwrap(&self, body: &[u8]) -> Result<ProtectedRequest, ApiError> {
        let envelope: EncryptedEnvelope = serde_json::from_slice(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Expected encrypted envelope: {}", e)))?;

        let session = self.store.get(&envelope.session_id).await.map_err(|e| {
            debug!("Rejecting envelope: {}", e);
            ApiError::from(e)
        })?;

        let plaintext = open(self.crypto.as_ref(), &session.session_id, &session.keys, &envelope)
            .map_err(|e| {
                if e.is_authentication_failure() {
                    warn!(
                        "⚠️  Envelope authentication failed for session {}: {}",
                        session.session_id, e
                    );
                }
                ApiError::from(e)
            })?;

        let payload: Value = serde_json::from_str(&plaintext).map_err(|e| {
            ApiError::InvalidRequest(format!("Decrypted body is not JSON: {}", e))
        })?;

        debug!("Decrypted request for session {}", session.session_id);
        Ok(ProtectedRequest { session, payload })
    }

    fn wrap(&self, session: &ServerSession, result: &Value) -> Result<EncryptedEnvelope, ApiError> {
        let json = serde_json::to_string(result)
            .map_err(|e| ApiError::InternalError(format!("Failed to serialize response: {}", e)))?;
        seal(self.crypto.as_ref(), &session.session_id, &session.keys, &json)
            .map_err(|e| ApiError::InternalError(format!("Failed to encrypt response: {}", e)))
    }
}

/// POST route whose bodies are encrypted envelopes
///
/// The handler receives the app state and the decrypted request and returns
/// the JSON value to encrypt.
pub fn with_encryption<F, Fut>(handler: F) -> MethodRouter<AppState>
where
    F: Fn(AppState, ProtectedRequest) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
{
    post(move |State(state): State<AppState>, body: Bytes| async move {
        let layer = state.encryption_layer();
        layer
            .process(&body, move |request| handler(state, request))
            .await
    })
}
