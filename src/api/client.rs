// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encrypted request wrapper
//!
//! `EncryptedClient::encrypted_fetch` makes a protected call look like an
//! ordinary JSON request: it obtains a session, seals the body, sends it,
//! opens the response envelope and parses the plaintext into `T`.
//!
//! ## Failure policy
//!
//! - Integrity or decryption failure on either side (the response fails to
//!   open, or the server answers 400 `invalid_envelope`): the session is reset
//!   and the error returned. The request is not retried.
//! - HTTP 401 `unknown_session`: the server never ran the handler, so the
//!   session is reset and the call retried exactly once after a new handshake.

use super::errors::{ErrorResponse, INVALID_ENVELOPE, UNKNOWN_SESSION};
use super::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::crypto::{open, seal, EncryptedEnvelope};
use crate::session::{ClientSession, ClientSessionManager, TransportError};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Path of the protected session-close route
pub const CLOSE_SESSION_PATH: &str = "/session/close";

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Encrypted as JSON `null` when absent
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::POST,
            body: None,
            headers: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn json<B: Serialize>(body: &B) -> Result<Self, TransportError> {
        Ok(Self {
            body: Some(serde_json::to_value(body)?),
            ..Default::default()
        })
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone)]
pub struct EncryptedClient {
    sessions: ClientSessionManager,
}

impl EncryptedClient {
    pub fn new(sessions: ClientSessionManager) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &ClientSessionManager {
        &self.sessions
    }

    /// Encrypted call to an absolute `url`
    pub async fn encrypted_fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T, TransportError> {
        let plaintext = match self.attempt(url, &options).await {
            Err(TransportError::UnknownSession(session_id)) => {
                info!(
                    "Server no longer holds session {}, re-handshaking once",
                    session_id
                );
                self.sessions.invalidate(&session_id);
                self.attempt(url, &options).await?
            }
            other => other?,
        };

        Ok(serde_json::from_str(&plaintext)?)
    }

    /// Encrypted call to a path on the configured server
    pub async fn fetch_path<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, TransportError> {
        let url = self
            .sessions
            .config()
            .resolve(path)
            .map_err(|e| TransportError::Network(e.to_string()))?;
        self.encrypted_fetch(url.as_str(), options).await
    }

    /// Ask the server to drop the cached session, then forget it locally
    ///
    /// Returns whether the server confirmed the close. Without a cached
    /// session nothing is sent.
    pub async fn close_session(&self) -> Result<bool, TransportError> {
        let Some(session) = self.sessions.cached_session() else {
            return Ok(false);
        };
        let url = self
            .sessions
            .config()
            .resolve(CLOSE_SESSION_PATH)
            .map_err(|e| TransportError::Network(e.to_string()));

        let result = match url {
            Ok(url) => {
                self.send_sealed(&session, url.as_str(), &RequestOptions::default())
                    .await
            }
            Err(e) => Err(e),
        };
        self.sessions.reset_session();

        let plaintext = result?;
        let reply: Value = serde_json::from_str(&plaintext)?;
        Ok(reply["closed"].as_bool().unwrap_or(false))
    }

    async fn attempt(&self, url: &str, options: &RequestOptions) -> Result<String, TransportError> {
        let session = self.sessions.get_session().await?;
        self.send_sealed(&session, url, options).await
    }

    async fn send_sealed(
        &self,
        session: &ClientSession,
        url: &str,
        options: &RequestOptions,
    ) -> Result<String, TransportError> {
        let crypto = self.sessions.crypto();
        let body = serde_json::to_string(options.body.as_ref().unwrap_or(&Value::Null))?;
        let envelope = seal(crypto.as_ref(), &session.session_id, &session.keys, &body)?;

        let mut request = HttpRequest::new(options.method.clone(), url)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&envelope)?);
        for (name, value) in &options.headers {
            request = request.with_header(name.clone(), value.clone());
        }

        debug!("Sending encrypted request to {}", url);
        let response = self.http().send(request).await?;
        if !response.is_success() {
            let err = error_from_response(&session.session_id, &response);
            if err.is_authentication_failure() {
                warn!(
                    "⚠️  Server rejected the envelope for {}, resetting session {}",
                    url, session.session_id
                );
                self.sessions.invalidate(&session.session_id);
            }
            return Err(err);
        }

        let envelope: EncryptedEnvelope = serde_json::from_str(&response.body)
            .map_err(|e| TransportError::InvalidEnvelope(format!("response body: {}", e)))?;

        open(crypto.as_ref(), &session.session_id, &session.keys, &envelope).map_err(|e| {
            let err = TransportError::from(e);
            if err.is_authentication_failure() {
                warn!(
                    "⚠️  Response from {} failed authentication, resetting session {}",
                    url, session.session_id
                );
                self.sessions.invalidate(&session.session_id);
            }
            err
        })
    }

    fn http(&self) -> &Arc<dyn HttpClient> {
        self.sessions.http()
    }
}

fn error_from_response(session_id: &str, response: &HttpResponse) -> TransportError {
    let parsed: Option<ErrorResponse> = serde_json::from_str(&response.body).ok();
    match parsed {
        Some(err) if response.status == 401 && err.error_type == UNKNOWN_SESSION => {
            TransportError::UnknownSession(session_id.to_string())
        }
        // the server could not verify our envelope
        Some(err) if response.status == 400 && err.error_type == INVALID_ENVELOPE => {
            TransportError::Integrity
        }
        Some(err) => TransportError::Http {
            status: response.status,
            message: err.message,
        },
        None => TransportError::Http {
            status: response.status,
            message: response.body.clone(),
        },
    }
}
