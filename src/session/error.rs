// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Error Types
//!
//! - **TransportError**: everything the client side can surface to a caller
//!   of `get_session` or `encrypted_fetch`
//! - **SessionError**: server-side handshake and session store failures
//!
//! Both are `Clone` so a single handshake outcome can be handed to every
//! caller waiting on it.

use crate::crypto::CryptoError;
use thiserror::Error;

/// Client-side transport errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network failure or non-success response from the handshake endpoint
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// HMAC mismatch: tampering or session desynchronization
    #[error("Envelope integrity check failed")]
    Integrity,

    /// AEAD tag mismatch: wrong key or corrupted ciphertext
    #[error("Envelope decryption failed")]
    Decryption,

    /// Cached session passed its expiry; the manager re-handshakes on this
    #[error("Session expired")]
    SessionExpired,

    /// Server does not hold the referenced session
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// Envelope could not be decoded
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Protected endpoint answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Crypto(CryptoError),
}

impl TransportError {
    /// Failures after which the cached session must not be trusted again
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, TransportError::Integrity | TransportError::Decryption)
    }
}

impl From<CryptoError> for TransportError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Integrity => TransportError::Integrity,
            CryptoError::Decryption { .. } => TransportError::Decryption,
            CryptoError::InvalidEnvelope { field, reason } => {
                TransportError::InvalidEnvelope(format!("{}: {}", field, reason))
            }
            other => TransportError::Crypto(other),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

/// Server-side handshake and session store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid client public key: {0}")]
    InvalidPublicKey(String),

    /// Session id was never issued, has expired, or was closed
    #[error("Unknown or expired session: {0}")]
    UnknownSession(String),

    #[error("Session store is full ({max} sessions)")]
    StoreFull { max: usize },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Internal session error: {0}")]
    Internal(String),
}
