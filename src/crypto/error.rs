// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error variants for every primitive the envelope layer relies on.
//!
//! ## Error Variants
//!
//! - **InvalidKey**: a key or EC point could not be parsed or imported
//! - **KeyDerivation**: ECDH agreement or PBKDF2 stretching failed
//! - **Integrity**: HMAC over the envelope did not verify
//! - **Decryption**: AES-GCM tag mismatch or undecodable plaintext
//! - **InvalidEnvelope**: a wire field is missing, not base64, or the wrong size
//! - **Encryption**: AES-GCM refused to encrypt
//!
//! Messages carry the operation and a reason only. Key bytes, salts and
//! plaintexts are never formatted into an error.

use thiserror::Error;

/// Error type for all cryptographic operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material could not be parsed or imported
    #[error("Invalid key ({key_type}): {reason}")]
    InvalidKey {
        /// Which key failed (e.g. "client_public_key", "aead_key")
        key_type: String,
        reason: String,
    },

    /// ECDH or PBKDF2 failed
    #[error("Key derivation failed during {operation}: {reason}")]
    KeyDerivation { operation: String, reason: String },

    /// HMAC verification failed (tampering or session desynchronization)
    #[error("Envelope integrity check failed")]
    Integrity,

    /// AEAD tag mismatch (wrong key or corrupted ciphertext)
    #[error("Decryption failed: {reason}")]
    Decryption { reason: String },

    /// AEAD encryption failed
    #[error("Encryption failed: {reason}")]
    Encryption { reason: String },

    /// Envelope wire field validation failed
    #[error("Invalid envelope field '{field}': {reason}")]
    InvalidEnvelope { field: String, reason: String },
}

impl CryptoError {
    pub(crate) fn invalid_key(key_type: &str, reason: impl Into<String>) -> Self {
        CryptoError::InvalidKey {
            key_type: key_type.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_envelope(field: &str, reason: impl Into<String>) -> Self {
        CryptoError::InvalidEnvelope {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures that mean the envelope cannot be trusted
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, CryptoError::Integrity | CryptoError::Decryption { .. })
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(err: base64::DecodeError) -> Self {
        CryptoError::InvalidEnvelope {
            field: "base64_field".to_string(),
            reason: format!("base64 decode error: {}", err),
        }
    }
}

impl From<p256::elliptic_curve::Error> for CryptoError {
    fn from(_: p256::elliptic_curve::Error) -> Self {
        CryptoError::InvalidKey {
            key_type: "peer_public_key".to_string(),
            reason: "not a valid P-256 point".to_string(),
        }
    }
}
