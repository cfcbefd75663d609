// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-256-GCM for Envelope Bodies
//!
//! Output layout matches Web Crypto's AES-GCM with a 128-bit tag:
//! ```text
//! [ciphertext (len = plaintext len) | tag (16 bytes)]
//! ```
//!
//! - Nonce: 12 bytes (96 bits), fresh per encryption, carried separately
//! - Tag: 16 bytes, split off by the envelope codec
//! - No Additional Authenticated Data (AAD); session binding is done by HMAC

use super::{AeadKey, CryptoError};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};

/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// Encrypt and return `ciphertext || tag`
///
/// **CRITICAL**: never call twice with the same key and nonce.
pub fn encrypt(
    key: &AeadKey,
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::invalid_key("aead_key", "rejected by AES-256-GCM"))?;

    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad: b"",
            },
        )
        .map_err(|_| CryptoError::Encryption {
            reason: "AES-GCM encryption failed".to_string(),
        })
}

/// Decrypt `ciphertext || tag` and verify the tag
///
/// # Errors
///
/// - `InvalidEnvelope` if the input is shorter than one tag
/// - `Decryption` if the tag does not verify (wrong key or tampered data)
pub fn decrypt(
    key: &AeadKey,
    nonce: &[u8; NONCE_LEN],
    ciphertext_and_tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext_and_tag.len() < TAG_LEN {
        return Err(CryptoError::invalid_envelope(
            "ciphertext",
            format!(
                "expected at least {} bytes for the tag, got {}",
                TAG_LEN,
                ciphertext_and_tag.len()
            ),
        ));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::invalid_key("aead_key", "rejected by AES-256-GCM"))?;

    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext_and_tag,
                aad: b"",
            },
        )
        .map_err(|_| CryptoError::Decryption {
            reason: "authentication tag mismatch (wrong key or corrupted data)".to_string(),
        })
}
