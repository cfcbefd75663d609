// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key Handles
//!
//! Opaque wrappers around symmetric and ephemeral key material. Every handle
//! zeroizes its bytes on drop and prints as a redacted placeholder, so a key
//! can be passed through `tracing` fields or error contexts without leaking.

use super::CryptoError;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of every symmetric key in bytes (256 bits)
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Size of a raw uncompressed P-256 public key (0x04 || X || Y)
pub const RAW_PUBLIC_KEY_LEN: usize = 65;

/// AES-256-GCM encryption key
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct AeadKey([u8; SYMMETRIC_KEY_LEN]);

/// HMAC-SHA256 authentication key
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct MacKey([u8; SYMMETRIC_KEY_LEN]);

impl AeadKey {
    /// Import an AEAD key from exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; SYMMETRIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::invalid_key(
                "aead_key",
                format!("expected {} bytes, got {}", SYMMETRIC_KEY_LEN, bytes.len()),
            )
        })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }
}

impl MacKey {
    /// Import a MAC key from exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; SYMMETRIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::invalid_key(
                "mac_key",
                format!("expected {} bytes, got {}", SYMMETRIC_KEY_LEN, bytes.len()),
            )
        })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AeadKey(<redacted>)")
    }
}

impl fmt::Debug for MacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MacKey(<redacted>)")
    }
}

/// The two independent keys a session is built from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionKeys {
    pub aes_key: AeadKey,
    pub hmac_key: MacKey,
}

/// Ephemeral ECDH key pair
///
/// The private scalar lives only as long as this value. Agreement consumes
/// the pair, so a key pair is used for exactly one handshake.
pub struct EcdhKeyPair {
    secret: Zeroizing<[u8; 32]>,
    public_key: Vec<u8>,
}

impl EcdhKeyPair {
    /// Build from a private scalar and its raw public point
    pub fn from_parts(secret: [u8; 32], public_key: Vec<u8>) -> Self {
        Self {
            secret: Zeroizing::new(secret),
            public_key,
        }
    }

    /// Raw (uncompressed SEC1) public key, safe to send over the wire
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub(crate) fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }
}

impl fmt::Debug for EcdhKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdhKeyPair")
            .field("public_key", &hex::encode(&self.public_key))
            .field("secret", &"<redacted>")
            .finish()
    }
}
