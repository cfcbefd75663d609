// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session Key Derivation
//!
//! Stretches the raw ECDH shared secret with PBKDF2-HMAC-SHA256 into 512
//! bits, then splits them into two independent 256-bit keys:
//!
//! ```text
//! bits[0..32]  -> AES-256-GCM key
//! bits[32..64] -> HMAC-SHA256 key
//! ```
//!
//! Salt and iteration count are chosen by the server per handshake and sent
//! to the client in the clear; the shared secret never leaves either side.

use super::{CryptoError, CryptoProvider, EcdhKeyPair, SessionKeys, SYMMETRIC_KEY_LEN};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Number of bits derived per handshake
pub const DERIVED_BITS: usize = 512;

/// Iteration count the server issues unless configured otherwise
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt length the server issues unless configured otherwise
pub const DEFAULT_SALT_LEN: usize = 16;

/// PBKDF2-HMAC-SHA256 over the shared secret, 64 bytes out
pub fn pbkdf2_stretch(
    secret: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<[u8; DERIVED_BITS / 8]>, CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::KeyDerivation {
            operation: "pbkdf2".to_string(),
            reason: "iteration count must be positive".to_string(),
        });
    }
    if salt.is_empty() {
        return Err(CryptoError::KeyDerivation {
            operation: "pbkdf2".to_string(),
            reason: "salt must not be empty".to_string(),
        });
    }

    let mut out = Zeroizing::new([0u8; DERIVED_BITS / 8]);
    pbkdf2_hmac::<Sha256>(secret, salt, iterations, &mut out[..]);
    Ok(out)
}

/// Full client/server derivation: ECDH, PBKDF2, split, import
///
/// Both parties call this with their own key pair and the other side's
/// public key; given the same salt and iteration count they arrive at
/// bit-identical `SessionKeys`.
pub fn derive_session_keys(
    provider: &dyn CryptoProvider,
    key_pair: &EcdhKeyPair,
    peer_public_key: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<SessionKeys, CryptoError> {
    let shared = provider.derive_shared_secret(key_pair, peer_public_key)?;
    let bits = provider.derive_bits(&shared[..], salt, iterations)?;

    let (aes_bytes, hmac_bytes) = bits.split_at(SYMMETRIC_KEY_LEN);
    Ok(SessionKeys {
        aes_key: provider.import_aead_key(aes_bytes)?,
        hmac_key: provider.import_mac_key(hmac_bytes)?,
    })
}
