// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Provider
//!
//! `CryptoProvider` is the single capability surface the session and
//! envelope layers call into. Client and server share one contract; an
//! alternate runtime (hardware module, FIPS library) plugs in by
//! implementing this trait.
//!
//! `RustCryptoProvider` is the default implementation on top of the
//! RustCrypto crates (`p256`, `pbkdf2`, `aes-gcm`, `hmac`).

use super::{aes_gcm, ecdh, kdf, mac, AeadKey, CryptoError, EcdhKeyPair, MacKey};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

/// Cryptographic operations required by the transport session layer
pub trait CryptoProvider: Send + Sync {
    /// Generate an ephemeral P-256 key pair
    fn generate_key_pair(&self) -> EcdhKeyPair;

    /// ECDH agreement, returning the 32-byte shared x-coordinate
    fn derive_shared_secret(
        &self,
        key_pair: &EcdhKeyPair,
        peer_public_key: &[u8],
    ) -> Result<Zeroizing<[u8; 32]>, CryptoError>;

    /// PBKDF2-HMAC-SHA256 stretch of `secret` to 512 bits
    fn derive_bits(
        &self,
        secret: &[u8],
        salt: &[u8],
        iterations: u32,
    ) -> Result<Zeroizing<[u8; 64]>, CryptoError>;

    fn import_aead_key(&self, bytes: &[u8]) -> Result<AeadKey, CryptoError>;

    fn import_mac_key(&self, bytes: &[u8]) -> Result<MacKey, CryptoError>;

    /// AES-256-GCM encrypt, output is `ciphertext || tag`
    fn aead_encrypt(
        &self,
        key: &AeadKey,
        nonce: &[u8; aes_gcm::NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// AES-256-GCM decrypt of `ciphertext || tag`
    fn aead_decrypt(
        &self,
        key: &AeadKey,
        nonce: &[u8; aes_gcm::NONCE_LEN],
        ciphertext_and_tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    fn hmac_sign(&self, key: &MacKey, data: &[u8]) -> Result<[u8; mac::HMAC_LEN], CryptoError>;

    /// Constant-time HMAC verification
    fn hmac_verify(&self, key: &MacKey, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let computed = self.hmac_sign(key, data)?;
        Ok(mac::constant_time_eq(&computed, signature))
    }

    /// Fill `buf` from a cryptographically secure source
    fn random_bytes(&self, buf: &mut [u8]);
}

/// Default provider backed by the RustCrypto crates and the OS RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl RustCryptoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for RustCryptoProvider {
    fn generate_key_pair(&self) -> EcdhKeyPair {
        ecdh::generate_key_pair()
    }

    fn derive_shared_secret(
        &self,
        key_pair: &EcdhKeyPair,
        peer_public_key: &[u8],
    ) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
        ecdh::shared_secret(key_pair, peer_public_key)
    }

    fn derive_bits(
        &self,
        secret: &[u8],
        salt: &[u8],
        iterations: u32,
    ) -> Result<Zeroizing<[u8; 64]>, CryptoError> {
        kdf::pbkdf2_stretch(secret, salt, iterations)
    }

    fn import_aead_key(&self, bytes: &[u8]) -> Result<AeadKey, CryptoError> {
        AeadKey::from_slice(bytes)
    }

    fn import_mac_key(&self, bytes: &[u8]) -> Result<MacKey, CryptoError> {
        MacKey::from_slice(bytes)
    }

    fn aead_encrypt(
        &self,
        key: &AeadKey,
        nonce: &[u8; aes_gcm::NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        aes_gcm::encrypt(key, nonce, plaintext)
    }

    fn aead_decrypt(
        &self,
        key: &AeadKey,
        nonce: &[u8; aes_gcm::NONCE_LEN],
        ciphertext_and_tag: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        aes_gcm::decrypt(key, nonce, ciphertext_and_tag)
    }

    fn hmac_sign(&self, key: &MacKey, data: &[u8]) -> Result<[u8; mac::HMAC_LEN], CryptoError> {
        mac::sign(key, data)
    }

    fn random_bytes(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}
