// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Envelope Encryption Module
//!
//! Cryptographic primitives for the encrypted transport session layer:
//!
//! - **ECDH**: Ephemeral-ephemeral key agreement on P-256
//! - **KDF**: PBKDF2-HMAC-SHA256 stretch to 512 bits, split into two keys
//! - **AEAD**: AES-256-GCM with a detached 16-byte tag
//! - **MAC**: HMAC-SHA256 over `sessionId || iv || ciphertext || tag`
//! - **Envelope**: the JSON wire container tying the above together
//!
//! ## Security Considerations
//!
//! - Key material lives in memory only and is zeroized on drop
//! - Nonces are drawn from the OS RNG for every encryption
//! - HMAC is verified in constant time before AEAD decryption is attempted
//! - Errors never carry key bytes, salts or plaintext
//!
//! ## Protocol Flow
//!
//! 1. Client generates an ephemeral key pair and posts its raw public key
//! 2. Server generates its own pair, a random salt, and picks an iteration count
//! 3. Both sides compute ECDH and run PBKDF2 over the shared x-coordinate
//! 4. Bits 0..256 become the AES key, bits 256..512 the HMAC key
//! 5. Every protected body travels as an `EncryptedEnvelope`

pub mod aes_gcm;
pub mod ecdh;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod mac;
pub mod provider;

pub use envelope::{open, seal, EncryptedEnvelope};
pub use error::CryptoError;
pub use kdf::derive_session_keys;
pub use keys::{
    AeadKey, EcdhKeyPair, MacKey, SessionKeys, RAW_PUBLIC_KEY_LEN, SYMMETRIC_KEY_LEN,
};
pub use provider::{CryptoProvider, RustCryptoProvider};
