// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod session;
pub mod version;

// Re-export main types
pub use api::{with_encryption, ApiError, EncryptedClient, RequestOptions};
pub use crypto::{CryptoError, CryptoProvider, EncryptedEnvelope, RustCryptoProvider};
pub use session::{
    ClientSession, ClientSessionManager, HandshakeHandler, InMemorySessionStore, SessionError,
    SessionStore, TransportError,
};
