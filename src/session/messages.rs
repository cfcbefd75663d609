// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plaintext handshake messages for `POST /handshake`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    /// Base64 raw (65-byte uncompressed) P-256 public key
    pub client_public_key: String,
}

/// Public session metadata; never contains derived key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    pub session_id: String,
    #[serde(rename = "serverPublicKeyB64")]
    pub server_public_key_b64: String,
    /// Base64 salt
    pub pbkdf2_salt: String,
    pub pbkdf2_iterations: u32,
    /// Unix epoch milliseconds
    pub expires_at: i64,
}
