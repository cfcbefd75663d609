// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the envelope transport

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-envelope-transport-2026-10-14";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2026-10-14";

/// Wire protocol revision; bumped on any envelope or handshake format change
pub const PROTOCOL_VERSION: u32 = 1;

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "p256-ecdh",
    "pbkdf2-sha256",
    "aes-256-gcm",
    "hmac-sha256-envelope",
    "single-flight-handshake",
    "session-expiry",
    "session-close",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Envelope Transport {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "protocol": PROTOCOL_VERSION,
        "features": FEATURES,
    })
}
