// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Envelope seal/open: round-trip, tamper detection, nonce freshness,
// cross-session isolation

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use envelope_transport::crypto::{
    derive_session_keys, mac, open, seal, CryptoError, CryptoProvider, EncryptedEnvelope,
    RustCryptoProvider, SessionKeys,
};
use std::collections::HashSet;

fn session_keys(provider: &RustCryptoProvider) -> SessionKeys {
    let client = provider.generate_key_pair();
    let server = provider.generate_key_pair();
    derive_session_keys(provider, &client, server.public_key(), b"integration-salt", 1_000).unwrap()
}

fn flip_byte(field: &str, index: usize) -> String {
    let mut bytes = BASE64.decode(field).unwrap();
    bytes[index] ^= 0x80;
    BASE64.encode(bytes)
}

#[test]
fn test_round_trip_various_plaintexts() {
    let provider = RustCryptoProvider::new();
    let keys = session_keys(&provider);

    let long = "x".repeat(10_000);
    let plaintexts = [
        "",
        "a",
        "hello world",
        r#"{"nested":{"k":[1,2,3]}}"#,
        "ünïcødé ✓",
        long.as_str(),
    ];
    for plaintext in plaintexts {
        let envelope = seal(&provider, "abc123", &keys, plaintext).unwrap();
        assert_eq!(open(&provider, "abc123", &keys, &envelope).unwrap(), plaintext);
    }
}

#[test]
fn test_single_byte_tamper_is_always_rejected() {
    let provider = RustCryptoProvider::new();
    let keys = session_keys(&provider);
    let original = seal(&provider, "abc123", &keys, "transfer 100 to alice").unwrap();

    let ciphertext_len = BASE64.decode(&original.ciphertext).unwrap().len();
    for i in 0..ciphertext_len {
        let mut tampered = original.clone();
        tampered.ciphertext = flip_byte(&original.ciphertext, i);
        let err = open(&provider, "abc123", &keys, &tampered).unwrap_err();
        assert!(err.is_authentication_failure(), "ciphertext byte {}: {:?}", i, err);
    }

    for i in 0..16 {
        let mut tampered = original.clone();
        tampered.tag = flip_byte(&original.tag, i);
        assert_eq!(open(&provider, "abc123", &keys, &tampered), Err(CryptoError::Integrity));
    }

    for i in 0..32 {
        let mut tampered = original.clone();
        tampered.hmac = flip_byte(&original.hmac, i);
        assert_eq!(open(&provider, "abc123", &keys, &tampered), Err(CryptoError::Integrity));
    }

    for i in 0..12 {
        let mut tampered = original.clone();
        tampered.iv = flip_byte(&original.iv, i);
        assert_eq!(open(&provider, "abc123", &keys, &tampered), Err(CryptoError::Integrity));
    }
}

#[test]
fn test_valid_hmac_over_corrupted_ciphertext_fails_decryption() {
    let provider = RustCryptoProvider::new();
    let keys = session_keys(&provider);
    let mut envelope = seal(&provider, "abc123", &keys, "hello world").unwrap();

    // attacker who holds the MAC key but not the AEAD key
    envelope.ciphertext = flip_byte(&envelope.ciphertext, 0);
    let iv = BASE64.decode(&envelope.iv).unwrap();
    let ct = BASE64.decode(&envelope.ciphertext).unwrap();
    let tag = BASE64.decode(&envelope.tag).unwrap();
    let mut data = b"abc123".to_vec();
    data.extend_from_slice(&iv);
    data.extend_from_slice(&ct);
    data.extend_from_slice(&tag);
    envelope.hmac = BASE64.encode(mac::sign(&keys.hmac_key, &data).unwrap());

    assert!(matches!(
        open(&provider, "abc123", &keys, &envelope),
        Err(CryptoError::Decryption { .. })
    ));
}

#[test]
fn test_nonces_are_fresh() {
    let provider = RustCryptoProvider::new();
    let keys = session_keys(&provider);

    let ivs: HashSet<String> = (0..500)
        .map(|_| seal(&provider, "abc123", &keys, "same plaintext").unwrap().iv)
        .collect();
    assert_eq!(ivs.len(), 500);
}

#[test]
fn test_cross_session_isolation() {
    let provider = RustCryptoProvider::new();
    let keys_a = session_keys(&provider);
    let keys_b = session_keys(&provider);

    let envelope = seal(&provider, "session-a", &keys_a, "for A only").unwrap();

    // B's keys with A's id: HMAC mismatch
    assert_eq!(
        open(&provider, "session-a", &keys_b, &envelope),
        Err(CryptoError::Integrity)
    );

    // relabelled for B, ciphertext and tag untouched: still HMAC mismatch
    let relabelled = EncryptedEnvelope {
        session_id: "session-b".to_string(),
        ..envelope
    };
    assert_eq!(
        open(&provider, "session-b", &keys_b, &relabelled),
        Err(CryptoError::Integrity)
    );
}

#[test]
fn test_malformed_fields_are_invalid_envelope() {
    let provider = RustCryptoProvider::new();
    let keys = session_keys(&provider);
    let original = seal(&provider, "abc123", &keys, "hello").unwrap();

    let mut bad_base64 = original.clone();
    bad_base64.ciphertext = "***".to_string();
    assert!(matches!(
        open(&provider, "abc123", &keys, &bad_base64),
        Err(CryptoError::InvalidEnvelope { .. })
    ));

    let mut short_iv = original;
    short_iv.iv = BASE64.encode([0u8; 8]);
    assert!(matches!(
        open(&provider, "abc123", &keys, &short_iv),
        Err(CryptoError::InvalidEnvelope { .. })
    ));
}
