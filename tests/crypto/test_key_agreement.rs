// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Both sides of the handshake derive bit-identical session keys

use envelope_transport::crypto::{
    derive_session_keys, kdf, open, seal, CryptoError, CryptoProvider, RustCryptoProvider,
};

#[test]
fn test_client_and_server_derive_same_keys() {
    let provider = RustCryptoProvider::new();
    let client = provider.generate_key_pair();
    let server = provider.generate_key_pair();
    let salt = [5u8; kdf::DEFAULT_SALT_LEN];

    let client_keys =
        derive_session_keys(&provider, &client, server.public_key(), &salt, 2_000).unwrap();
    let server_keys =
        derive_session_keys(&provider, &server, client.public_key(), &salt, 2_000).unwrap();

    assert_eq!(client_keys, server_keys);
}

/// Client encrypts "hello world" under session "abc123"; the server, given
/// the same client public key, salt and iteration count, decrypts it.
#[test]
fn test_hello_world_under_abc123() {
    let provider = RustCryptoProvider::new();
    let client = provider.generate_key_pair();
    let server = provider.generate_key_pair();
    let salt = b"0123456789abcdef";

    let client_keys =
        derive_session_keys(&provider, &client, server.public_key(), salt, 1_000).unwrap();
    let envelope = seal(&provider, "abc123", &client_keys, "hello world").unwrap();

    let server_keys =
        derive_session_keys(&provider, &server, client.public_key(), salt, 1_000).unwrap();
    assert_eq!(
        open(&provider, "abc123", &server_keys, &envelope).unwrap(),
        "hello world"
    );
}

#[test]
fn test_parameters_change_the_keys() {
    let provider = RustCryptoProvider::new();
    let client = provider.generate_key_pair();
    let server = provider.generate_key_pair();

    let base = derive_session_keys(&provider, &client, server.public_key(), b"salt-one", 1_000)
        .unwrap();
    let other_salt =
        derive_session_keys(&provider, &client, server.public_key(), b"salt-two", 1_000).unwrap();
    let other_iterations =
        derive_session_keys(&provider, &client, server.public_key(), b"salt-one", 1_001).unwrap();

    assert_ne!(base, other_salt);
    assert_ne!(base, other_iterations);
}

#[test]
fn test_peer_key_must_be_on_curve() {
    let provider = RustCryptoProvider::new();
    let client = provider.generate_key_pair();

    let mut bogus = [0u8; 65];
    bogus[0] = 0x04;
    let err = derive_session_keys(&provider, &client, &bogus, b"salt", 1_000).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidKey { .. }));

    let compressed = [0x02u8; 33];
    assert!(derive_session_keys(&provider, &client, &compressed, b"salt", 1_000).is_err());
}
