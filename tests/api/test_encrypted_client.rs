// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// EncryptedClient end to end through the in-process router

use crate::common::TestEnv;
use envelope_transport::{
    api::RequestOptions,
    crypto::{AeadKey, MacKey, SessionKeys},
    session::{ServerSession, SessionStore, TransportError},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Note {
    title: String,
    tags: Vec<String>,
}

#[tokio::test]
async fn test_encrypted_fetch_typed_round_trip() {
    let env = TestEnv::new();
    let note = Note {
        title: "hello world".to_string(),
        tags: vec!["a".to_string(), "b".to_string()],
    };

    let echoed: Note = env
        .client
        .encrypted_fetch(&env.url("/api/echo"), RequestOptions::json(&note).unwrap())
        .await
        .unwrap();
    assert_eq!(echoed, note);
    assert_eq!(env.http.handshake_count(), 1);
}

#[tokio::test]
async fn test_missing_body_is_encrypted_as_null() {
    let env = TestEnv::new();
    let echoed: Value = env
        .client
        .fetch_path("/api/echo", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(echoed, Value::Null);
}

#[tokio::test]
async fn test_session_is_reused_across_calls() {
    let env = TestEnv::new();
    for i in 0..5 {
        let echoed: Value = env
            .client
            .fetch_path("/api/echo", RequestOptions::json(&json!({ "i": i })).unwrap())
            .await
            .unwrap();
        assert_eq!(echoed["i"], i);
    }
    assert_eq!(env.http.handshake_count(), 1);
    assert_eq!(env.http.request_count(), 5);
}

#[tokio::test]
async fn test_unknown_session_retries_once_after_new_handshake() {
    let env = TestEnv::new();
    let first = env.client.sessions().get_session().await.unwrap();

    // server restarted or evicted the session
    assert!(env.state.store.remove(&first.session_id).await);

    let echoed: Value = env
        .client
        .fetch_path("/api/echo", RequestOptions::json(&json!("again")).unwrap())
        .await
        .unwrap();
    assert_eq!(echoed, json!("again"));
    assert_eq!(env.http.handshake_count(), 2);
    assert_eq!(env.http.request_count(), 2);
    assert_ne!(
        env.client.sessions().cached_session().unwrap().session_id,
        first.session_id
    );
}

#[tokio::test]
async fn test_tampered_response_fails_and_resets_session() {
    let env = TestEnv::new();
    env.http.set_tamper_responses(true);

    let result: Result<Value, _> = env
        .client
        .fetch_path("/api/echo", RequestOptions::default())
        .await;
    assert!(matches!(
        result,
        Err(TransportError::Integrity) | Err(TransportError::Decryption)
    ));
    assert!(env.client.sessions().cached_session().is_none());
    // not retried
    assert_eq!(env.http.request_count(), 1);

    env.http.set_tamper_responses(false);
    let echoed: Value = env
        .client
        .fetch_path("/api/echo", RequestOptions::json(&json!(1)).unwrap())
        .await
        .unwrap();
    assert_eq!(echoed, json!(1));
    assert_eq!(env.http.handshake_count(), 2);
}

#[tokio::test]
async fn test_desynchronized_keys_reset_session_without_retry() {
    let env = TestEnv::new();
    let first = env.client.sessions().get_session().await.unwrap();

    // same id on the server, different keys
    let stored = env.state.store.get(&first.session_id).await.unwrap();
    env.state
        .store
        .insert(ServerSession {
            session_id: stored.session_id.clone(),
            server_public_key: stored.server_public_key.clone(),
            keys: SessionKeys {
                aes_key: AeadKey::from_slice(&[7u8; 32]).unwrap(),
                hmac_key: MacKey::from_slice(&[9u8; 32]).unwrap(),
            },
            pbkdf2_salt: stored.pbkdf2_salt.clone(),
            pbkdf2_iterations: stored.pbkdf2_iterations,
            created_at: stored.created_at,
            expires_at: stored.expires_at,
        })
        .await
        .unwrap();

    let result: Result<Value, _> = env
        .client
        .fetch_path("/api/echo", RequestOptions::default())
        .await;
    assert_eq!(result, Err(TransportError::Integrity));
    assert!(env.client.sessions().cached_session().is_none());
    assert_eq!(env.http.request_count(), 1);
    assert_eq!(env.http.handshake_count(), 1);

    let echoed: Value = env
        .client
        .fetch_path("/api/echo", RequestOptions::json(&json!("again")).unwrap())
        .await
        .unwrap();
    assert_eq!(echoed, json!("again"));
    assert_eq!(env.http.handshake_count(), 2);
    assert_ne!(
        env.client.sessions().cached_session().unwrap().session_id,
        first.session_id
    );
}

#[tokio::test]
async fn test_expired_session_re_handshakes_before_request() {
    let env = TestEnv::new();
    let first = env.client.sessions().get_session().await.unwrap();

    env.clock.set(first.expires_at + 1);
    let _: Value = env
        .client
        .fetch_path("/api/echo", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(env.http.handshake_count(), 2);
    // the expired session was never sent
    assert_eq!(env.http.request_count(), 1);
}

#[tokio::test]
async fn test_close_session_removes_server_state() {
    let env = TestEnv::new();
    let _: Value = env
        .client
        .fetch_path("/api/echo", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(env.state.store.count().await, 1);

    assert!(env.client.close_session().await.unwrap());
    assert_eq!(env.state.store.count().await, 0);
    assert!(env.client.sessions().cached_session().is_none());

    // nothing cached, nothing sent
    assert!(!env.client.close_session().await.unwrap());
}

#[tokio::test]
async fn test_handler_errors_surface_as_http_errors() {
    let env = TestEnv::new();
    let result: Result<Value, _> = env
        .client
        .fetch_path("/does/not/exist", RequestOptions::default())
        .await;
    assert!(matches!(result, Err(TransportError::Http { status: 404, .. })));
}
