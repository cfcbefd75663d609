// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Server session store: expiry, capacity and background sweep

use envelope_transport::crypto::{CryptoProvider, RustCryptoProvider, SessionKeys};
use envelope_transport::session::{
    spawn_cleanup_task, InMemorySessionStore, ManualClock, ServerSession, SessionError,
    SessionStore,
};
use std::sync::Arc;
use std::time::Duration;

fn session(id: &str, expires_at: i64) -> ServerSession {
    let provider = RustCryptoProvider::new();
    ServerSession {
        session_id: id.to_string(),
        server_public_key: provider.generate_key_pair().public_key().to_vec(),
        keys: SessionKeys {
            aes_key: provider.import_aead_key(&[1u8; 32]).unwrap(),
            hmac_key: provider.import_mac_key(&[2u8; 32]).unwrap(),
        },
        pbkdf2_salt: vec![9u8; 16],
        pbkdf2_iterations: 1_000,
        created_at: 0,
        expires_at,
    }
}

#[tokio::test]
async fn test_lookup_rejects_expired_without_sweep() {
    let clock = Arc::new(ManualClock::new(0));
    let store = InMemorySessionStore::new(clock.clone(), 10);
    store.insert(session("s1", 1_000)).await.unwrap();

    clock.set(999);
    assert!(store.get("s1").await.is_ok());
    clock.set(1_000);
    assert_eq!(
        store.get("s1").await.unwrap_err(),
        SessionError::UnknownSession("s1".to_string())
    );
}

#[tokio::test]
async fn test_full_store_rejects_until_sessions_expire() {
    let clock = Arc::new(ManualClock::new(0));
    let store = InMemorySessionStore::new(clock.clone(), 3);
    for i in 0..3 {
        store.insert(session(&format!("s{}", i), 100)).await.unwrap();
    }

    assert!(matches!(
        store.insert(session("overflow", 100)).await,
        Err(SessionError::StoreFull { max: 3 })
    ));

    clock.set(100);
    store.insert(session("after-expiry", 200)).await.unwrap();
    assert_eq!(store.count().await, 1);
}

#[tokio::test]
async fn test_cleanup_task_purges_expired_sessions() {
    let clock = Arc::new(ManualClock::new(0));
    let store = Arc::new(InMemorySessionStore::new(clock.clone(), 10));
    store.insert(session("old", 10)).await.unwrap();
    store.insert(session("current", 10_000)).await.unwrap();

    clock.set(50);
    let handle = spawn_cleanup_task(store.clone(), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(60)).await;
    handle.abort();

    assert_eq!(store.count().await, 1);
    assert!(store.get("current").await.is_ok());
}

#[tokio::test]
async fn test_debug_output_omits_key_material() {
    let record = session("debuggable", 1);
    let debug = format!("{:?}", record);
    assert!(debug.contains("debuggable"));
    assert!(!debug.contains("pbkdf2_salt"));
    assert!(!debug.contains("keys"));
}
