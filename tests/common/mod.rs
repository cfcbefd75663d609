// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fixtures: an in-process server reached through `HttpClient`
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use envelope_transport::{
    api::{create_app, AppState, EncryptedClient, HttpClient, HttpRequest, HttpResponse},
    config::{ClientConfig, TransportConfig},
    crypto::{EncryptedEnvelope, RustCryptoProvider},
    session::{ClientSessionManager, InMemorySessionStore, ManualClock, TransportError},
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Low enough to keep PBKDF2 fast in tests
pub const TEST_ITERATIONS: u32 = 1_000;

pub const TEST_BASE_URL: &str = "http://transport.test";

/// Routes requests into an axum `Router` without a socket
pub struct RouterHttpClient {
    router: Router,
    handshake_delay: Duration,
    handshakes: AtomicUsize,
    requests: AtomicUsize,
    tamper_responses: AtomicBool,
}

impl RouterHttpClient {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            handshake_delay: Duration::ZERO,
            handshakes: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            tamper_responses: AtomicBool::new(false),
        }
    }

    /// Hold every handshake open so concurrent callers overlap
    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    pub fn handshake_count(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Flip one ciphertext byte in every protected response
    pub fn set_tamper_responses(&self, enabled: bool) {
        self.tamper_responses.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpClient for RouterHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = url::Url::parse(&request.url).map_err(|e| TransportError::Network(e.to_string()))?;
        let path = url.path().to_string();
        let is_handshake = path == "/handshake";

        if is_handshake {
            self.handshakes.fetch_add(1, Ordering::SeqCst);
            if !self.handshake_delay.is_zero() {
                tokio::time::sleep(self.handshake_delay).await;
            }
        } else {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }

        let mut builder = Request::builder().method(request.method.as_str()).uri(path);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let http_request = builder
            .body(Body::from(request.body.unwrap_or_default()))
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let response = self.router.clone().oneshot(http_request).await.unwrap();
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let mut body = String::from_utf8(bytes.to_vec()).unwrap();

        if !is_handshake && status == 200 && self.tamper_responses.load(Ordering::SeqCst) {
            body = tamper_ciphertext(&body);
        }

        Ok(HttpResponse { status, body })
    }
}

/// Flip the first ciphertext byte of a serialized envelope
pub fn tamper_ciphertext(body: &str) -> String {
    let mut envelope: EncryptedEnvelope = serde_json::from_str(body).unwrap();
    let mut ciphertext = BASE64.decode(&envelope.ciphertext).unwrap();
    ciphertext[0] ^= 0x01;
    envelope.ciphertext = BASE64.encode(ciphertext);
    serde_json::to_string(&envelope).unwrap()
}

pub fn test_transport_config() -> TransportConfig {
    TransportConfig {
        pbkdf2_iterations: TEST_ITERATIONS,
        min_pbkdf2_iterations: TEST_ITERATIONS,
        session_ttl_secs: 60,
        max_sessions: 100,
        ..Default::default()
    }
}

/// Server state, client and shared clock wired together
pub struct TestEnv {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub http: Arc<RouterHttpClient>,
    pub client: EncryptedClient,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(test_transport_config(), Duration::ZERO)
    }

    pub fn with_config(config: TransportConfig, handshake_delay: Duration) -> Self {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(InMemorySessionStore::new(clock.clone(), config.max_sessions));
        let state = AppState::from_parts(
            config,
            store,
            Arc::new(RustCryptoProvider::new()),
            clock.clone(),
        );

        let http = Arc::new(
            RouterHttpClient::new(create_app(state.clone())).with_handshake_delay(handshake_delay),
        );
        let client_config = ClientConfig::new(TEST_BASE_URL)
            .unwrap()
            .with_min_pbkdf2_iterations(TEST_ITERATIONS);
        let manager = ClientSessionManager::new(
            client_config,
            http.clone(),
            Arc::new(RustCryptoProvider::new()),
            clock.clone(),
        );

        Self {
            state,
            clock,
            http,
            client: EncryptedClient::new(manager),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", TEST_BASE_URL, path)
    }
}
