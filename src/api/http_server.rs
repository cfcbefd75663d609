// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{
    errors::{ApiError, ApiErrorResponse},
    middleware::{with_encryption, EncryptionLayer, ProtectedRequest},
};
use crate::config::TransportConfig;
use crate::crypto::{CryptoProvider, RustCryptoProvider};
use crate::session::{
    spawn_cleanup_task, Clock, HandshakeHandler, HandshakeRequest, HandshakeSettings,
    InMemorySessionStore, SessionStore, SystemClock,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub crypto: Arc<dyn CryptoProvider>,
    pub handshake: HandshakeHandler,
    pub config: Arc<TransportConfig>,
}

impl AppState {
    /// Production wiring: in-memory store, RustCrypto provider, wall clock
    pub fn new(config: TransportConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::new(Arc::clone(&clock), config.max_sessions));
        Self::from_parts(config, store, Arc::new(RustCryptoProvider::new()), clock)
    }

    pub fn from_parts(
        config: TransportConfig,
        store: Arc<dyn SessionStore>,
        crypto: Arc<dyn CryptoProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let handshake = HandshakeHandler::new(
            Arc::clone(&crypto),
            Arc::clone(&store),
            clock,
            HandshakeSettings::from(&config),
        );
        Self {
            store,
            crypto,
            handshake,
            config: Arc::new(config),
        }
    }

    pub fn encryption_layer(&self) -> EncryptionLayer {
        EncryptionLayer::new(Arc::clone(&self.store), Arc::clone(&self.crypto))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Build and protocol details from `version::get_version_info`
    pub version: Value,
    pub active_sessions: usize,
}

/// Router with the handshake, health and protected routes
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Plaintext key exchange
        .route("/handshake", post(handshake_handler))
        .route("/health", get(health_handler))
        // Protected routes
        .route("/session/close", with_encryption(close_session_handler))
        .route("/api/echo", with_encryption(echo_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(config: TransportConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let state = AppState::new(config);

    let cleanup = state
        .config
        .cleanup_interval()
        .map(|interval| spawn_cleanup_task(Arc::clone(&state.store), interval));

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("🔐 Envelope transport listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cleanup {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn handshake_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request: HandshakeRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return ApiErrorResponse(ApiError::InvalidRequest(format!(
                "Invalid handshake request: {}",
                e
            )))
            .into_response()
        }
    };

    match state.handshake.handle(request).await {
        Ok(response) => {
            let mut response = Json(response).into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate"),
            );
            headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
            response
        }
        Err(e) => ApiErrorResponse(ApiError::from(e)).into_response(),
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::version::get_version_info(),
        active_sessions: state.store.count().await,
    })
}

async fn echo_handler(_state: AppState, request: ProtectedRequest) -> Result<Value, ApiError> {
    Ok(request.payload)
}

/// The response is sealed with the already-loaded session after removal
async fn close_session_handler(
    state: AppState,
    request: ProtectedRequest,
) -> Result<Value, ApiError> {
    let closed = state.store.remove(request.session_id()).await;
    Ok(serde_json::json!({ "closed": closed }))
}
