// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::api::client::{EncryptedClient, RequestOptions};
use crate::api::http_client::ReqwestHttpClient;
use crate::config::{ClientConfig, TransportConfig};
use crate::crypto::RustCryptoProvider;
use crate::session::{ClientSessionManager, SystemClock};

/// Connection options shared by every command
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Base URL of the transport server
    #[arg(long, env = "TRANSPORT_SERVER_URL", default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// Optional TOML config file with a [transport] table
    #[arg(long)]
    pub config: Option<String>,
}

/// Arguments for the handshake command
#[derive(Args, Debug)]
pub struct HandshakeArgs {
    #[command(flatten)]
    pub server: ServerArgs,
}

/// Arguments for the send command
#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub server: ServerArgs,

    /// Protected path to call
    #[arg(long, default_value = "/api/echo")]
    pub path: String,

    /// JSON request body; omitted means `null`
    #[arg(long)]
    pub body: Option<String>,

    /// Close the session after the call
    #[arg(long)]
    pub close: bool,
}

fn build_client(args: &ServerArgs) -> Result<EncryptedClient> {
    let transport = TransportConfig::load(args.config.as_deref())?;
    let config = ClientConfig::from_transport(&args.server, &transport)?;
    let http = ReqwestHttpClient::new(config.request_timeout)
        .map_err(|e| anyhow!("{}", e))?;

    let manager = ClientSessionManager::new(
        config,
        Arc::new(http),
        Arc::new(RustCryptoProvider::new()),
        Arc::new(SystemClock),
    );
    Ok(EncryptedClient::new(manager))
}

/// Establish a session and print its public metadata
pub async fn handshake(args: HandshakeArgs) -> Result<()> {
    let client = build_client(&args.server)?;
    let session = client
        .sessions()
        .get_session()
        .await
        .map_err(|e| anyhow!("{}", e))?;

    let expires = chrono::DateTime::from_timestamp_millis(session.expires_at)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| session.expires_at.to_string());

    println!("✅ Session established");
    println!("   Session ID: {}", session.session_id);
    println!("   Expires:    {}", expires);
    Ok(())
}

/// Send one encrypted request and print the decrypted response
pub async fn send(args: SendArgs) -> Result<()> {
    let client = build_client(&args.server)?;

    let body = match args.body.as_deref() {
        Some(raw) => Some(
            serde_json::from_str::<Value>(raw).map_err(|e| anyhow!("--body is not JSON: {}", e))?,
        ),
        None => None,
    };
    let options = RequestOptions {
        body,
        ..Default::default()
    };

    info!("Sending encrypted request to {}", args.path);
    let response: Value = client
        .fetch_path(&args.path, options)
        .await
        .map_err(|e| anyhow!("{}", e))?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if args.close {
        let closed = client.close_session().await.map_err(|e| anyhow!("{}", e))?;
        info!("Session closed: {}", closed);
    }
    Ok(())
}
