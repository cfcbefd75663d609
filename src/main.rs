// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use envelope_transport::{api::start_server, config::TransportConfig, version};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting {}", version::get_version_string());
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!();

    let config_path = env::var("TRANSPORT_CONFIG").ok();
    let config = TransportConfig::load(config_path.as_deref())?;

    tracing::info!(
        "Session TTL {}s, {} PBKDF2 iterations, max {} sessions",
        config.session_ttl_secs,
        config.pbkdf2_iterations,
        config.max_sessions
    );

    start_server(config).await
}
