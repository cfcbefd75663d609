// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Transport configuration
//!
//! Values come from defaults, an optional TOML file with a `[transport]`
//! table, and `TRANSPORT_*` environment variables (a `.env` file is loaded
//! by the binaries before this runs). Environment values win over the file.
//!
//! ```toml
//! [transport]
//! listen_addr = "0.0.0.0:8080"
//! session_ttl_secs = 900
//! pbkdf2_iterations = 100000
//! ```

use crate::crypto::kdf::{DEFAULT_PBKDF2_ITERATIONS, DEFAULT_SALT_LEN};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default minimum iteration count a client accepts from a server
pub const DEFAULT_MIN_PBKDF2_ITERATIONS: u32 = 10_000;

/// Server and client settings for the encrypted transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub listen_addr: String,
    pub session_ttl_secs: u64,
    pub pbkdf2_iterations: u32,
    pub salt_len: usize,
    pub max_sessions: usize,
    /// Background sweep interval; 0 disables the sweep
    pub cleanup_interval_secs: u64,
    /// Client side: reject handshakes weaker than this
    pub min_pbkdf2_iterations: u32,
    pub request_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            session_ttl_secs: 15 * 60,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            salt_len: DEFAULT_SALT_LEN,
            max_sessions: 10_000,
            cleanup_interval_secs: 60,
            min_pbkdf2_iterations: DEFAULT_MIN_PBKDF2_ITERATIONS,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    transport: TransportConfig,
}

impl TransportConfig {
    /// Load from a TOML file; a file without `[transport]` yields defaults
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let file: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        file.transport.validate()?;
        Ok(file.transport)
    }

    /// Defaults overridden by `TRANSPORT_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load `path` if given, then apply environment overrides
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("TRANSPORT_LISTEN_ADDR") {
            self.listen_addr = val;
        }
        override_parsed(&lookup, "TRANSPORT_SESSION_TTL_SECS", &mut self.session_ttl_secs)?;
        override_parsed(&lookup, "TRANSPORT_PBKDF2_ITERATIONS", &mut self.pbkdf2_iterations)?;
        override_parsed(&lookup, "TRANSPORT_SALT_LEN", &mut self.salt_len)?;
        override_parsed(&lookup, "TRANSPORT_MAX_SESSIONS", &mut self.max_sessions)?;
        override_parsed(
            &lookup,
            "TRANSPORT_CLEANUP_INTERVAL_SECS",
            &mut self.cleanup_interval_secs,
        )?;
        override_parsed(
            &lookup,
            "TRANSPORT_MIN_PBKDF2_ITERATIONS",
            &mut self.min_pbkdf2_iterations,
        )?;
        override_parsed(
            &lookup,
            "TRANSPORT_REQUEST_TIMEOUT_SECS",
            &mut self.request_timeout_secs,
        )?;
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_ttl_secs == 0 {
            return Err(anyhow!("session_ttl_secs must be greater than 0"));
        }
        if self.pbkdf2_iterations == 0 {
            return Err(anyhow!("pbkdf2_iterations must be greater than 0"));
        }
        if self.salt_len == 0 {
            return Err(anyhow!("salt_len must be greater than 0"));
        }
        if self.max_sessions == 0 {
            return Err(anyhow!("max_sessions must be greater than 0"));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .with_context(|| format!("Invalid listen_addr '{}'", self.listen_addr))
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn override_parsed<F, T>(lookup: &F, name: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(val) = lookup(name) {
        *target = val
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value for {}: {}", name, e))?;
    }
    Ok(())
}

/// Client-side view: where the server lives and what it must offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: url::Url,
    pub handshake_path: String,
    pub min_pbkdf2_iterations: u32,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = url::Url::parse(base_url)
            .with_context(|| format!("Invalid server URL '{}'", base_url))?;
        Ok(Self {
            base_url,
            handshake_path: "/handshake".to_string(),
            min_pbkdf2_iterations: DEFAULT_MIN_PBKDF2_ITERATIONS,
            request_timeout: Duration::from_secs(30),
        })
    }

    pub fn from_transport(base_url: &str, transport: &TransportConfig) -> Result<Self> {
        let mut config = Self::new(base_url)?;
        config.min_pbkdf2_iterations = transport.min_pbkdf2_iterations;
        config.request_timeout = transport.request_timeout();
        Ok(config)
    }

    pub fn with_min_pbkdf2_iterations(mut self, iterations: u32) -> Self {
        self.min_pbkdf2_iterations = iterations;
        self
    }

    /// Absolute URL for a server path such as `/api/echo`
    pub fn resolve(&self, path: &str) -> Result<url::Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Cannot join '{}' onto {}", path, self.base_url))
    }

    pub fn handshake_url(&self) -> Result<url::Url> {
        self.resolve(&self.handshake_path)
    }
}
