// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// TransportConfig from TOML files

use envelope_transport::config::TransportConfig;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_from_file_reads_transport_table() {
    let file = write_config(
        r#"
[transport]
listen_addr = "0.0.0.0:9443"
session_ttl_secs = 300
pbkdf2_iterations = 250000
max_sessions = 50
"#,
    );

    let config = TransportConfig::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.listen_addr, "0.0.0.0:9443");
    assert_eq!(config.session_ttl_secs, 300);
    assert_eq!(config.pbkdf2_iterations, 250_000);
    assert_eq!(config.max_sessions, 50);
    // unspecified values keep their defaults
    assert_eq!(config.salt_len, 16);
}

#[test]
fn test_missing_table_yields_defaults() {
    let file = write_config("[other]\nkey = 1\n");
    let config = TransportConfig::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config, TransportConfig::default());
}

#[test]
fn test_invalid_values_are_rejected() {
    let zero_ttl = write_config("[transport]\nsession_ttl_secs = 0\n");
    assert!(TransportConfig::from_file(zero_ttl.path().to_str().unwrap()).is_err());

    let wrong_type = write_config("[transport]\npbkdf2_iterations = \"many\"\n");
    assert!(TransportConfig::from_file(wrong_type.path().to_str().unwrap()).is_err());

    assert!(TransportConfig::from_file("/nonexistent/transport.toml").is_err());
}
