// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Envelope transport CLI
#[derive(Parser, Debug)]
#[command(name = "envelope-cli")]
#[command(version)]
#[command(about = "Client tools for the encrypted transport session layer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Perform a handshake and print the session metadata
    Handshake(commands::HandshakeArgs),

    /// Send an encrypted JSON request to a protected path
    Send(commands::SendArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Handshake(args) => commands::handshake(args).await,
        Commands::Send(args) => commands::send(args).await,
    }
}
