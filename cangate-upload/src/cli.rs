// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cangate_common::config::PROTOCOL_TIMEOUT_MS;

use crate::commands;
use crate::transport::Transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "cangate-upload")]
#[command(about = "Firmware upload tool for the cangate bootloader")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyACM0)
    #[arg(short, long)]
    pub port: String,

    /// Reply timeout in milliseconds
    #[arg(short, long, default_value_t = PROTOCOL_TIMEOUT_MS as u64)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Query bootloader version and product identity
    Info,

    /// Upload a firmware image
    Upload {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Announce the size only; the bootloader starts the image without verifying it
        #[arg(long)]
        no_crc: bool,
    },

    /// Abort a transfer in progress
    Cancel,
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let mut transport = Transport::with_timeout(&cli.port, cli.timeout)?;

    match cli.command {
        Commands::Info => commands::info(&mut transport),
        Commands::Upload { file, no_crc } => commands::upload(&mut transport, &file, !no_crc),
        Commands::Cancel => commands::cancel(&mut transport),
    }
}
