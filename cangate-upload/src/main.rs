// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware upload tool for the cangate bootloader via USB CDC.
//!
//! Usage:
//!   cangate-upload --port /dev/ttyACM0 info
//!   cangate-upload --port /dev/ttyACM0 upload firmware.bin
//!   cangate-upload --port /dev/ttyACM0 upload firmware.bin --no-crc
//!   cangate-upload --port /dev/ttyACM0 cancel

mod cli;
mod commands;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
