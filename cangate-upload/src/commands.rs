// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for bootloader operations.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use crc::{Crc, CRC_32_ISO_HDLC};
use indicatif::{ProgressBar, ProgressStyle};

use cangate_common::config::MAX_RETRIES;
use cangate_common::download::{Command, InfoKind, ProtocolFrame, MAX_PAYLOAD, NAK_ALL_SEQ};

use crate::transport::Transport;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Erasing the application region can take several seconds.
const ERASE_TIMEOUT_MS: u64 = 30_000;

/// How long to wait for the acknowledgement of END before assuming the
/// bootloader already moved on.
const END_TIMEOUT_MS: u64 = 500;

/// Query and display the bootloader identity.
pub fn info(transport: &mut Transport) -> Result<()> {
    transport.drain_rx();

    let version = query_info(transport, InfoKind::Version)?;
    match version.payload() {
        [major, minor, ..] => println!("Bootloader version: {}.{}", major, minor),
        other => bail!("Malformed version reply: {:02x?}", other),
    }

    let series = query_info(transport, InfoKind::Series)?;
    println!("Product series:     0x{:08x}", info_word(&series)?);

    let spec = query_info(transport, InfoKind::Spec)?;
    println!("Product id:         0x{:08x}", info_word(&spec)?);

    Ok(())
}

/// Upload a firmware image, with or without CRC verification.
pub fn upload(transport: &mut Transport, file: &Path, with_crc: bool) -> Result<()> {
    let firmware = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if firmware.is_empty() {
        bail!("{} is empty", file.display());
    }
    let size = u32::try_from(firmware.len()).context("Firmware image too large")?;
    let crc32 = with_crc.then(|| CRC32.checksum(&firmware));

    println!("Firmware: {} ({} bytes)", file.display(), size);
    match crc32 {
        Some(crc) => println!("CRC32:    0x{:08x}", crc),
        None => println!("CRC32:    not sent, image starts unverified"),
    }
    println!();

    transport.drain_rx();

    print!("Starting transfer... ");
    std::io::stdout().flush()?;
    exchange(
        transport,
        &ProtocolFrame::new(Command::Start, 0, &size.to_le_bytes()),
        ERASE_TIMEOUT_MS,
    )?;
    if let Some(crc) = crc32 {
        // The second START opens the transfer and erases the region.
        exchange(
            transport,
            &ProtocolFrame::new(Command::Start, 1, &crc.to_le_bytes()),
            ERASE_TIMEOUT_MS,
        )?;
    }
    println!("OK");

    let image = pad_image(firmware);
    let pb = ProgressBar::new(image.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    for (index, word) in image.chunks(MAX_PAYLOAD).enumerate() {
        let seq = index as u16;
        // Without CRC the first DATA frame opens the transfer and erases.
        let timeout = if index == 0 && crc32.is_none() {
            ERASE_TIMEOUT_MS
        } else {
            transport.timeout_ms()
        };
        if let Err(e) = exchange(
            transport,
            &ProtocolFrame::new(Command::Data, seq, word),
            timeout,
        ) {
            pb.abandon();
            return Err(e.context(format!("DATA frame {} (offset {})", seq, index * MAX_PAYLOAD)));
        }
        pb.inc(word.len() as u64);
    }
    pb.finish_with_message("Upload complete");
    println!();

    print!("Finishing... ");
    std::io::stdout().flush()?;
    match transport.request_timeout(&ProtocolFrame::new(Command::End, 0, &[]), END_TIMEOUT_MS)? {
        Some(reply) if reply.command() == Some(Command::Nak) => {
            bail!("END rejected (seq {})", reply.seq)
        }
        _ => println!("OK"),
    }

    println!();
    if crc32.is_some() {
        println!("Firmware uploaded. The bootloader verifies the image and resets.");
    } else {
        println!("Firmware uploaded. The bootloader starts the image.");
    }

    Ok(())
}

/// Abort a transfer in progress. The bootloader does not reply.
pub fn cancel(transport: &mut Transport) -> Result<()> {
    transport.send(&ProtocolFrame::new(Command::Cancel, 0, &[]))?;
    println!("Cancel sent.");
    Ok(())
}

fn query_info(transport: &mut Transport, kind: InfoKind) -> Result<ProtocolFrame> {
    let request = ProtocolFrame::new(Command::Info, 0, &[kind as u8]);
    match transport.request(&request)? {
        Some(reply) if reply.command() == Some(Command::Info) => Ok(reply),
        Some(reply) => bail!("Unexpected reply to INFO {:?}: cmd 0x{:02x}", kind, reply.cmd),
        None => bail!("Timeout waiting for INFO {:?}", kind),
    }
}

fn info_word(reply: &ProtocolFrame) -> Result<u32> {
    reply
        .word()
        .with_context(|| format!("Malformed INFO reply: {:02x?}", reply.payload()))
}

/// Send `frame` until it is acknowledged. A NAK or a timeout resends it,
/// up to the bootloader's retry limit.
fn exchange(transport: &mut Transport, frame: &ProtocolFrame, timeout_ms: u64) -> Result<()> {
    for _ in 0..=MAX_RETRIES {
        match transport.request_timeout(frame, timeout_ms)? {
            Some(reply) if reply.command() == Some(Command::Ack) && reply.seq == frame.seq => {
                return Ok(());
            }
            Some(reply) if reply.command() == Some(Command::Nak) && reply.seq == NAK_ALL_SEQ => {
                bail!("Bootloader rejected cmd 0x{:02x}", frame.cmd);
            }
            Some(reply) if reply.command() == Some(Command::Nak) => {
                eprintln!("NAK seq {}, resending", reply.seq);
            }
            Some(reply) => {
                eprintln!("Ignoring reply cmd 0x{:02x} seq {}", reply.cmd, reply.seq);
            }
            None => eprintln!("Timeout on seq {}, resending", frame.seq),
        }
    }
    bail!("No acknowledgement after {} retries", MAX_RETRIES)
}

/// Pad the image with 0xFF to a whole number of words.
fn pad_image(mut image: Vec<u8>) -> Vec<u8> {
    let padded = image.len().div_ceil(MAX_PAYLOAD) * MAX_PAYLOAD;
    image.resize(padded, 0xFF);
    image
}
