// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash capability consumed by the download controller and the parameter store.

use crate::crc32::CRC32;
use crate::error::FlashError;

/// Word-programmable NOR flash addressed by absolute bus addresses.
pub trait FlashMemory {
    /// Erase every sector overlapping `[addr, addr + len)`.
    fn erase(&mut self, addr: u32, len: u32) -> Result<(), FlashError>;

    /// Program one little-endian word at a word-aligned address.
    fn program_word(&mut self, addr: u32, word: u32) -> Result<(), FlashError>;

    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    fn read_word(&self, addr: u32) -> Result<u32, FlashError> {
        let mut word = [0u8; 4];
        self.read(addr, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }
}

impl<F: FlashMemory + ?Sized> FlashMemory for &mut F {
    fn erase(&mut self, addr: u32, len: u32) -> Result<(), FlashError> {
        (**self).erase(addr, len)
    }

    fn program_word(&mut self, addr: u32, word: u32) -> Result<(), FlashError> {
        (**self).program_word(addr, word)
    }

    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        (**self).read(addr, buf)
    }
}

/// Compute CRC-32 (ISO HDLC) over `len` bytes of flash starting at `addr`.
pub fn crc32_region<F: FlashMemory + ?Sized>(
    flash: &F,
    addr: u32,
    len: u32,
) -> Result<u32, FlashError> {
    let mut digest = CRC32.digest();
    let mut remaining = len as usize;
    let mut addr = addr;
    let mut chunk = [0u8; 256];

    while remaining > 0 {
        let n = remaining.min(chunk.len());
        flash.read(addr, &mut chunk[..n])?;
        digest.update(&chunk[..n]);
        addr += n as u32;
        remaining -= n;
    }

    Ok(digest.finalize())
}
