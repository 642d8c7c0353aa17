// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! CRC-protected parameter blob in a dedicated flash region.
//!
//! Layout: a 32-byte [`ParamHeader`] followed by `length` bytes of payload,
//! padded with 0xFF to a word boundary.

use crate::config::Region;
use crate::crc32::CRC32;
use crate::error::ParamError;
use crate::flash::FlashMemory;

/// "PARA"
pub const PARAM_MAGIC: u32 = 0x5041_5241;
pub const HEADER_SIZE: usize = 32;

/// On-flash header, little-endian words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParamHeader {
    pub magic: u32,
    pub version: u32,
    pub crc32: u32,
    pub length: u32,
    pub reserved: [u32; 4],
}

impl ParamHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let words = [
            self.magic,
            self.version,
            self.crc32,
            self.length,
            self.reserved[0],
            self.reserved[1],
            self.reserved[2],
            self.reserved[3],
        ];
        for (dst, word) in out.chunks_exact_mut(4).zip(words) {
            dst.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(raw: &[u8; HEADER_SIZE]) -> Self {
        let word = |i: usize| u32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);
        Self {
            magic: word(0),
            version: word(4),
            crc32: word(8),
            length: word(12),
            reserved: [word(16), word(20), word(24), word(28)],
        }
    }
}

/// Parameter store over a flash region.
pub struct ParamStore<F> {
    flash: F,
    region: Region,
}

impl<F: FlashMemory> ParamStore<F> {
    /// The region must be word aligned and larger than the header.
    pub fn new(flash: F, region: Region) -> Result<Self, ParamError> {
        if region.start % 4 != 0 || (region.size as usize) <= HEADER_SIZE {
            return Err(ParamError::InvalidArgument);
        }
        Ok(Self { flash, region })
    }

    /// Largest payload the region can hold.
    pub fn max_length(&self) -> usize {
        self.region.size as usize - HEADER_SIZE
    }

    pub fn header(&self) -> Result<ParamHeader, ParamError> {
        let mut raw = [0u8; HEADER_SIZE];
        self.flash.read(self.region.start, &mut raw)?;
        Ok(ParamHeader::from_bytes(&raw))
    }

    /// Version of the stored blob, 0 when none is stored.
    pub fn version(&self) -> u32 {
        match self.header() {
            Ok(header) if header.magic == PARAM_MAGIC => header.version,
            _ => 0,
        }
    }

    /// Copy the stored payload into `buf` and return its length.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, ParamError> {
        let header = self.checked_header()?;
        let length = header.length as usize;
        if buf.len() < length {
            return Err(ParamError::TooLarge(length));
        }

        let data = &mut buf[..length];
        self.flash.read(self.data_addr(), data)?;
        if CRC32.checksum(data) != header.crc32 {
            warn!("params: CRC mismatch");
            return Err(ParamError::CrcMismatch);
        }
        Ok(length)
    }

    /// True when a blob with a matching CRC is stored.
    pub fn is_valid(&self) -> bool {
        let Ok(header) = self.checked_header() else {
            return false;
        };
        crate::flash::crc32_region(&self.flash, self.data_addr(), header.length)
            .map(|crc| crc == header.crc32)
            .unwrap_or(false)
    }

    /// Replace the stored blob. The version counts up from the previous blob.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ParamError> {
        if data.is_empty() {
            return Err(ParamError::InvalidArgument);
        }
        if data.len() > self.max_length() {
            return Err(ParamError::TooLarge(data.len()));
        }

        let version = self.version().wrapping_add(1).max(1);
        self.erase()?;

        let header = ParamHeader {
            magic: PARAM_MAGIC,
            version,
            crc32: CRC32.checksum(data),
            length: data.len() as u32,
            reserved: [0; 4],
        };
        let mut addr = self.region.start;
        for word in header.to_bytes().chunks_exact(4) {
            self.flash
                .program_word(addr, u32::from_le_bytes([word[0], word[1], word[2], word[3]]))?;
            addr += 4;
        }

        for chunk in data.chunks(4) {
            let mut word = [0xFFu8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.flash.program_word(addr, u32::from_le_bytes(word))?;
            addr += 4;
        }

        debug!("params: wrote {} bytes, version {}", data.len(), version);
        Ok(())
    }

    pub fn erase(&mut self) -> Result<(), ParamError> {
        self.flash.erase(self.region.start, self.region.size)?;
        Ok(())
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    fn data_addr(&self) -> u32 {
        self.region.start + HEADER_SIZE as u32
    }

    fn checked_header(&self) -> Result<ParamHeader, ParamError> {
        let header = self.header()?;
        if header.magic != PARAM_MAGIC {
            return Err(ParamError::NotInitialized);
        }
        if header.length as usize > self.max_length() {
            return Err(ParamError::TooLarge(header.length as usize));
        }
        Ok(header)
    }
}
