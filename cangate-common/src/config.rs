// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Compile-time configuration: memory map, boot control word, protocol timing
//! and the identities reported over USB and the download protocol.

use heapless::String;

// --- Flash layout constants ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SIZE: u32 = 2 * 1024 * 1024;

pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

pub const BOOTLOADER_ADDR: u32 = FLASH_BASE;
pub const BOOTLOADER_SIZE: u32 = 60 * 1024;

/// Parameter blob region. Owns a whole erase sector, only the first 1KB is used.
pub const PARAM_ADDR: u32 = BOOTLOADER_ADDR + BOOTLOADER_SIZE;
pub const PARAM_SIZE: u32 = 1024;

pub const APP_ADDR: u32 = PARAM_ADDR + FLASH_SECTOR_SIZE;
pub const APP_SIZE: u32 = FLASH_BASE + FLASH_SIZE - APP_ADDR;

pub const RAM_START: u32 = 0x2000_0000;
pub const RAM_SIZE: u32 = 264 * 1024;

// --- Boot control word ---

/// Top of SCRATCH_Y. Neither image links anything there, so the word
/// survives a software reset.
pub const BOOT_CONTROL_ADDR: u32 = 0x2004_1FF0;
pub const ENTER_BOOTLOADER_MAGIC: u32 = 0xDEAD_BEEF;
pub const EXIT_BOOTLOADER_MAGIC: u32 = 0xCAFE_BABE;

// --- Download protocol timing ---

pub const PROTOCOL_TIMEOUT_MS: u32 = 5000;
pub const MAX_RETRIES: u16 = 3;

/// Number of CAN channels exposed by the application firmware.
pub const NUM_CAN_CHANNELS: usize = 2;

/// A contiguous address range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub start: u32,
    pub size: u32,
}

impl Region {
    pub const fn new(start: u32, size: u32) -> Self {
        Self { start, size }
    }

    /// One past the last address.
    pub const fn end(&self) -> u32 {
        self.start + self.size
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && addr - self.start < self.size
    }

    /// True when `[addr, addr + len)` lies entirely inside the region.
    pub fn contains_range(&self, addr: u32, len: u32) -> bool {
        addr >= self.start
            && (addr - self.start) <= self.size
            && len <= self.size - (addr - self.start)
    }
}

/// Where the application, its parameters and RAM live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryLayout {
    pub application: Region,
    pub params: Region,
    pub ram: Region,
}

impl MemoryLayout {
    pub const RP2040: Self = Self {
        application: Region::new(APP_ADDR, APP_SIZE),
        params: Region::new(PARAM_ADDR, PARAM_SIZE),
        ram: Region::new(RAM_START, RAM_SIZE),
    };
}

/// Identity answered to INFO requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootloaderIdentity {
    /// `[major, minor]`
    pub version: [u8; 2],
    pub product_id: u64,
}

impl BootloaderIdentity {
    pub const DEFAULT: Self = Self {
        version: [1, 0],
        product_id: 0x4341_4E47_0000_0001,
    };

    /// Upper half of the product id.
    pub const fn series(&self) -> u32 {
        (self.product_id >> 32) as u32
    }

    /// Lower half of the product id.
    pub const fn spec(&self) -> u32 {
        self.product_id as u32
    }
}

/// Maximum serial string length kept in a [`DeviceIdentity`].
pub const SERIAL_MAX_LEN: usize = 24;

/// USB identity of the application firmware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vid: u16,
    pub pid: u16,
    pub manufacturer: &'static str,
    pub product: &'static str,
    pub serial: String<SERIAL_MAX_LEN>,
}

impl DeviceIdentity {
    /// VID/PID pair the Linux gs_usb driver binds to.
    pub const DEFAULT_VID: u16 = 0x1D50;
    pub const DEFAULT_PID: u16 = 0x606F;

    /// Apply an identity override stored in the parameter blob.
    ///
    /// Blob layout: `vid: u16 LE`, `pid: u16 LE`, then an optional ASCII
    /// serial string. Zero VID/PID keep the defaults. Malformed blobs are ignored.
    pub fn with_overrides(mut self, blob: &[u8]) -> Self {
        if blob.len() < 4 {
            return self;
        }
        let vid = u16::from_le_bytes([blob[0], blob[1]]);
        let pid = u16::from_le_bytes([blob[2], blob[3]]);
        if vid != 0 {
            self.vid = vid;
        }
        if pid != 0 {
            self.pid = pid;
        }

        let serial = &blob[4..];
        let serial = &serial[..serial.iter().position(|&b| b == 0).unwrap_or(serial.len())];
        if !serial.is_empty() && serial.len() <= SERIAL_MAX_LEN && serial.is_ascii() {
            if let Ok(text) = core::str::from_utf8(serial) {
                let mut owned = String::new();
                if owned.push_str(text).is_ok() {
                    self.serial = owned;
                }
            }
        }
        self
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        let mut serial = String::new();
        let _ = serial.push_str("000000000001");
        Self {
            vid: Self::DEFAULT_VID,
            pid: Self::DEFAULT_PID,
            manufacturer: "cangate",
            product: "cangate USB-CAN adapter",
            serial,
        }
    }
}

/// Range limits of one bit timing phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingLimits {
    pub tseg1_min: u32,
    pub tseg1_max: u32,
    pub tseg2_min: u32,
    pub tseg2_max: u32,
    pub sjw_max: u32,
    pub brp_min: u32,
    pub brp_max: u32,
    pub brp_inc: u32,
}

/// CAN capabilities advertised to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanCapabilities {
    pub fclk_can: u32,
    pub nominal: TimingLimits,
    pub data: TimingLimits,
}

impl CanCapabilities {
    pub const DEFAULT: Self = Self {
        fclk_can: 60_000_000,
        nominal: TimingLimits {
            tseg1_min: 1,
            tseg1_max: 256,
            tseg2_min: 1,
            tseg2_max: 128,
            sjw_max: 128,
            brp_min: 1,
            brp_max: 512,
            brp_inc: 1,
        },
        data: TimingLimits {
            tseg1_min: 1,
            tseg1_max: 32,
            tseg2_min: 1,
            tseg2_max: 16,
            sjw_max: 16,
            brp_min: 1,
            brp_max: 32,
            brp_inc: 1,
        },
    };
}
