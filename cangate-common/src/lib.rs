// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common protocol cores for the cangate USB-CAN adapter and its bootloader.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: Enables `std` support for host tools
//! - `defmt` feature: Routes internal logging to `defmt`
//! - `embedded` feature: Enables rp2040 flash access and reboot helpers

#![cfg_attr(not(feature = "std"), no_std)]

// Must stay first so the logging macros are visible to every module below.
#[macro_use]
mod fmt;

pub mod boot;
pub mod config;
pub mod crc32;
pub mod download;
pub mod error;
pub mod flash;
pub mod gs_usb;
pub mod param;
pub mod usb;

// rp2040 ROM flash driver (requires embedded feature)
#[cfg(feature = "embedded")]
pub mod rp2040;

// Re-export commonly used types
pub use config::{BootloaderIdentity, DeviceIdentity, MemoryLayout, Region};
pub use download::{Command, ProtocolController, ProtocolFrame, ProtocolState, ProtocolStatus};
pub use error::{CanError, FlashError, ParamError, RequestError};
pub use flash::FlashMemory;

#[cfg(feature = "embedded")]
use embedded_hal::delay::DelayNs;
#[cfg(feature = "embedded")]
use embedded_hal::digital::OutputPin;

/// Blink an LED a specified number of times.
#[cfg(feature = "embedded")]
pub fn blink(led: &mut impl OutputPin, timer: &mut impl DelayNs, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        timer.delay_ms(period_ms);
        led.set_low().ok();
        timer.delay_ms(period_ms);
    }
}
