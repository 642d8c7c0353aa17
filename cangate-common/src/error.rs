// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error types shared by the protocol cores.

use thiserror::Error;

/// Failure of a flash capability.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    #[error("address 0x{0:08x} outside of flash")]
    OutOfRange(u32),
    #[error("address 0x{0:08x} not word aligned")]
    Misaligned(u32),
    #[error("flash device reported a failure")]
    Device,
}

/// Failure of a class/vendor control request. Always ends in an EP0 stall.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    #[error("request 0x{0:02x} not supported")]
    Unsupported(u8),
    #[error("channel {0} does not exist")]
    InvalidChannel(u16),
    #[error("request payload too short")]
    Malformed,
    #[error("CAN controller rejected the request")]
    Hardware(#[from] CanError),
}

/// Failure reported by a CAN controller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CanError {
    #[error("transmit queue full")]
    TxFull,
    #[error("channel not started")]
    NotStarted,
    #[error("invalid bit timing")]
    InvalidTiming,
    #[error("controller failure")]
    Controller,
}

/// Failure of the parameter store.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("blob of {0} bytes does not fit the parameter region")]
    TooLarge(usize),
    #[error("parameter region not initialized")]
    NotInitialized,
    #[error("parameter CRC mismatch")]
    CrcMismatch,
    #[error("flash: {0}")]
    Flash(#[from] FlashError),
}
