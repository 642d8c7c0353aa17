// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! CAN controller seam used by the gs_usb engine.

use embedded_can::{ExtendedId, Id, StandardId};

use crate::error::CanError;

use super::constants::{CAN_EFF_FLAG, CAN_EFF_MASK, CAN_RTR_FLAG, CAN_SFF_MASK};

/// Bit timing as programmed into the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    pub prescaler: u32,
    pub sjw: u32,
    pub tseg1: u32,
    pub tseg2: u32,
}

/// Everything `CanDriver::init` needs to bring a channel up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    pub nominal: BitTiming,
    pub data: BitTiming,
    /// FD framing (without bit rate switch) instead of classic CAN.
    pub fd: bool,
}

/// Accept-all receive filter for one identifier kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterKind {
    Standard,
    Extended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanHeader {
    pub id: Id,
    pub remote: bool,
    /// DLC code, 0 to 15.
    pub dlc: u8,
    pub fd: bool,
    pub brs: bool,
}

impl CanHeader {
    /// Decode the identifier part of a Linux style `can_id`.
    pub fn id_from_raw(can_id: u32) -> Option<Id> {
        if can_id & CAN_EFF_FLAG != 0 {
            ExtendedId::new(can_id & CAN_EFF_MASK).map(Id::Extended)
        } else {
            StandardId::new((can_id & CAN_SFF_MASK) as u16).map(Id::Standard)
        }
    }

    /// Linux style `can_id` with EFF and RTR flags.
    pub fn raw_id(&self) -> u32 {
        let mut raw = match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw() | CAN_EFF_FLAG,
        };
        if self.remote {
            raw |= CAN_RTR_FLAG;
        }
        raw
    }
}

/// A frame taken from a receive FIFO.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanFrame {
    pub header: CanHeader,
    pub data: [u8; 64],
}

/// CAN controller bank indexed by channel. Callers only pass valid indices.
pub trait CanDriver {
    fn stop(&mut self, channel: usize) -> Result<(), CanError>;
    fn init(&mut self, channel: usize, config: &ChannelConfig) -> Result<(), CanError>;
    fn configure_filter(&mut self, channel: usize, kind: FilterKind) -> Result<(), CanError>;
    fn start(&mut self, channel: usize) -> Result<(), CanError>;
    fn enable_rx_notification(&mut self, channel: usize) -> Result<(), CanError>;
    /// Queue a frame; `data` holds the payload of `header.dlc`.
    fn transmit(&mut self, channel: usize, header: &CanHeader, data: &[u8])
        -> Result<(), CanError>;
    fn rx_pending(&self, channel: usize) -> bool;
    fn receive(&mut self, channel: usize) -> Option<CanFrame>;
}
