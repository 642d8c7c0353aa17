// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Device, configuration and string descriptors of the gs_usb interface.

use crate::config::DeviceIdentity;

use super::bulk::{BULK_IN_EP, BULK_MAX_PACKET, BULK_OUT_EP};
use super::control::EP0_MAX_PACKET;

pub const DESC_DEVICE: u8 = 1;
pub const DESC_CONFIGURATION: u8 = 2;
pub const DESC_STRING: u8 = 3;
pub const DESC_INTERFACE: u8 = 4;
pub const DESC_ENDPOINT: u8 = 5;

pub const DEVICE_DESC_SIZE: usize = 18;
pub const CONFIG_DESC_SIZE: usize = 9 + 9 + 7 + 7;

pub const LANGID_EN_US: u16 = 0x0409;

pub const STRING_MANUFACTURER: u8 = 1;
pub const STRING_PRODUCT: u8 = 2;
pub const STRING_SERIAL: u8 = 3;

const ENDPOINT_BULK: u8 = 0x02;
const CLASS_VENDOR_SPECIFIC: u8 = 0xFF;

/// Descriptor set built once from a [`DeviceIdentity`].
pub struct Descriptors {
    device: [u8; DEVICE_DESC_SIZE],
    config: [u8; CONFIG_DESC_SIZE],
    identity: DeviceIdentity,
}

impl Descriptors {
    pub fn new(identity: DeviceIdentity) -> Self {
        let vid = identity.vid.to_le_bytes();
        let pid = identity.pid.to_le_bytes();
        let device = [
            DEVICE_DESC_SIZE as u8,
            DESC_DEVICE,
            0x00,
            0x02, // bcdUSB 2.00
            0x00, // class defined per interface
            0x00,
            0x00,
            EP0_MAX_PACKET as u8,
            vid[0],
            vid[1],
            pid[0],
            pid[1],
            0x00,
            0x01, // bcdDevice 1.00
            STRING_MANUFACTURER,
            STRING_PRODUCT,
            STRING_SERIAL,
            1, // configurations
        ];

        let mps = BULK_MAX_PACKET.to_le_bytes();
        let total = (CONFIG_DESC_SIZE as u16).to_le_bytes();
        let config = [
            // Configuration
            9,
            DESC_CONFIGURATION,
            total[0],
            total[1],
            1,    // interfaces
            1,    // bConfigurationValue
            0,    // iConfiguration
            0x80, // bus powered
            50,   // 100 mA
            // Interface 0, vendor specific
            9,
            DESC_INTERFACE,
            0,
            0,
            2, // endpoints
            CLASS_VENDOR_SPECIFIC,
            CLASS_VENDOR_SPECIFIC,
            CLASS_VENDOR_SPECIFIC,
            0,
            // Bulk OUT
            7,
            DESC_ENDPOINT,
            BULK_OUT_EP,
            ENDPOINT_BULK,
            mps[0],
            mps[1],
            0,
            // Bulk IN
            7,
            DESC_ENDPOINT,
            BULK_IN_EP,
            ENDPOINT_BULK,
            mps[0],
            mps[1],
            0,
        ];

        Self {
            device,
            config,
            identity,
        }
    }

    pub fn device(&self) -> &[u8] {
        &self.device
    }

    pub fn configuration(&self) -> &[u8] {
        &self.config
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Write string descriptor `index` into `buf`. Returns its length, or
    /// `None` for an unknown index. Long strings are cut to fit `buf`.
    pub fn string(&self, index: u8, buf: &mut [u8]) -> Option<usize> {
        if index == 0 {
            let lang = LANGID_EN_US.to_le_bytes();
            let desc = [4, DESC_STRING, lang[0], lang[1]];
            let n = desc.len().min(buf.len());
            buf[..n].copy_from_slice(&desc[..n]);
            return Some(n);
        }

        let text = match index {
            STRING_MANUFACTURER => self.identity.manufacturer,
            STRING_PRODUCT => self.identity.product,
            STRING_SERIAL => self.identity.serial.as_str(),
            _ => return None,
        };
        if buf.len() < 2 {
            return None;
        }

        let max = buf.len().min(u8::MAX as usize);
        let mut len = 2;
        for unit in text.encode_utf16() {
            if len + 2 > max {
                break;
            }
            buf[len..len + 2].copy_from_slice(&unit.to_le_bytes());
            len += 2;
        }
        buf[0] = len as u8;
        buf[1] = DESC_STRING;
        Some(len)
    }
}
