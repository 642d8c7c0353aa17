// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Control request payloads, packed little-endian as they appear on the wire.

use crate::config::{CanCapabilities, TimingLimits};
use crate::error::RequestError;

use super::constants::*;

fn pack_words<const N: usize>(words: &[u32]) -> [u8; N] {
    let mut out = [0u8; N];
    for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

fn word_at(buf: &[u8], index: usize) -> u32 {
    let o = index * 4;
    u32::from_le_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]])
}

/// Answer to DEVICE_CONFIG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Number of CAN channels minus one.
    pub icount: u8,
    pub sw_version: u32,
    pub hw_version: u32,
}

impl DeviceConfig {
    pub const SIZE: usize = 12;

    pub fn new(channels: usize) -> Self {
        Self {
            icount: channels.saturating_sub(1) as u8,
            sw_version: GS_DEVICE_SW_VERSION,
            hw_version: GS_DEVICE_HW_VERSION,
        }
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[3] = self.icount;
        out[4..8].copy_from_slice(&self.sw_version.to_le_bytes());
        out[8..12].copy_from_slice(&self.hw_version.to_le_bytes());
        out
    }
}

/// Answer to BT_CONST.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitTimingConst {
    pub feature: u32,
    pub fclk_can: u32,
    pub limits: TimingLimits,
}

impl BitTimingConst {
    pub const SIZE: usize = 40;

    pub fn new(caps: &CanCapabilities) -> Self {
        Self {
            feature: DEVICE_FEATURES,
            fclk_can: caps.fclk_can,
            limits: caps.nominal,
        }
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        let l = &self.limits;
        pack_words(&[
            self.feature,
            self.fclk_can,
            l.tseg1_min,
            l.tseg1_max,
            l.tseg2_min,
            l.tseg2_max,
            l.sjw_max,
            l.brp_min,
            l.brp_max,
            l.brp_inc,
        ])
    }
}

/// Answer to BT_CONST_EXT: nominal limits followed by the data phase limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitTimingConstExt {
    pub feature: u32,
    pub fclk_can: u32,
    pub nominal: TimingLimits,
    pub data: TimingLimits,
}

impl BitTimingConstExt {
    pub const SIZE: usize = 72;

    pub fn new(caps: &CanCapabilities) -> Self {
        Self {
            feature: DEVICE_FEATURES,
            fclk_can: caps.fclk_can,
            nominal: caps.nominal,
            data: caps.data,
        }
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        let (n, d) = (&self.nominal, &self.data);
        pack_words(&[
            self.feature,
            self.fclk_can,
            n.tseg1_min,
            n.tseg1_max,
            n.tseg2_min,
            n.tseg2_max,
            n.sjw_max,
            n.brp_min,
            n.brp_max,
            n.brp_inc,
            d.tseg1_min,
            d.tseg1_max,
            d.tseg2_min,
            d.tseg2_max,
            d.sjw_max,
            d.brp_min,
            d.brp_max,
            d.brp_inc,
        ])
    }
}

/// Payload of BITTIMING and DATA_BITTIMING.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceBitTiming {
    pub prop_seg: u32,
    pub phase_seg1: u32,
    pub phase_seg2: u32,
    pub sjw: u32,
    pub brp: u32,
}

impl DeviceBitTiming {
    pub const SIZE: usize = 20;

    pub fn unpack(buf: &[u8]) -> Result<Self, RequestError> {
        if buf.len() < Self::SIZE {
            return Err(RequestError::Malformed);
        }
        Ok(Self {
            prop_seg: word_at(buf, 0),
            phase_seg1: word_at(buf, 1),
            phase_seg2: word_at(buf, 2),
            sjw: word_at(buf, 3),
            brp: word_at(buf, 4),
        })
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        pack_words(&[
            self.prop_seg,
            self.phase_seg1,
            self.phase_seg2,
            self.sjw,
            self.brp,
        ])
    }
}

/// Payload of MODE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceMode {
    pub mode: u32,
    pub flags: u32,
}

impl DeviceMode {
    pub const SIZE: usize = 8;

    pub fn unpack(buf: &[u8]) -> Result<Self, RequestError> {
        if buf.len() < Self::SIZE {
            return Err(RequestError::Malformed);
        }
        Ok(Self {
            mode: word_at(buf, 0),
            flags: word_at(buf, 1),
        })
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        pack_words(&[self.mode, self.flags])
    }
}

/// Answer to GET_STATE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceState {
    pub state: u32,
    pub rxerr: u32,
    pub txerr: u32,
}

impl DeviceState {
    pub const SIZE: usize = 12;

    pub fn pack(&self) -> [u8; Self::SIZE] {
        pack_words(&[self.state, self.rxerr, self.txerr])
    }

    pub fn unpack(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            state: word_at(buf, 0),
            rxerr: word_at(buf, 1),
            txerr: word_at(buf, 2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_config_layout() {
        let bytes = DeviceConfig::new(2).pack();
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..8], &0x0001_0000u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &0x0001_0000u32.to_le_bytes());
    }

    #[test]
    fn test_bt_const_ext_places_data_limits_after_nominal() {
        let bytes = BitTimingConstExt::new(&CanCapabilities::DEFAULT).pack();
        assert_eq!(word_at(&bytes, 1), 60_000_000);
        assert_eq!(word_at(&bytes, 3), 256); // tseg1_max
        assert_eq!(word_at(&bytes, 11), 32); // dtseg1_max
        assert_eq!(word_at(&bytes, 16), 32); // dbrp_max
    }

    #[test]
    fn test_bittiming_rejects_short_payload() {
        assert_eq!(
            DeviceBitTiming::unpack(&[0u8; 19]),
            Err(RequestError::Malformed)
        );
        let bt = DeviceBitTiming {
            prop_seg: 1,
            phase_seg1: 12,
            phase_seg2: 2,
            sjw: 1,
            brp: 4,
        };
        assert_eq!(DeviceBitTiming::unpack(&bt.pack()), Ok(bt));
    }
}
