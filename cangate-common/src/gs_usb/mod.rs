// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! gs_usb (candleLight) compatible USB-CAN function.

mod can;
pub mod constants;
mod engine;
mod frame;
mod structures;

pub use can::{BitTiming, CanDriver, CanFrame, CanHeader, ChannelConfig, FilterKind};
pub use engine::{ChannelState, GsUsb};
pub use frame::{
    dlc_to_len, host_frame_wire_len, len_to_dlc, HostFrame, HOST_FRAME_DATA_SIZE,
    HOST_FRAME_HEADER_SIZE, HOST_FRAME_MAX_WIRE_SIZE, HOST_FRAME_MIN_SIZE,
};
pub use structures::{
    BitTimingConst, BitTimingConstExt, DeviceBitTiming, DeviceConfig, DeviceMode, DeviceState,
};
