// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware download protocol: fixed 8-byte frames over a serial link.
//!
//! The host sends START (size, then optional CRC), a stream of 4-byte DATA
//! frames and END. Every frame is answered with ACK or NAK carrying a
//! sequence number; INFO queries are answered with identity frames.

mod controller;
mod frame;
mod ring;

pub use controller::{ProtocolController, ProtocolState, ProtocolStatus};
pub use frame::{Command, InfoKind, ProtocolFrame, FRAME_SIZE, MAX_PAYLOAD, NAK_ALL_SEQ};
pub use ring::{FrameSource, ReplyLink};
