// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Byte ring between the serial receive path and the protocol poll loop.

use heapless::spsc::Consumer;

use super::frame::FRAME_SIZE;

/// Consumer side of the receive ring. Frames are removed in whole 8-byte units.
pub trait FrameSource {
    /// At least one full frame is buffered.
    fn frame_ready(&self) -> bool;

    fn take_frame(&mut self) -> Option<[u8; FRAME_SIZE]>;
}

impl<const N: usize> FrameSource for Consumer<'_, u8, N> {
    fn frame_ready(&self) -> bool {
        self.len() >= FRAME_SIZE
    }

    fn take_frame(&mut self) -> Option<[u8; FRAME_SIZE]> {
        if !self.frame_ready() {
            return None;
        }
        let mut raw = [0u8; FRAME_SIZE];
        for byte in raw.iter_mut() {
            *byte = self.dequeue()?;
        }
        Some(raw)
    }
}

/// Transmit side: where ACK/NAK/INFO replies go.
pub trait ReplyLink {
    fn send(&mut self, frame: &[u8; FRAME_SIZE]);
}
