// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bulk IN flow control: one transfer in flight plus a one-deep pending slot.
//!
//! A frame arriving while the slot is occupied replaces it (drop-oldest).

use heapless::Vec;

use super::UsbDriver;

pub const BULK_OUT_EP: u8 = 0x01;
pub const BULK_IN_EP: u8 = 0x81;
pub const BULK_MAX_PACKET: u16 = 64;

/// Largest bulk transfer handled in either direction.
pub const BULK_BUF_SIZE: usize = 128;

/// Destination for bulk IN transfers.
pub trait BulkSink {
    fn send(&mut self, data: &[u8]);
}

pub struct BulkInPipe {
    ep: u8,
    busy: bool,
    pending: Option<Vec<u8, BULK_BUF_SIZE>>,
}

impl BulkInPipe {
    pub const fn new(ep: u8) -> Self {
        Self {
            ep,
            busy: false,
            pending: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn pending(&self) -> Option<&[u8]> {
        self.pending.as_deref()
    }

    pub fn reset(&mut self) {
        self.busy = false;
        self.pending = None;
    }

    /// Start a transfer, or park it in the pending slot when one is in flight.
    /// Data beyond [`BULK_BUF_SIZE`] is cut off.
    pub fn send<D: UsbDriver>(&mut self, driver: &mut D, data: &[u8]) {
        let data = &data[..data.len().min(BULK_BUF_SIZE)];
        if self.busy {
            if self.pending.is_some() {
                trace!("usb: bulk IN pending frame overwritten");
            }
            self.pending = Vec::from_slice(data).ok();
            return;
        }
        self.busy = true;
        driver.ep_transmit(self.ep, data);
    }

    /// The in-flight transfer finished: send the pending frame or go idle.
    pub fn on_complete<D: UsbDriver>(&mut self, driver: &mut D) {
        match self.pending.take() {
            Some(frame) => driver.ep_transmit(self.ep, &frame),
            None => self.busy = false,
        }
    }
}

/// [`BulkSink`] writing through a [`BulkInPipe`].
pub struct BulkWriter<'a, D> {
    driver: &'a mut D,
    pipe: &'a mut BulkInPipe,
}

impl<'a, D: UsbDriver> BulkWriter<'a, D> {
    pub fn new(driver: &'a mut D, pipe: &'a mut BulkInPipe) -> Self {
        Self { driver, pipe }
    }
}

impl<D: UsbDriver> BulkSink for BulkWriter<'_, D> {
    fn send(&mut self, data: &[u8]) {
        self.pipe.send(&mut *self.driver, data);
    }
}
