// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! EP0 control transfer state machine.
//!
//! Phases: Idle -> (DataIn | DataOut) -> Status -> Idle. Every SETUP restarts
//! from Idle, so nothing from an aborted transfer carries over.

use super::setup::SetupPacket;
use super::UsbDriver;

pub const EP0_OUT: u8 = 0x00;
pub const EP0_IN: u8 = 0x80;
pub const EP0_MAX_PACKET: usize = 64;

/// Largest data stage handled in either direction.
pub const CONTROL_BUF_SIZE: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlPhase {
    Idle,
    DataIn,
    DataOut,
    Status,
}

/// Control endpoint context: last request, phase, deferred address and the
/// data stage buffers.
pub struct ControlPipe {
    phase: ControlPhase,
    setup: SetupPacket,
    pending_address: Option<u8>,
    tx_buf: [u8; CONTROL_BUF_SIZE],
    tx_pos: usize,
    tx_len: usize,
    tx_zlp: bool,
    rx_buf: [u8; CONTROL_BUF_SIZE],
    rx_len: usize,
    rx_expected: usize,
}

impl Default for ControlPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPipe {
    pub const fn new() -> Self {
        Self {
            phase: ControlPhase::Idle,
            setup: SetupPacket {
                request_type: 0,
                request: 0,
                value: 0,
                index: 0,
                length: 0,
            },
            pending_address: None,
            tx_buf: [0; CONTROL_BUF_SIZE],
            tx_pos: 0,
            tx_len: 0,
            tx_zlp: false,
            rx_buf: [0; CONTROL_BUF_SIZE],
            rx_len: 0,
            rx_expected: 0,
        }
    }

    /// Bus reset: forget everything including a deferred address.
    pub fn reset(&mut self) {
        self.begin(SetupPacket::default());
        self.pending_address = None;
    }

    /// Capture a new request and return to Idle.
    pub fn begin(&mut self, setup: SetupPacket) {
        self.setup = setup;
        self.phase = ControlPhase::Idle;
        self.tx_pos = 0;
        self.tx_len = 0;
        self.tx_zlp = false;
        self.rx_len = 0;
        self.rx_expected = 0;
    }

    pub fn phase(&self) -> ControlPhase {
        self.phase
    }

    pub fn setup(&self) -> &SetupPacket {
        &self.setup
    }

    pub fn pending_address(&self) -> Option<u8> {
        self.pending_address
    }

    pub fn set_pending_address(&mut self, address: u8) {
        self.pending_address = Some(address & 0x7F);
    }

    /// Response buffer for the IN data stage.
    pub fn tx_buf_mut(&mut self) -> &mut [u8; CONTROL_BUF_SIZE] {
        &mut self.tx_buf
    }

    /// Data received during the OUT data stage.
    pub fn out_data(&self) -> &[u8] {
        &self.rx_buf[..self.rx_len]
    }

    /// Enter DataOut and arm EP0 OUT for `min(wLength, buffer)` bytes.
    pub fn expect_out<D: UsbDriver>(&mut self, driver: &mut D) {
        self.phase = ControlPhase::DataOut;
        self.rx_len = 0;
        self.rx_expected = (self.setup.length as usize).min(CONTROL_BUF_SIZE);
        driver.ep_receive(EP0_OUT, self.rx_expected);
    }

    /// Append one OUT packet. Returns true once the data stage is complete.
    pub fn push_out(&mut self, packet: &[u8]) -> bool {
        let room = self.rx_expected - self.rx_len;
        let n = packet.len().min(room);
        self.rx_buf[self.rx_len..self.rx_len + n].copy_from_slice(&packet[..n]);
        self.rx_len += n;
        self.rx_len >= self.rx_expected || packet.len() < EP0_MAX_PACKET
    }

    /// Send `tx_buf[..len]` as the IN data stage, chunked at the max packet size.
    /// The length is capped by wLength and the buffer.
    pub fn send<D: UsbDriver>(&mut self, driver: &mut D, len: usize) {
        let len = len.min(self.setup.length as usize).min(CONTROL_BUF_SIZE);
        if len == 0 {
            self.ack(driver);
            return;
        }

        self.phase = ControlPhase::DataIn;
        self.tx_len = len;
        self.tx_pos = 0;
        // A short transfer that ends on a packet boundary needs an explicit ZLP.
        self.tx_zlp = len < self.setup.length as usize && len % EP0_MAX_PACKET == 0;
        self.send_chunk(driver);
    }

    /// Status stage of a transfer without IN data: zero-length IN packet.
    pub fn ack<D: UsbDriver>(&mut self, driver: &mut D) {
        self.phase = ControlPhase::Status;
        driver.ep_transmit(EP0_IN, &[]);
    }

    /// Stall both directions of EP0.
    pub fn stall<D: UsbDriver>(&mut self, driver: &mut D) {
        debug!(
            "usb: stall request 0x{:02x} type 0x{:02x}",
            self.setup.request,
            self.setup.request_type
        );
        self.phase = ControlPhase::Idle;
        driver.set_stall(EP0_OUT);
        driver.set_stall(EP0_IN);
    }

    /// An EP0 IN packet went out.
    pub fn on_in_complete<D: UsbDriver>(&mut self, driver: &mut D) {
        match self.phase {
            ControlPhase::DataIn if self.tx_pos < self.tx_len => self.send_chunk(driver),
            ControlPhase::DataIn if self.tx_zlp => {
                self.tx_zlp = false;
                driver.ep_transmit(EP0_IN, &[]);
            }
            ControlPhase::DataIn => {
                // Data stage done, the host closes with a zero-length OUT.
                self.phase = ControlPhase::Status;
                driver.ep_receive(EP0_OUT, 0);
            }
            ControlPhase::Status => {
                if let Some(address) = self.pending_address.take() {
                    debug!("usb: address {}", address);
                    driver.set_address(address);
                }
                self.phase = ControlPhase::Idle;
            }
            _ => {}
        }
    }

    /// The zero-length OUT of a status stage arrived.
    pub fn on_status_out(&mut self) {
        if self.phase == ControlPhase::Status {
            self.phase = ControlPhase::Idle;
        }
    }

    fn send_chunk<D: UsbDriver>(&mut self, driver: &mut D) {
        let end = (self.tx_pos + EP0_MAX_PACKET).min(self.tx_len);
        driver.ep_transmit(EP0_IN, &self.tx_buf[self.tx_pos..end]);
        self.tx_pos = end;
    }
}
