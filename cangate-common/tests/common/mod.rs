// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hardware-independent doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use cangate_common::download::{FrameSource, ReplyLink, FRAME_SIZE};
use cangate_common::error::{CanError, FlashError};
use cangate_common::flash::FlashMemory;
use cangate_common::gs_usb::{CanDriver, CanFrame, CanHeader, ChannelConfig, FilterKind};
use cangate_common::usb::{BulkSink, EndpointKind, UsbDriver, UsbEvent};

// =============================================================================
// Flash
// =============================================================================

pub const MOCK_SECTOR_SIZE: u32 = 4096;

/// RAM-backed NOR flash: erase sets bytes to 0xFF, programming only clears bits.
pub struct MockFlash {
    pub base: u32,
    pub mem: Vec<u8>,
    pub erase_calls: Vec<(u32, u32)>,
    pub program_calls: usize,
    pub fail_erase: bool,
    /// Fail programming at this address.
    pub fail_program_at: Option<u32>,
}

impl MockFlash {
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            mem: vec![0xFF; size],
            erase_calls: Vec::new(),
            program_calls: 0,
            fail_erase: false,
            fail_program_at: None,
        }
    }

    fn offset(&self, addr: u32, len: usize) -> Result<usize, FlashError> {
        if addr < self.base || (addr - self.base) as usize + len > self.mem.len() {
            return Err(FlashError::OutOfRange(addr));
        }
        Ok((addr - self.base) as usize)
    }

    pub fn bytes(&self, addr: u32, len: usize) -> &[u8] {
        let o = (addr - self.base) as usize;
        &self.mem[o..o + len]
    }

    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) {
        let o = (addr - self.base) as usize;
        self.mem[o..o + data.len()].copy_from_slice(data);
    }
}

impl FlashMemory for MockFlash {
    fn erase(&mut self, addr: u32, len: u32) -> Result<(), FlashError> {
        self.erase_calls.push((addr, len));
        if self.fail_erase {
            return Err(FlashError::Device);
        }
        let offset = self.offset(addr, len as usize)? as u32;
        let start = offset - offset % MOCK_SECTOR_SIZE;
        let end = ((offset + len).div_ceil(MOCK_SECTOR_SIZE) * MOCK_SECTOR_SIZE)
            .min(self.mem.len() as u32);
        self.mem[start as usize..end as usize].fill(0xFF);
        Ok(())
    }

    fn program_word(&mut self, addr: u32, word: u32) -> Result<(), FlashError> {
        if addr % 4 != 0 {
            return Err(FlashError::Misaligned(addr));
        }
        if self.fail_program_at == Some(addr) {
            return Err(FlashError::Device);
        }
        let o = self.offset(addr, 4)?;
        for (cell, byte) in self.mem[o..o + 4].iter_mut().zip(word.to_le_bytes()) {
            *cell &= byte;
        }
        self.program_calls += 1;
        Ok(())
    }

    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let o = self.offset(addr, buf.len())?;
        buf.copy_from_slice(&self.mem[o..o + buf.len()]);
        Ok(())
    }
}

// =============================================================================
// Download frames
// =============================================================================

/// Frames queued for the controller.
#[derive(Default)]
pub struct VecSource {
    pub frames: VecDeque<[u8; FRAME_SIZE]>,
}

impl VecSource {
    pub fn push(&mut self, frame: [u8; FRAME_SIZE]) {
        self.frames.push_back(frame);
    }
}

impl FrameSource for VecSource {
    fn frame_ready(&self) -> bool {
        !self.frames.is_empty()
    }

    fn take_frame(&mut self) -> Option<[u8; FRAME_SIZE]> {
        self.frames.pop_front()
    }
}

/// Records every reply.
#[derive(Default)]
pub struct VecLink {
    pub sent: Vec<[u8; FRAME_SIZE]>,
}

impl VecLink {
    pub fn last(&self) -> Option<[u8; FRAME_SIZE]> {
        self.sent.last().copied()
    }
}

impl ReplyLink for VecLink {
    fn send(&mut self, frame: &[u8; FRAME_SIZE]) {
        self.sent.push(*frame);
    }
}

// =============================================================================
// USB
// =============================================================================

/// Recording USB driver with a scripted event queue.
#[derive(Default)]
pub struct MockUsb {
    pub events: VecDeque<UsbEvent>,
    pub transmits: Vec<(u8, Vec<u8>)>,
    pub receives: Vec<(u8, usize)>,
    pub stalled: Vec<u8>,
    pub address: Option<u8>,
    pub opened: Vec<(u8, EndpointKind, u16)>,
    pub closed: Vec<u8>,
}

impl MockUsb {
    pub fn transmits_on(&self, ep: u8) -> Vec<Vec<u8>> {
        self.transmits
            .iter()
            .filter(|(e, _)| *e == ep)
            .map(|(_, d)| d.clone())
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.transmits.clear();
        self.receives.clear();
    }
}

impl UsbDriver for MockUsb {
    fn poll_event(&mut self) -> Option<UsbEvent> {
        self.events.pop_front()
    }

    fn ep_transmit(&mut self, ep: u8, data: &[u8]) {
        self.transmits.push((ep, data.to_vec()));
    }

    fn ep_receive(&mut self, ep: u8, len: usize) {
        self.receives.push((ep, len));
    }

    fn set_stall(&mut self, ep: u8) {
        if !self.stalled.contains(&ep) {
            self.stalled.push(ep);
        }
    }

    fn clear_stall(&mut self, ep: u8) {
        self.stalled.retain(|e| *e != ep);
    }

    fn is_stalled(&self, ep: u8) -> bool {
        self.stalled.contains(&ep)
    }

    fn set_address(&mut self, address: u8) {
        self.address = Some(address);
    }

    fn open_endpoint(&mut self, ep: u8, kind: EndpointKind, max_packet: u16) {
        self.opened.push((ep, kind, max_packet));
    }

    fn close_endpoint(&mut self, ep: u8) {
        self.closed.push(ep);
    }
}

/// Records every bulk IN transfer.
#[derive(Default)]
pub struct VecSink {
    pub sent: Vec<Vec<u8>>,
}

impl BulkSink for VecSink {
    fn send(&mut self, data: &[u8]) {
        self.sent.push(data.to_vec());
    }
}

// =============================================================================
// CAN
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanCall {
    Stop(usize),
    Init(usize, ChannelConfig),
    Filter(usize, FilterKind),
    Start(usize),
    EnableRx(usize),
}

/// CAN controller bank recording calls, with scripted receive FIFOs.
#[derive(Default)]
pub struct MockCan {
    pub calls: Vec<CanCall>,
    pub transmitted: Vec<(usize, CanHeader, Vec<u8>)>,
    pub rx: [VecDeque<CanFrame>; 3],
    pub fail_init: bool,
    pub fail_transmit: bool,
}

impl CanDriver for MockCan {
    fn stop(&mut self, channel: usize) -> Result<(), CanError> {
        self.calls.push(CanCall::Stop(channel));
        Ok(())
    }

    fn init(&mut self, channel: usize, config: &ChannelConfig) -> Result<(), CanError> {
        self.calls.push(CanCall::Init(channel, *config));
        if self.fail_init {
            return Err(CanError::Controller);
        }
        Ok(())
    }

    fn configure_filter(&mut self, channel: usize, kind: FilterKind) -> Result<(), CanError> {
        self.calls.push(CanCall::Filter(channel, kind));
        Ok(())
    }

    fn start(&mut self, channel: usize) -> Result<(), CanError> {
        self.calls.push(CanCall::Start(channel));
        Ok(())
    }

    fn enable_rx_notification(&mut self, channel: usize) -> Result<(), CanError> {
        self.calls.push(CanCall::EnableRx(channel));
        Ok(())
    }

    fn transmit(
        &mut self,
        channel: usize,
        header: &CanHeader,
        data: &[u8],
    ) -> Result<(), CanError> {
        if self.fail_transmit {
            return Err(CanError::TxFull);
        }
        self.transmitted.push((channel, *header, data.to_vec()));
        Ok(())
    }

    fn rx_pending(&self, channel: usize) -> bool {
        !self.rx[channel].is_empty()
    }

    fn receive(&mut self, channel: usize) -> Option<CanFrame> {
        self.rx[channel].pop_front()
    }
}
