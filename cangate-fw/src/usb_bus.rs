// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! `UsbDriver` on top of the rp2040-hal USB peripheral.
//!
//! The HAL bus is driven directly through the `usb_device::bus::UsbBus`
//! trait; no `UsbDevice` is built, the EP0 and bulk handling live in
//! `cangate_common::usb`. One `poll()` of the peripheral can report several
//! endpoints at once, so the resulting events are queued and handed out one
//! at a time.

use cangate_common::usb::{
    EndpointKind, UsbDriver, UsbEvent, BULK_BUF_SIZE, BULK_IN_EP, BULK_MAX_PACKET, BULK_OUT_EP,
    EP0_IN, EP0_MAX_PACKET, EP0_OUT,
};
use heapless::{Deque, Vec};
use rp2040_hal::usb::UsbBus;
use usb_device::bus::{PollResult, UsbBus as _};
use usb_device::endpoint::{EndpointAddress, EndpointType};
use usb_device::{UsbDirection, UsbError};

const MAX_ENDPOINTS: usize = 16;

pub struct Rp2040UsbDriver {
    bus: UsbBus,
    events: Deque<UsbEvent, 8>,
    /// Bulk OUT transfer being assembled from max-size packets.
    bulk_rx: Vec<u8, BULK_BUF_SIZE>,
    bulk_rx_expected: usize,
    bulk_open: bool,
}

impl Rp2040UsbDriver {
    /// Allocate EP0 and the bulk pair, then enable the peripheral.
    pub fn new(mut bus: UsbBus) -> Result<Self, UsbError> {
        let ep0 = EP0_MAX_PACKET as u16;
        bus.alloc_ep(
            UsbDirection::Out,
            Some(EndpointAddress::from(EP0_OUT)),
            EndpointType::Control,
            ep0,
            0,
        )?;
        bus.alloc_ep(
            UsbDirection::In,
            Some(EndpointAddress::from(EP0_IN)),
            EndpointType::Control,
            ep0,
            0,
        )?;
        bus.alloc_ep(
            UsbDirection::Out,
            Some(EndpointAddress::from(BULK_OUT_EP)),
            EndpointType::Bulk,
            BULK_MAX_PACKET,
            0,
        )?;
        bus.alloc_ep(
            UsbDirection::In,
            Some(EndpointAddress::from(BULK_IN_EP)),
            EndpointType::Bulk,
            BULK_MAX_PACKET,
            0,
        )?;
        bus.enable();

        Ok(Self {
            bus,
            events: Deque::new(),
            bulk_rx: Vec::new(),
            bulk_rx_expected: BULK_BUF_SIZE,
            bulk_open: false,
        })
    }

    fn fill_events(&mut self) {
        match self.bus.poll() {
            PollResult::None => {}
            PollResult::Reset => {
                self.bus.reset();
                self.events.clear();
                self.bulk_rx.clear();
                self.bulk_open = false;
                self.push(UsbEvent::Reset);
            }
            PollResult::Suspend => self.bus.suspend(),
            PollResult::Resume => self.bus.resume(),
            PollResult::Data {
                ep_out,
                ep_in_complete,
                ep_setup,
            } => {
                for index in 0..MAX_ENDPOINTS as u8 {
                    if ep_in_complete & (1 << index) != 0 {
                        self.push(UsbEvent::InComplete(index | 0x80));
                    }
                }
                if ep_setup & 1 != 0 {
                    self.read_setup();
                } else if ep_out & 1 != 0 {
                    self.read_ep0_out();
                }
                if ep_out & (1 << BULK_OUT_EP) != 0 {
                    self.read_bulk_out();
                }
            }
        }
    }

    fn read_setup(&mut self) {
        let mut raw = [0u8; 8];
        match self.bus.read(EndpointAddress::from(EP0_OUT), &mut raw) {
            Ok(8) => self.push(UsbEvent::Setup(raw)),
            Ok(n) => defmt::warn!("usb: short setup packet ({} bytes)", n),
            Err(_) => {}
        }
    }

    fn read_ep0_out(&mut self) {
        let mut buf = [0u8; EP0_MAX_PACKET];
        if let Ok(n) = self.bus.read(EndpointAddress::from(EP0_OUT), &mut buf) {
            let data = Vec::from_slice(&buf[..n]).unwrap_or_default();
            self.push(UsbEvent::Out { ep: EP0_OUT, data });
        }
    }

    /// A transfer ends with a short packet or once the armed length is reached.
    fn read_bulk_out(&mut self) {
        let mut buf = [0u8; BULK_MAX_PACKET as usize];
        let Ok(n) = self.bus.read(EndpointAddress::from(BULK_OUT_EP), &mut buf) else {
            return;
        };
        if !self.bulk_open {
            return;
        }
        if self.bulk_rx.extend_from_slice(&buf[..n]).is_err() {
            defmt::warn!("usb: bulk OUT transfer too long, dropped");
            self.bulk_rx.clear();
            return;
        }
        if n < BULK_MAX_PACKET as usize || self.bulk_rx.len() >= self.bulk_rx_expected {
            let data = core::mem::take(&mut self.bulk_rx);
            self.push(UsbEvent::Out {
                ep: BULK_OUT_EP,
                data,
            });
        }
    }

    fn push(&mut self, event: UsbEvent) {
        if self.events.push_back(event).is_err() {
            defmt::warn!("usb: event queue full");
        }
    }
}

impl UsbDriver for Rp2040UsbDriver {
    fn poll_event(&mut self) -> Option<UsbEvent> {
        if self.events.is_empty() {
            self.fill_events();
        }
        self.events.pop_front()
    }

    fn ep_transmit(&mut self, ep: u8, data: &[u8]) {
        if let Err(e) = self.bus.write(EndpointAddress::from(ep), data) {
            defmt::warn!("usb: write on 0x{:02x} failed: {}", ep, defmt::Debug2Format(&e));
        }
    }

    // The HAL re-arms OUT endpoints after every read; only the transfer
    // length is tracked here.
    fn ep_receive(&mut self, ep: u8, len: usize) {
        if ep == BULK_OUT_EP {
            self.bulk_rx_expected = len.clamp(1, BULK_BUF_SIZE);
        }
    }

    fn set_stall(&mut self, ep: u8) {
        self.bus.set_stalled(EndpointAddress::from(ep), true);
    }

    fn clear_stall(&mut self, ep: u8) {
        self.bus.set_stalled(EndpointAddress::from(ep), false);
    }

    fn is_stalled(&self, ep: u8) -> bool {
        self.bus.is_stalled(EndpointAddress::from(ep))
    }

    fn set_address(&mut self, address: u8) {
        self.bus.set_device_address(address);
    }

    fn open_endpoint(&mut self, ep: u8, kind: EndpointKind, _max_packet: u16) {
        if ep == BULK_OUT_EP && kind == EndpointKind::Bulk {
            self.bulk_open = true;
            self.bulk_rx.clear();
        }
    }

    fn close_endpoint(&mut self, ep: u8) {
        if ep == BULK_OUT_EP {
            self.bulk_open = false;
            self.bulk_rx.clear();
        }
    }
}
