// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! USB CDC transport for the download protocol.
//!
//! Received bytes go into the download ring; replies are written straight to
//! the serial port. Frames are not delimited: the ring hands them out in
//! fixed 8-byte units.

use cangate_common::download::{ReplyLink, FRAME_SIZE};
use heapless::spsc::Producer;
use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_serial::SerialPort;

const USB_PACKET_SIZE: usize = 64;

pub struct UsbTransport {
    serial: SerialPort<'static, UsbBus>,
    usb_dev: UsbDevice<'static, UsbBus>,
}

impl UsbTransport {
    pub fn new(usb_bus: &'static UsbBusAllocator<UsbBus>) -> Self {
        let serial = SerialPort::new(usb_bus);
        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x2E8A, 0x000A))
            .strings(&[StringDescriptors::default()
                .manufacturer("cangate")
                .product("cangate bootloader")
                .serial_number("0001")])
            .unwrap()
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();

        Self { serial, usb_dev }
    }

    /// Poll USB device. Must be called frequently.
    pub fn poll(&mut self) -> bool {
        self.usb_dev.poll(&mut [&mut self.serial])
    }

    /// Move received bytes into the ring. Nothing is read while the ring is
    /// full, so the host is held off by USB flow control instead of losing data.
    pub fn receive_into<const N: usize>(&mut self, ring: &mut Producer<'_, u8, N>) -> usize {
        let room = ring.capacity() - ring.len();
        if room == 0 {
            return 0;
        }

        let mut tmp = [0u8; USB_PACKET_SIZE];
        let want = room.min(tmp.len());
        match self.serial.read(&mut tmp[..want]) {
            Ok(count) => {
                for &byte in &tmp[..count] {
                    // Cannot fail, `want` never exceeds the free space.
                    let _ = ring.enqueue(byte);
                }
                count
            }
            Err(_) => 0,
        }
    }

    /// Keep servicing USB for a while so queued replies reach the host.
    pub fn flush(&mut self) {
        let _ = self.serial.flush();
        for _ in 0..100 {
            self.poll();
            cortex_m::asm::delay(10_000);
        }
    }
}

impl ReplyLink for UsbTransport {
    fn send(&mut self, frame: &[u8; FRAME_SIZE]) {
        let mut offset = 0;
        while offset < frame.len() {
            match self.serial.write(&frame[offset..]) {
                Ok(n) => offset += n,
                Err(UsbError::WouldBlock) => {
                    self.poll();
                }
                Err(_) => break,
            }
        }
    }
}
