// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Resident mode: USB CDC transport feeding the download protocol.
//!
//! The serial endpoint fills the byte ring, the protocol controller drains
//! it one frame per iteration and the resulting status decides between
//! carrying on, starting the new image and resetting.

use cangate_common::boot::{spin_action, SpinAction};
use cangate_common::config::{BootloaderIdentity, MemoryLayout};
use cangate_common::rp2040::{self, Rp2040Flash};
use cangate_common::{ProtocolController, ProtocolStatus};
use embedded_hal::digital::OutputPin;
use heapless::spsc::Queue;
use rp2040_hal as hal;
use usb_device::class_prelude::UsbBusAllocator;

use crate::boot;
use crate::peripherals::{self, Peripherals};
use crate::usb_transport::UsbTransport;

/// Receive ring size. Holds 63 whole frames.
const RING_SIZE: usize = 512;

/// Enter resident mode: initialize USB and run the download loop.
pub fn enter_update_mode(p: &mut Peripherals, flash: Rp2040Flash) -> ! {
    defmt::println!("Update mode");

    cangate_common::blink(&mut p.led_pin, &mut p.timer, 10, 50);

    let Some(mut usb) = p.usb.take() else {
        defmt::println!("USB peripherals unavailable, resetting");
        rp2040::reboot();
    };

    let usb_bus = peripherals::store_usb_bus(UsbBusAllocator::new(hal::usb::UsbBus::new(
        usb.regs,
        usb.dpram,
        usb.clock,
        true,
        &mut usb.resets,
    )));
    let mut transport = UsbTransport::new(usb_bus);

    defmt::println!("USB CDC initialized, waiting for download");
    p.led_pin.set_high().ok();

    let layout = MemoryLayout::RP2040;
    let controller =
        ProtocolController::new(flash, layout.application, BootloaderIdentity::DEFAULT);
    run_update_loop(&mut transport, controller, &p.timer, &layout)
}

fn run_update_loop(
    transport: &mut UsbTransport,
    mut controller: ProtocolController<Rp2040Flash>,
    timer: &hal::Timer,
    layout: &MemoryLayout,
) -> ! {
    let mut ring: Queue<u8, RING_SIZE> = Queue::new();
    let (mut producer, mut consumer) = ring.split();
    let mut last_ms = now_ms(timer);

    loop {
        transport.poll();
        transport.receive_into(&mut producer);

        let now = now_ms(timer);
        controller.update_time(now.wrapping_sub(last_ms));
        last_ms = now;

        let status = controller.process(&mut consumer, transport);
        log_status(status);

        match spin_action(status) {
            SpinAction::Continue => {}
            SpinAction::JumpToApplication => {
                defmt::println!("Download complete, starting application");
                transport.flush();
                boot::try_jump(controller.flash(), layout);
                rp2040::reboot();
            }
            SpinAction::Reset => {
                defmt::println!("Resetting");
                transport.flush();
                rp2040::reboot();
            }
        }
    }
}

fn log_status(status: ProtocolStatus) {
    match status {
        ProtocolStatus::Ok | ProtocolStatus::Busy => {}
        ProtocolStatus::Timeout => defmt::println!("Download timeout, NAK resent"),
        ProtocolStatus::VerifyFailed => defmt::println!("Image verification failed"),
        ProtocolStatus::Error => defmt::println!("Download failed"),
        other => defmt::debug!("download status {}", other),
    }
}

fn now_ms(timer: &hal::Timer) -> u32 {
    (timer.get_counter().ticks() / 1000) as u32
}
