// Copyright (c) 2026 ADNT Sarl <info@adnt.io>
// SPDX-License-Identifier: MIT

//! cangate application: gs_usb USB-CAN adapter on RP2040.
//!
//! Holding GP2 low at power-up requests the bootloader instead.

#![no_std]
#![no_main]

mod can;
mod usb_bus;

use cangate_common::config::{CanCapabilities, MemoryLayout, NUM_CAN_CHANNELS};
use cangate_common::gs_usb::GsUsb;
use cangate_common::param::ParamStore;
use cangate_common::rp2040::{self, Rp2040Flash};
use cangate_common::usb::UsbDevice;
use cangate_common::DeviceIdentity;
use defmt_rtt as _;
use embedded_hal::digital::{InputPin, OutputPin};
use panic_probe as _;
use rp2040_hal as hal;

use crate::can::VirtualCan;
use crate::usb_bus::Rp2040UsbDriver;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

/// Identity from the parameter blob, or the defaults when there is none.
fn load_identity() -> DeviceIdentity {
    let flash = unsafe { Rp2040Flash::new() };
    let identity = DeviceIdentity::default();

    let store = match ParamStore::new(flash, MemoryLayout::RP2040.params) {
        Ok(store) => store,
        Err(e) => {
            defmt::println!("Parameter store unavailable: {}", e);
            return identity;
        }
    };

    let mut blob = [0u8; 64];
    match store.read(&mut blob) {
        Ok(n) => {
            defmt::println!("Parameters v{} ({} bytes)", store.version(), n);
            identity.with_overrides(&blob[..n])
        }
        Err(e) => {
            defmt::println!("No parameters: {}", e);
            identity
        }
    }
}

#[entry]
fn main() -> ! {
    defmt::println!("Firmware started!");

    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let mut timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let mut led_pin = pins.gpio25.into_push_pull_output();
    let mut gp2 = pins.gpio2.into_pull_up_input();

    if gp2.is_low().unwrap_or(false) {
        defmt::println!("GP2 low, rebooting to bootloader");
        rp2040::reboot_to_bootloader();
    }

    // Blink to signal firmware alive
    cangate_common::blink(&mut led_pin, &mut timer, 5, 100);

    let identity = load_identity();
    defmt::println!(
        "USB identity {:04x}:{:04x} serial {}",
        identity.vid,
        identity.pid,
        identity.serial.as_str()
    );

    let bus = hal::usb::UsbBus::new(
        pac.USBCTRL_REGS,
        pac.USBCTRL_DPRAM,
        clocks.usb_clock,
        true,
        &mut pac.RESETS,
    );
    let driver = Rp2040UsbDriver::new(bus).unwrap();
    let gs_usb: GsUsb<_, NUM_CAN_CHANNELS> =
        GsUsb::new(VirtualCan::<NUM_CAN_CHANNELS>::new(), CanCapabilities::DEFAULT);
    let mut device = UsbDevice::new(driver, gs_usb, identity);

    defmt::println!("gs_usb ready, {} channels", NUM_CAN_CHANNELS);
    led_pin.set_high().ok();

    loop {
        device.poll();

        let (app, mut writer) = device.split();
        app.poll_can(&mut writer);
    }
}
