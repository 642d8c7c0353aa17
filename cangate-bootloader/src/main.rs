// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! cangate bootloader for RP2040: starts the application or stays resident
//! for a firmware download over USB CDC.

#![no_std]
#![no_main]

mod boot;
mod peripherals;
mod update;
mod usb_transport;

use cangate_common::boot::BootDecision;
use cangate_common::config::MemoryLayout;
use cangate_common::rp2040::Rp2040Flash;
use defmt_rtt as _;
use panic_probe as _;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("Bootloader init");

    let mut p = peripherals::init();
    cangate_common::blink(&mut p.led_pin, &mut p.timer, 3, 200);

    let flash = unsafe { Rp2040Flash::new() };
    let layout = MemoryLayout::RP2040;

    match boot::check_application(&flash, &layout) {
        BootDecision::JumpToApplication => {
            defmt::println!("Jumping to application at 0x{:08x}", layout.application.start);
            boot::try_jump(&flash, &layout);
            update::enter_update_mode(&mut p, flash)
        }
        BootDecision::StayResident(reason) => {
            defmt::println!("Staying resident: {}", reason);
            update::enter_update_mode(&mut p, flash)
        }
    }
}
