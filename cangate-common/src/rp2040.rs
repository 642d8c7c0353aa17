// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! RP2040 flash driver and reboot helpers.
//!
//! On RP2040, flash operations (erase/program) require disabling XIP first.
//! The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash, so the
//! critical functions live in `.data` and call ROM pointers resolved up front.

use crate::config::{
    BOOT_CONTROL_ADDR, ENTER_BOOTLOADER_MAGIC, FLASH_BASE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE,
    FLASH_SIZE,
};
use crate::error::FlashError;
use crate::flash::FlashMemory;

const SECTOR_ERASE_CMD: u8 = 0x20;

type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

#[link_section = ".data"]
#[inline(never)]
unsafe fn ram_erase(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_SECTOR_SIZE, SECTOR_ERASE_CMD);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

#[link_section = ".data"]
#[inline(never)]
unsafe fn ram_program(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// On-chip QSPI flash, addressed through the XIP window.
pub struct Rp2040Flash {
    _private: (),
}

impl Rp2040Flash {
    /// Resolve the ROM flash routines.
    ///
    /// # Safety
    /// Call once, with XIP active, and keep a single instance: the driver
    /// disables interrupts and XIP while it erases or programs.
    pub unsafe fn new() -> Self {
        ROM_CONNECT_INTERNAL_FLASH = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE = core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
        Self { _private: () }
    }

    fn offset(addr: u32, len: u32) -> Result<u32, FlashError> {
        if addr < FLASH_BASE || addr - FLASH_BASE > FLASH_SIZE || len > FLASH_SIZE - (addr - FLASH_BASE)
        {
            return Err(FlashError::OutOfRange(addr));
        }
        Ok(addr - FLASH_BASE)
    }
}

impl FlashMemory for Rp2040Flash {
    fn erase(&mut self, addr: u32, len: u32) -> Result<(), FlashError> {
        let offset = Self::offset(addr, len)?;
        let start = offset - offset % FLASH_SECTOR_SIZE;
        let end = (offset + len).div_ceil(FLASH_SECTOR_SIZE) * FLASH_SECTOR_SIZE;
        if end > start {
            unsafe { ram_erase(start, end - start) };
        }
        Ok(())
    }

    fn program_word(&mut self, addr: u32, word: u32) -> Result<(), FlashError> {
        if addr % 4 != 0 {
            return Err(FlashError::Misaligned(addr));
        }
        let offset = Self::offset(addr, 4)?;

        // Programming only clears bits, so the rest of the page stays as is.
        let page_start = offset - offset % FLASH_PAGE_SIZE;
        let at = (offset - page_start) as usize;
        let mut page = [0xFFu8; FLASH_PAGE_SIZE as usize];
        page[at..at + 4].copy_from_slice(&word.to_le_bytes());
        unsafe { ram_program(page_start, page.as_ptr(), page.len()) };
        Ok(())
    }

    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        Self::offset(addr, buf.len() as u32)?;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = unsafe { ((addr + i as u32) as *const u8).read_volatile() };
        }
        Ok(())
    }
}

/// Current value of the boot control word.
pub fn read_boot_control() -> u32 {
    unsafe { (BOOT_CONTROL_ADDR as *const u32).read_volatile() }
}

pub fn write_boot_control(value: u32) {
    unsafe { (BOOT_CONTROL_ADDR as *mut u32).write_volatile(value) };
}

/// Reboot to bootloader update mode.
///
/// This writes the magic to the boot control word and triggers a system
/// reset. The bootloader will detect it and stay resident.
pub fn reboot_to_bootloader() -> ! {
    write_boot_control(ENTER_BOOTLOADER_MAGIC);

    // Small delay to ensure write completes
    cortex_m::asm::delay(100_000);

    cortex_m::peripheral::SCB::sys_reset();
}

/// Reboot normally.
pub fn reboot() -> ! {
    cortex_m::peripheral::SCB::sys_reset();
}
