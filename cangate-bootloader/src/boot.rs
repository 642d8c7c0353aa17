// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot path: read the boot control word and the application vector table,
//! decide, and hand the CPU over to the application.

use cangate_common::boot::{decide_boot, BootDecision, StayReason, VectorTable};
use cangate_common::config::{MemoryLayout, EXIT_BOOTLOADER_MAGIC};
use cangate_common::rp2040::{self, Rp2040Flash};

/// Decide whether to start the application.
pub fn check_application(flash: &Rp2040Flash, layout: &MemoryLayout) -> BootDecision {
    let control_word = rp2040::read_boot_control();
    let vector_table = VectorTable::read(flash, layout).ok();

    if let Some(vt) = vector_table {
        defmt::println!(
            "Application vectors: sp=0x{:08x} reset=0x{:08x}, control=0x{:08x}",
            vt.initial_sp,
            vt.reset_vector,
            control_word
        );
    }

    let decision = decide_boot(vector_table.as_ref(), layout, control_word);
    if decision == BootDecision::StayResident(StayReason::Requested) {
        // Consume the request so the reset after an update boots the new image.
        rp2040::write_boot_control(EXIT_BOOTLOADER_MAGIC);
    }
    decision
}

/// Jump to the application if its vector table is plausible.
/// Returns when it is not.
pub fn try_jump(flash: &Rp2040Flash, layout: &MemoryLayout) {
    match VectorTable::read(flash, layout) {
        Ok(vt) if vt.is_plausible(layout) => unsafe { jump_to_application(&vt, layout) },
        _ => defmt::println!("No valid application to start"),
    }
}

/// # Safety
/// `vt` must be the validated vector table of the image at `layout.application`.
pub unsafe fn jump_to_application(vt: &VectorTable, layout: &MemoryLayout) -> ! {
    rp2040::write_boot_control(EXIT_BOOTLOADER_MAGIC);

    prepare_for_handoff();
    relocate_vector_table(layout.application.start);
    jump(vt.initial_sp, vt.reset_vector);
}

/// Quiet the NVIC. Clocks are left configured, the application's HAL
/// reinitializes them.
unsafe fn prepare_for_handoff() {
    cortex_m::interrupt::disable();

    // Clear all pending interrupts in NVIC
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);

    // Disable all NVIC interrupts
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);

    // SysTick off, the application sets up its own
    const SYST_CSR: *mut u32 = 0xE000_E010 as *mut u32;
    SYST_CSR.write_volatile(0);
}

unsafe fn relocate_vector_table(base: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(base);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
