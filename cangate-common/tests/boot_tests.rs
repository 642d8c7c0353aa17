// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the boot decision.

mod common;

use cangate_common::boot::{
    decide_boot, spin_action, BootDecision, SpinAction, StayReason, VectorTable,
};
use cangate_common::config::{
    MemoryLayout, APP_ADDR, APP_SIZE, ENTER_BOOTLOADER_MAGIC, EXIT_BOOTLOADER_MAGIC, RAM_SIZE,
    RAM_START,
};
use cangate_common::download::ProtocolStatus;
use common::MockFlash;

const LAYOUT: MemoryLayout = MemoryLayout::RP2040;

fn make_vector_table() -> VectorTable {
    VectorTable {
        initial_sp: RAM_START + RAM_SIZE,
        reset_vector: APP_ADDR + 0x0101,
    }
}

// =============================================================================
// VectorTable tests
// =============================================================================

#[test]
fn test_vector_table_read_from_flash() {
    let mut flash = MockFlash::new(APP_ADDR, 256);
    flash.write_bytes(APP_ADDR, &0x2004_2000u32.to_le_bytes());
    flash.write_bytes(APP_ADDR + 4, &0x1001_00C1u32.to_le_bytes());

    let vt = VectorTable::read(&flash, &LAYOUT).unwrap();

    assert_eq!(vt.initial_sp, 0x2004_2000);
    assert_eq!(vt.reset_vector, 0x1001_00C1);
    assert!(vt.is_plausible(&LAYOUT));
}

#[test]
fn test_erased_image_is_not_plausible() {
    let flash = MockFlash::new(APP_ADDR, 256);
    let vt = VectorTable::read(&flash, &LAYOUT).unwrap();
    assert!(!vt.is_plausible(&LAYOUT));
}

#[test]
fn test_stack_pointer_at_top_of_ram_is_accepted() {
    assert!(make_vector_table().is_plausible(&LAYOUT));
}

#[test]
fn test_stack_pointer_outside_ram_is_rejected() {
    let mut vt = make_vector_table();
    vt.initial_sp = RAM_START + RAM_SIZE + 4;
    assert!(!vt.is_plausible(&LAYOUT));

    vt.initial_sp = RAM_START - 4;
    assert!(!vt.is_plausible(&LAYOUT));
}

#[test]
fn test_even_reset_vector_is_rejected() {
    let mut vt = make_vector_table();
    vt.reset_vector = APP_ADDR + 0x0100;
    assert!(!vt.is_plausible(&LAYOUT));
}

#[test]
fn test_reset_vector_outside_application_is_rejected() {
    let mut vt = make_vector_table();
    vt.reset_vector = APP_ADDR - 0xFF;
    assert!(!vt.is_plausible(&LAYOUT));

    vt.reset_vector = APP_ADDR + APP_SIZE + 1;
    assert!(!vt.is_plausible(&LAYOUT));
}

#[test]
fn test_erased_words_are_rejected() {
    let mut vt = make_vector_table();
    vt.reset_vector = 0xFFFF_FFFF;
    assert!(!vt.is_plausible(&LAYOUT));

    let mut vt = make_vector_table();
    vt.initial_sp = 0xFFFF_FFFF;
    assert!(!vt.is_plausible(&LAYOUT));
}

// =============================================================================
// decide_boot tests
// =============================================================================

#[test]
fn test_valid_image_without_request_jumps() {
    let vt = make_vector_table();
    assert_eq!(
        decide_boot(Some(&vt), &LAYOUT, 0),
        BootDecision::JumpToApplication
    );
    assert_eq!(
        decide_boot(Some(&vt), &LAYOUT, EXIT_BOOTLOADER_MAGIC),
        BootDecision::JumpToApplication
    );
}

#[test]
fn test_enter_request_keeps_bootloader_resident() {
    let vt = make_vector_table();
    assert_eq!(
        decide_boot(Some(&vt), &LAYOUT, ENTER_BOOTLOADER_MAGIC),
        BootDecision::StayResident(StayReason::Requested)
    );
}

#[test]
fn test_invalid_image_keeps_bootloader_resident() {
    let mut vt = make_vector_table();
    vt.reset_vector &= !1;
    assert_eq!(
        decide_boot(Some(&vt), &LAYOUT, 0),
        BootDecision::StayResident(StayReason::InvalidImage)
    );
    assert_eq!(
        decide_boot(None, &LAYOUT, 0),
        BootDecision::StayResident(StayReason::InvalidImage)
    );
}

// =============================================================================
// spin_action tests
// =============================================================================

#[test]
fn test_completion_jumps_to_application() {
    assert_eq!(
        spin_action(ProtocolStatus::Complete),
        SpinAction::JumpToApplication
    );
}

#[test]
fn test_reset_request_resets() {
    assert_eq!(spin_action(ProtocolStatus::ResetRequested), SpinAction::Reset);
}

#[test]
fn test_other_statuses_keep_polling() {
    for status in [
        ProtocolStatus::Ok,
        ProtocolStatus::Busy,
        ProtocolStatus::Invalid,
        ProtocolStatus::Error,
        ProtocolStatus::Timeout,
        ProtocolStatus::VerifyFailed,
    ] {
        assert_eq!(spin_action(status), SpinAction::Continue);
    }
}
