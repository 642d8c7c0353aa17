// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for protocol constants, the memory map and the frame codec.

use cangate_common::config::{
    MemoryLayout, APP_ADDR, APP_SIZE, BOOTLOADER_ADDR, BOOTLOADER_SIZE, BOOT_CONTROL_ADDR,
    ENTER_BOOTLOADER_MAGIC, EXIT_BOOTLOADER_MAGIC, FLASH_BASE, FLASH_SECTOR_SIZE, FLASH_SIZE,
    MAX_RETRIES, PARAM_ADDR, PARAM_SIZE, PROTOCOL_TIMEOUT_MS, RAM_SIZE, RAM_START,
};
use cangate_common::crc32;
use cangate_common::download::{Command, InfoKind, ProtocolFrame, NAK_ALL_SEQ};

// --- Flash layout constants tests ---

#[test]
fn test_flash_base_address() {
    assert_eq!(FLASH_BASE, 0x1000_0000);
    assert_eq!(BOOTLOADER_ADDR, FLASH_BASE);
}

#[test]
fn test_application_address() {
    assert_eq!(APP_ADDR, 0x1001_0000);
    assert_eq!(APP_ADDR + APP_SIZE, FLASH_BASE + FLASH_SIZE);
}

#[test]
fn test_regions_are_sector_aligned() {
    assert_eq!(PARAM_ADDR % FLASH_SECTOR_SIZE, 0);
    assert_eq!(APP_ADDR % FLASH_SECTOR_SIZE, 0);
}

#[test]
fn test_params_sit_between_bootloader_and_application() {
    assert!(PARAM_ADDR >= BOOTLOADER_ADDR + BOOTLOADER_SIZE);
    assert!(PARAM_ADDR + PARAM_SIZE <= APP_ADDR);
}

#[test]
fn test_boot_control_word_in_ram() {
    assert!(BOOT_CONTROL_ADDR >= RAM_START);
    assert!(BOOT_CONTROL_ADDR + 4 <= RAM_START + RAM_SIZE);
    assert_eq!(BOOT_CONTROL_ADDR % 4, 0);
    assert_ne!(ENTER_BOOTLOADER_MAGIC, EXIT_BOOTLOADER_MAGIC);
}

#[test]
fn test_layout_regions() {
    let layout = MemoryLayout::RP2040;
    assert!(layout.application.contains(APP_ADDR));
    assert!(!layout.application.contains(PARAM_ADDR));
    assert!(layout.application.contains_range(APP_ADDR, APP_SIZE));
    assert!(!layout.application.contains_range(APP_ADDR, APP_SIZE + 1));
    assert_eq!(layout.ram.end(), 0x2004_2000);
}

#[test]
fn test_protocol_timing() {
    assert_eq!(PROTOCOL_TIMEOUT_MS, 5000);
    assert_eq!(MAX_RETRIES, 3);
}

// --- CRC tests ---

#[test]
fn test_crc32_check_value() {
    assert_eq!(crc32::checksum(b"123456789"), 0xCBF4_3926);
}

// --- Command tests ---

#[test]
fn test_command_codes() {
    assert_eq!(Command::Start as u8, 0x01);
    assert_eq!(Command::Data as u8, 0x02);
    assert_eq!(Command::End as u8, 0x03);
    assert_eq!(Command::Info as u8, 0x04);
    assert_eq!(Command::Ack as u8, 0x06);
    assert_eq!(Command::Nak as u8, 0x15);
    assert_eq!(Command::Cancel as u8, 0x18);
}

#[test]
fn test_unknown_command_code() {
    assert_eq!(Command::try_from(0x05), Err(0x05));
    assert_eq!(InfoKind::try_from(0), Err(0));
}

// --- Frame codec tests ---

#[test]
fn test_frame_layout() {
    let frame = ProtocolFrame::new(Command::Data, 0x1234, &[0xAA, 0xBB, 0xCC, 0xDD]);
    assert_eq!(
        frame.encode(),
        [0x02, 0x34, 0x12, 4, 0xAA, 0xBB, 0xCC, 0xDD]
    );
}

#[test]
fn test_nak_all_uses_reserved_sequence() {
    let raw = ProtocolFrame::nak_all().encode();
    assert_eq!(raw, [0x15, 0xFF, 0xFF, 0, 0, 0, 0, 0]);
    assert_eq!(ProtocolFrame::parse(&raw).seq, NAK_ALL_SEQ);
}

#[test]
fn test_parse_clamps_data_len() {
    let frame = ProtocolFrame::parse(&[0x02, 0, 0, 9, 1, 2, 3, 4]);
    assert_eq!(frame.data_len, 4);
    assert_eq!(frame.word(), Some(0x0403_0201));
}

#[test]
fn test_parse_zeroes_bytes_past_data_len() {
    let frame = ProtocolFrame::parse(&[0x04, 1, 0, 1, 2, 0xEE, 0xEE, 0xEE]);
    assert_eq!(frame.payload(), &[2]);
    assert_eq!(frame.data, [2, 0, 0, 0]);
    assert_eq!(frame.word(), None);
}

#[test]
fn test_payload_is_truncated_to_four_bytes() {
    let frame = ProtocolFrame::new(Command::Info, 0, &[1, 2, 3, 4, 5, 6]);
    assert_eq!(frame.data_len, 4);
    assert_eq!(frame.payload(), &[1, 2, 3, 4]);
}
