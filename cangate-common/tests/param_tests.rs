// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the CRC-checked parameter store.

mod common;

use cangate_common::config::{DeviceIdentity, Region, PARAM_ADDR, PARAM_SIZE};
use cangate_common::crc32;
use cangate_common::error::ParamError;
use cangate_common::param::{ParamHeader, ParamStore, HEADER_SIZE, PARAM_MAGIC};
use common::MockFlash;

fn make_store() -> ParamStore<MockFlash> {
    ParamStore::new(
        MockFlash::new(PARAM_ADDR, 4096),
        Region::new(PARAM_ADDR, PARAM_SIZE),
    )
    .unwrap()
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_region_must_hold_more_than_header() {
    let flash = MockFlash::new(PARAM_ADDR, 4096);
    let result = ParamStore::new(flash, Region::new(PARAM_ADDR, HEADER_SIZE as u32));
    assert!(matches!(result, Err(ParamError::InvalidArgument)));
}

#[test]
fn test_region_must_be_word_aligned() {
    let flash = MockFlash::new(PARAM_ADDR, 4096);
    let result = ParamStore::new(flash, Region::new(PARAM_ADDR + 2, 256));
    assert!(matches!(result, Err(ParamError::InvalidArgument)));
}

#[test]
fn test_max_length() {
    assert_eq!(make_store().max_length(), PARAM_SIZE as usize - HEADER_SIZE);
}

// =============================================================================
// Read / write
// =============================================================================

#[test]
fn test_blank_region_is_not_initialized() {
    let store = make_store();
    let mut buf = [0u8; 64];

    assert_eq!(store.read(&mut buf), Err(ParamError::NotInitialized));
    assert!(!store.is_valid());
    assert_eq!(store.version(), 0);
}

#[test]
fn test_write_then_read() {
    let mut store = make_store();
    let data = b"vid-pid-serial";

    store.write(data).unwrap();

    let mut buf = [0u8; 64];
    let n = store.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], data);
    assert!(store.is_valid());
    assert_eq!(store.version(), 1);
}

#[test]
fn test_header_layout() {
    let mut store = make_store();
    store.write(&[1, 2, 3]).unwrap();

    let header = store.header().unwrap();
    assert_eq!(header.magic, PARAM_MAGIC);
    assert_eq!(header.length, 3);
    assert_eq!(header.crc32, crc32::checksum(&[1, 2, 3]));

    let flash = store.into_inner();
    assert_eq!(flash.bytes(PARAM_ADDR, 4), b"ARAP");
    // Tail of the last word stays erased.
    assert_eq!(flash.bytes(PARAM_ADDR + HEADER_SIZE as u32, 4), &[1, 2, 3, 0xFF]);
}

#[test]
fn test_header_bytes_roundtrip() {
    let header = ParamHeader {
        magic: PARAM_MAGIC,
        version: 3,
        crc32: 0x1234_5678,
        length: 10,
        reserved: [0; 4],
    };
    assert_eq!(ParamHeader::from_bytes(&header.to_bytes()), header);
}

#[test]
fn test_version_counts_up_on_each_write() {
    let mut store = make_store();
    store.write(&[1]).unwrap();
    store.write(&[2]).unwrap();
    store.write(&[3]).unwrap();
    assert_eq!(store.version(), 3);
}

#[test]
fn test_empty_write_is_rejected() {
    let mut store = make_store();
    assert_eq!(store.write(&[]), Err(ParamError::InvalidArgument));
}

#[test]
fn test_oversized_write_is_rejected() {
    let mut store = make_store();
    let data = vec![0u8; store.max_length() + 1];
    assert_eq!(store.write(&data), Err(ParamError::TooLarge(data.len())));
}

#[test]
fn test_read_into_short_buffer_fails() {
    let mut store = make_store();
    store.write(&[0u8; 32]).unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(store.read(&mut buf), Err(ParamError::TooLarge(32)));
}

#[test]
fn test_corrupted_payload_fails_crc() {
    let mut store = make_store();
    store.write(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();

    let mut flash = store.into_inner();
    flash.write_bytes(PARAM_ADDR + HEADER_SIZE as u32, &[0x00]);
    let store = ParamStore::new(flash, Region::new(PARAM_ADDR, PARAM_SIZE)).unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(store.read(&mut buf), Err(ParamError::CrcMismatch));
    assert!(!store.is_valid());
}

#[test]
fn test_erase_invalidates_blob() {
    let mut store = make_store();
    store.write(&[1, 2, 3, 4]).unwrap();

    store.erase().unwrap();

    assert!(!store.is_valid());
    assert_eq!(store.version(), 0);
}

#[test]
fn test_flash_failure_is_reported() {
    let mut store = make_store();
    let mut flash = store.into_inner();
    flash.fail_erase = true;
    store = ParamStore::new(flash, Region::new(PARAM_ADDR, PARAM_SIZE)).unwrap();

    assert!(matches!(store.write(&[1]), Err(ParamError::Flash(_))));
}

// =============================================================================
// Identity overrides
// =============================================================================

#[test]
fn test_identity_override_from_stored_blob() {
    let mut store = make_store();
    let mut blob = Vec::new();
    blob.extend_from_slice(&0x1209u16.to_le_bytes());
    blob.extend_from_slice(&0x2323u16.to_le_bytes());
    blob.extend_from_slice(b"CG-0042\0");
    store.write(&blob).unwrap();

    let mut buf = [0u8; 64];
    let n = store.read(&mut buf).unwrap();
    let identity = DeviceIdentity::default().with_overrides(&buf[..n]);

    assert_eq!(identity.vid, 0x1209);
    assert_eq!(identity.pid, 0x2323);
    assert_eq!(identity.serial.as_str(), "CG-0042");
}

#[test]
fn test_zero_ids_keep_defaults() {
    let identity = DeviceIdentity::default().with_overrides(&[0, 0, 0, 0]);
    assert_eq!(identity.vid, DeviceIdentity::DEFAULT_VID);
    assert_eq!(identity.pid, DeviceIdentity::DEFAULT_PID);
    assert_eq!(identity.serial.as_str(), "000000000001");
}

#[test]
fn test_short_blob_is_ignored() {
    let identity = DeviceIdentity::default().with_overrides(&[1, 2]);
    assert_eq!(identity, DeviceIdentity::default());
}
