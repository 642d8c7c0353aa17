// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! CRC-32/ISO-HDLC: reflected polynomial 0xEDB88320, all-ones init, final complement.

use crc::{Crc, CRC_32_ISO_HDLC};

pub const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC over a byte slice.
pub fn checksum(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_vector() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let data = [0xA5u8; 1000];
        let mut digest = CRC32.digest();
        for chunk in data.chunks(256) {
            digest.update(chunk);
        }
        assert_eq!(digest.finalize(), checksum(&data));
    }
}
