// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host frame carried over the bulk endpoints.
//!
//! Layout: echo_id u32, can_id u32, can_dlc u8, channel u8, flags u8,
//! reserved u8, then up to 64 data bytes. `can_dlc` holds the byte length.

pub const HOST_FRAME_HEADER_SIZE: usize = 12;
pub const HOST_FRAME_DATA_SIZE: usize = 64;

/// Shortest bulk OUT transfer accepted: header plus a classic payload.
pub const HOST_FRAME_MIN_SIZE: usize = HOST_FRAME_HEADER_SIZE + 8;

/// Bytes sent for a frame with `payload_len` data bytes: header, payload and
/// the 4-byte timestamp slot.
pub const fn host_frame_wire_len(payload_len: usize) -> usize {
    HOST_FRAME_HEADER_SIZE + 4 + payload_len
}

/// Largest transfer produced by [`HostFrame::encode`].
pub const HOST_FRAME_MAX_WIRE_SIZE: usize = host_frame_wire_len(HOST_FRAME_DATA_SIZE);

const DLC_TO_LEN: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

/// Payload length of DLC code `dlc`. Codes above 15 count as 8 bytes.
pub fn dlc_to_len(dlc: u8) -> u8 {
    DLC_TO_LEN.get(dlc as usize).copied().unwrap_or(8)
}

/// DLC code of a payload length. Lengths with no code map to 8.
pub fn len_to_dlc(len: u8) -> u8 {
    DLC_TO_LEN
        .iter()
        .position(|&l| l == len)
        .map(|code| code as u8)
        .unwrap_or(8)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostFrame {
    pub echo_id: u32,
    pub can_id: u32,
    pub can_dlc: u8,
    pub channel: u8,
    pub flags: u8,
    pub reserved: u8,
    pub data: [u8; HOST_FRAME_DATA_SIZE],
}

impl Default for HostFrame {
    fn default() -> Self {
        Self {
            echo_id: 0,
            can_id: 0,
            can_dlc: 0,
            channel: 0,
            flags: 0,
            reserved: 0,
            data: [0; HOST_FRAME_DATA_SIZE],
        }
    }
}

impl HostFrame {
    /// Parse a bulk OUT transfer. Returns `None` below [`HOST_FRAME_MIN_SIZE`].
    /// Data bytes not present in `buf` read as zero.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < HOST_FRAME_MIN_SIZE {
            return None;
        }
        let mut frame = Self {
            echo_id: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            can_id: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            can_dlc: buf[8],
            channel: buf[9],
            flags: buf[10],
            reserved: buf[11],
            ..Self::default()
        };
        let body = &buf[HOST_FRAME_HEADER_SIZE..];
        let n = body.len().min(HOST_FRAME_DATA_SIZE);
        frame.data[..n].copy_from_slice(&body[..n]);
        Some(frame)
    }

    /// Payload length after snapping `can_dlc` to a valid CAN length.
    pub fn payload_len(&self) -> usize {
        dlc_to_len(len_to_dlc(self.can_dlc)) as usize
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.payload_len()]
    }

    /// Serialize into `out` (at least [`HOST_FRAME_MAX_WIRE_SIZE`] bytes).
    /// Returns the number of bytes to transmit.
    pub fn encode(&self, out: &mut [u8]) -> usize {
        let payload_len = self.payload_len();
        let len = host_frame_wire_len(payload_len).min(out.len());
        out[..len].fill(0);

        let mut header = [0u8; HOST_FRAME_HEADER_SIZE];
        header[0..4].copy_from_slice(&self.echo_id.to_le_bytes());
        header[4..8].copy_from_slice(&self.can_id.to_le_bytes());
        header[8] = self.can_dlc;
        header[9] = self.channel;
        header[10] = self.flags;
        header[11] = self.reserved;

        let h = HOST_FRAME_HEADER_SIZE.min(len);
        out[..h].copy_from_slice(&header[..h]);
        let d = payload_len.min(len - h);
        out[h..h + d].copy_from_slice(&self.data[..d]);
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dlc_table_covers_fd_lengths() {
        for (code, len) in DLC_TO_LEN.iter().enumerate() {
            assert_eq!(len_to_dlc(*len), code as u8);
            assert_eq!(dlc_to_len(code as u8), *len);
        }
        assert_eq!(len_to_dlc(9), 8);
        assert_eq!(len_to_dlc(65), 8);
        assert_eq!(dlc_to_len(16), 8);
    }

    #[test]
    fn test_parse_rejects_short_transfer() {
        assert!(HostFrame::parse(&[0u8; HOST_FRAME_MIN_SIZE - 1]).is_none());
        assert!(HostFrame::parse(&[0u8; HOST_FRAME_MIN_SIZE]).is_some());
    }

    #[test]
    fn test_encode_sends_header_payload_and_timestamp_slot() {
        let mut frame = HostFrame {
            echo_id: 7,
            can_id: 0x123,
            can_dlc: 3,
            ..HostFrame::default()
        };
        frame.data[..3].copy_from_slice(&[0xAA, 0xBB, 0xCC]);

        let mut out = [0xEEu8; HOST_FRAME_MAX_WIRE_SIZE];
        let n = frame.encode(&mut out);
        assert_eq!(n, 16 + 3);
        assert_eq!(&out[0..4], &7u32.to_le_bytes());
        assert_eq!(&out[12..15], &[0xAA, 0xBB, 0xCC]);
        assert_eq!(&out[15..19], &[0, 0, 0, 0]);
    }
}
