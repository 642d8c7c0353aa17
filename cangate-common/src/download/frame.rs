// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Wire codec: `cmd: u8, seq: u16 LE, data_len: u8, data: [u8; 4]`.

pub const FRAME_SIZE: usize = 8;
pub const MAX_PAYLOAD: usize = 4;

/// Sequence used by NAKs that refer to no particular frame.
pub const NAK_ALL_SEQ: u16 = 0xFFFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Start = 0x01,
    Data = 0x02,
    End = 0x03,
    Info = 0x04,
    Ack = 0x06,
    Nak = 0x15,
    Cancel = 0x18,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Start),
            0x02 => Ok(Self::Data),
            0x03 => Ok(Self::End),
            0x04 => Ok(Self::Info),
            0x06 => Ok(Self::Ack),
            0x15 => Ok(Self::Nak),
            0x18 => Ok(Self::Cancel),
            other => Err(other),
        }
    }
}

/// INFO sub-type, selected by the first payload byte of the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InfoKind {
    Version = 1,
    Series = 2,
    Spec = 3,
}

impl TryFrom<u8> for InfoKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Version),
            2 => Ok(Self::Series),
            3 => Ok(Self::Spec),
            other => Err(other),
        }
    }
}

/// One protocol frame. `cmd` stays raw so unknown commands can be answered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProtocolFrame {
    pub cmd: u8,
    pub seq: u16,
    pub data_len: u8,
    pub data: [u8; MAX_PAYLOAD],
}

impl ProtocolFrame {
    /// Build a frame, keeping at most [`MAX_PAYLOAD`] bytes of `payload`.
    pub fn new(cmd: Command, seq: u16, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_PAYLOAD);
        let mut data = [0u8; MAX_PAYLOAD];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            cmd: cmd as u8,
            seq,
            data_len: len as u8,
            data,
        }
    }

    /// Decode a raw frame. `data_len` is clamped and bytes past it are zeroed.
    pub fn parse(raw: &[u8; FRAME_SIZE]) -> Self {
        let data_len = raw[3].min(MAX_PAYLOAD as u8);
        let mut data = [0u8; MAX_PAYLOAD];
        data[..data_len as usize].copy_from_slice(&raw[4..4 + data_len as usize]);
        Self {
            cmd: raw[0],
            seq: u16::from_le_bytes([raw[1], raw[2]]),
            data_len,
            data,
        }
    }

    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let seq = self.seq.to_le_bytes();
        [
            self.cmd,
            seq[0],
            seq[1],
            self.data_len,
            self.data[0],
            self.data[1],
            self.data[2],
            self.data[3],
        ]
    }

    pub fn command(&self) -> Option<Command> {
        Command::try_from(self.cmd).ok()
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.data_len as usize]
    }

    /// Payload as a little-endian word, when it carries a full one.
    pub fn word(&self) -> Option<u32> {
        (self.data_len as usize == MAX_PAYLOAD).then(|| u32::from_le_bytes(self.data))
    }

    pub fn ack(seq: u16) -> Self {
        Self::new(Command::Ack, seq, &[])
    }

    pub fn nak(seq: u16) -> Self {
        Self::new(Command::Nak, seq, &[])
    }

    pub fn nak_all() -> Self {
        Self::nak(NAK_ALL_SEQ)
    }

    pub fn info(seq: u16, payload: &[u8]) -> Self {
        Self::new(Command::Info, seq, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clamps_data_len() {
        let frame = ProtocolFrame::parse(&[0x02, 0x34, 0x12, 9, 1, 2, 3, 4]);
        assert_eq!(frame.command(), Some(Command::Data));
        assert_eq!(frame.seq, 0x1234);
        assert_eq!(frame.data_len, 4);
        assert_eq!(frame.payload(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_zeroes_bytes_past_data_len() {
        let frame = ProtocolFrame::parse(&[0x04, 0, 0, 1, 3, 0xAA, 0xBB, 0xCC]);
        assert_eq!(frame.data, [3, 0, 0, 0]);
        assert_eq!(frame.word(), None);
    }

    #[test]
    fn test_nak_all_encoding() {
        assert_eq!(
            ProtocolFrame::nak_all().encode(),
            [0x15, 0xFF, 0xFF, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_unknown_command() {
        let frame = ProtocolFrame::parse(&[0x7E, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(frame.command(), None);
        assert_eq!(Command::try_from(0x7E), Err(0x7E));
    }
}
