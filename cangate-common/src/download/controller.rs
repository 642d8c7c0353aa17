// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Download protocol state machine.
//!
//! One frame is consumed per [`ProtocolController::process`] call. The
//! controller never resets the CPU: it reports [`ProtocolStatus::ResetRequested`]
//! and leaves the reset to the caller.

use crate::config::{BootloaderIdentity, Region, MAX_RETRIES, PROTOCOL_TIMEOUT_MS};
use crate::flash::{crc32_region, FlashMemory};

use super::frame::{Command, InfoKind, ProtocolFrame, MAX_PAYLOAD};
use super::ring::{FrameSource, ReplyLink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolState {
    Idle,
    Receiving,
    Complete,
    Error,
}

/// Outcome of one processing step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolStatus {
    /// Nothing to report, or a frame was handled.
    Ok,
    /// The transfer failed and the controller entered `Error`.
    Error,
    /// The frame was rejected with a NAK; state unchanged.
    Invalid,
    /// A data word was accepted, more are expected.
    Busy,
    /// The written image does not match the announced CRC.
    VerifyFailed,
    /// A size-only transfer finished; the image may be started.
    Complete,
    /// The caller should reset the system.
    ResetRequested,
    /// No frame arrived within the protocol timeout; a NAK was resent.
    Timeout,
}

/// Download protocol controller owning the flash it programs.
pub struct ProtocolController<F> {
    flash: F,
    region: Region,
    identity: BootloaderIdentity,
    state: ProtocolState,
    expected_seq: u16,
    firmware_size: u32,
    firmware_crc: u32,
    received_bytes: u32,
    retry_count: u16,
    start_size_received: bool,
    system_time_ms: u32,
    last_frame_time: u32,
}

impl<F: FlashMemory> ProtocolController<F> {
    /// `region` is where the image is written, typically the application region.
    pub fn new(flash: F, region: Region, identity: BootloaderIdentity) -> Self {
        Self {
            flash,
            region,
            identity,
            state: ProtocolState::Idle,
            expected_seq: 0,
            firmware_size: 0,
            firmware_crc: 0,
            received_bytes: 0,
            retry_count: 0,
            start_size_received: false,
            system_time_ms: 0,
            last_frame_time: 0,
        }
    }

    /// Return to the zero state. The time base is kept.
    pub fn reset(&mut self) {
        self.state = ProtocolState::Idle;
        self.expected_seq = 0;
        self.firmware_size = 0;
        self.firmware_crc = 0;
        self.received_bytes = 0;
        self.retry_count = 0;
        self.start_size_received = false;
    }

    /// Advance the protocol clock by `elapsed_ms`.
    pub fn update_time(&mut self, elapsed_ms: u32) {
        self.system_time_ms = self.system_time_ms.wrapping_add(elapsed_ms);
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn expected_seq(&self) -> u16 {
        self.expected_seq
    }

    pub fn received_bytes(&self) -> u32 {
        self.received_bytes
    }

    pub fn retry_count(&self) -> u16 {
        self.retry_count
    }

    /// Announced image size, 0 while idle or failed.
    pub fn firmware_size(&self) -> u32 {
        match self.state {
            ProtocolState::Idle | ProtocolState::Error => 0,
            _ => self.firmware_size,
        }
    }

    /// Announced image CRC, 0 while idle, failed or when none was sent.
    pub fn firmware_crc(&self) -> u32 {
        match self.state {
            ProtocolState::Idle | ProtocolState::Error => 0,
            _ => self.firmware_crc,
        }
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Run one step: consume at most one frame and act on it.
    pub fn process(
        &mut self,
        rx: &mut impl FrameSource,
        link: &mut impl ReplyLink,
    ) -> ProtocolStatus {
        if self.state == ProtocolState::Complete {
            return self.finish(rx, link);
        }

        let Some(raw) = rx.take_frame() else {
            return self.check_timeout(link);
        };
        let frame = ProtocolFrame::parse(&raw);
        self.last_frame_time = self.system_time_ms;
        trace!("download: cmd 0x{:02x} seq {}", frame.cmd, frame.seq);

        match self.state {
            ProtocolState::Idle => self.on_idle(&frame, link),
            ProtocolState::Receiving => self.on_receiving(&frame, link),
            ProtocolState::Error => {
                info!("download: input after failure, requesting reset");
                ProtocolStatus::ResetRequested
            }
            ProtocolState::Complete => ProtocolStatus::Ok,
        }
    }

    // --- Idle ---

    fn on_idle(&mut self, frame: &ProtocolFrame, link: &mut impl ReplyLink) -> ProtocolStatus {
        match frame.command() {
            Some(Command::Start) => self.on_start(frame, link),
            Some(Command::Data) if self.start_size_received && frame.seq == 0 => {
                // Size-only transfer: the first DATA frame opens it.
                self.start_size_received = false;
                if self.begin_transfer().is_err() {
                    reply(link, ProtocolFrame::nak_all());
                    self.state = ProtocolState::Error;
                    return ProtocolStatus::Error;
                }
                self.on_data(frame, link)
            }
            Some(Command::Cancel) => {
                self.reset();
                ProtocolStatus::Ok
            }
            Some(Command::Info) => self.on_info(frame, link),
            _ => {
                debug!("download: unexpected cmd 0x{:02x} while idle", frame.cmd);
                reply(link, ProtocolFrame::nak_all());
                ProtocolStatus::Invalid
            }
        }
    }

    fn on_start(&mut self, frame: &ProtocolFrame, link: &mut impl ReplyLink) -> ProtocolStatus {
        match (frame.seq, frame.word()) {
            (0, Some(size)) => {
                self.firmware_size = size;
                self.firmware_crc = 0;
                if size == 0 || size > self.region.size {
                    warn!("download: rejected image size {}", size);
                    self.firmware_size = 0;
                    self.start_size_received = false;
                    reply(link, ProtocolFrame::nak_all());
                    return ProtocolStatus::Invalid;
                }
                self.start_size_received = true;
                reply(link, ProtocolFrame::ack(0));
                ProtocolStatus::Ok
            }
            (1, Some(crc)) if self.start_size_received => {
                self.firmware_crc = crc;
                self.start_size_received = false;
                self.open_transfer(1, link)
            }
            (seq, _) if self.start_size_received && seq != 1 => {
                self.start_size_received = false;
                self.open_transfer(seq, link)
            }
            _ => {
                self.start_size_received = false;
                reply(link, ProtocolFrame::nak_all());
                ProtocolStatus::Invalid
            }
        }
    }

    /// Erase, enter `Receiving` and acknowledge `seq`.
    fn open_transfer(&mut self, seq: u16, link: &mut impl ReplyLink) -> ProtocolStatus {
        if self.begin_transfer().is_err() {
            reply(link, ProtocolFrame::nak(seq));
            self.state = ProtocolState::Error;
            return ProtocolStatus::Error;
        }
        reply(link, ProtocolFrame::ack(seq));
        ProtocolStatus::Ok
    }

    fn begin_transfer(&mut self) -> Result<(), crate::error::FlashError> {
        info!(
            "download: erasing {} bytes at 0x{:08x}, crc 0x{:08x}",
            self.firmware_size,
            self.region.start,
            self.firmware_crc
        );
        if let Err(e) = self.flash.erase(self.region.start, self.firmware_size) {
            error!("download: erase failed: {}", e);
            return Err(e);
        }
        self.state = ProtocolState::Receiving;
        self.expected_seq = 0;
        self.received_bytes = 0;
        self.retry_count = 0;
        Ok(())
    }

    fn on_info(&mut self, frame: &ProtocolFrame, link: &mut impl ReplyLink) -> ProtocolStatus {
        let response = match InfoKind::try_from(frame.data[0]) {
            Ok(InfoKind::Version) => ProtocolFrame::info(frame.seq, &self.identity.version),
            Ok(InfoKind::Series) => {
                ProtocolFrame::info(frame.seq, &self.identity.series().to_le_bytes())
            }
            Ok(InfoKind::Spec) => ProtocolFrame::info(frame.seq, &self.identity.spec().to_le_bytes()),
            Err(_) => {
                reply(link, ProtocolFrame::nak(frame.seq));
                return ProtocolStatus::Invalid;
            }
        };
        reply(link, response);
        ProtocolStatus::Ok
    }

    // --- Receiving ---

    fn on_receiving(&mut self, frame: &ProtocolFrame, link: &mut impl ReplyLink) -> ProtocolStatus {
        match frame.command() {
            Some(Command::Data) => self.on_data(frame, link),
            Some(Command::End) => self.on_end(frame, link),
            Some(Command::Cancel) => {
                info!("download: cancelled");
                self.reset();
                ProtocolStatus::Ok
            }
            _ => {
                reply(link, ProtocolFrame::nak(self.expected_seq));
                ProtocolStatus::Invalid
            }
        }
    }

    fn on_data(&mut self, frame: &ProtocolFrame, link: &mut impl ReplyLink) -> ProtocolStatus {
        if frame.seq != self.expected_seq {
            debug!(
                "download: seq {} while expecting {}",
                frame.seq,
                self.expected_seq
            );
            return self.nak_retry(link);
        }
        self.retry_count = 0;

        let mut word = [0xFFu8; MAX_PAYLOAD];
        word[..frame.data_len as usize].copy_from_slice(frame.payload());
        let addr = self.region.start + self.received_bytes;
        if let Err(e) = self.flash.program_word(addr, u32::from_le_bytes(word)) {
            error!("download: program at 0x{:08x} failed: {}", addr, e);
            reply(link, ProtocolFrame::nak(self.expected_seq));
            self.state = ProtocolState::Error;
            return ProtocolStatus::Error;
        }

        self.received_bytes += MAX_PAYLOAD as u32;
        self.expected_seq = self.expected_seq.wrapping_add(1);
        reply(link, ProtocolFrame::ack(frame.seq));

        if self.received_bytes >= self.firmware_size {
            info!("download: {} bytes received", self.received_bytes);
            self.state = ProtocolState::Complete;
            return ProtocolStatus::Ok;
        }
        ProtocolStatus::Busy
    }

    fn on_end(&mut self, frame: &ProtocolFrame, link: &mut impl ReplyLink) -> ProtocolStatus {
        if self.received_bytes < self.firmware_size {
            warn!(
                "download: END after {} of {} bytes",
                self.received_bytes,
                self.firmware_size
            );
            reply(link, ProtocolFrame::nak(frame.seq));
            self.state = ProtocolState::Error;
            return ProtocolStatus::Error;
        }
        reply(link, ProtocolFrame::ack(frame.seq));
        self.state = ProtocolState::Complete;
        ProtocolStatus::Ok
    }

    /// NAK the expected sequence and count a retry.
    fn nak_retry(&mut self, link: &mut impl ReplyLink) -> ProtocolStatus {
        reply(link, ProtocolFrame::nak(self.expected_seq));
        self.retry_count += 1;
        if self.retry_count >= MAX_RETRIES {
            warn!("download: retries exhausted at seq {}", self.expected_seq);
            self.state = ProtocolState::Error;
            return ProtocolStatus::Error;
        }
        ProtocolStatus::Invalid
    }

    fn check_timeout(&mut self, link: &mut impl ReplyLink) -> ProtocolStatus {
        if self.state != ProtocolState::Receiving
            || self.system_time_ms.wrapping_sub(self.last_frame_time) < PROTOCOL_TIMEOUT_MS
        {
            return ProtocolStatus::Ok;
        }
        self.last_frame_time = self.system_time_ms;
        match self.nak_retry(link) {
            ProtocolStatus::Invalid => ProtocolStatus::Timeout,
            status => status,
        }
    }

    // --- Complete ---

    fn finish(&mut self, rx: &mut impl FrameSource, link: &mut impl ReplyLink) -> ProtocolStatus {
        // A trailing END is acknowledged, anything else buffered is dropped.
        if let Some(raw) = rx.take_frame() {
            let frame = ProtocolFrame::parse(&raw);
            if frame.command() == Some(Command::End) {
                reply(link, ProtocolFrame::ack(frame.seq));
            }
        }

        if self.firmware_crc == 0 {
            return ProtocolStatus::Complete;
        }

        let actual = match crc32_region(&self.flash, self.region.start, self.firmware_size) {
            Ok(crc) => crc,
            Err(e) => {
                error!("download: verify read failed: {}", e);
                self.state = ProtocolState::Error;
                return ProtocolStatus::VerifyFailed;
            }
        };
        if actual != self.firmware_crc {
            error!(
                "download: CRC mismatch, expected 0x{:08x}, got 0x{:08x}",
                self.firmware_crc,
                actual
            );
            self.state = ProtocolState::Error;
            return ProtocolStatus::VerifyFailed;
        }

        info!("download: image verified, requesting reset");
        ProtocolStatus::ResetRequested
    }
}

fn reply(link: &mut impl ReplyLink, frame: ProtocolFrame) {
    link.send(&frame.encode());
}

