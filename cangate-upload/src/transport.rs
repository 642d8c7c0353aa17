// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for bootloader communication.

use anyhow::{bail, Context, Result};
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

use cangate_common::download::{ProtocolFrame, FRAME_SIZE};

/// USB CDC transport exchanging fixed-size protocol frames.
pub struct Transport {
    port: Box<dyn SerialPort>,
}

impl Transport {
    /// Open `port_name` with a read timeout of `timeout_ms`.
    pub fn with_timeout(port_name: &str, timeout_ms: u64) -> Result<Self> {
        let port = serialport::new(port_name, 115200)
            .timeout(Duration::from_millis(timeout_ms))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self { port })
    }

    /// Current read timeout.
    pub fn timeout_ms(&self) -> u64 {
        self.port.timeout().as_millis() as u64
    }

    /// Send one frame.
    pub fn send(&mut self, frame: &ProtocolFrame) -> Result<()> {
        self.port
            .write_all(&frame.encode())
            .context("Failed to write to serial port")?;
        self.port.flush()?;
        Ok(())
    }

    /// Receive one frame. Returns `None` on timeout.
    pub fn receive(&mut self) -> Result<Option<ProtocolFrame>> {
        let mut raw = [0u8; FRAME_SIZE];
        let mut filled = 0;

        while filled < FRAME_SIZE {
            match self.port.read(&mut raw[filled..]) {
                Ok(0) => continue,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    if filled > 0 {
                        bail!("Timeout inside a frame ({} of {} bytes)", filled, FRAME_SIZE);
                    }
                    return Ok(None);
                }
                Err(e) => bail!("Serial read error: {}", e),
            }
        }

        Ok(Some(ProtocolFrame::parse(&raw)))
    }

    /// Discard anything left over from an earlier exchange.
    pub fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        let old_timeout = self.port.timeout();
        let _ = self.port.set_timeout(Duration::from_millis(10));
        while self.port.read(&mut buf).unwrap_or(0) > 0 {}
        let _ = self.port.set_timeout(old_timeout);
    }

    /// Send a frame and wait for the reply, with a custom timeout.
    pub fn request_timeout(
        &mut self,
        frame: &ProtocolFrame,
        timeout_ms: u64,
    ) -> Result<Option<ProtocolFrame>> {
        let old_timeout = self.port.timeout();
        self.port
            .set_timeout(Duration::from_millis(timeout_ms))
            .context("Failed to set timeout")?;

        let result = self.send(frame).and_then(|_| self.receive());

        let _ = self.port.set_timeout(old_timeout);
        result
    }

    /// Send a frame and wait for the reply.
    pub fn request(&mut self, frame: &ProtocolFrame) -> Result<Option<ProtocolFrame>> {
        self.send(frame)?;
        self.receive()
    }
}
