// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! gs_usb request handling and the bulk relay between host and CAN channels.

use crate::config::CanCapabilities;
use crate::error::RequestError;
use crate::usb::{BulkSink, ControlOutcome, SetupPacket, UsbApplication};

use super::can::{BitTiming, CanDriver, CanHeader, ChannelConfig, FilterKind};
use super::constants::*;
use super::frame::{len_to_dlc, HostFrame, HOST_FRAME_MAX_WIRE_SIZE};
use super::structures::{
    BitTimingConst, BitTimingConstExt, DeviceBitTiming, DeviceConfig, DeviceMode, DeviceState,
};

/// Per-channel state visible to the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelState {
    pub started: bool,
    pub fd_enabled: bool,
}

#[derive(Clone, Copy, Default)]
struct Channel {
    state: ChannelState,
    config: ChannelConfig,
}

/// Which bit timing a BITTIMING style request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Nominal,
    Data,
}

/// gs_usb device with `N` CAN channels behind a [`CanDriver`].
pub struct GsUsb<C, const N: usize> {
    can: C,
    caps: CanCapabilities,
    channels: [Channel; N],
}

impl<C: CanDriver, const N: usize> GsUsb<C, N> {
    pub fn new(can: C, caps: CanCapabilities) -> Self {
        Self {
            can,
            caps,
            channels: [Channel::default(); N],
        }
    }

    pub fn channel_state(&self, channel: usize) -> Option<ChannelState> {
        self.channels.get(channel).map(|c| c.state)
    }

    pub fn channel_config(&self, channel: usize) -> Option<&ChannelConfig> {
        self.channels.get(channel).map(|c| &c.config)
    }

    pub fn can(&self) -> &C {
        &self.can
    }

    pub fn can_mut(&mut self) -> &mut C {
        &mut self.can
    }

    /// Handle a gs_usb control request. IN answers are zero padded to
    /// exactly `min(wLength, response.len())` bytes.
    pub fn handle_request(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
        response: &mut [u8],
    ) -> Result<ControlOutcome, RequestError> {
        match setup.request {
            GS_USB_BREQ_DEVICE_CONFIG => {
                Ok(respond(setup, response, &DeviceConfig::new(N).pack()))
            }
            GS_USB_BREQ_BT_CONST => {
                Ok(respond(setup, response, &BitTimingConst::new(&self.caps).pack()))
            }
            GS_USB_BREQ_BT_CONST_EXT => Ok(respond(
                setup,
                response,
                &BitTimingConstExt::new(&self.caps).pack(),
            )),
            GS_USB_BREQ_GET_STATE => {
                let channel = self.channel_index(setup)?;
                let state = DeviceState {
                    state: if self.channels[channel].state.started {
                        GS_CAN_STATE_ERROR_ACTIVE
                    } else {
                        GS_CAN_STATE_STOPPED
                    },
                    rxerr: 0,
                    txerr: 0,
                };
                Ok(respond(setup, response, &state.pack()))
            }
            GS_USB_BREQ_GET_TERMINATION => Ok(respond(
                setup,
                response,
                &GS_CAN_TERMINATION_STATE_OFF.to_le_bytes(),
            )),
            GS_USB_BREQ_GET_USER_ID | GS_USB_BREQ_TIMESTAMP => {
                Ok(respond(setup, response, &0u32.to_le_bytes()))
            }
            GS_USB_BREQ_HOST_FORMAT
            | GS_USB_BREQ_IDENTIFY
            | GS_USB_BREQ_BERR
            | GS_USB_BREQ_SET_USER_ID
            | GS_USB_BREQ_SET_TERMINATION => Ok(ControlOutcome::Ack),
            GS_USB_BREQ_MODE => {
                let channel = self.channel_index(setup)?;
                let mode = DeviceMode::unpack(data)?;
                self.set_mode(channel, &mode)?;
                Ok(ControlOutcome::Ack)
            }
            GS_USB_BREQ_BITTIMING => {
                let channel = self.channel_index(setup)?;
                let bt = DeviceBitTiming::unpack(data)?;
                self.apply_bittiming(channel, &bt, Phase::Nominal)?;
                Ok(ControlOutcome::Ack)
            }
            GS_USB_BREQ_DATA_BITTIMING => {
                let channel = self.channel_index(setup)?;
                let bt = DeviceBitTiming::unpack(data)?;
                self.apply_bittiming(channel, &bt, Phase::Data)?;
                Ok(ControlOutcome::Ack)
            }
            other => Err(RequestError::Unsupported(other)),
        }
    }

    /// Relay one host frame to its CAN channel and echo it back on success.
    /// Short frames, unknown channels and error frames are dropped.
    pub fn handle_host_frame(&mut self, data: &[u8], sink: &mut impl BulkSink) {
        let Some(frame) = HostFrame::parse(data) else {
            trace!("gs_usb: runt bulk transfer ({} bytes)", data.len());
            return;
        };
        let channel = frame.channel as usize;
        if channel >= N {
            debug!("gs_usb: frame for unknown channel {}", channel);
            return;
        }
        if frame.can_id & CAN_ERR_FLAG != 0 {
            return;
        }
        let Some(id) = CanHeader::id_from_raw(frame.can_id) else {
            return;
        };

        let header = CanHeader {
            id,
            remote: frame.can_id & CAN_RTR_FLAG != 0,
            dlc: len_to_dlc(frame.can_dlc),
            fd: frame.flags & GS_CAN_FLAG_FD != 0,
            brs: frame.flags & GS_CAN_FLAG_BRS != 0,
        };
        match self.can.transmit(channel, &header, frame.payload()) {
            Ok(()) => {
                let mut out = [0u8; HOST_FRAME_MAX_WIRE_SIZE];
                let n = frame.encode(&mut out);
                sink.send(&out[..n]);
            }
            Err(e) => debug!("gs_usb: ch{} transmit failed: {}", channel, e),
        }
    }

    /// Forward one received frame of `channel` to the host. Returns false
    /// when the receive FIFO was empty.
    pub fn on_can_receive(&mut self, channel: usize, sink: &mut impl BulkSink) -> bool {
        if channel >= N {
            return false;
        }
        let Some(rx) = self.can.receive(channel) else {
            return false;
        };

        let len = super::frame::dlc_to_len(rx.header.dlc);
        let mut frame = HostFrame {
            echo_id: GS_HOST_FRAME_ECHO_ID_RX,
            can_id: rx.header.raw_id(),
            can_dlc: len,
            channel: channel as u8,
            ..HostFrame::default()
        };
        if rx.header.fd {
            frame.flags |= GS_CAN_FLAG_FD;
        }
        if rx.header.brs {
            frame.flags |= GS_CAN_FLAG_BRS;
        }
        let len = len as usize;
        frame.data[..len].copy_from_slice(&rx.data[..len]);

        let mut out = [0u8; HOST_FRAME_MAX_WIRE_SIZE];
        let n = frame.encode(&mut out);
        sink.send(&out[..n]);
        true
    }

    /// Forward at most one frame per channel with pending receive data.
    pub fn poll_can(&mut self, sink: &mut impl BulkSink) {
        for channel in 0..N {
            if self.can.rx_pending(channel) {
                self.on_can_receive(channel, sink);
            }
        }
    }

    fn channel_index(&self, setup: &SetupPacket) -> Result<usize, RequestError> {
        let channel = setup.value as usize;
        if channel < N {
            Ok(channel)
        } else {
            Err(RequestError::InvalidChannel(setup.value))
        }
    }

    fn set_mode(&mut self, channel: usize, mode: &DeviceMode) -> Result<(), RequestError> {
        let started = self.channels[channel].state.started;
        match mode.mode {
            GS_CAN_MODE_START if !started => {
                let fd = mode.flags & GS_CAN_MODE_FD != 0;
                self.can.configure_filter(channel, FilterKind::Standard)?;
                self.can.configure_filter(channel, FilterKind::Extended)?;

                let ch = &mut self.channels[channel];
                ch.state.fd_enabled = fd;
                ch.config.fd = fd;
                let config = ch.config;

                self.can.init(channel, &config)?;
                self.can.start(channel)?;
                self.can.enable_rx_notification(channel)?;
                self.channels[channel].state.started = true;
                info!("gs_usb: ch{} started (fd: {})", channel, fd);
            }
            GS_CAN_MODE_RESET if started => {
                self.can.stop(channel)?;
                self.channels[channel].state.started = false;
                info!("gs_usb: ch{} stopped", channel);
            }
            _ => {}
        }
        Ok(())
    }

    /// Store new timing. A started channel is stopped, reinitialized and
    /// started again.
    fn apply_bittiming(
        &mut self,
        channel: usize,
        bt: &DeviceBitTiming,
        phase: Phase,
    ) -> Result<(), RequestError> {
        let timing = BitTiming {
            prescaler: bt.brp,
            sjw: bt.sjw,
            tseg1: bt.prop_seg.wrapping_add(bt.phase_seg1),
            tseg2: bt.phase_seg2,
        };
        debug!(
            "gs_usb: ch{} timing brp {} tseg1 {} tseg2 {} sjw {}",
            channel,
            timing.prescaler,
            timing.tseg1,
            timing.tseg2,
            timing.sjw
        );

        let ch = &mut self.channels[channel];
        match phase {
            Phase::Nominal => ch.config.nominal = timing,
            Phase::Data => ch.config.data = timing,
        }
        let config = ch.config;
        if ch.state.started {
            self.can.stop(channel)?;
            self.can.init(channel, &config)?;
            self.can.start(channel)?;
        }
        Ok(())
    }
}

impl<C: CanDriver, const N: usize> UsbApplication for GsUsb<C, N> {
    fn class_request(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
        response: &mut [u8],
    ) -> Result<ControlOutcome, RequestError> {
        self.handle_request(setup, data, response)
    }

    fn vendor_request(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
        response: &mut [u8],
    ) -> Result<ControlOutcome, RequestError> {
        self.handle_request(setup, data, response)
    }

    fn bulk_out(&mut self, data: &[u8], sink: &mut impl BulkSink) {
        self.handle_host_frame(data, sink);
    }
}

/// Copy `payload` into `response` zero padded to `min(wLength, response.len())`.
fn respond(setup: &SetupPacket, response: &mut [u8], payload: &[u8]) -> ControlOutcome {
    let len = (setup.length as usize).min(response.len());
    response[..len].fill(0);
    let n = payload.len().min(len);
    response[..n].copy_from_slice(&payload[..n]);
    ControlOutcome::Data(len)
}
