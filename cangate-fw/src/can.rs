// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Software CAN bus joining all channels.
//!
//! The RP2040 has no CAN controller, so the channels share one virtual bus:
//! a frame transmitted on a started channel is received by every other
//! started channel. Channels in loop-back mode would need the controller's
//! own echo and are not modelled.

use cangate_common::gs_usb::{CanDriver, CanFrame, CanHeader, ChannelConfig, FilterKind};
use cangate_common::CanError;
use heapless::Deque;

/// Receive FIFO depth per channel.
const RX_DEPTH: usize = 16;

#[derive(Default)]
struct Node {
    config: ChannelConfig,
    started: bool,
    rx_enabled: bool,
    std_filter: bool,
    ext_filter: bool,
    rx: Deque<CanFrame, RX_DEPTH>,
}

pub struct VirtualCan<const N: usize> {
    nodes: [Node; N],
}

impl<const N: usize> VirtualCan<N> {
    pub fn new() -> Self {
        Self {
            nodes: core::array::from_fn(|_| Node::default()),
        }
    }

    fn accepts(node: &Node, header: &CanHeader) -> bool {
        if !node.started || !node.rx_enabled {
            return false;
        }
        if header.fd && !node.config.fd {
            return false;
        }
        match header.id {
            embedded_can::Id::Standard(_) => node.std_filter,
            embedded_can::Id::Extended(_) => node.ext_filter,
        }
    }
}

impl<const N: usize> CanDriver for VirtualCan<N> {
    fn stop(&mut self, channel: usize) -> Result<(), CanError> {
        let node = &mut self.nodes[channel];
        node.started = false;
        node.rx.clear();
        Ok(())
    }

    fn init(&mut self, channel: usize, config: &ChannelConfig) -> Result<(), CanError> {
        if config.nominal.prescaler == 0 || config.nominal.tseg1 == 0 || config.nominal.tseg2 == 0
        {
            return Err(CanError::InvalidTiming);
        }
        defmt::debug!(
            "can{}: brp {} tseg1 {} tseg2 {} sjw {} fd {}",
            channel,
            config.nominal.prescaler,
            config.nominal.tseg1,
            config.nominal.tseg2,
            config.nominal.sjw,
            config.fd
        );
        self.nodes[channel].config = *config;
        Ok(())
    }

    fn configure_filter(&mut self, channel: usize, kind: FilterKind) -> Result<(), CanError> {
        let node = &mut self.nodes[channel];
        match kind {
            FilterKind::Standard => node.std_filter = true,
            FilterKind::Extended => node.ext_filter = true,
        }
        Ok(())
    }

    fn start(&mut self, channel: usize) -> Result<(), CanError> {
        self.nodes[channel].started = true;
        Ok(())
    }

    fn enable_rx_notification(&mut self, channel: usize) -> Result<(), CanError> {
        self.nodes[channel].rx_enabled = true;
        Ok(())
    }

    fn transmit(
        &mut self,
        channel: usize,
        header: &CanHeader,
        data: &[u8],
    ) -> Result<(), CanError> {
        if !self.nodes[channel].started {
            return Err(CanError::NotStarted);
        }

        let mut frame = CanFrame {
            header: *header,
            data: [0; 64],
        };
        let n = data.len().min(frame.data.len());
        frame.data[..n].copy_from_slice(&data[..n]);

        for (index, node) in self.nodes.iter_mut().enumerate() {
            if index == channel || !Self::accepts(node, header) {
                continue;
            }
            if node.rx.is_full() {
                // The controller would report an RX overrun here.
                let _ = node.rx.pop_front();
            }
            let _ = node.rx.push_back(frame);
        }
        Ok(())
    }

    fn rx_pending(&self, channel: usize) -> bool {
        !self.nodes[channel].rx.is_empty()
    }

    fn receive(&mut self, channel: usize) -> Option<CanFrame> {
        self.nodes[channel].rx.pop_front()
    }
}
