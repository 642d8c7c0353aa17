// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Minimal USB device stack: EP0 control handling, one vendor interface with
//! a bulk OUT/IN pair, and a pluggable application for class/vendor requests.
//!
//! Hardware events reach the stack through [`UsbDriver::poll_event`]; each
//! event is handled to completion before the next one is taken.

mod bulk;
mod control;
mod descriptor;
pub mod setup;

pub use bulk::{
    BulkInPipe, BulkSink, BulkWriter, BULK_BUF_SIZE, BULK_IN_EP, BULK_MAX_PACKET, BULK_OUT_EP,
};
pub use control::{ControlPhase, ControlPipe, CONTROL_BUF_SIZE, EP0_IN, EP0_MAX_PACKET, EP0_OUT};
pub use descriptor::{
    Descriptors, CONFIG_DESC_SIZE, DESC_CONFIGURATION, DESC_DEVICE, DESC_STRING, DEVICE_DESC_SIZE,
};
pub use setup::{Direction, Recipient, RequestKind, SetupPacket};

use heapless::Vec;

use crate::config::DeviceIdentity;
use crate::error::RequestError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointKind {
    Control,
    Bulk,
    Interrupt,
}

/// Hardware event delivered by a [`UsbDriver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UsbEvent {
    Reset,
    Setup([u8; 8]),
    /// A complete OUT transfer on `ep`.
    Out { ep: u8, data: Vec<u8, BULK_BUF_SIZE> },
    /// The last transmission queued on IN endpoint `ep` finished.
    InComplete(u8),
}

/// USB peripheral capability. Endpoint addresses carry the direction bit (0x80 = IN).
pub trait UsbDriver {
    fn poll_event(&mut self) -> Option<UsbEvent>;

    /// Queue `data` on an IN endpoint. The driver copies the data.
    fn ep_transmit(&mut self, ep: u8, data: &[u8]);

    /// Arm an OUT endpoint for up to `len` bytes.
    fn ep_receive(&mut self, ep: u8, len: usize);

    fn set_stall(&mut self, ep: u8);

    fn clear_stall(&mut self, ep: u8);

    fn is_stalled(&self, ep: u8) -> bool;

    fn set_address(&mut self, address: u8);

    fn open_endpoint(&mut self, ep: u8, kind: EndpointKind, max_packet: u16);

    fn close_endpoint(&mut self, ep: u8);
}

/// Successful result of a class/vendor request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlOutcome {
    /// No data stage: acknowledge with a zero-length status packet.
    Ack,
    /// `n` bytes of the response buffer form the IN data stage.
    Data(usize),
}

/// Application behind the vendor interface.
pub trait UsbApplication {
    /// Class request. OUT data (if any) is in `data`; IN data goes into `response`.
    fn class_request(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
        response: &mut [u8],
    ) -> Result<ControlOutcome, RequestError> {
        let _ = (data, response);
        Err(RequestError::Unsupported(setup.request))
    }

    /// Vendor request. OUT data (if any) is in `data`; IN data goes into `response`.
    fn vendor_request(
        &mut self,
        setup: &SetupPacket,
        data: &[u8],
        response: &mut [u8],
    ) -> Result<ControlOutcome, RequestError> {
        let _ = (data, response);
        Err(RequestError::Unsupported(setup.request))
    }

    /// One bulk OUT transfer.
    fn bulk_out(&mut self, data: &[u8], sink: &mut impl BulkSink);

    /// The host selected configuration `value` (0 = unconfigured).
    fn configured(&mut self, value: u8) {
        let _ = value;
    }

    /// Bus reset.
    fn reset(&mut self) {}
}

/// The device: driver, application, EP0 context and bulk IN pipe.
pub struct UsbDevice<D, A> {
    driver: D,
    app: A,
    control: ControlPipe,
    bulk_in: BulkInPipe,
    descriptors: Descriptors,
    configuration: u8,
}

impl<D: UsbDriver, A: UsbApplication> UsbDevice<D, A> {
    pub fn new(driver: D, app: A, identity: DeviceIdentity) -> Self {
        Self {
            driver,
            app,
            control: ControlPipe::new(),
            bulk_in: BulkInPipe::new(BULK_IN_EP),
            descriptors: Descriptors::new(identity),
            configuration: 0,
        }
    }

    /// Drain and handle all pending hardware events.
    pub fn poll(&mut self) {
        while let Some(event) = self.driver.poll_event() {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: UsbEvent) {
        match event {
            UsbEvent::Reset => self.on_bus_reset(),
            UsbEvent::Setup(raw) => self.on_setup(&raw),
            UsbEvent::Out { ep, data } => self.on_out(ep, &data),
            UsbEvent::InComplete(ep) => self.on_in_complete(ep),
        }
    }

    pub fn on_bus_reset(&mut self) {
        debug!("usb: bus reset");
        self.driver
            .open_endpoint(EP0_OUT, EndpointKind::Control, EP0_MAX_PACKET as u16);
        self.driver
            .open_endpoint(EP0_IN, EndpointKind::Control, EP0_MAX_PACKET as u16);
        self.driver.ep_receive(EP0_OUT, EP0_MAX_PACKET);
        self.control.reset();
        self.bulk_in.reset();
        self.configuration = 0;
        self.app.reset();
    }

    pub fn on_setup(&mut self, raw: &[u8; 8]) {
        let setup = SetupPacket::parse(raw);
        self.control.begin(setup);
        trace!(
            "usb: setup type 0x{:02x} req 0x{:02x} len {}",
            setup.request_type,
            setup.request,
            setup.length
        );

        match setup.kind() {
            RequestKind::Standard => self.handle_standard(&setup),
            RequestKind::Class | RequestKind::Vendor if setup.has_out_data() => {
                // Dispatch is deferred until the data stage has arrived.
                self.control.expect_out(&mut self.driver);
            }
            RequestKind::Class | RequestKind::Vendor => self.dispatch(&setup, false),
            RequestKind::Reserved => self.control.stall(&mut self.driver),
        }
    }

    pub fn on_out(&mut self, ep: u8, data: &[u8]) {
        match ep {
            EP0_OUT => match self.control.phase() {
                ControlPhase::DataOut => {
                    if self.control.push_out(data) {
                        let setup = *self.control.setup();
                        self.dispatch(&setup, true);
                    } else {
                        self.driver.ep_receive(EP0_OUT, EP0_MAX_PACKET);
                    }
                }
                _ => self.control.on_status_out(),
            },
            BULK_OUT_EP => {
                let mut writer = BulkWriter::new(&mut self.driver, &mut self.bulk_in);
                self.app.bulk_out(data, &mut writer);
                self.driver.ep_receive(BULK_OUT_EP, BULK_BUF_SIZE);
            }
            _ => {}
        }
    }

    pub fn on_in_complete(&mut self, ep: u8) {
        match ep {
            EP0_IN => self.control.on_in_complete(&mut self.driver),
            BULK_IN_EP => self.bulk_in.on_complete(&mut self.driver),
            _ => {}
        }
    }

    /// Application plus a bulk IN writer, for traffic not triggered by the host.
    pub fn split(&mut self) -> (&mut A, BulkWriter<'_, D>) {
        (
            &mut self.app,
            BulkWriter::new(&mut self.driver, &mut self.bulk_in),
        )
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn control(&self) -> &ControlPipe {
        &self.control
    }

    pub fn bulk_in(&self) -> &BulkInPipe {
        &self.bulk_in
    }

    pub fn configuration(&self) -> u8 {
        self.configuration
    }

    /// Run the class/vendor handler and finish the transfer.
    fn dispatch(&mut self, setup: &SetupPacket, with_data: bool) {
        let mut data = [0u8; CONTROL_BUF_SIZE];
        let data_len = if with_data {
            let out = self.control.out_data();
            data[..out.len()].copy_from_slice(out);
            out.len()
        } else {
            0
        };

        let response = self.control.tx_buf_mut();
        let result = match setup.kind() {
            RequestKind::Class => self.app.class_request(setup, &data[..data_len], response),
            _ => self.app.vendor_request(setup, &data[..data_len], response),
        };

        match result {
            Ok(ControlOutcome::Data(n)) if setup.direction() == Direction::In => {
                self.control.send(&mut self.driver, n)
            }
            Ok(_) => self.control.ack(&mut self.driver),
            Err(e) => {
                debug!("usb: request 0x{:02x} failed: {}", setup.request, e);
                self.control.stall(&mut self.driver);
            }
        }
    }

    fn handle_standard(&mut self, setup: &SetupPacket) {
        use self::setup::{
            CLEAR_FEATURE, GET_CONFIGURATION, GET_DESCRIPTOR, GET_INTERFACE, GET_STATUS,
            SET_ADDRESS, SET_CONFIGURATION, SET_FEATURE, SET_INTERFACE,
        };

        let result = match setup.request {
            GET_STATUS => self.get_status(setup),
            CLEAR_FEATURE | SET_FEATURE => self.set_feature(setup),
            SET_ADDRESS => {
                self.control.set_pending_address(setup.value as u8);
                Ok(0)
            }
            GET_DESCRIPTOR => self.get_descriptor(setup),
            GET_CONFIGURATION => {
                self.control.tx_buf_mut()[0] = self.configuration;
                Ok(1)
            }
            SET_CONFIGURATION => self.set_configuration(setup.value as u8),
            GET_INTERFACE if self.configuration != 0 && setup.index == 0 => {
                self.control.tx_buf_mut()[0] = 0;
                Ok(1)
            }
            SET_INTERFACE if self.configuration != 0 && setup.index == 0 && setup.value == 0 => {
                Ok(0)
            }
            _ => Err(()),
        };

        match result {
            Ok(n) => self.control.send(&mut self.driver, n),
            Err(()) => self.control.stall(&mut self.driver),
        }
    }

    fn get_status(&mut self, setup: &SetupPacket) -> Result<usize, ()> {
        let status: u16 = match setup.recipient() {
            Recipient::Device | Recipient::Interface => 0,
            Recipient::Endpoint if is_known_endpoint(setup.index as u8) => {
                self.driver.is_stalled(setup.index as u8) as u16
            }
            _ => return Err(()),
        };
        self.control.tx_buf_mut()[..2].copy_from_slice(&status.to_le_bytes());
        Ok(2)
    }

    fn set_feature(&mut self, setup: &SetupPacket) -> Result<usize, ()> {
        use self::setup::{FEATURE_DEVICE_REMOTE_WAKEUP, FEATURE_ENDPOINT_HALT, SET_FEATURE};

        match setup.recipient() {
            Recipient::Endpoint
                if setup.value == FEATURE_ENDPOINT_HALT && is_known_endpoint(setup.index as u8) =>
            {
                let ep = setup.index as u8;
                if setup.request == SET_FEATURE {
                    self.driver.set_stall(ep);
                } else {
                    self.driver.clear_stall(ep);
                }
                Ok(0)
            }
            // Remote wakeup is accepted but has no effect.
            Recipient::Device if setup.value == FEATURE_DEVICE_REMOTE_WAKEUP => Ok(0),
            _ => Err(()),
        }
    }

    fn get_descriptor(&mut self, setup: &SetupPacket) -> Result<usize, ()> {
        let kind = (setup.value >> 8) as u8;
        let index = setup.value as u8;
        let buf = self.control.tx_buf_mut();

        let len = match kind {
            DESC_DEVICE => copy_into(buf, self.descriptors.device()),
            DESC_CONFIGURATION => copy_into(buf, self.descriptors.configuration()),
            DESC_STRING => self.descriptors.string(index, buf).ok_or(())?,
            _ => return Err(()),
        };
        Ok(len)
    }

    fn set_configuration(&mut self, value: u8) -> Result<usize, ()> {
        match value {
            0 => {
                self.driver.close_endpoint(BULK_OUT_EP);
                self.driver.close_endpoint(BULK_IN_EP);
            }
            1 => {
                self.driver
                    .open_endpoint(BULK_OUT_EP, EndpointKind::Bulk, BULK_MAX_PACKET);
                self.driver
                    .open_endpoint(BULK_IN_EP, EndpointKind::Bulk, BULK_MAX_PACKET);
                self.driver.ep_receive(BULK_OUT_EP, BULK_BUF_SIZE);
            }
            _ => return Err(()),
        }
        self.bulk_in.reset();
        self.configuration = value;
        info!("usb: configuration {}", value);
        self.app.configured(value);
        Ok(0)
    }
}

fn is_known_endpoint(ep: u8) -> bool {
    matches!(ep, EP0_OUT | EP0_IN | BULK_OUT_EP | BULK_IN_EP)
}

fn copy_into(buf: &mut [u8], src: &[u8]) -> usize {
    let n = src.len().min(buf.len());
    buf[..n].copy_from_slice(&src[..n]);
    n
}
