//! Test doubles for the device stack and the clock.

use core::cell::{Cell, RefCell};
use std::vec::Vec;

use usb_device::endpoint::{EndpointAddress, EndpointType};
use usb_device::prelude::UsbDeviceState;
use usb_device::UsbError;

use crate::{Clock, DeviceStack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(u8, EndpointType, u16),
    Close(u8),
    Transmit(u8, Vec<u8>),
    CtlSend(Vec<u8>),
}

/// Records every primitive call.
#[derive(Debug)]
pub struct MockStack {
    pub state: Cell<UsbDeviceState>,
    pub events: RefCell<Vec<Event>>,
    /// `transmit` fails with `WouldBlock` while set.
    pub fail_transmit: Cell<bool>,
    /// Endpoint whose `open_ep` fails with `InvalidEndpoint`.
    pub fail_open: Cell<Option<u8>>,
}

impl MockStack {
    pub fn configured() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        MockStack {
            state: Cell::new(UsbDeviceState::Configured),
            events: RefCell::new(Vec::new()),
            fail_transmit: Cell::new(false),
            fail_open: Cell::new(None),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Transmit(_, data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DeviceStack for MockStack {
    fn open_ep(
        &self,
        ep_addr: EndpointAddress,
        ep_type: EndpointType,
        max_packet_size: u16,
    ) -> usb_device::Result<()> {
        if self.fail_open.get() == Some(u8::from(ep_addr)) {
            return Err(UsbError::InvalidEndpoint);
        }
        self.events
            .borrow_mut()
            .push(Event::Open(ep_addr.into(), ep_type, max_packet_size));
        Ok(())
    }

    fn close_ep(&self, ep_addr: EndpointAddress) {
        self.events.borrow_mut().push(Event::Close(ep_addr.into()));
    }

    fn transmit(&self, ep_addr: EndpointAddress, buf: &[u8]) -> usb_device::Result<()> {
        if self.fail_transmit.get() {
            return Err(UsbError::WouldBlock);
        }
        self.events
            .borrow_mut()
            .push(Event::Transmit(ep_addr.into(), buf.to_vec()));
        Ok(())
    }

    fn ctl_send_data(&self, buf: &[u8]) -> usb_device::Result<()> {
        self.events.borrow_mut().push(Event::CtlSend(buf.to_vec()));
        Ok(())
    }

    fn state(&self) -> UsbDeviceState {
        self.state.get()
    }
}

/// Clock whose ticks only advance by one on every `wait`.
#[derive(Debug)]
pub struct StepClock {
    now: Cell<u32>,
    waits: Cell<u32>,
}

impl StepClock {
    pub fn new(start: u32) -> Self {
        StepClock {
            now: Cell::new(start),
            waits: Cell::new(0),
        }
    }

    pub fn waits(&self) -> u32 {
        self.waits.get()
    }
}

impl Clock for StepClock {
    fn ticks(&self) -> u32 {
        self.now.get()
    }

    fn wait(&self) {
        self.now.set(self.now.get().wrapping_add(1));
        self.waits.set(self.waits.get() + 1);
    }
}
