use arrayvec::ArrayVec;
use log::trace;
use usb_device::control::{Recipient, Request};

use crate::{ClassHandler, DeviceStack, Error, Result, VcpState};

/// Number of interface slots of a configuration.
pub const MAX_IF_COUNT: usize = 8;

/// What an interface slot is bound to.
#[derive(Debug)]
pub enum Interface {
    Disabled,
    /// Control interface of a VCP; owns the VCP state.
    Vcp(VcpState),
    /// Data interface of the VCP whose control interface is `control_iface`.
    VcpData { control_iface: u8 },
}

impl Interface {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Interface::Disabled)
    }

    pub fn as_vcp(&self) -> Result<&VcpState> {
        match self {
            Interface::Vcp(state) => Ok(state),
            _ => Err(Error::WrongInterfaceType),
        }
    }
}

impl ClassHandler for Interface {
    fn init<S: DeviceStack + ?Sized>(&self, stack: &S, cfg_idx: u8) -> Result<()> {
        match self {
            Interface::Vcp(state) => state.init(stack, cfg_idx),
            _ => Ok(()),
        }
    }

    fn deinit<S: DeviceStack + ?Sized>(&self, stack: &S, cfg_idx: u8) -> Result<()> {
        match self {
            Interface::Vcp(state) => state.deinit(stack, cfg_idx),
            _ => Ok(()),
        }
    }

    fn setup<S: DeviceStack + ?Sized>(&self, stack: &S, req: &Request) -> Result<()> {
        match self {
            Interface::Vcp(state) => state.setup(stack, req),
            _ => Ok(()),
        }
    }

    fn data_in<S: DeviceStack + ?Sized>(&self, stack: &S, ep_num: u8) -> Result<()> {
        match self {
            Interface::Vcp(state) => state.data_in(stack, ep_num),
            _ => Ok(()),
        }
    }

    fn data_out<S: DeviceStack + ?Sized>(&self, stack: &S, ep_num: u8) -> Result<()> {
        match self {
            Interface::Vcp(state) => state.data_out(stack, ep_num),
            _ => Ok(()),
        }
    }
}

/// The interface table of a configuration.
///
/// Binding needs `&mut self` and happens before the device is started; the
/// class callbacks and the I/O functions only need `&self`.
#[derive(Debug)]
pub struct UsbInterfaces {
    slots: ArrayVec<[Interface; MAX_IF_COUNT]>,
}

impl UsbInterfaces {
    pub fn new() -> Self {
        let mut slots = ArrayVec::new();
        for _ in 0..MAX_IF_COUNT {
            slots.push(Interface::Disabled);
        }

        UsbInterfaces { slots }
    }

    pub fn get(&self, iface_num: u8) -> Option<&Interface> {
        self.slots.get(iface_num as usize)
    }

    /// Returns the VCP whose control interface is `iface_num`.
    pub fn vcp(&self, iface_num: u8) -> Result<&VcpState> {
        self.get(iface_num).ok_or(Error::UnknownSlot)?.as_vcp()
    }

    pub(crate) fn install(&mut self, iface_num: u8, iface: Interface) {
        if let Some(slot) = self.slots.get_mut(iface_num as usize) {
            *slot = iface;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &Interface)> {
        self.slots.iter().enumerate().map(|(num, iface)| (num as u8, iface))
    }

    /// Runs `init` on every bound interface, stopping at the first failure.
    pub fn class_init<S: DeviceStack + ?Sized>(&self, stack: &S, cfg_idx: u8) -> Result<()> {
        self.slots.iter().try_for_each(|iface| iface.init(stack, cfg_idx))
    }

    pub fn class_deinit<S: DeviceStack + ?Sized>(&self, stack: &S, cfg_idx: u8) -> Result<()> {
        self.slots.iter().try_for_each(|iface| iface.deinit(stack, cfg_idx))
    }

    /// Routes an interface request to the interface in the low byte of
    /// `wIndex`. Other recipients are not handled here.
    pub fn class_setup<S: DeviceStack + ?Sized>(&self, stack: &S, req: &Request) -> Result<()> {
        if req.recipient != Recipient::Interface {
            return Ok(());
        }

        let iface_num = (req.index & 0xff) as u8;
        match self.get(iface_num) {
            Some(iface) => iface.setup(stack, req),
            None => {
                trace!("setup for unknown interface {}", iface_num);
                Ok(())
            }
        }
    }

    pub fn class_data_in<S: DeviceStack + ?Sized>(&self, stack: &S, ep_num: u8) -> Result<()> {
        self.slots.iter().try_for_each(|iface| iface.data_in(stack, ep_num))
    }

    pub fn class_data_out<S: DeviceStack + ?Sized>(&self, stack: &S, ep_num: u8) -> Result<()> {
        self.slots.iter().try_for_each(|iface| iface.data_out(stack, ep_num))
    }
}

impl Default for UsbInterfaces {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ConfigDescriptorBuffer, ConfigurationAttributes};
    use crate::testing::{Event, MockStack};
    use crate::vcp::{self, VcpInfo, CDC_SET_CONTROL_LINE_STATE};
    use usb_device::control::RequestType;
    use usb_device::endpoint::EndpointType;
    use usb_device::UsbDirection;

    fn two_vcps() -> UsbInterfaces {
        let mut ifaces = UsbInterfaces::new();
        let mut config = ConfigDescriptorBuffer::new(1, ConfigurationAttributes::BUS_POWERED, 50);
        let first = VcpInfo {
            iface_num: 0,
            data_iface_num: 1,
            ep_cmd: 0x82,
            ep_in: 0x81,
            ep_out: 0x01,
            polling_interval: 1,
            max_data_packet_len: 64,
        };
        let second = VcpInfo {
            iface_num: 3,
            data_iface_num: 4,
            ep_cmd: 0x84,
            ep_in: 0x83,
            ep_out: 0x03,
            ..first
        };
        vcp::bind(&mut ifaces, &mut config, &first).unwrap();
        vcp::bind(&mut ifaces, &mut config, &second).unwrap();
        ifaces
    }

    fn set_control_line_state(iface_num: u8, recipient: Recipient) -> Request {
        Request {
            direction: UsbDirection::Out,
            request_type: RequestType::Class,
            recipient,
            request: CDC_SET_CONTROL_LINE_STATE,
            value: 1,
            index: iface_num as u16,
            length: 0,
        }
    }

    #[test]
    fn new_table_is_disabled() {
        let ifaces = UsbInterfaces::new();

        assert_eq!(ifaces.iter().count(), MAX_IF_COUNT);
        assert!(ifaces.iter().all(|(_, iface)| iface.is_disabled()));
        assert!(ifaces.get(MAX_IF_COUNT as u8).is_none());
        assert_eq!(ifaces.vcp(0).unwrap_err(), Error::WrongInterfaceType);
        assert_eq!(ifaces.vcp(MAX_IF_COUNT as u8).unwrap_err(), Error::UnknownSlot);
    }

    #[test]
    fn init_opens_every_vcp() {
        let ifaces = two_vcps();
        let stack = MockStack::configured();

        ifaces.class_init(&stack, 0).unwrap();

        let opened: std::vec::Vec<_> = stack
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Open(ep, EndpointType::Bulk, _) => Some(ep),
                _ => None,
            })
            .collect();
        assert_eq!(opened, [0x81, 0x01, 0x83, 0x03]);

        ifaces.class_deinit(&stack, 0).unwrap();
        assert_eq!(stack.events().len(), 12);
    }

    #[test]
    fn setup_is_routed_by_interface_number() {
        let ifaces = two_vcps();
        let stack = MockStack::configured();

        ifaces
            .class_setup(&stack, &set_control_line_state(3, Recipient::Interface))
            .unwrap();

        assert!(!ifaces.vcp(0).unwrap().is_connected());
        assert!(ifaces.vcp(3).unwrap().is_connected());
    }

    #[test]
    fn setup_for_data_or_unknown_interface_is_ignored() {
        let ifaces = two_vcps();
        let stack = MockStack::configured();

        for &iface_num in &[1u8, 4, 7, 0x42] {
            ifaces
                .class_setup(&stack, &set_control_line_state(iface_num, Recipient::Interface))
                .unwrap();
        }
        ifaces
            .class_setup(&stack, &set_control_line_state(0, Recipient::Device))
            .unwrap();

        assert!(!ifaces.vcp(0).unwrap().is_connected());
        assert!(!ifaces.vcp(3).unwrap().is_connected());
    }

    #[test]
    fn data_in_reaches_the_owning_vcp() {
        let ifaces = two_vcps();
        let stack = MockStack::configured();
        for &iface_num in &[0u8, 3] {
            ifaces
                .class_setup(&stack, &set_control_line_state(iface_num, Recipient::Interface))
                .unwrap();
            vcp::write(&ifaces, &stack, iface_num, b"x").unwrap();
        }

        ifaces.class_data_in(&stack, 3).unwrap();

        assert!(!ifaces.vcp(0).unwrap().in_idle());
        assert!(ifaces.vcp(3).unwrap().in_idle());
        assert_eq!(ifaces.class_data_out(&stack, 1), Ok(()));
    }
}
