//! CDC-ACM virtual serial port.
//!
//! The free functions address a VCP by the number of its control interface
//! and report [`Error::UnknownSlot`] / [`Error::WrongInterfaceType`] when that
//! interface is not a bound VCP.

use core::fmt;
use core::ops::Range;
use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace, warn};
use usb_device::control::{Request, RequestType};
use usb_device::endpoint::{EndpointAddress, EndpointType};
use usb_device::prelude::UsbDeviceState;
use usb_device::UsbDirection;
use usbd_serial::{ParityType, StopBits};

use crate::descriptor::DescriptorAllocator;
use crate::stack::poll_until;
use crate::{ClassHandler, Clock, DeviceStack, Error, Interface, Result, UsbInterfaces};

mod block;

pub use block::VcpDescriptorBlock;

/// Maximal length of packets on the IN command endpoint.
pub const CDC_MAX_CMD_PACKET_LEN: u16 = 0x08;

// Class-Specific Request Codes for PSTN subclasses
pub const CDC_GET_LINE_CODING: u8 = 0x21;
pub const CDC_SET_CONTROL_LINE_STATE: u8 = 0x22;

const EP_DIR_MASK: u8 = 0x80;

/// Placement of a VCP in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VcpInfo {
    /// Control interface, also the number the VCP is addressed by.
    pub iface_num: u8,
    pub data_iface_num: u8,
    /// Interrupt IN endpoint address for notifications.
    pub ep_cmd: u8,
    /// Bulk IN endpoint address.
    pub ep_in: u8,
    /// Bulk OUT endpoint address.
    pub ep_out: u8,
    /// Polling interval of the command endpoint, in frames.
    pub polling_interval: u8,
    /// `wMaxPacketSize` of both data endpoints.
    pub max_data_packet_len: u16,
}

impl VcpInfo {
    fn check_endpoints(&self) -> Result<()> {
        let is_in = |ep: u8| ep & EP_DIR_MASK == UsbDirection::In as u8;

        if !is_in(self.ep_cmd) || !is_in(self.ep_in) || is_in(self.ep_out) {
            return Err(Error::InvalidEndpointDirection);
        }

        Ok(())
    }
}

/// Serial parameters reported to `GET_LINE_CODING`.
#[derive(Clone, Copy)]
pub struct LineCoding {
    pub data_rate: u32,
    pub stop_bits: StopBits,
    pub parity_type: ParityType,
    pub data_bits: u8,
}

impl LineCoding {
    pub const LEN: usize = 7;

    pub const fn to_arr(&self) -> [u8; Self::LEN] {
        let rate = self.data_rate.to_le_bytes();
        [
            rate[0],
            rate[1],
            rate[2],
            rate[3],
            self.stop_bits as u8,
            self.parity_type as u8,
            self.data_bits,
        ]
    }
}

impl fmt::Debug for LineCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // usbd-serial enums have no Debug impl, print their wire values
        f.debug_struct("LineCoding")
            .field("data_rate", &self.data_rate)
            .field("stop_bits", &(self.stop_bits as u8))
            .field("parity_type", &(self.parity_type as u8))
            .field("data_bits", &self.data_bits)
            .finish()
    }
}

/// The host cannot change it: `SET_LINE_CODING` is not handled.
pub const LINE_CODING: LineCoding = LineCoding {
    data_rate: 115_200,
    stop_bits: StopBits::One,
    parity_type: ParityType::None,
    data_bits: 8,
};

/// Where a bound VCP is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcpStatus {
    /// Endpoints closed.
    Idle,
    /// Endpoints open, no terminal attached on the host side.
    Active,
    /// The host asserted DTR.
    Connected,
}

/// Runtime state of a bound VCP.
///
/// `in_idle` and `is_connected` are written from interrupt context, so they
/// are atomics and every method takes `&self`.
#[derive(Debug)]
pub struct VcpState {
    data_iface_num: u8,
    ep_cmd: EndpointAddress,
    ep_in: EndpointAddress,
    ep_out: EndpointAddress,
    max_data_packet_len: u16,
    desc_offset: usize,
    is_connected: AtomicBool,
    in_idle: AtomicBool,
    is_open: AtomicBool,
}

impl VcpState {
    fn new(info: &VcpInfo, desc_offset: usize) -> Self {
        VcpState {
            data_iface_num: info.data_iface_num,
            ep_cmd: EndpointAddress::from(info.ep_cmd),
            ep_in: EndpointAddress::from(info.ep_in),
            ep_out: EndpointAddress::from(info.ep_out),
            max_data_packet_len: info.max_data_packet_len,
            desc_offset,
            is_connected: AtomicBool::new(false),
            in_idle: AtomicBool::new(true),
            is_open: AtomicBool::new(false),
        }
    }

    pub fn data_iface_num(&self) -> u8 {
        self.data_iface_num
    }

    pub fn ep_cmd(&self) -> EndpointAddress {
        self.ep_cmd
    }

    pub fn ep_in(&self) -> EndpointAddress {
        self.ep_in
    }

    pub fn ep_out(&self) -> EndpointAddress {
        self.ep_out
    }

    pub fn max_data_packet_len(&self) -> u16 {
        self.max_data_packet_len
    }

    /// Location of the descriptor block inside the configuration descriptor.
    pub fn descriptor_range(&self) -> Range<usize> {
        self.desc_offset..self.desc_offset + VcpDescriptorBlock::LEN
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Acquire)
    }

    /// `false` while a transmission is in flight.
    pub fn in_idle(&self) -> bool {
        self.in_idle.load(Ordering::Acquire)
    }

    pub fn status(&self) -> VcpStatus {
        if !self.is_open.load(Ordering::Acquire) {
            VcpStatus::Idle
        } else if self.is_connected() {
            VcpStatus::Connected
        } else {
            VcpStatus::Active
        }
    }

    pub fn can_read(&self) -> bool {
        false
    }

    pub fn can_write<S: DeviceStack + ?Sized>(&self, stack: &S) -> bool {
        // Last transmission must be over and the device configured
        self.in_idle() && stack.state() == UsbDeviceState::Configured
    }

    /// Reception is not implemented: always reads nothing.
    pub fn read(&self, _buf: &mut [u8]) -> Result<usize> {
        Ok(0)
    }

    /// Starts transmitting `buf` on the IN endpoint and returns its length.
    ///
    /// Without a connected terminal the data is dropped and `0` is returned.
    /// The length is not checked against the packet size.
    pub fn write<S: DeviceStack + ?Sized>(&self, stack: &S, buf: &[u8]) -> Result<usize> {
        if !self.is_connected() {
            trace!("vcp: dropping {} bytes, not connected", buf.len());
            return Ok(0);
        }

        self.in_idle.store(false, Ordering::Release);
        if let Err(err) = stack.transmit(self.ep_in, buf) {
            warn!("vcp: transmit on {:?} failed: {:?}", self.ep_in, err);
            self.in_idle.store(true, Ordering::Release);
            return Err(err.into());
        }

        Ok(buf.len())
    }
}

impl ClassHandler for VcpState {
    fn init<S: DeviceStack + ?Sized>(&self, stack: &S, _cfg_idx: u8) -> Result<()> {
        let endpoints = [
            (self.ep_in, EndpointType::Bulk, self.max_data_packet_len),
            (self.ep_out, EndpointType::Bulk, self.max_data_packet_len),
            (self.ep_cmd, EndpointType::Interrupt, CDC_MAX_CMD_PACKET_LEN),
        ];

        for (idx, &(ep_addr, ep_type, max_packet_size)) in endpoints.iter().enumerate() {
            if let Err(err) = stack.open_ep(ep_addr, ep_type, max_packet_size) {
                warn!("vcp: cannot open endpoint {:?}: {:?}", ep_addr, err);
                // Leave nothing half open
                for &(opened, _, _) in &endpoints[..idx] {
                    stack.close_ep(opened);
                }
                return Err(err.into());
            }
        }

        self.in_idle.store(true, Ordering::Release);
        self.is_open.store(true, Ordering::Release);
        debug!("vcp: endpoints {:?}/{:?}/{:?} open", self.ep_in, self.ep_out, self.ep_cmd);

        Ok(())
    }

    fn deinit<S: DeviceStack + ?Sized>(&self, stack: &S, _cfg_idx: u8) -> Result<()> {
        stack.close_ep(self.ep_in);
        stack.close_ep(self.ep_out);
        stack.close_ep(self.ep_cmd);

        self.is_open.store(false, Ordering::Release);
        debug!("vcp: endpoints closed");

        Ok(())
    }

    fn setup<S: DeviceStack + ?Sized>(&self, stack: &S, req: &Request) -> Result<()> {
        if req.request_type != RequestType::Class {
            return Ok(());
        }

        match req.request {
            CDC_GET_LINE_CODING => {
                let line_coding = LINE_CODING.to_arr();
                let len = line_coding.len().min(req.length as usize);
                debug!("vcp: GET_LINE_CODING, sending {} bytes", len);
                stack.ctl_send_data(&line_coding[..len])?;
            }
            CDC_SET_CONTROL_LINE_STATE => {
                // Bit 0 is DTR
                let connected = req.value & 1 != 0;
                if connected != self.is_connected() {
                    debug!("vcp: {}", if connected { "connected" } else { "disconnected" });
                }
                self.is_connected.store(connected, Ordering::Release);
            }
            request => trace!("vcp: ignoring class request {:#04x}", request),
        }

        Ok(())
    }

    fn data_in<S: DeviceStack + ?Sized>(&self, _stack: &S, ep_num: u8) -> Result<()> {
        if ep_num | EP_DIR_MASK == u8::from(self.ep_in) {
            self.in_idle.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn data_out<S: DeviceStack + ?Sized>(&self, _stack: &S, _ep_num: u8) -> Result<()> {
        // Received data is not processed
        Ok(())
    }
}

/// Adds the VCP described by `info` to the configuration.
///
/// Claims the control and the data interface, appends the descriptor block to
/// `desc` and installs a fresh [`VcpState`]. Nothing is modified on error.
pub fn bind<A: DescriptorAllocator + ?Sized>(
    ifaces: &mut UsbInterfaces,
    desc: &mut A,
    info: &VcpInfo,
) -> Result<()> {
    for &iface_num in &[info.iface_num, info.data_iface_num] {
        let iface = ifaces.get(iface_num).ok_or(Error::UnknownSlot)?;
        if !iface.is_disabled() {
            warn!("vcp: interface {} is already enabled", iface_num);
            return Err(Error::SlotAlreadyBound);
        }
    }
    if info.iface_num == info.data_iface_num {
        return Err(Error::InterfaceConflict);
    }

    let block = VcpDescriptorBlock::new(info);
    info.check_endpoints()?;

    let d = desc
        .alloc_iface(VcpDescriptorBlock::LEN)
        .ok_or(Error::DescriptorSpaceExhausted)?;
    d.copy_from_slice(&block.to_arr());
    // The block declares two interfaces
    let offset = desc.add_iface(VcpDescriptorBlock::LEN, 2);

    ifaces.install(info.iface_num, Interface::Vcp(VcpState::new(info, offset)));
    ifaces.install(
        info.data_iface_num,
        Interface::VcpData {
            control_iface: info.iface_num,
        },
    );
    debug!(
        "vcp: bound interfaces {}/{} (cmd {:#04x}, in {:#04x}, out {:#04x})",
        info.iface_num, info.data_iface_num, info.ep_cmd, info.ep_in, info.ep_out
    );

    Ok(())
}

pub fn can_read(ifaces: &UsbInterfaces, iface_num: u8) -> bool {
    ifaces.vcp(iface_num).map_or(false, VcpState::can_read)
}

pub fn can_write<S: DeviceStack + ?Sized>(ifaces: &UsbInterfaces, stack: &S, iface_num: u8) -> bool {
    ifaces
        .vcp(iface_num)
        .map_or(false, |state| state.can_write(stack))
}

pub fn read(ifaces: &UsbInterfaces, iface_num: u8, buf: &mut [u8]) -> Result<usize> {
    ifaces.vcp(iface_num)?.read(buf)
}

pub fn write<S: DeviceStack + ?Sized>(
    ifaces: &UsbInterfaces,
    stack: &S,
    iface_num: u8,
    buf: &[u8],
) -> Result<usize> {
    ifaces.vcp(iface_num)?.write(stack, buf)
}

/// Waits up to `timeout` ticks for data, then reads it.
pub fn read_blocking<C: Clock + ?Sized>(
    ifaces: &UsbInterfaces,
    clock: &C,
    iface_num: u8,
    buf: &mut [u8],
    timeout: u32,
) -> Result<usize> {
    let state = ifaces.vcp(iface_num)?;
    poll_until(clock, timeout, || state.can_read())?;
    state.read(buf)
}

/// Waits up to `timeout` ticks for the previous transmission to finish, then
/// writes `buf`.
pub fn write_blocking<S, C>(
    ifaces: &UsbInterfaces,
    stack: &S,
    clock: &C,
    iface_num: u8,
    buf: &[u8],
    timeout: u32,
) -> Result<usize>
where
    S: DeviceStack + ?Sized,
    C: Clock + ?Sized,
{
    let state = ifaces.vcp(iface_num)?;
    poll_until(clock, timeout, || state.can_write(stack))?;
    state.write(stack, buf)
}
