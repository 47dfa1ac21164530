//! Standard USB descriptor records and configuration descriptor handling.

use bitfield::bitfield;
use bitflags::bitflags;
use usb_device::endpoint::{EndpointAddress, EndpointType};

mod cdc;
mod config;

pub use cdc::*;
pub use config::*;

pub const DESC_TYPE_CONFIGURATION: u8 = 0x02;
pub const DESC_TYPE_INTERFACE: u8 = 0x04;
pub const DESC_TYPE_ENDPOINT: u8 = 0x05;
pub const DESC_TYPE_ASSOCIATION: u8 = 0x0b;

/// Copies the serialized form of each descriptor, in order, into one array of
/// `$len` bytes.
macro_rules! combine_descriptors {
    ($len:expr; $($descriptor:expr),* $(,)?) => {{
        let mut data = [0u8; $len];
        let mut idx = 0;

        $({
            let arr = $descriptor.to_arr();
            data[idx..idx + arr.len()].copy_from_slice(&arr);
            idx += arr.len();
        })*

        debug_assert_eq!(idx, $len);
        data
    }};
}

pub(crate) use combine_descriptors;

bitflags! {
    pub struct ConfigurationAttributes: u8 {
        const BUS_POWERED   = 0b10000000;
        const SELF_POWERED  = 0b01000000;
        const REMOTE_WAKEUP = 0b00100000;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConfigurationDescriptor {
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_name_idx: u8,
    pub attributes: ConfigurationAttributes,
    pub max_power: u8,
}

impl ConfigurationDescriptor {
    pub const LEN: usize = 9;

    pub const fn to_arr(&self) -> [u8; Self::LEN] {
        let total_length = self.total_length.to_le_bytes();
        [
            Self::LEN as u8,
            DESC_TYPE_CONFIGURATION,
            total_length[0],
            total_length[1],
            self.num_interfaces,
            self.configuration_value,
            self.configuration_name_idx,
            self.attributes.bits(),
            self.max_power,
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InterfaceDescriptor {
    pub interface_num: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub interface_name_idx: u8,
}

impl InterfaceDescriptor {
    pub const LEN: usize = 9;

    pub const fn to_arr(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESC_TYPE_INTERFACE,
            self.interface_num,
            self.alternate_setting,
            self.num_endpoints,
            self.interface_class,
            self.interface_subclass,
            self.interface_protocol,
            self.interface_name_idx,
        ]
    }
}

bitfield! {
    /// `bmAttributes` of an endpoint descriptor.
    pub struct EndpointAttributes(u8);
    impl Debug;
    pub transfer_type, set_transfer_type: 1, 0;
    pub synchronisation_type, set_synchronisation_type: 3, 2;
    pub usage_type, set_usage_type: 5, 4;
}

impl EndpointAttributes {
    /// Attributes of a non-isochronous endpoint of the given transfer type.
    pub fn with_type(ep_type: EndpointType) -> Self {
        let mut attributes = EndpointAttributes(0);
        attributes.set_transfer_type(ep_type as u8);
        attributes
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EndpointDescriptor {
    pub endpoint_addr: EndpointAddress,
    pub ep_type: EndpointType,
    pub max_packet_size: u16,
    /// Polling interval in frames. Hosts ignore it on bulk endpoints.
    pub interval: u8,
}

impl EndpointDescriptor {
    pub const LEN: usize = 7;

    pub fn to_arr(&self) -> [u8; Self::LEN] {
        let max_packet_size = self.max_packet_size.to_le_bytes();
        [
            Self::LEN as u8,
            DESC_TYPE_ENDPOINT,
            u8::from(self.endpoint_addr),
            EndpointAttributes::with_type(self.ep_type).bits(),
            max_packet_size[0],
            max_packet_size[1],
            self.interval,
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InterfaceAssociationDescriptor {
    pub first_interface: u8,
    pub interface_count: u8,
    pub function_class: u8,
    pub function_subclass: u8,
    pub function_protocol: u8,
    pub function_name_idx: u8,
}

impl InterfaceAssociationDescriptor {
    pub const LEN: usize = 8;

    pub const fn to_arr(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            DESC_TYPE_ASSOCIATION,
            self.first_interface,
            self.interface_count,
            self.function_class,
            self.function_subclass,
            self.function_protocol,
            self.function_name_idx,
        ]
    }
}

/// Structural problems found by [`validate_configuration`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConfigError {
    /// A descriptor claims a length below 2 bytes.
    BadLength { offset: usize },
    /// A descriptor runs past the end of the buffer.
    Truncated { offset: usize },
    /// The first descriptor is not a configuration descriptor.
    MissingHeader,
    /// A second configuration descriptor was found.
    MultipleHeaders { offset: usize },
    /// `wTotalLength` differs from the buffer length.
    TotalLengthMismatch { declared: u16, actual: usize },
    /// `bNumInterfaces` differs from the number of interface descriptors.
    InterfaceCountMismatch { declared: u8, found: u8 },
    /// An interface declares a different number of endpoints than follow it.
    EndpointCountMismatch { interface_offset: usize, declared: u8, found: u8 },
}

/// Walks a complete configuration descriptor and checks that its lengths and
/// counts are consistent.
pub fn validate_configuration(data: &[u8]) -> Result<(), ConfigError> {
    let mut idx = 0;
    let mut interfaces_expected = 0;
    let mut interfaces_found = 0u8;
    // (offset, declared, found) of the interface currently being walked
    let mut current: Option<(usize, u8, u8)> = None;

    let check_endpoints = |current: Option<(usize, u8, u8)>| match current {
        Some((interface_offset, declared, found)) if declared != found => {
            Err(ConfigError::EndpointCountMismatch { interface_offset, declared, found })
        }
        _ => Ok(()),
    };

    while idx < data.len() {
        let len = data[idx] as usize;
        if len < 2 {
            return Err(ConfigError::BadLength { offset: idx });
        }
        if idx + len > data.len() {
            return Err(ConfigError::Truncated { offset: idx });
        }

        match data[idx + 1] {
            DESC_TYPE_CONFIGURATION if idx == 0 => {
                if len < ConfigurationDescriptor::LEN {
                    return Err(ConfigError::Truncated { offset: idx });
                }
                let declared = u16::from_le_bytes([data[2], data[3]]);
                if declared as usize != data.len() {
                    return Err(ConfigError::TotalLengthMismatch {
                        declared,
                        actual: data.len(),
                    });
                }
                interfaces_expected = data[4];
            }
            DESC_TYPE_CONFIGURATION => return Err(ConfigError::MultipleHeaders { offset: idx }),
            _ if idx == 0 => return Err(ConfigError::MissingHeader),
            DESC_TYPE_INTERFACE => {
                check_endpoints(current)?;
                if len < InterfaceDescriptor::LEN {
                    return Err(ConfigError::Truncated { offset: idx });
                }
                interfaces_found += 1;
                current = Some((idx, data[idx + 4], 0));
            }
            DESC_TYPE_ENDPOINT => {
                if let Some((_, _, found)) = current.as_mut() {
                    *found += 1;
                }
            }
            _ => (),
        }

        idx += len;
    }

    if data.is_empty() {
        return Err(ConfigError::MissingHeader);
    }
    check_endpoints(current)?;
    if interfaces_found != interfaces_expected {
        return Err(ConfigError::InterfaceCountMismatch {
            declared: interfaces_expected,
            found: interfaces_found,
        });
    }

    Ok(())
}
