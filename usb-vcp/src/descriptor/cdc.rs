use bitflags::bitflags;

pub use usbd_serial::USB_CLASS_CDC;

/// Data Interface Class Code (bInterfaceClass)
pub const USB_CLASS_CDC_DATA: u8 = 0x0a;
pub const CDC_SUBCLASS_ACM: u8 = 0x02;
pub const CDC_PROTOCOL_AT: u8 = 0x01;

/// Value reported in `bcdCDC`.
pub const CDC_VERSION: u16 = 0x1001;

const CS_INTERFACE: u8 = 0x24;

const CS_HEADER: u8 = 0x00;
const CS_CALL_MANAGEMENT: u8 = 0x01;
const CS_ABSTRACT_CONTROL_MANAGEMENT: u8 = 0x02;
const CS_UNION: u8 = 0x06;

#[derive(Debug, Clone, Copy)]
pub struct CdcHeaderFunctionalDescriptor {
    pub cdc_version: u16,
}

impl CdcHeaderFunctionalDescriptor {
    pub const LEN: usize = 5;

    pub const fn to_arr(&self) -> [u8; Self::LEN] {
        let version = self.cdc_version.to_le_bytes();
        [Self::LEN as u8, CS_INTERFACE, CS_HEADER, version[0], version[1]]
    }
}

bitflags! {
    pub struct CallManagementCapabilities: u8 {
        /// The device handles call management itself.
        const CALL_MANAGEMENT = 0b01;
        /// Call management may happen over the data class interface.
        const OVER_DATA_CLASS = 0b10;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CdcCallManagementFunctionalDescriptor {
    pub capabilities: CallManagementCapabilities,
    pub data_interface: u8,
}

impl CdcCallManagementFunctionalDescriptor {
    pub const LEN: usize = 5;

    pub const fn to_arr(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            CS_INTERFACE,
            CS_CALL_MANAGEMENT,
            self.capabilities.bits(),
            self.data_interface,
        ]
    }
}

bitflags! {
    pub struct AcmCapabilities: u8 {
        const COMM_FEATURE       = 0b0001;
        /// `SET_LINE_CODING`, `GET_LINE_CODING`, `SET_CONTROL_LINE_STATE`
        /// and the `SERIAL_STATE` notification.
        const LINE_CODING        = 0b0010;
        const SEND_BREAK         = 0b0100;
        const NETWORK_CONNECTION = 0b1000;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CdcAbstractControlManagementFunctionalDescriptor {
    pub capabilities: AcmCapabilities,
}

impl CdcAbstractControlManagementFunctionalDescriptor {
    pub const LEN: usize = 4;

    pub const fn to_arr(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            CS_INTERFACE,
            CS_ABSTRACT_CONTROL_MANAGEMENT,
            self.capabilities.bits(),
        ]
    }
}

/// Union functional descriptor with a single subordinate interface.
#[derive(Debug, Clone, Copy)]
pub struct CdcUnionFunctionalDescriptor {
    pub control_interface: u8,
    pub subordinate_interface: u8,
}

impl CdcUnionFunctionalDescriptor {
    pub const LEN: usize = 5;

    pub const fn to_arr(&self) -> [u8; Self::LEN] {
        [
            Self::LEN as u8,
            CS_INTERFACE,
            CS_UNION,
            self.control_interface,
            self.subordinate_interface,
        ]
    }
}
