use static_assertions::const_assert_eq;
use usb_device::endpoint::{EndpointAddress, EndpointType};

use crate::descriptor::*;
use crate::descriptor::combine_descriptors;
use crate::vcp::{VcpInfo, CDC_MAX_CMD_PACKET_LEN};

/// Every descriptor a VCP contributes to the configuration descriptor, in
/// the order they are sent to the host.
#[derive(Debug, Clone, Copy)]
pub struct VcpDescriptorBlock {
    pub assoc: InterfaceAssociationDescriptor,
    pub iface_cdc: InterfaceDescriptor,
    pub fheader: CdcHeaderFunctionalDescriptor,
    pub fcm: CdcCallManagementFunctionalDescriptor,
    pub facm: CdcAbstractControlManagementFunctionalDescriptor,
    pub funion: CdcUnionFunctionalDescriptor,
    pub ep_cmd: EndpointDescriptor,
    pub iface_data: InterfaceDescriptor,
    pub ep_out: EndpointDescriptor,
    pub ep_in: EndpointDescriptor,
}

impl VcpDescriptorBlock {
    pub const LEN: usize = InterfaceAssociationDescriptor::LEN
        + InterfaceDescriptor::LEN
        + CdcHeaderFunctionalDescriptor::LEN
        + CdcCallManagementFunctionalDescriptor::LEN
        + CdcAbstractControlManagementFunctionalDescriptor::LEN
        + CdcUnionFunctionalDescriptor::LEN
        + EndpointDescriptor::LEN
        + InterfaceDescriptor::LEN
        + EndpointDescriptor::LEN
        + EndpointDescriptor::LEN;

    /// Lays out the descriptors for `info`. Endpoint directions are not
    /// checked here.
    pub fn new(info: &VcpInfo) -> Self {
        VcpDescriptorBlock {
            assoc: InterfaceAssociationDescriptor {
                first_interface: info.iface_num,
                interface_count: 2,
                function_class: USB_CLASS_CDC,
                function_subclass: CDC_SUBCLASS_ACM,
                function_protocol: CDC_PROTOCOL_AT,
                function_name_idx: 0,
            },
            iface_cdc: InterfaceDescriptor {
                interface_num: info.iface_num,
                alternate_setting: 0,
                num_endpoints: 1,
                interface_class: USB_CLASS_CDC,
                interface_subclass: CDC_SUBCLASS_ACM,
                interface_protocol: CDC_PROTOCOL_AT,
                interface_name_idx: 0,
            },
            fheader: CdcHeaderFunctionalDescriptor {
                cdc_version: CDC_VERSION,
            },
            fcm: CdcCallManagementFunctionalDescriptor {
                capabilities: CallManagementCapabilities::empty(),
                data_interface: info.data_iface_num,
            },
            facm: CdcAbstractControlManagementFunctionalDescriptor {
                capabilities: AcmCapabilities::LINE_CODING,
            },
            funion: CdcUnionFunctionalDescriptor {
                control_interface: info.iface_num,
                subordinate_interface: info.data_iface_num,
            },
            ep_cmd: EndpointDescriptor {
                endpoint_addr: EndpointAddress::from(info.ep_cmd),
                ep_type: EndpointType::Interrupt,
                max_packet_size: CDC_MAX_CMD_PACKET_LEN,
                interval: info.polling_interval,
            },
            iface_data: InterfaceDescriptor {
                interface_num: info.data_iface_num,
                alternate_setting: 0,
                num_endpoints: 2,
                interface_class: USB_CLASS_CDC_DATA,
                interface_subclass: 0,
                interface_protocol: 0,
                interface_name_idx: 0,
            },
            ep_out: EndpointDescriptor {
                endpoint_addr: EndpointAddress::from(info.ep_out),
                ep_type: EndpointType::Bulk,
                max_packet_size: info.max_data_packet_len,
                interval: 0,
            },
            ep_in: EndpointDescriptor {
                endpoint_addr: EndpointAddress::from(info.ep_in),
                ep_type: EndpointType::Bulk,
                max_packet_size: info.max_data_packet_len,
                interval: 0,
            },
        }
    }

    pub fn to_arr(&self) -> [u8; Self::LEN] {
        combine_descriptors!(Self::LEN;
            self.assoc,
            self.iface_cdc,
            self.fheader,
            self.fcm,
            self.facm,
            self.funion,
            self.ep_cmd,
            self.iface_data,
            self.ep_out,
            self.ep_in,
        )
    }
}

const_assert_eq!(VcpDescriptorBlock::LEN, 66);
