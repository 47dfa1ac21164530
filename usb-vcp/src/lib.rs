//! CDC-ACM virtual serial port (VCP) function for USB devices that expose
//! several interfaces through one configuration.
//!
//! A VCP owns two interfaces (control + data) tied together by an Interface
//! Association Descriptor. Binding it into a [`UsbInterfaces`] table writes its
//! descriptor block into the configuration descriptor and installs a
//! [`VcpState`]; after that the USB stack drives the [`ClassHandler`]
//! callbacks from interrupt context while firmware uses the functions in
//! [`vcp`] to send data.
//!
//! ```ignore
//! static VCP_INFO: VcpInfo = VcpInfo {
//!     iface_num: 1,
//!     data_iface_num: 2,
//!     ep_cmd: 0x82,
//!     ep_in: 0x83,
//!     ep_out: 0x03,
//!     polling_interval: 1,
//!     max_data_packet_len: 64,
//! };
//!
//! vcp::bind(&mut interfaces, &mut config, &VCP_INFO)?;
//! vcp::write_blocking(&interfaces, &stack, &clock, 1, b"hello\r\n", 100)?;
//! ```

#![no_std]
#![warn(missing_debug_implementations, rust_2018_idioms)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod descriptor;
mod error;
mod iface;
mod stack;
pub mod vcp;
mod writer;

#[cfg(test)]
mod testing;

pub use error::{Error, Result, UsbErrorKind};
pub use iface::{Interface, UsbInterfaces, MAX_IF_COUNT};
pub use stack::{ClassHandler, Clock, DeviceStack};
pub use vcp::{LineCoding, VcpInfo, VcpState, VcpStatus};
pub use writer::VcpWriter;

#[cfg(feature = "cortex-m")]
pub use stack::WfiClock;
