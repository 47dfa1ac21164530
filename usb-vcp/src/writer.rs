use core::fmt;

use crate::vcp;
use crate::{Clock, DeviceStack, UsbInterfaces};

/// `core::fmt::Write` adapter over a VCP, for `write!`-style debug output.
///
/// Text is sent in chunks of at most one data packet, each waiting up to
/// `timeout` ticks for the previous one to complete. Like [`vcp::write`], the
/// output is silently dropped while no terminal is connected.
pub struct VcpWriter<'a, S: ?Sized, C: ?Sized> {
    ifaces: &'a UsbInterfaces,
    stack: &'a S,
    clock: &'a C,
    iface_num: u8,
    timeout: u32,
}

impl<'a, S, C> VcpWriter<'a, S, C>
where
    S: DeviceStack + ?Sized,
    C: Clock + ?Sized,
{
    pub fn new(
        ifaces: &'a UsbInterfaces,
        stack: &'a S,
        clock: &'a C,
        iface_num: u8,
        timeout: u32,
    ) -> Self {
        VcpWriter {
            ifaces,
            stack,
            clock,
            iface_num,
            timeout,
        }
    }
}

impl<S: ?Sized, C: ?Sized> fmt::Debug for VcpWriter<'_, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcpWriter")
            .field("iface_num", &self.iface_num)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<S, C> fmt::Write for VcpWriter<'_, S, C>
where
    S: DeviceStack + ?Sized,
    C: Clock + ?Sized,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let state = self.ifaces.vcp(self.iface_num).map_err(|_| fmt::Error)?;
        let packet_len = usize::from(state.max_data_packet_len()).max(1);

        for chunk in s.as_bytes().chunks(packet_len) {
            vcp::write_blocking(
                self.ifaces,
                self.stack,
                self.clock,
                self.iface_num,
                chunk,
                self.timeout,
            )
            .map_err(|_| fmt::Error)?;
        }

        Ok(())
    }
}
