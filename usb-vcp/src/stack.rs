use usb_device::control::Request;
use usb_device::endpoint::{EndpointAddress, EndpointType};
use usb_device::prelude::UsbDeviceState;

use crate::{Error, Result};

/// The low level USB device stack the interface functions run on.
///
/// Methods take `&self` because the stack is shared between normal execution
/// and the USB interrupt.
pub trait DeviceStack {
    /// Opens an endpoint of the active configuration.
    fn open_ep(
        &self,
        ep_addr: EndpointAddress,
        ep_type: EndpointType,
        max_packet_size: u16,
    ) -> usb_device::Result<()>;

    fn close_ep(&self, ep_addr: EndpointAddress);

    /// Queues `buf` for transmission on an IN endpoint.
    ///
    /// The data is copied into endpoint memory before this returns. Completion
    /// is reported later through [`ClassHandler::data_in`].
    fn transmit(&self, ep_addr: EndpointAddress, buf: &[u8]) -> usb_device::Result<()>;

    /// Sends `buf` as the data stage of the control transfer in progress.
    fn ctl_send_data(&self, buf: &[u8]) -> usb_device::Result<()>;

    fn state(&self) -> UsbDeviceState;
}

/// Class specific callbacks the device stack invokes on one interface.
///
/// All of them may run in interrupt context.
pub trait ClassHandler {
    /// The configuration was selected by the host.
    fn init<S: DeviceStack + ?Sized>(&self, stack: &S, cfg_idx: u8) -> Result<()>;

    /// The configuration is being torn down.
    fn deinit<S: DeviceStack + ?Sized>(&self, stack: &S, cfg_idx: u8) -> Result<()>;

    /// A SETUP packet addressed to this interface arrived.
    fn setup<S: DeviceStack + ?Sized>(&self, stack: &S, req: &Request) -> Result<()>;

    /// An IN transfer on endpoint number `ep_num` completed.
    fn data_in<S: DeviceStack + ?Sized>(&self, stack: &S, ep_num: u8) -> Result<()>;

    /// An OUT transfer on endpoint number `ep_num` completed.
    fn data_out<S: DeviceStack + ?Sized>(&self, stack: &S, ep_num: u8) -> Result<()>;
}

/// Time source and sleep primitive used by the blocking operations.
pub trait Clock {
    /// Monotonic tick counter, wrapping at `u32::MAX`.
    fn ticks(&self) -> u32;

    /// Suspends execution until the next interrupt of any kind.
    fn wait(&self);
}

/// Polls `ready` until it returns `true`, sleeping between polls, or fails
/// with [`Error::Timeout`] once `timeout` ticks have elapsed.
pub(crate) fn poll_until<C, F>(clock: &C, timeout: u32, mut ready: F) -> Result<()>
where
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    let start = clock.ticks();
    while !ready() {
        if clock.ticks().wrapping_sub(start) >= timeout {
            return Err(Error::Timeout);
        }
        clock.wait();
    }

    Ok(())
}

/// [`Clock`] that sleeps with `wfi`, reading ticks from a user supplied
/// counter (usually incremented by the SysTick handler).
#[cfg(feature = "cortex-m")]
pub struct WfiClock<F> {
    ticks: F,
}

#[cfg(feature = "cortex-m")]
impl<F: Fn() -> u32> WfiClock<F> {
    pub fn new(ticks: F) -> Self {
        WfiClock { ticks }
    }
}

#[cfg(feature = "cortex-m")]
impl<F> core::fmt::Debug for WfiClock<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WfiClock").finish()
    }
}

#[cfg(feature = "cortex-m")]
impl<F: Fn() -> u32> Clock for WfiClock<F> {
    fn ticks(&self) -> u32 {
        (self.ticks)()
    }

    fn wait(&self) {
        // Wait for interruption (the USB IRQ or the tick counter wakes us up)
        cortex_m::asm::wfi();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StepClock;
    use core::cell::Cell;

    #[test]
    fn ready_immediately() {
        let clock = StepClock::new(0);

        assert_eq!(poll_until(&clock, 0, || true), Ok(()));
        assert_eq!(clock.waits(), 0);
    }

    #[test]
    fn times_out_after_deadline() {
        let clock = StepClock::new(0);

        assert_eq!(poll_until(&clock, 25, || false), Err(Error::Timeout));
        assert!(clock.ticks() >= 25);
        assert_eq!(clock.waits(), 25);
    }

    #[test]
    fn deadline_survives_tick_wraparound() {
        let clock = StepClock::new(u32::MAX - 3);

        assert_eq!(poll_until(&clock, 10, || false), Err(Error::Timeout));
        assert_eq!(clock.waits(), 10);
        assert_eq!(clock.ticks(), 6);
    }

    #[test]
    fn becomes_ready_while_waiting() {
        let clock = StepClock::new(0);
        let polls = Cell::new(0);

        let res = poll_until(&clock, 100, || {
            polls.set(polls.get() + 1);
            polls.get() == 4
        });

        assert_eq!(res, Ok(()));
        assert_eq!(clock.waits(), 3);
    }
}
