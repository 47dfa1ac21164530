use core::fmt;

use usb_device::UsbError;

/// The error type used by this library.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The interface number is outside of the interface table.
    UnknownSlot,

    /// The interface exists but is not bound as a VCP.
    WrongInterfaceType,

    /// The interface (or its paired data interface) was already bound.
    SlotAlreadyBound,

    /// Control and data interface numbers are the same.
    InterfaceConflict,

    /// The command or IN endpoint lacks the IN direction bit, or the OUT
    /// endpoint carries it.
    InvalidEndpointDirection,

    /// The configuration descriptor has no room left for the descriptor block.
    DescriptorSpaceExhausted,

    /// A blocking operation did not become ready before its deadline.
    Timeout,

    /// A device stack primitive failed.
    Usb(UsbErrorKind),
}

/// Comparable copy of a [`UsbError`] reported by the device stack.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UsbErrorKind {
    WouldBlock,
    ParseError,
    BufferOverflow,
    EndpointOverflow,
    EndpointMemoryOverflow,
    InvalidEndpoint,
    Unsupported,
    InvalidState,
}

impl From<UsbError> for UsbErrorKind {
    fn from(err: UsbError) -> Self {
        match err {
            UsbError::WouldBlock => UsbErrorKind::WouldBlock,
            UsbError::ParseError => UsbErrorKind::ParseError,
            UsbError::BufferOverflow => UsbErrorKind::BufferOverflow,
            UsbError::EndpointOverflow => UsbErrorKind::EndpointOverflow,
            UsbError::EndpointMemoryOverflow => UsbErrorKind::EndpointMemoryOverflow,
            UsbError::InvalidEndpoint => UsbErrorKind::InvalidEndpoint,
            UsbError::Unsupported => UsbErrorKind::Unsupported,
            UsbError::InvalidState => UsbErrorKind::InvalidState,
        }
    }
}

/// A result type with the error hardwired to [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

impl From<UsbError> for Error {
    fn from(err: UsbError) -> Self {
        Error::Usb(err.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::UnknownSlot => "invalid interface number",
            Error::WrongInterfaceType => "interface is not a VCP",
            Error::SlotAlreadyBound => "interface is already enabled",
            Error::InterfaceConflict => "control and data interface numbers collide",
            Error::InvalidEndpointDirection => "endpoint direction does not match its role",
            Error::DescriptorSpaceExhausted => "not enough space in the configuration descriptor",
            Error::Timeout => "operation timed out",
            Error::Usb(err) => return write!(f, "USB error: {:?}", err),
        };

        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
