//! Error types for spinor-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A caller-supplied argument is unusable (empty buffer, zero length,
    /// length exceeding the page size for a single-page program)
    InvalidArgument,
    /// Address or address+length exceeds the chip capacity
    OutOfRange,
    /// Operation attempted before a successful `init`
    NotInitialized,
    /// Identity bytes read during init do not match the expected part
    DeviceMismatch {
        /// Manufacturer byte reported by the chip
        manufacturer: u8,
        /// Capacity byte reported by the chip
        capacity: u8,
    },
    /// The underlying transmit/receive failed
    TransportFailure,
    /// The busy bit failed to clear within the operation's timeout tier
    Timeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::OutOfRange => write!(f, "address out of range"),
            Self::NotInitialized => write!(f, "device not initialized"),
            Self::DeviceMismatch {
                manufacturer,
                capacity,
            } => write!(
                f,
                "device mismatch: manufacturer 0x{:02X}, capacity 0x{:02X}",
                manufacturer, capacity
            ),
            Self::TransportFailure => write!(f, "transport failure"),
            Self::Timeout => write!(f, "operation timed out"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
