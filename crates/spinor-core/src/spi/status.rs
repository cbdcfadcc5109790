//! Status register bits

use bitflags::bitflags;

bitflags! {
    /// Snapshot of the chip's status register
    ///
    /// Transient: read fresh on every poll, never cached.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Write In Progress - set while a program/erase is executing
        const BUSY = 1 << 0;
        /// Write Enable Latch - set by WREN, auto-cleared after one
        /// mutating command
        const WEL = 1 << 1;
    }
}

impl Status {
    /// Decode a raw status register byte, keeping reserved bits
    pub const fn from_byte(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }

    /// True while a program or erase operation is in progress
    pub const fn is_busy(&self) -> bool {
        self.contains(Self::BUSY)
    }

    /// True if the write-enable latch is set
    pub const fn write_enabled(&self) -> bool {
        self.contains(Self::WEL)
    }
}
