//! SPI flash command opcodes
//!
//! The standard JEDEC command set as implemented by the IS25LP040E and
//! compatible serial NOR parts. These byte layouts are part of the chip's
//! published command set and are reproduced byte-exact on the wire.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any program/erase/status-write operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL bit in the status register
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Write Status Register
pub const WRSR: u8 = 0x01;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer, memory type, capacity)
pub const RDID: u8 = 0x9F;
/// Read Electronic Manufacturer & Device ID (legacy, takes a zero address)
pub const REMS: u8 = 0x90;
/// Read Unique ID (4 dummy bytes, then an 8-byte factory identifier)
pub const RDUID: u8 = 0x4B;

// ============================================================================
// Read commands
// ============================================================================

/// Read Data (no dummy byte, limited clock rate)
pub const READ: u8 = 0x03;
/// Fast Read (one dummy byte before the data phase)
pub const FAST_READ: u8 = 0x0B;

// ============================================================================
// Program / erase
// ============================================================================

/// Page Program (up to one page, must not cross a page boundary)
pub const PP: u8 = 0x02;
/// Sector Erase (4 KiB)
pub const SE: u8 = 0x20;
/// Block Erase (32 KiB)
pub const BE_32K: u8 = 0x52;
/// Block Erase (64 KiB)
pub const BE_64K: u8 = 0xD8;
/// Chip Erase (entire array)
pub const CE: u8 = 0xC7;

// ============================================================================
// Power management
// ============================================================================

/// Deep Power-Down
pub const DP: u8 = 0xB9;
/// Release from Deep Power-Down
pub const RDP: u8 = 0xAB;

/// Filler byte clocked out during dummy cycles and receive phases
pub const DUMMY: u8 = 0xFF;
