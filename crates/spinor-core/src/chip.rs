//! Chip parameters
//!
//! Geometry and identity constants for the supported part, plus the timeout
//! tiers used when polling operations to completion. Parameters live on the
//! device handle so multiple chip instances (on separate buses) stay
//! independent.

/// Geometry and expected identity of a serial NOR flash part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipParams {
    /// Vendor name
    pub vendor: &'static str,
    /// Part name
    pub name: &'static str,
    /// Program page size in bytes
    pub page_size: u32,
    /// Smallest erase unit in bytes
    pub sector_size: u32,
    /// 32 KiB erase block size
    pub block_32k_size: u32,
    /// 64 KiB erase block size
    pub block_64k_size: u32,
    /// Total capacity in bytes
    pub total_size: u32,
    /// Expected JEDEC manufacturer byte
    pub manufacturer_id: u8,
    /// Expected JEDEC capacity byte
    pub capacity_id: u8,
}

impl ChipParams {
    /// Check if an address is inside the chip's address space
    pub fn is_valid_address(&self, addr: u32) -> bool {
        addr < self.total_size
    }

    /// Check if an address range is inside the chip's address space
    pub fn is_valid_range(&self, addr: u32, len: usize) -> bool {
        if addr >= self.total_size {
            return false;
        }
        let end = addr as u64 + len as u64;
        end <= self.total_size as u64
    }
}

/// ISSI IS25LP040E: 4 Mbit (512 KiB), 256-byte pages, 4 KiB sectors
pub const IS25LP040E: ChipParams = ChipParams {
    vendor: "ISSI",
    name: "IS25LP040E",
    page_size: 256,
    sector_size: 4096,
    block_32k_size: 32 * 1024,
    block_64k_size: 64 * 1024,
    total_size: 512 * 1024,
    manufacturer_id: 0x9D,
    capacity_id: 0x13,
};

/// Settle delay after releasing chip-select during init, in milliseconds
pub const INIT_SETTLE_MS: u32 = 10;

/// Timeout tiers for polling operations to completion
///
/// Policy constants bounding worst-case blocking, not datasheet values;
/// sized per operation class with headroom over typical completion times.
pub mod timeout {
    /// Generic transport transactions
    pub const TRANSPORT_MS: u32 = 5;
    /// Page program (typical ~3 ms)
    pub const PAGE_PROGRAM_MS: u32 = 10;
    /// Status register write
    pub const STATUS_WRITE_MS: u32 = 200;
    /// 4 KiB sector erase (typical ~100 ms)
    pub const SECTOR_ERASE_MS: u32 = 200;
    /// 32 KiB block erase
    pub const BLOCK_ERASE_32K_MS: u32 = 500;
    /// 64 KiB block erase
    pub const BLOCK_ERASE_64K_MS: u32 = 1000;
    /// Full chip erase (typical ~3 s)
    pub const CHIP_ERASE_MS: u32 = 10_000;
}
