//! Flash device handle
//!
//! [`Flash`] owns the bus capability for one chip and carries the identity
//! captured at init. Every operation takes `&mut self`, so exclusive
//! ownership of the chip's command stream is a compile-time property; a
//! handle shared between threads needs external mutual exclusion.

use crate::bus::SpiBus;
use crate::chip::{timeout, ChipParams, INIT_SETTLE_MS, IS25LP040E};
use crate::error::{Error, Result};
use crate::protocol;
use crate::spi::{opcodes, Status};

/// Identity read from the chip during init
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// JEDEC manufacturer byte
    pub manufacturer_id: u8,
    /// JEDEC memory type byte
    pub memory_type: u8,
    /// JEDEC capacity byte
    pub capacity: u8,
    /// 64-bit factory unique ID
    pub unique_id: [u8; 8],
}

/// Handle for a single serial NOR flash chip
///
/// Constructed empty, populated and validated by [`Flash::init`], then used
/// for all other operations. The identity reads (`read_jedec_id`,
/// `read_device_id`, `read_unique_id`) are the only operations permitted
/// before a successful init - they are what init itself is built from.
pub struct Flash<B: SpiBus> {
    bus: B,
    params: &'static ChipParams,
    identity: Option<DeviceIdentity>,
}

impl<B: SpiBus> Flash<B> {
    /// Create an uninitialized handle for the default part (IS25LP040E)
    pub fn new(bus: B) -> Self {
        Self::with_params(bus, &IS25LP040E)
    }

    /// Create an uninitialized handle for a specific part
    pub fn with_params(bus: B, params: &'static ChipParams) -> Self {
        Self {
            bus,
            params,
            identity: None,
        }
    }

    /// The chip parameters this handle was built with
    pub fn params(&self) -> &ChipParams {
        self.params
    }

    /// Consume the handle and return the bus
    pub fn release(self) -> B {
        self.bus
    }

    /// Initialize the device
    ///
    /// Releases chip-select to its idle state, waits for the part to
    /// settle, then reads and verifies the JEDEC identity. Fails with
    /// [`Error::DeviceMismatch`] unless the manufacturer and capacity
    /// bytes match the expected part; only on a match is the handle
    /// marked initialized. The unique ID is captured here as well.
    pub fn init(&mut self) -> Result<()> {
        self.bus.deassert_select();
        self.bus.delay_ms(INIT_SETTLE_MS);

        let (manufacturer, memory_type, capacity) = protocol::read_jedec_id(&mut self.bus)?;
        log::debug!(
            "JEDEC id: {:02X} {:02X} {:02X}",
            manufacturer,
            memory_type,
            capacity
        );

        if manufacturer != self.params.manufacturer_id || capacity != self.params.capacity_id {
            return Err(Error::DeviceMismatch {
                manufacturer,
                capacity,
            });
        }

        let unique_id = protocol::read_unique_id(&mut self.bus)?;

        self.identity = Some(DeviceIdentity {
            manufacturer_id: manufacturer,
            memory_type,
            capacity,
            unique_id,
        });

        log::debug!(
            "initialized {} {} ({} bytes)",
            self.params.vendor,
            self.params.name,
            self.params.total_size
        );
        Ok(())
    }

    /// Identity captured during init
    pub fn identity(&self) -> Result<&DeviceIdentity> {
        self.identity.as_ref().ok_or(Error::NotInitialized)
    }

    /// Read the JEDEC ID: (manufacturer, memory type, capacity)
    pub fn read_jedec_id(&mut self) -> Result<(u8, u8, u8)> {
        protocol::read_jedec_id(&mut self.bus)
    }

    /// Read the legacy manufacturer/device ID
    pub fn read_device_id(&mut self) -> Result<(u8, u8)> {
        protocol::read_device_id(&mut self.bus)
    }

    /// Read the 64-bit factory unique ID
    pub fn read_unique_id(&mut self) -> Result<[u8; 8]> {
        protocol::read_unique_id(&mut self.bus)
    }

    /// Read a fresh status register snapshot
    pub fn read_status(&mut self) -> Result<Status> {
        self.ensure_initialized()?;
        protocol::read_status(&mut self.bus)
    }

    /// Clear the write-enable latch
    pub fn write_disable(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        protocol::write_disable(&mut self.bus)
    }

    /// Read `buf.len()` bytes starting at `addr`
    ///
    /// Reads are not serialized against an in-flight program/erase by the
    /// protocol itself; beyond a best-effort ready check, callers must not
    /// issue a read while a mutation they started is still completing.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_initialized()?;
        self.check_range(addr, buf.len())?;
        let _ = protocol::wait_ready(&mut self.bus, timeout::TRANSPORT_MS);
        protocol::read_data(&mut self.bus, addr, buf)
    }

    /// Read `buf.len()` bytes starting at `addr` with the fast-read command
    ///
    /// Same contract as [`Flash::read`]; differs only in opcode and the
    /// extra dummy byte before the data phase.
    pub fn fast_read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.ensure_initialized()?;
        self.check_range(addr, buf.len())?;
        let _ = protocol::wait_ready(&mut self.bus, timeout::TRANSPORT_MS);
        protocol::fast_read(&mut self.bus, addr, buf)
    }

    /// Program up to one page at `addr` with a single program command
    ///
    /// `data` must fit within the page containing `addr`: the device wraps
    /// the address pointer to the start of the same page at the boundary
    /// instead of advancing. Use [`Flash::write`] for arbitrary ranges.
    pub fn write_page(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        self.check_range(addr, data.len())?;

        let page_size = self.params.page_size as usize;
        let page_offset = addr as usize % page_size;
        if data.len() > page_size || page_offset + data.len() > page_size {
            return Err(Error::InvalidArgument);
        }

        protocol::program_page(&mut self.bus, addr, data)
    }

    /// Write an arbitrary-length buffer starting at `addr`
    ///
    /// The buffer is decomposed into page-sized, boundary-aligned chunks;
    /// each chunk is fully sequenced (enable, program, poll to completion)
    /// before the next begins. If a chunk fails, the write fails without
    /// rolling back pages already committed.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        self.check_range(addr, data.len())?;

        let page_size = self.params.page_size as usize;
        log::debug!("write: {} bytes at 0x{:06X}", data.len(), addr);

        let mut offset = 0usize;
        let mut current_addr = addr;

        while offset < data.len() {
            let page_offset = current_addr as usize % page_size;
            let bytes_to_page_end = page_size - page_offset;
            let remaining = data.len() - offset;
            let chunk_size = core::cmp::min(bytes_to_page_end, remaining);

            protocol::program_page(
                &mut self.bus,
                current_addr,
                &data[offset..offset + chunk_size],
            )?;

            offset += chunk_size;
            current_addr += chunk_size as u32;
        }

        Ok(())
    }

    /// Erase the 4 KiB sector containing `addr`
    ///
    /// The address is aligned down to the enclosing sector boundary, so
    /// bytes before `addr` within the same sector are erased too.
    pub fn erase_sector(&mut self, addr: u32) -> Result<()> {
        self.erase_unit(
            addr,
            self.params.sector_size,
            opcodes::SE,
            timeout::SECTOR_ERASE_MS,
        )
    }

    /// Erase the 32 KiB block containing `addr` (aligned down, as for
    /// [`Flash::erase_sector`])
    pub fn erase_block_32k(&mut self, addr: u32) -> Result<()> {
        self.erase_unit(
            addr,
            self.params.block_32k_size,
            opcodes::BE_32K,
            timeout::BLOCK_ERASE_32K_MS,
        )
    }

    /// Erase the 64 KiB block containing `addr` (aligned down, as for
    /// [`Flash::erase_sector`])
    pub fn erase_block_64k(&mut self, addr: u32) -> Result<()> {
        self.erase_unit(
            addr,
            self.params.block_64k_size,
            opcodes::BE_64K,
            timeout::BLOCK_ERASE_64K_MS,
        )
    }

    /// Erase the entire chip
    pub fn erase_chip(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        log::debug!("chip erase");
        protocol::chip_erase(&mut self.bus)
    }

    /// Write the status register
    pub fn write_status(&mut self, value: u8) -> Result<()> {
        self.ensure_initialized()?;
        protocol::write_status(&mut self.bus, value)
    }

    /// Enter deep power-down
    pub fn power_down(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        protocol::power_down(&mut self.bus)
    }

    /// Release from deep power-down
    pub fn release_power_down(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        protocol::release_power_down(&mut self.bus)
    }

    fn erase_unit(&mut self, addr: u32, unit: u32, opcode: u8, timeout_ms: u32) -> Result<()> {
        self.ensure_initialized()?;
        if !self.params.is_valid_address(addr) {
            return Err(Error::OutOfRange);
        }

        let aligned = addr - addr % unit;
        log::debug!("erase 0x{:06X} (unit {} at 0x{:06X})", addr, unit, aligned);
        protocol::erase_block(&mut self.bus, opcode, aligned, timeout_ms)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.identity.is_none() {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        if len == 0 {
            return Err(Error::InvalidArgument);
        }
        if !self.params.is_valid_range(addr, len) {
            return Err(Error::OutOfRange);
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::chip::IS25LP040E;
    use std::vec::Vec;

    /// A mock bus that records every chip-select framed transaction
    ///
    /// Responses are canned: JEDEC/unique-id bytes are configurable and the
    /// status register reports busy for a configurable number of polls.
    struct MockBus {
        jedec: [u8; 3],
        unique: [u8; 8],
        device_id: u8,
        busy_polls: u32,
        clock_ms: u32,
        frame: Vec<u8>,
        frames: Vec<Vec<u8>>,
        fail_transmit: bool,
    }

    impl MockBus {
        fn new() -> Self {
            Self {
                jedec: [0x9D, 0x60, 0x13],
                unique: [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF],
                device_id: 0x12,
                busy_polls: 0,
                clock_ms: 0,
                frame: Vec::new(),
                frames: Vec::new(),
                fail_transmit: false,
            }
        }

        fn frames_with_opcode(&self, opcode: u8) -> Vec<&Vec<u8>> {
            self.frames.iter().filter(|f| f[0] == opcode).collect()
        }

        fn count(&self, opcode: u8) -> usize {
            self.frames_with_opcode(opcode).len()
        }
    }

    impl SpiBus for MockBus {
        fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
            if self.fail_transmit {
                return Err(Error::TransportFailure);
            }
            self.frame.extend_from_slice(bytes);
            Ok(())
        }

        fn transmit_receive(&mut self, out: &[u8], read_buf: &mut [u8]) -> Result<()> {
            self.frame.extend_from_slice(out);
            match out[0] {
                opcodes::RDSR => {
                    read_buf[0] = if self.busy_polls > 0 {
                        self.busy_polls -= 1;
                        Status::BUSY.bits()
                    } else {
                        0
                    };
                }
                opcodes::RDID => read_buf.copy_from_slice(&self.jedec),
                opcodes::RDUID => read_buf.copy_from_slice(&self.unique),
                opcodes::REMS => {
                    read_buf[0] = self.jedec[0];
                    read_buf[1] = self.device_id;
                }
                opcodes::READ | opcodes::FAST_READ => read_buf.fill(0xFF),
                _ => {}
            }
            Ok(())
        }

        fn assert_select(&mut self) {
            self.frame.clear();
        }

        fn deassert_select(&mut self) {
            if !self.frame.is_empty() {
                self.frames.push(core::mem::take(&mut self.frame));
            }
        }

        fn now_ms(&self) -> u32 {
            self.clock_ms
        }

        fn delay_ms(&mut self, ms: u32) {
            self.clock_ms += ms;
        }
    }

    fn initialized() -> Flash<MockBus> {
        let mut flash = Flash::new(MockBus::new());
        flash.init().unwrap();
        flash
    }

    #[test]
    fn init_captures_identity() {
        let flash = initialized();
        let id = flash.identity().unwrap();
        assert_eq!(id.manufacturer_id, 0x9D);
        assert_eq!(id.memory_type, 0x60);
        assert_eq!(id.capacity, 0x13);
        assert_eq!(id.unique_id, [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn init_rejects_wrong_manufacturer() {
        let mut bus = MockBus::new();
        bus.jedec[0] = 0xEF;
        let mut flash = Flash::new(bus);
        assert_eq!(
            flash.init(),
            Err(Error::DeviceMismatch {
                manufacturer: 0xEF,
                capacity: 0x13
            })
        );
        assert_eq!(flash.identity(), Err(Error::NotInitialized));
    }

    #[test]
    fn init_rejects_wrong_capacity() {
        let mut bus = MockBus::new();
        bus.jedec[2] = 0x14;
        let mut flash = Flash::new(bus);
        assert!(matches!(flash.init(), Err(Error::DeviceMismatch { .. })));
    }

    #[test]
    fn operations_require_init() {
        let mut flash = Flash::new(MockBus::new());
        let mut buf = [0u8; 4];
        assert_eq!(flash.read(0, &mut buf), Err(Error::NotInitialized));
        assert_eq!(flash.write(0, &[0xAA]), Err(Error::NotInitialized));
        assert_eq!(flash.erase_sector(0), Err(Error::NotInitialized));
        // Nothing reached the transport
        assert!(flash.release().frames.is_empty());
    }

    #[test]
    fn read_range_boundary() {
        let mut flash = initialized();
        let capacity = IS25LP040E.total_size;
        let mut buf = [0u8; 2];
        assert_eq!(flash.read(capacity - 1, &mut buf), Err(Error::OutOfRange));
        assert!(flash.read(capacity - 2, &mut buf).is_ok());
    }

    #[test]
    fn read_rejects_empty_buffer() {
        let mut flash = initialized();
        assert_eq!(flash.read(0, &mut []), Err(Error::InvalidArgument));
    }

    #[test]
    fn write_page_issues_single_program_command() {
        let mut flash = initialized();
        let data = [0x11, 0x22, 0x33, 0x44];
        flash.write_page(0x000120, &data).unwrap();

        let bus = flash.release();
        let programs = bus.frames_with_opcode(opcodes::PP);
        assert_eq!(programs.len(), 1);
        assert_eq!(
            programs[0].as_slice(),
            &[0x02, 0x00, 0x01, 0x20, 0x11, 0x22, 0x33, 0x44]
        );
        assert_eq!(bus.count(opcodes::WREN), 1);
    }

    #[test]
    fn write_page_rejects_page_boundary_crossing() {
        let mut flash = initialized();
        let data = [0u8; 32];
        assert_eq!(flash.write_page(0x0000F0, &data), Err(Error::InvalidArgument));
    }

    #[test]
    fn write_page_rejects_oversized_buffer() {
        let mut flash = initialized();
        let data = [0u8; 257];
        assert_eq!(flash.write_page(0, &data), Err(Error::InvalidArgument));
    }

    #[test]
    fn write_decomposes_on_page_boundaries() {
        let mut flash = initialized();
        // 300 bytes at 250: chunks of 6, 256, and 38 bytes
        let data: Vec<u8> = (0..300).map(|i| i as u8).collect();
        flash.write(250, &data).unwrap();

        let bus = flash.release();
        let programs = bus.frames_with_opcode(opcodes::PP);
        assert_eq!(programs.len(), 3);

        let page_size = IS25LP040E.page_size as usize;
        let mut expected_addr = 250usize;
        let mut consumed = 0usize;
        for frame in &programs {
            let addr =
                ((frame[1] as usize) << 16) | ((frame[2] as usize) << 8) | frame[3] as usize;
            let payload = &frame[4..];
            assert_eq!(addr, expected_addr);
            assert_eq!(payload, &data[consumed..consumed + payload.len()]);
            // Each chunk stays within a single page
            assert!(addr % page_size + payload.len() <= page_size);
            expected_addr += payload.len();
            consumed += payload.len();
        }
        assert_eq!(consumed, data.len());
    }

    #[test]
    fn chunk_count_matches_page_arithmetic() {
        for &(addr, len) in &[(0u32, 256usize), (0, 257), (255, 2), (4096, 1), (100, 1000)] {
            let mut flash = initialized();
            let data = std::vec![0xA5u8; len];
            flash.write(addr, &data).unwrap();

            let page = IS25LP040E.page_size as usize;
            let expected = (len + addr as usize % page).div_ceil(page);
            let bus = flash.release();
            assert_eq!(bus.count(opcodes::PP), expected, "addr={} len={}", addr, len);
        }
    }

    #[test]
    fn write_enable_reissued_before_every_chunk() {
        let mut flash = initialized();
        let data = std::vec![0x5Au8; 700];
        flash.write(0, &data).unwrap();
        flash.erase_sector(0x1000).unwrap();

        let bus = flash.release();
        let programs = bus.count(opcodes::PP);
        let erases = bus.count(opcodes::SE);
        assert_eq!(programs, 3);
        assert_eq!(erases, 1);
        assert_eq!(bus.count(opcodes::WREN), programs + erases);
    }

    #[test]
    fn write_rejects_empty_and_out_of_range() {
        let mut flash = initialized();
        assert_eq!(flash.write(0, &[]), Err(Error::InvalidArgument));
        let capacity = IS25LP040E.total_size;
        assert_eq!(flash.write(capacity - 1, &[0, 0]), Err(Error::OutOfRange));
        // Validation failures issue no transport traffic
        assert_eq!(flash.release().count(opcodes::PP), 0);
    }

    #[test]
    fn erase_sector_aligns_address_down() {
        for &(addr, aligned) in &[(0x1234u32, 0x1000u32), (0x2000, 0x2000), (0xFFF, 0x0000)] {
            let mut flash = initialized();
            flash.erase_sector(addr).unwrap();
            let bus = flash.release();
            let frames = bus.frames_with_opcode(opcodes::SE);
            assert_eq!(
                frames[0].as_slice(),
                &[
                    0x20,
                    (aligned >> 16) as u8,
                    (aligned >> 8) as u8,
                    aligned as u8
                ]
            );
        }
    }

    #[test]
    fn erase_blocks_align_to_their_unit() {
        let mut flash = initialized();
        flash.erase_block_32k(0x12345).unwrap();
        flash.erase_block_64k(0x12345).unwrap();
        let bus = flash.release();
        assert_eq!(
            bus.frames_with_opcode(opcodes::BE_32K)[0].as_slice(),
            &[0x52, 0x01, 0x00, 0x00]
        );
        assert_eq!(
            bus.frames_with_opcode(opcodes::BE_64K)[0].as_slice(),
            &[0xD8, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn erase_rejects_out_of_range_address() {
        let mut flash = initialized();
        assert_eq!(
            flash.erase_sector(IS25LP040E.total_size),
            Err(Error::OutOfRange)
        );
    }

    #[test]
    fn wait_ready_returns_immediately_when_idle() {
        let mut bus = MockBus::new();
        protocol::wait_ready(&mut bus, timeout::PAGE_PROGRAM_MS).unwrap();
        assert_eq!(bus.count(opcodes::RDSR), 1);
        assert_eq!(bus.clock_ms, 0);
    }

    #[test]
    fn wait_ready_times_out_when_busy_never_clears() {
        let mut bus = MockBus::new();
        bus.busy_polls = u32::MAX;
        assert_eq!(
            protocol::wait_ready(&mut bus, timeout::PAGE_PROGRAM_MS),
            Err(Error::Timeout)
        );
        assert!(bus.clock_ms > timeout::PAGE_PROGRAM_MS);
    }

    #[test]
    fn wait_ready_clears_after_some_polls() {
        let mut bus = MockBus::new();
        bus.busy_polls = 3;
        protocol::wait_ready(&mut bus, timeout::PAGE_PROGRAM_MS).unwrap();
        assert_eq!(bus.count(opcodes::RDSR), 4);
    }

    #[test]
    fn program_is_not_sent_when_enable_fails() {
        let mut flash = initialized();
        flash.bus.fail_transmit = true;
        assert_eq!(flash.write_page(0, &[0xAA]), Err(Error::TransportFailure));
        let bus = flash.release();
        assert_eq!(bus.count(opcodes::PP), 0);
    }

    #[test]
    fn device_id_read_uses_zero_address() {
        let mut flash = initialized();
        let (manufacturer, device) = flash.read_device_id().unwrap();
        assert_eq!((manufacturer, device), (0x9D, 0x12));
        let bus = flash.release();
        assert_eq!(
            bus.frames_with_opcode(opcodes::REMS)[0].as_slice(),
            &[0x90, 0x00, 0x00, 0x00]
        );
    }
}
