//! spinor-dummy - In-memory flash emulator for testing
//!
//! This crate provides a dummy bus that emulates a serial NOR flash chip in
//! memory, at the level of chip-select framed byte transactions. It's useful
//! for testing and development without real hardware: the driver's exact
//! wire traffic (write-enable gating, page wrap-around, erase alignment,
//! busy timing) is interpreted the way the real part would.

use spinor_core::bus::SpiBus;
use spinor_core::spi::{opcodes, Status};
use spinor_core::Result;

/// Configuration for the emulated chip
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JEDEC ID bytes: manufacturer, memory type, capacity
    pub jedec_id: [u8; 3],
    /// Legacy device ID byte (REMS response)
    pub device_id: u8,
    /// Factory unique ID
    pub unique_id: [u8; 8],
    /// Flash size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Smallest erase unit
    pub sector_size: usize,
    /// How long the busy bit stays set after a page program, in emulated ms
    pub program_time_ms: u32,
    /// How long the busy bit stays set after a block erase, in emulated ms
    pub erase_time_ms: u32,
    /// How long the busy bit stays set after a chip erase, in emulated ms
    pub chip_erase_time_ms: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            jedec_id: [0x9D, 0x60, 0x13], // ISSI IS25LP040E
            device_id: 0x12,
            unique_id: [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04],
            size: 512 * 1024,
            page_size: 256,
            sector_size: 4096,
            program_time_ms: 1,
            erase_time_ms: 2,
            chip_erase_time_ms: 5,
        }
    }
}

/// Operation counters, for asserting on the driver's command sequencing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    /// Write Enable commands accepted
    pub write_enables: usize,
    /// Page program commands executed
    pub programs: usize,
    /// Sector/block erase commands executed
    pub erases: usize,
    /// Chip erase commands executed
    pub chip_erases: usize,
}

/// Emulated flash chip behind the [`SpiBus`] transport interface
///
/// Time is simulated: `now_ms` only advances through `delay_ms`, and
/// program/erase operations keep the busy bit set for their configured
/// duration of emulated time.
pub struct DummyBus {
    config: DummyConfig,
    memory: Vec<u8>,
    frame: Vec<u8>,
    write_enabled: bool,
    powered_down: bool,
    clock_ms: u32,
    busy_until_ms: u32,
    stats: DummyStats,
}

impl DummyBus {
    /// Create a new emulated chip, fully erased (all 0xFF)
    pub fn new(config: DummyConfig) -> Self {
        let memory = vec![0xFF; config.size];
        Self {
            config,
            memory,
            frame: Vec::new(),
            write_enabled: false,
            powered_down: false,
            clock_ms: 0,
            busy_until_ms: 0,
            stats: DummyStats::default(),
        }
    }

    /// Create a new emulated chip with the default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create an emulated chip pre-filled with data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut bus = Self::new(config);
        let len = initial_data.len().min(bus.memory.len());
        bus.memory[..len].copy_from_slice(&initial_data[..len]);
        bus
    }

    /// Get a reference to the emulated flash contents
    pub fn data(&self) -> &[u8] {
        &self.memory
    }

    /// Get a mutable reference to the emulated flash contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Operation counters accumulated so far
    pub fn stats(&self) -> DummyStats {
        self.stats
    }

    fn is_busy(&self) -> bool {
        self.clock_ms < self.busy_until_ms
    }

    fn frame_address(&self) -> usize {
        ((self.frame[1] as usize) << 16) | ((self.frame[2] as usize) << 8) | self.frame[3] as usize
    }

    /// Program with the real part's wrap-around: the address pointer wraps
    /// to the start of the page at the boundary, and bits only clear (1->0)
    fn program(&mut self, addr: usize, data: &[u8]) {
        let page = self.config.page_size;
        let base = addr - addr % page;
        for (i, &byte) in data.iter().enumerate() {
            let index = base + (addr % page + i) % page;
            if index < self.memory.len() {
                self.memory[index] &= byte;
            }
        }
        self.stats.programs += 1;
        self.busy_until_ms = self.clock_ms + self.config.program_time_ms;
    }

    fn erase(&mut self, addr: usize, unit: usize) {
        let aligned = addr - addr % unit;
        let end = (aligned + unit).min(self.memory.len());
        for byte in &mut self.memory[aligned..end] {
            *byte = 0xFF;
        }
        log::trace!("dummy: erased {} bytes at 0x{:06X}", unit, aligned);
        self.stats.erases += 1;
        self.busy_until_ms = self.clock_ms + self.config.erase_time_ms;
    }

    /// Interpret one completed command frame
    ///
    /// Mutations take effect when chip-select is released, like the real
    /// part. Program/erase frames are silently ignored unless the
    /// write-enable latch is set; the latch clears after one such command
    /// either way.
    fn apply_frame(&mut self) {
        if self.frame.is_empty() {
            return;
        }
        let opcode = self.frame[0];

        if self.powered_down {
            if opcode == opcodes::RDP {
                self.powered_down = false;
            }
            return;
        }
        // A busy part only answers status reads
        if self.is_busy() {
            return;
        }

        match opcode {
            opcodes::WREN => {
                self.write_enabled = true;
                self.stats.write_enables += 1;
            }
            opcodes::WRDI => self.write_enabled = false,
            opcodes::PP => {
                if self.write_enabled && self.frame.len() > 4 {
                    let addr = self.frame_address();
                    let data = self.frame[4..].to_vec();
                    self.program(addr, &data);
                }
                self.write_enabled = false;
            }
            opcodes::SE => self.apply_erase(self.config.sector_size),
            opcodes::BE_32K => self.apply_erase(32 * 1024),
            opcodes::BE_64K => self.apply_erase(64 * 1024),
            opcodes::CE => {
                if self.write_enabled {
                    self.memory.fill(0xFF);
                    self.stats.chip_erases += 1;
                    self.busy_until_ms = self.clock_ms + self.config.chip_erase_time_ms;
                }
                self.write_enabled = false;
            }
            opcodes::WRSR => self.write_enabled = false,
            opcodes::DP => self.powered_down = true,
            _ => {}
        }
    }

    fn apply_erase(&mut self, unit: usize) {
        if self.write_enabled && self.frame.len() >= 4 {
            let addr = self.frame_address();
            self.erase(addr, unit);
        }
        self.write_enabled = false;
    }

    fn status_byte(&self) -> u8 {
        let mut status = Status::empty();
        if self.is_busy() {
            status |= Status::BUSY;
        }
        if self.write_enabled {
            status |= Status::WEL;
        }
        status.bits()
    }

    /// Serve the response phase of a read-style command
    fn respond(&mut self, read_buf: &mut [u8]) {
        if self.powered_down {
            read_buf.fill(0xFF);
            return;
        }

        match self.frame[0] {
            opcodes::RDSR => read_buf[0] = self.status_byte(),
            opcodes::RDID => read_buf.copy_from_slice(&self.config.jedec_id[..read_buf.len()]),
            opcodes::REMS => {
                read_buf[0] = self.config.jedec_id[0];
                read_buf[1] = self.config.device_id;
            }
            opcodes::RDUID => read_buf.copy_from_slice(&self.config.unique_id[..read_buf.len()]),
            opcodes::READ | opcodes::FAST_READ => {
                let addr = self.frame_address();
                for (i, byte) in read_buf.iter_mut().enumerate() {
                    // Reads wrap around at the end of the array
                    *byte = self.memory[(addr + i) % self.memory.len()];
                }
            }
            _ => read_buf.fill(0xFF),
        }
    }
}

impl SpiBus for DummyBus {
    fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        self.frame.extend_from_slice(bytes);
        Ok(())
    }

    fn transmit_receive(&mut self, out: &[u8], read_buf: &mut [u8]) -> Result<()> {
        self.frame.extend_from_slice(out);
        self.respond(read_buf);
        Ok(())
    }

    fn assert_select(&mut self) {
        self.frame.clear();
    }

    fn deassert_select(&mut self) {
        self.apply_frame();
        self.frame.clear();
    }

    fn now_ms(&self) -> u32 {
        self.clock_ms
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock_ms += ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinor_core::flash::Flash;
    use spinor_core::{protocol, Error};

    #[test]
    fn init_reads_identity() {
        let mut flash = Flash::new(DummyBus::new_default());
        flash.init().unwrap();
        let id = flash.identity().unwrap();
        assert_eq!(id.manufacturer_id, 0x9D);
        assert_eq!(id.capacity, 0x13);
        assert_eq!(id.unique_id, DummyConfig::default().unique_id);
    }

    #[test]
    fn init_rejects_foreign_chip() {
        let config = DummyConfig {
            jedec_id: [0xEF, 0x40, 0x18], // a Winbond part
            ..DummyConfig::default()
        };
        let mut flash = Flash::new(DummyBus::new(config));
        assert!(matches!(flash.init(), Err(Error::DeviceMismatch { .. })));
    }

    #[test]
    fn erase_write_read_round_trip() {
        let mut flash = Flash::new(DummyBus::new_default());
        flash.init().unwrap();

        flash.erase_sector(0x1000).unwrap();
        let pattern = [0x12, 0x34, 0x56, 0x78, 0x9A];
        flash.write(0x1010, &pattern).unwrap();

        let mut buf = [0u8; 5];
        flash.read(0x1010, &mut buf).unwrap();
        assert_eq!(buf, pattern);

        // The rest of the erased sector still reads as 0xFF
        let mut before = [0u8; 0x10];
        flash.read(0x1000, &mut before).unwrap();
        assert!(before.iter().all(|&b| b == 0xFF));
        let mut after = [0u8; 8];
        flash.read(0x1015, &mut after).unwrap();
        assert!(after.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn multi_page_write_round_trip() {
        let mut flash = Flash::new(DummyBus::new_default());
        flash.init().unwrap();

        let data: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();
        flash.write(0x01F0, &data).unwrap();

        let mut buf = vec![0u8; data.len()];
        flash.read(0x01F0, &mut buf).unwrap();
        assert_eq!(buf, data);

        // 600 bytes at offset 0x1F0: 16 + 256 + 256 + 72
        let stats = flash.release().stats();
        assert_eq!(stats.programs, 4);
        assert_eq!(stats.write_enables, 4);
    }

    #[test]
    fn write_enable_counted_per_mutation() {
        let mut flash = Flash::new(DummyBus::new_default());
        flash.init().unwrap();

        flash.erase_sector(0).unwrap();
        flash.write(0, &vec![0xA5; 300]).unwrap();

        let stats = flash.release().stats();
        assert_eq!(stats.erases, 1);
        assert_eq!(stats.programs, 2);
        assert_eq!(stats.write_enables, stats.erases + stats.programs);
    }

    #[test]
    fn program_without_enable_is_ignored() {
        let mut bus = DummyBus::new_default();
        // Raw program frame without a preceding WREN
        bus.assert_select();
        bus.transmit(&[0x02, 0x00, 0x00, 0x00, 0x00]).unwrap();
        bus.deassert_select();
        assert_eq!(bus.data()[0], 0xFF);
    }

    #[test]
    fn program_wraps_within_page() {
        let mut bus = DummyBus::new_default();
        // 8 bytes at page offset 252 of a raw program command: the last
        // 4 land at the start of the same page, not the next one
        protocol::program_page(&mut bus, 0x00FC, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(&bus.data()[0xFC..0x100], &[1, 2, 3, 4]);
        assert_eq!(&bus.data()[0x00..0x04], &[5, 6, 7, 8]);
        assert_eq!(bus.data()[0x100], 0xFF);
    }

    #[test]
    fn chip_erase_resets_everything() {
        let mut flash = Flash::new(DummyBus::new_default());
        flash.init().unwrap();
        flash.write(0x100, &[0x00; 32]).unwrap();
        flash.erase_chip().unwrap();
        let bus = flash.release();
        assert!(bus.data().iter().all(|&b| b == 0xFF));
        assert_eq!(bus.stats().chip_erases, 1);
    }

    #[test]
    fn busy_is_reported_until_operation_time_elapses() {
        let mut bus = DummyBus::new_default();
        protocol::write_enable(&mut bus).unwrap();
        let mut cmd = spinor_core::spi::SpiCommand::write_3b(opcodes::PP, 0, &[0xAA]);
        spinor_core::bus::execute(&mut bus, &mut cmd).unwrap();

        assert!(protocol::read_status(&mut bus).unwrap().is_busy());
        bus.delay_ms(bus.config().program_time_ms);
        assert!(!protocol::read_status(&mut bus).unwrap().is_busy());
    }

    #[test]
    fn erase_aligns_down_inside_the_emulator() {
        let mut bus = DummyBus::new_default();
        bus.data_mut()[0x1000..0x1010].fill(0x00);
        // A raw erase frame with an unaligned address clears the whole
        // containing sector, as the real part does
        protocol::erase_block(&mut bus, opcodes::SE, 0x1FFF, 200).unwrap();
        assert!(bus.data()[0x1000..0x2000].iter().all(|&b| b == 0xFF));
    }
}
