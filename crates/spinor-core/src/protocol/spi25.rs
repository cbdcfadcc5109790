//! SPI25 protocol sequences
//!
//! Implements the common serial-NOR command sequences over an [`SpiBus`].
//! Every function here issues whole chip-select framed transactions; none
//! of them hold chip-select across iterations or commands.
//!
//! Mutating sequences follow the same shape throughout: wait until the chip
//! is ready, raise the write-enable latch, issue the command, then poll
//! busy to completion at the same timeout tier. The enable latch auto-clears
//! after one mutating command, so it is re-issued every single time and
//! never batched across operations.

use crate::bus::{execute, SpiBus};
use crate::chip::timeout;
use crate::error::{Error, Result};
use crate::spi::{opcodes, SpiCommand, Status};

/// Delay between status polls, in milliseconds
const POLL_INTERVAL_MS: u32 = 1;

/// Read the status register
pub fn read_status<B: SpiBus + ?Sized>(bus: &mut B) -> Result<Status> {
    let mut buf = [0u8; 1];
    let mut cmd = SpiCommand::read_reg(opcodes::RDSR, &mut buf);
    execute(bus, &mut cmd)?;
    Ok(Status::from_byte(buf[0]))
}

/// Send the Write Enable command
pub fn write_enable<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WREN);
    execute(bus, &mut cmd)
}

/// Send the Write Disable command
pub fn write_disable<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::WRDI);
    execute(bus, &mut cmd)
}

/// Wait for the busy bit to clear
///
/// Polls the status register (one chip-select framed transaction per
/// iteration) until busy clears, returning success on the first clear
/// read. Fails with [`Error::Timeout`] once more than `timeout_ms` has
/// elapsed since the call began with busy still set.
pub fn wait_ready<B: SpiBus + ?Sized>(bus: &mut B, timeout_ms: u32) -> Result<()> {
    let start = bus.now_ms();

    loop {
        if !read_status(bus)?.is_busy() {
            return Ok(());
        }
        if bus.now_ms().wrapping_sub(start) > timeout_ms {
            return Err(Error::Timeout);
        }
        bus.delay_ms(POLL_INTERVAL_MS);
    }
}

/// Read the JEDEC ID
///
/// Returns (manufacturer, memory type, capacity).
pub fn read_jedec_id<B: SpiBus + ?Sized>(bus: &mut B) -> Result<(u8, u8, u8)> {
    let mut buf = [0u8; 3];
    let mut cmd = SpiCommand::read_reg(opcodes::RDID, &mut buf);
    execute(bus, &mut cmd)?;
    Ok((buf[0], buf[1], buf[2]))
}

/// Read the legacy manufacturer/device ID (0x90 with a 3-byte zero address)
pub fn read_device_id<B: SpiBus + ?Sized>(bus: &mut B) -> Result<(u8, u8)> {
    let mut buf = [0u8; 2];
    let mut cmd = SpiCommand::read_3b(opcodes::REMS, 0, &mut buf);
    execute(bus, &mut cmd)?;
    Ok((buf[0], buf[1]))
}

/// Read the 64-bit factory unique ID
pub fn read_unique_id<B: SpiBus + ?Sized>(bus: &mut B) -> Result<[u8; 8]> {
    let mut buf = [0u8; 8];
    let mut cmd = SpiCommand::read_reg(opcodes::RDUID, &mut buf).with_dummy_bytes(4);
    execute(bus, &mut cmd)?;
    Ok(buf)
}

/// Read data with the plain READ command
pub fn read_data<B: SpiBus + ?Sized>(bus: &mut B, addr: u32, buf: &mut [u8]) -> Result<()> {
    let mut cmd = SpiCommand::read_3b(opcodes::READ, addr, buf);
    execute(bus, &mut cmd)
}

/// Read data with the FAST_READ command (one dummy byte before data)
pub fn fast_read<B: SpiBus + ?Sized>(bus: &mut B, addr: u32, buf: &mut [u8]) -> Result<()> {
    let mut cmd = SpiCommand::read_3b(opcodes::FAST_READ, addr, buf).with_dummy_bytes(1);
    execute(bus, &mut cmd)
}

/// Program a single page
///
/// `data` must not cross a page boundary; the device wraps the address
/// pointer to the start of the same page instead of advancing, silently
/// corrupting data. Callers enforce the boundary before reaching here.
/// Not durable until the trailing ready-wait returns.
pub fn program_page<B: SpiBus + ?Sized>(bus: &mut B, addr: u32, data: &[u8]) -> Result<()> {
    wait_ready(bus, timeout::PAGE_PROGRAM_MS)?;
    write_enable(bus)?;

    let mut cmd = SpiCommand::write_3b(opcodes::PP, addr, data);
    execute(bus, &mut cmd)?;

    wait_ready(bus, timeout::PAGE_PROGRAM_MS)
}

/// Erase one unit at an already-aligned address
///
/// `opcode` selects the erase granularity; `timeout_ms` is the tier
/// matching that granularity's expected duration.
pub fn erase_block<B: SpiBus + ?Sized>(
    bus: &mut B,
    opcode: u8,
    addr: u32,
    timeout_ms: u32,
) -> Result<()> {
    wait_ready(bus, timeout_ms)?;
    write_enable(bus)?;

    let mut cmd = SpiCommand::erase_3b(opcode, addr);
    execute(bus, &mut cmd)?;

    wait_ready(bus, timeout_ms)
}

/// Erase the entire chip
pub fn chip_erase<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    wait_ready(bus, timeout::CHIP_ERASE_MS)?;
    write_enable(bus)?;

    let mut cmd = SpiCommand::simple(opcodes::CE);
    execute(bus, &mut cmd)?;

    wait_ready(bus, timeout::CHIP_ERASE_MS)
}

/// Write the status register
///
/// Gated by write-enable like any other mutation.
pub fn write_status<B: SpiBus + ?Sized>(bus: &mut B, value: u8) -> Result<()> {
    wait_ready(bus, timeout::STATUS_WRITE_MS)?;
    write_enable(bus)?;

    let data = [value];
    let mut cmd = SpiCommand::write_reg(opcodes::WRSR, &data);
    execute(bus, &mut cmd)?;

    wait_ready(bus, timeout::STATUS_WRITE_MS)
}

/// Enter deep power-down
pub fn power_down<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::DP);
    execute(bus, &mut cmd)
}

/// Release from deep power-down
///
/// The part needs a short recovery time before it accepts commands again.
pub fn release_power_down<B: SpiBus + ?Sized>(bus: &mut B) -> Result<()> {
    let mut cmd = SpiCommand::simple(opcodes::RDP);
    execute(bus, &mut cmd)?;
    bus.delay_ms(1);
    Ok(())
}
