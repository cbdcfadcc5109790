//! Transport trait and transaction framing
//!
//! The core never touches hardware directly: everything below the command
//! layer is reached through [`SpiBus`], which a programmer/board crate
//! implements. One [`execute`] call is exactly one chip-select framed
//! transaction; chip-select is released on every exit path, success or
//! failure.

use crate::error::Result;
use crate::spi::{SpiCommand, MAX_HEADER_LEN};

/// Byte transport capability for a single flash chip
///
/// Implementations own the physical link and the chip-select signal. The
/// core only decides what bytes to send and when; signal toggling, timing,
/// and electrical concerns stay behind this trait.
pub trait SpiBus {
    /// Transmit bytes while chip-select is asserted
    fn transmit(&mut self, bytes: &[u8]) -> Result<()>;

    /// Transmit `out`, then clock `read_buf.len()` further bytes (sending
    /// `0xFF` filler) and capture them into `read_buf`
    ///
    /// The response payload therefore starts immediately after the
    /// command+address+dummy prefix held in `out`.
    fn transmit_receive(&mut self, out: &[u8], read_buf: &mut [u8]) -> Result<()>;

    /// Drive chip-select active
    fn assert_select(&mut self);

    /// Release chip-select to its idle state
    fn deassert_select(&mut self);

    /// Monotonic millisecond tick source
    fn now_ms(&self) -> u32;

    /// Block for the given number of milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// Execute a single command as one chip-select framed transaction
///
/// Encodes the header, asserts chip-select, runs the transfer, and
/// deasserts chip-select before returning - on the error path too.
pub fn execute<B: SpiBus + ?Sized>(bus: &mut B, cmd: &mut SpiCommand<'_>) -> Result<()> {
    let mut header = [0u8; MAX_HEADER_LEN];
    let len = cmd.encode_header(&mut header);

    bus.assert_select();
    let result = if cmd.has_read() {
        bus.transmit_receive(&header[..len], cmd.read_buf)
    } else if cmd.has_write() {
        bus.transmit(&header[..len])
            .and_then(|()| bus.transmit(cmd.write_data))
    } else {
        bus.transmit(&header[..len])
    };
    bus.deassert_select();

    result
}
