//! SPI command structure

use super::{opcodes, AddressWidth};

/// Largest possible command header: opcode + 3 address bytes + 4 dummy bytes
pub const MAX_HEADER_LEN: usize = 8;

/// A single SPI transaction
///
/// This is the one descriptor shape every supported command is expressed as:
/// an opcode, an optional big-endian address, a count of `0xFF` dummy bytes
/// clocked before the data phase, and at most one payload direction. Designed
/// to avoid allocation - uses slices for data. The lifetime parameter `'a`
/// ties the command to the buffers it references.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Number of dummy bytes between address and data phase
    pub dummy_bytes: u8,

    /// Data to write after opcode/address/dummy
    pub write_data: &'a [u8],

    /// Buffer to read into (mutable)
    pub read_buf: &'a mut [u8],
}

impl<'a> SpiCommand<'a> {
    /// Create a simple command with no address or data (e.g., WREN, CE)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_bytes: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a read register command with no address (e.g., RDSR, RDID)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_bytes: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a write register command with no address (e.g., WRSR)
    pub fn write_reg(opcode: u8, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_bytes: 0,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create a read command with a 3-byte address (e.g., READ)
    pub fn read_3b(opcode: u8, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            dummy_bytes: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create a write command with a 3-byte address (e.g., PP)
    pub fn write_3b(opcode: u8, addr: u32, data: &'a [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            dummy_bytes: 0,
            write_data: data,
            read_buf: &mut [],
        }
    }

    /// Create an erase command with a 3-byte address
    pub fn erase_3b(opcode: u8, addr: u32) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: AddressWidth::ThreeByte,
            dummy_bytes: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Set the number of dummy bytes
    pub fn with_dummy_bytes(mut self, count: u8) -> Self {
        self.dummy_bytes = count;
        self
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Returns true if this command has a write phase
    pub fn has_write(&self) -> bool {
        !self.write_data.is_empty()
    }

    /// Length of the command header (opcode + address + dummy bytes)
    pub fn header_len(&self) -> usize {
        1 + self.address_width.bytes() as usize + self.dummy_bytes as usize
    }

    /// Encode the command header into `buf`, returning the encoded length
    ///
    /// `buf` must be at least [`MAX_HEADER_LEN`] bytes. The response payload,
    /// if any, starts on the wire immediately after these bytes.
    pub fn encode_header(&self, buf: &mut [u8]) -> usize {
        buf[0] = self.opcode;
        let mut len = 1;
        if let Some(addr) = self.address {
            self.address_width.encode(addr, &mut buf[len..]);
            len += self.address_width.bytes() as usize;
        }
        for _ in 0..self.dummy_bytes {
            buf[len] = opcodes::DUMMY;
            len += 1;
        }
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cmd: &SpiCommand<'_>) -> ([u8; MAX_HEADER_LEN], usize) {
        let mut buf = [0u8; MAX_HEADER_LEN];
        let len = cmd.encode_header(&mut buf);
        (buf, len)
    }

    #[test]
    fn simple_command_is_one_byte() {
        let (buf, len) = header(&SpiCommand::simple(opcodes::WREN));
        assert_eq!(&buf[..len], &[0x06]);
    }

    #[test]
    fn read_command_encodes_big_endian_address() {
        let mut data = [0u8; 4];
        let (buf, len) = header(&SpiCommand::read_3b(opcodes::READ, 0x0123_45, &mut data));
        assert_eq!(&buf[..len], &[0x03, 0x01, 0x23, 0x45]);
    }

    #[test]
    fn address_is_truncated_to_24_bits() {
        let mut data = [0u8; 1];
        let (buf, len) = header(&SpiCommand::read_3b(opcodes::READ, 0xAB07_FFFF, &mut data));
        assert_eq!(&buf[..len], &[0x03, 0x07, 0xFF, 0xFF]);
    }

    #[test]
    fn fast_read_has_one_dummy_byte() {
        let mut data = [0u8; 2];
        let cmd = SpiCommand::read_3b(opcodes::FAST_READ, 0x40, &mut data).with_dummy_bytes(1);
        let (buf, len) = header(&cmd);
        assert_eq!(&buf[..len], &[0x0B, 0x00, 0x00, 0x40, 0xFF]);
    }

    #[test]
    fn unique_id_has_four_dummy_bytes() {
        let mut data = [0u8; 8];
        let cmd = SpiCommand::read_reg(opcodes::RDUID, &mut data).with_dummy_bytes(4);
        let (buf, len) = header(&cmd);
        assert_eq!(&buf[..len], &[0x4B, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn page_program_header_carries_no_payload() {
        let data = [0xAA; 4];
        let cmd = SpiCommand::write_3b(opcodes::PP, 0x1234, &data);
        let (buf, len) = header(&cmd);
        assert_eq!(&buf[..len], &[0x02, 0x00, 0x12, 0x34]);
        assert!(cmd.has_write());
        assert!(!cmd.has_read());
    }

    #[test]
    fn legacy_device_id_takes_zero_address() {
        let mut data = [0u8; 2];
        let (buf, len) = header(&SpiCommand::read_3b(opcodes::REMS, 0, &mut data));
        assert_eq!(&buf[..len], &[0x90, 0x00, 0x00, 0x00]);
    }
}
