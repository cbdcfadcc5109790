//! Command implementations

use crate::cli::EraseSize;
use crate::CliError;
use spinor_core::flash::Flash;
use spinor_dummy::DummyBus;
use std::path::Path;

/// Run the probe command: print identity and geometry
pub fn run_probe(flash: &mut Flash<DummyBus>) -> Result<(), CliError> {
    let params = *flash.params();
    let id = *flash.identity()?;
    let (_, device_id) = flash.read_device_id()?;

    println!(
        "Found: {} {} ({} bytes)",
        params.vendor, params.name, params.total_size
    );
    println!(
        "JEDEC id: {:02X} {:02X} {:02X}",
        id.manufacturer_id, id.memory_type, id.capacity
    );
    println!("Device id: {:02X}", device_id);
    print!("Unique id:");
    for byte in id.unique_id {
        print!(" {:02X}", byte);
    }
    println!();
    println!(
        "Geometry: {} byte pages, {} byte sectors, {}/{} byte blocks",
        params.page_size, params.sector_size, params.block_32k_size, params.block_64k_size
    );
    Ok(())
}

/// Run the read command
pub fn run_read(
    flash: &mut Flash<DummyBus>,
    address: u32,
    length: u32,
    output: Option<&Path>,
    fast: bool,
) -> Result<(), CliError> {
    let mut buf = vec![0u8; length as usize];
    if fast {
        flash.fast_read(address, &mut buf)?;
    } else {
        flash.read(address, &mut buf)?;
    }

    match output {
        Some(path) => {
            std::fs::write(path, &buf)?;
            println!("Read {} bytes at 0x{:06X} to {}", length, address, path.display());
        }
        None => hexdump(address, &buf),
    }
    Ok(())
}

/// Run the write command
pub fn run_write(flash: &mut Flash<DummyBus>, address: u32, input: &Path) -> Result<(), CliError> {
    let data = std::fs::read(input)?;
    flash.write(address, &data)?;
    println!("Wrote {} bytes at 0x{:06X}", data.len(), address);
    Ok(())
}

/// Run the erase command for one unit
pub fn run_erase(
    flash: &mut Flash<DummyBus>,
    address: u32,
    size: EraseSize,
) -> Result<(), CliError> {
    let (unit, label) = match size {
        EraseSize::Sector => (flash.params().sector_size, "sector"),
        EraseSize::Block32 => (flash.params().block_32k_size, "32K block"),
        EraseSize::Block64 => (flash.params().block_64k_size, "64K block"),
    };
    match size {
        EraseSize::Sector => flash.erase_sector(address)?,
        EraseSize::Block32 => flash.erase_block_32k(address)?,
        EraseSize::Block64 => flash.erase_block_64k(address)?,
    }
    println!("Erased {} at 0x{:06X}", label, address - address % unit);
    Ok(())
}

/// Run the chip erase command
pub fn run_erase_chip(flash: &mut Flash<DummyBus>) -> Result<(), CliError> {
    flash.erase_chip()?;
    println!("Chip erase complete");
    Ok(())
}

fn hexdump(base: u32, data: &[u8]) {
    for (i, chunk) in data.chunks(16).enumerate() {
        print!("{:06X}: ", base as usize + i * 16);
        for byte in chunk {
            print!("{:02X} ", byte);
        }
        println!();
    }
}
