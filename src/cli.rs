//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "spinor")]
#[command(author, version, about = "Serial NOR flash driver tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the emulated chip image (created if missing)
    #[arg(short, long, global = true, default_value = "flash.img")]
    pub image: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Erase unit selection
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EraseSize {
    /// 4 KiB sector
    #[value(name = "4k")]
    Sector,
    /// 32 KiB block
    #[value(name = "32k")]
    Block32,
    /// 64 KiB block
    #[value(name = "64k")]
    Block64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the flash chip and print its identity
    Probe,

    /// Read a range of flash to a file (or hexdump to stdout)
    Read {
        /// Start address (hex with 0x prefix, or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Number of bytes to read
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: u32,

        /// Output file path; hexdump to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the fast-read command
        #[arg(long)]
        fast: bool,
    },

    /// Write a file to flash at the given address
    Write {
        /// Start address (hex with 0x prefix, or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Input file path
        #[arg(long)]
        input: PathBuf,
    },

    /// Erase the unit containing the given address
    ///
    /// The address is aligned down to the unit boundary, so bytes before
    /// the given address within the same unit are erased too.
    Erase {
        /// Address inside the unit to erase
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Erase unit size
        #[arg(short, long, value_enum, default_value = "4k")]
        size: EraseSize,
    },

    /// Erase the entire chip
    EraseChip,
}
