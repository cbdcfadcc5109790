//! spinor-core - Command-protocol layer for serial NOR flash chips
//!
//! This crate implements the protocol side of driving a SPI NOR flash chip:
//! encoding command frames, gating mutations behind write-enable, polling the
//! busy flag to completion, and decomposing writes/erases to respect the
//! hardware's page and erase-unit geometry. The byte transport itself (and
//! the chip-select line it frames transactions with) is supplied by the
//! caller through the [`bus::SpiBus`] trait.
//!
//! It is `no_std` compatible and allocation-free for use in embedded
//! environments.
//!
//! # Features
//!
//! - `std` - Enable standard library support (`std::error::Error` impls)
//!
//! # Example
//!
//! ```ignore
//! use spinor_core::flash::Flash;
//!
//! let mut flash = Flash::new(bus);
//! flash.init()?;
//! flash.erase_sector(0x1000)?;
//! flash.write(0x1000, b"hello")?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod bus;
pub mod chip;
pub mod error;
pub mod flash;
pub mod protocol;
pub mod spi;

pub use error::{Error, Result};
