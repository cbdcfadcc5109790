//! Flash command protocol
//!
//! Command sequences built on top of [`crate::bus::execute`]: identification
//! reads, the write-enable gate, busy polling, and the program/erase
//! sequencing every mutating operation goes through.

mod spi25;

pub use spi25::*;
