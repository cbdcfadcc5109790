//! Device handle and top-level flash operations

mod device;

pub use device::{DeviceIdentity, Flash};
