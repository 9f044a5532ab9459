//! Hardware abstraction layer traits.
//!
//! Drivers in [`crate::peripheral`] are generic over these traits so they can
//! run against the Linux i2c-dev interface or against a scripted bus in tests.

pub mod i2c;

#[cfg(test)]
pub mod mock;

pub use i2c::{I2c, I2cError};
