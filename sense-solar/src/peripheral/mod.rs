//! Sensor chip drivers.
//!
//! One driver per part, all generic over [`crate::hw_trait::I2c`] and all
//! implementing [`crate::sensor::Sensor`].

pub mod ina226;
pub mod sht3x;
pub mod tsl2561;

pub use ina226::Ina226;
pub use sht3x::Sht3x;
pub use tsl2561::Tsl2561;
