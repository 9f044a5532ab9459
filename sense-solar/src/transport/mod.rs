//! Bus transports implementing [`crate::hw_trait::I2c`].

pub mod linux;

pub use linux::LinuxI2c;
