//! Polls I2C environmental and power sensors and aggregates their readings
//! into one flat report.
//!
//! Drivers ([`peripheral`]) sit behind the [`sensor::Sensor`] trait and talk
//! to the bus through [`hw_trait::I2c`]. The [`scan::Scanner`] reads them one
//! after another with bounded retry and merges whatever succeeded.

pub mod config;
pub mod convert;
pub mod crc;
pub mod error;
pub mod hw_trait;
pub mod peripheral;
pub mod scan;
pub mod sensor;
pub mod tracing;
pub mod transport;
pub mod wifi;
