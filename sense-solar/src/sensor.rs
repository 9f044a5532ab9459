//! Uniform interface over the sensor drivers.
//!
//! Every driver in [`crate::peripheral`] implements [`Sensor`]; the
//! [`crate::scan::Scanner`] only ever talks to sensors through it.

use async_trait::async_trait;
use std::collections::btree_map::{self, BTreeMap};
use thiserror::Error;

use crate::hw_trait::I2cError;

/// Errors from a single measurement attempt.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Bus failure (no device, NACK, timeout)
    #[error("transport: {0}")]
    Transport(#[from] I2cError),

    /// A received word did not match its checksum
    #[error("{what} checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    Integrity {
        what: &'static str,
        expected: u8,
        actual: u8,
    },

    /// The device answered but is not the part this driver expects
    #[error("unsupported device: {0}")]
    Unsupported(String),
}

/// One driver's readings, keyed by metric name.
///
/// Names are prefixed on insertion, so two instances of the same driver
/// class with distinct prefixes never produce the same key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    prefix: String,
    values: BTreeMap<String, f64>,
}

impl Measurement {
    pub fn new(prefix: Option<&str>) -> Self {
        Self {
            prefix: prefix.unwrap_or_default().to_string(),
            values: BTreeMap::new(),
        }
    }

    /// Record `metric`, stored under `prefix + metric`.
    pub fn insert(&mut self, metric: &str, value: f64) {
        self.values.insert(format!("{}{}", self.prefix, metric), value);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, metric: &str, value: f64) -> Self {
        self.insert(metric, value);
        self
    }

    /// Look up a value by its full (prefixed) name.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl IntoIterator for Measurement {
    type Item = (String, f64);
    type IntoIter = btree_map::IntoIter<String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// A polled I2C sensor.
#[async_trait]
pub trait Sensor: Send {
    /// Model name, for logs.
    fn name(&self) -> &str;

    /// 7-bit bus address.
    fn address(&self) -> u8;

    /// Check whether the expected device answers at [`address`](Self::address).
    ///
    /// Presence probing is best-effort: "absent" and "glitched" are treated
    /// alike, so every bus error becomes `false` here.
    async fn probe(&mut self) -> bool;

    /// Run the device's full measurement sequence.
    async fn read_measurement(&mut self) -> Result<Measurement, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_applied_to_every_metric() {
        let m = Measurement::new(Some("panel_"))
            .with("voltage", 12.5)
            .with("current", 0.25);

        assert_eq!(m.get("panel_voltage"), Some(12.5));
        assert_eq!(m.get("panel_current"), Some(0.25));
        assert_eq!(m.get("voltage"), None);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn no_prefix_keeps_names() {
        let m = Measurement::new(None).with("temp", 21.5);
        let keys: Vec<_> = m.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["temp"]);
    }

    #[test]
    fn integrity_error_message() {
        let e = DriverError::Integrity {
            what: "temperature",
            expected: 0x92,
            actual: 0x00,
        };
        assert_eq!(
            e.to_string(),
            "temperature checksum mismatch: expected 0x92, got 0x00"
        );
    }
}
