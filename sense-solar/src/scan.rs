//! Scan-and-aggregate: poll every configured sensor once and merge the
//! results into a single flat [`Report`].
//!
//! Aggregation is best-effort. A sensor that fails every attempt is left out
//! of the report and the scan carries on; the scan itself never fails.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time;

use crate::convert;
use crate::sensor::{Measurement, Sensor};
use crate::tracing::prelude::*;

/// Attempts per sensor and scan pass.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Pause between attempts on the same sensor.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Decimal places of floats in the encoded report.
const REPORT_PLACES: usize = 2;

/// A report value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f64),
    Integer(i64),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Value::Float(v) => serializer.serialize_f64(convert::round_to(v, REPORT_PLACES)),
            Value::Integer(v) => serializer.serialize_i64(v),
        }
    }
}

/// Flat mapping of metric name to value.
///
/// Merging is last-write-wins: when two sensors produce the same key, the one
/// scanned later replaces the earlier value. That only happens with missing
/// or duplicated prefixes, so every overwrite is logged as a warning.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Report {
    values: BTreeMap<String, Value>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a sensor's measurement into the report.
    pub fn merge(&mut self, measurement: Measurement) {
        for (key, value) in measurement {
            self.insert(key, Value::Float(value));
        }
    }

    /// Add a value that does not come from a sensor driver.
    pub fn insert_integer(&mut self, key: impl Into<String>, value: i64) {
        self.insert(key.into(), Value::Integer(value));
    }

    fn insert(&mut self, key: String, value: Value) {
        if let Some(previous) = self.values.get(&key) {
            warn!("Metric {} reported twice; {:?} replaces {:?}", key, value, previous);
        }
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encode as one JSON object, floats rounded to two places.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Presence of one configured sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub name: String,
    pub address: u8,
    pub present: bool,
}

/// Polls sensors strictly one after another, retrying each a bounded number
/// of times.
#[derive(Debug, Clone)]
pub struct Scanner {
    attempts: u32,
    retry_delay: Duration,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl Scanner {
    /// `attempts` below one is treated as one.
    pub fn new(attempts: u32, retry_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Read every sensor once, in order, and merge what succeeded.
    pub async fn scan(&self, sensors: &mut [Box<dyn Sensor>]) -> Report {
        let mut report = Report::new();

        for sensor in sensors.iter_mut() {
            if let Some(measurement) = self.read_with_retry(&mut **sensor).await {
                report.merge(measurement);
            }
        }

        debug!("Scan complete: {} metrics", report.len());
        report
    }

    async fn read_with_retry(&self, sensor: &mut dyn Sensor) -> Option<Measurement> {
        for attempt in 1..=self.attempts {
            match sensor.read_measurement().await {
                Ok(measurement) => {
                    trace!(
                        "{} at 0x{:02X} read on attempt {}",
                        sensor.name(),
                        sensor.address(),
                        attempt
                    );
                    return Some(measurement);
                }
                Err(e) => {
                    debug!(
                        "{} at 0x{:02X} attempt {}/{} failed: {}",
                        sensor.name(),
                        sensor.address(),
                        attempt,
                        self.attempts,
                        e
                    );
                    if attempt < self.attempts {
                        time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        warn!(
            "{} at 0x{:02X} skipped after {} attempts",
            sensor.name(),
            sensor.address(),
            self.attempts
        );
        None
    }

    /// Probe every sensor once, in order.
    pub async fn probe_all(&self, sensors: &mut [Box<dyn Sensor>]) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(sensors.len());
        for sensor in sensors.iter_mut() {
            let present = sensor.probe().await;
            results.push(ProbeResult {
                name: sensor.name().to_string(),
                address: sensor.address(),
                present,
            });
        }
        results
    }
}
