//! Configuration management for sense-solar.
//!
//! The configuration is a JSON file naming the bus and the sensors to poll,
//! in polling order. Without a file, [`Config::default`] describes the solar
//! station: one SHT-35 and three INA226 monitors (panel, charger, battery).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::Display;

use crate::convert::{Gain, Integration, PowerCalibration};
use crate::error::{Error, Result};
use crate::hw_trait::I2c;
use crate::peripheral::{ina226, sht3x, tsl2561, Ina226, Sht3x, Tsl2561};
use crate::scan::{self, Scanner};
use crate::sensor::Sensor;

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// I2C bus device
    #[serde(default = "default_bus")]
    pub bus: PathBuf,

    /// Retry policy
    #[serde(default)]
    pub scan: ScanConfig,

    /// Sensors, in polling order
    pub sensors: Vec<SensorConfig>,

    /// Wi-Fi signal level
    #[serde(default)]
    pub wifi: WifiConfig,
}

fn default_bus() -> PathBuf {
    PathBuf::from("/dev/i2c-1")
}

/// Retry policy of the scanner.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Attempts per sensor
    pub attempts: u32,

    /// Pause between attempts (ms)
    pub retry_delay_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            attempts: scan::DEFAULT_ATTEMPTS,
            retry_delay_ms: scan::DEFAULT_RETRY_DELAY.as_millis() as u64,
        }
    }
}

impl ScanConfig {
    pub fn scanner(&self) -> Scanner {
        Scanner::new(self.attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

/// Wi-Fi signal level collection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WifiConfig {
    pub enabled: bool,

    /// Program and arguments whose output contains `Signal level=-NN dBm`
    pub command: Vec<String>,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["iwconfig".to_string()],
        }
    }
}

/// Sensor models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Model {
    #[strum(to_string = "SHT3x")]
    Sht3x,
    #[strum(to_string = "TSL2561")]
    Tsl2561,
    #[strum(to_string = "INA226")]
    Ina226,
}

/// One configured sensor.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "model", rename_all = "snake_case", deny_unknown_fields)]
pub enum SensorConfig {
    Sht3x {
        #[serde(default = "default_sht3x_addr")]
        address: u8,
        #[serde(default)]
        prefix: Option<String>,
    },
    Tsl2561 {
        #[serde(default = "default_tsl2561_addr")]
        address: u8,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        gain: Gain,
        #[serde(default)]
        integration: Integration,
    },
    Ina226 {
        #[serde(default = "default_ina226_addr")]
        address: u8,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default = "default_shunt_ohms")]
        shunt_ohms: f64,
        #[serde(default = "default_current_lsb")]
        current_lsb: f64,
    },
}

fn default_sht3x_addr() -> u8 {
    sht3x::DEFAULT_ADDR
}

fn default_tsl2561_addr() -> u8 {
    tsl2561::DEFAULT_ADDR
}

fn default_ina226_addr() -> u8 {
    ina226::DEFAULT_ADDR
}

fn default_shunt_ohms() -> f64 {
    PowerCalibration::default().shunt_ohms
}

fn default_current_lsb() -> f64 {
    PowerCalibration::default().current_lsb
}

impl SensorConfig {
    pub fn model(&self) -> Model {
        match self {
            SensorConfig::Sht3x { .. } => Model::Sht3x,
            SensorConfig::Tsl2561 { .. } => Model::Tsl2561,
            SensorConfig::Ina226 { .. } => Model::Ina226,
        }
    }

    pub fn address(&self) -> u8 {
        match self {
            SensorConfig::Sht3x { address, .. }
            | SensorConfig::Tsl2561 { address, .. }
            | SensorConfig::Ina226 { address, .. } => *address,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        match self {
            SensorConfig::Sht3x { prefix, .. }
            | SensorConfig::Tsl2561 { prefix, .. }
            | SensorConfig::Ina226 { prefix, .. } => prefix.as_deref(),
        }
    }

    fn ina226(address: u8, prefix: &str) -> Self {
        SensorConfig::Ina226 {
            address,
            prefix: Some(prefix.to_string()),
            shunt_ohms: default_shunt_ohms(),
            current_lsb: default_current_lsb(),
        }
    }

    /// Construct the driver on `bus`.
    pub fn build<I2C: I2c + Clone + 'static>(&self, bus: &I2C) -> Box<dyn Sensor> {
        match self {
            SensorConfig::Sht3x { address, prefix } => {
                Box::new(Sht3x::new(bus.clone(), *address, prefix.clone()))
            }
            SensorConfig::Tsl2561 {
                address,
                prefix,
                gain,
                integration,
            } => Box::new(
                Tsl2561::new(bus.clone(), *address, prefix.clone())
                    .with_timing(*gain, *integration),
            ),
            SensorConfig::Ina226 {
                address,
                prefix,
                shunt_ohms,
                current_lsb,
            } => Box::new(Ina226::new(
                bus.clone(),
                *address,
                prefix.clone(),
                PowerCalibration {
                    shunt_ohms: *shunt_ohms,
                    current_lsb: *current_lsb,
                },
            )),
        }
    }

    fn validate(&self) -> Result<()> {
        let address = self.address();
        if !(0x08..=0x77).contains(&address) {
            return Err(Error::Config(format!(
                "{} address 0x{:02X} is outside the 7-bit device range",
                self.model(),
                address
            )));
        }
        if let SensorConfig::Ina226 {
            shunt_ohms,
            current_lsb,
            ..
        } = self
        {
            if !(*shunt_ohms > 0.0 && *current_lsb > 0.0) {
                return Err(Error::Config(format!(
                    "INA226 at 0x{:02X}: shunt_ohms and current_lsb must be positive",
                    address
                )));
            }
            let cal = PowerCalibration {
                shunt_ohms: *shunt_ohms,
                current_lsb: *current_lsb,
            };
            if cal.register() == 0 || 0.00512 / (current_lsb * shunt_ohms) > f64::from(0x7FFF) {
                return Err(Error::Config(format!(
                    "INA226 at 0x{:02X}: calibration out of range",
                    address
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: default_bus(),
            scan: ScanConfig::default(),
            sensors: vec![
                SensorConfig::Sht3x {
                    address: sht3x::DEFAULT_ADDR,
                    prefix: None,
                },
                SensorConfig::ina226(0x40, "panel_"),
                SensorConfig::ina226(0x41, "charge_"),
                SensorConfig::ina226(0x42, "battery_"),
            ],
            wifi: WifiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.attempts == 0 {
            return Err(Error::Config("scan.attempts must be at least 1".into()));
        }
        if self.wifi.enabled && self.wifi.command.is_empty() {
            return Err(Error::Config("wifi.command is empty".into()));
        }

        for (i, sensor) in self.sensors.iter().enumerate() {
            sensor.validate()?;
            let duplicate = self.sensors[..i]
                .iter()
                .any(|other| other.address() == sensor.address());
            if duplicate {
                return Err(Error::Config(format!(
                    "more than one sensor at address 0x{:02X}",
                    sensor.address()
                )));
            }
        }
        Ok(())
    }

    /// Construct all drivers, in polling order.
    pub fn build_sensors<I2C: I2c + Clone + 'static>(&self, bus: &I2C) -> Vec<Box<dyn Sensor>> {
        self.sensors.iter().map(|s| s.build(bus)).collect()
    }
}
