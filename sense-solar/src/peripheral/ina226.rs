//! Texas Instruments INA226 current and power monitor driver.
//!
//! Datasheet: <https://www.ti.com/lit/ds/symlink/ina226.pdf>
//!
//! All registers are 16 bits wide and transferred MSB first.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time;

use crate::convert::PowerCalibration;
use crate::hw_trait::I2c;
use crate::sensor::{DriverError, Measurement, Sensor};
use crate::tracing::prelude::*;

/// Default I2C address (A0 and A1 tied to GND).
pub const DEFAULT_ADDR: u8 = 0x40;

/// Register pointers
pub mod registers {
    pub const CONFIGURATION: u8 = 0x00;
    pub const BUS_VOLTAGE: u8 = 0x02;
    pub const POWER: u8 = 0x03;
    pub const CURRENT: u8 = 0x04;
    pub const CALIBRATION: u8 = 0x05;
    pub const MANUFACTURER_ID: u8 = 0xFE;
}

/// "TI" in ASCII
pub const MANUFACTURER_ID: u16 = 0x5449;

/// 16-sample average, 1.1 ms bus and shunt conversion, continuous shunt and bus.
pub const CONFIGURATION: u16 = 0x4527;

/// One averaged conversion (16 x 2 x 1.1 ms) plus slack.
const CONVERSION_DELAY: Duration = Duration::from_millis(40);

/// INA226 driver
pub struct Ina226<I2C> {
    i2c: I2C,
    addr: u8,
    prefix: Option<String>,
    calibration: PowerCalibration,
    initialized: bool,
}

impl<I2C: I2c> Ina226<I2C> {
    /// Create a new INA226 instance
    pub fn new(
        i2c: I2C,
        addr: u8,
        prefix: Option<String>,
        calibration: PowerCalibration,
    ) -> Self {
        Self {
            i2c,
            addr,
            prefix,
            calibration,
            initialized: false,
        }
    }

    async fn init(&mut self) -> Result<(), DriverError> {
        let id = self.read_word(registers::MANUFACTURER_ID).await?;
        if id != MANUFACTURER_ID {
            return Err(DriverError::Unsupported(format!(
                "manufacturer ID 0x{:04X} at 0x{:02X}",
                id, self.addr
            )));
        }

        let cal = self.calibration.register();
        debug!(
            "INA226 0x{:02X}: config 0x{:04X}, calibration {} ({} ohm, {} A/LSB)",
            self.addr, CONFIGURATION, cal, self.calibration.shunt_ohms, self.calibration.current_lsb
        );
        self.write_word(registers::CONFIGURATION, CONFIGURATION).await?;
        self.write_word(registers::CALIBRATION, cal).await?;
        time::sleep(CONVERSION_DELAY).await;

        self.initialized = true;
        Ok(())
    }

    /// Read bus voltage (V), current (A) and power (W).
    pub async fn read_raw(&mut self) -> Result<(f64, f64, f64), DriverError> {
        if !self.initialized {
            self.init().await?;
        }

        let bus = self.read_word(registers::BUS_VOLTAGE).await?;
        let current = self.read_word(registers::CURRENT).await?;
        let power = self.read_word(registers::POWER).await?;
        trace!(
            "INA226 0x{:02X} raw: bus 0x{:04X} current 0x{:04X} power 0x{:04X}",
            self.addr, bus, current, power
        );

        Ok((
            self.calibration.bus_volts(bus),
            self.calibration.current_amps(current as i16),
            self.calibration.power_watts(power),
        ))
    }

    // Helper methods for I2C operations

    async fn read_word(&mut self, register: u8) -> Result<u16, DriverError> {
        let mut data = [0u8; 2];
        self.i2c
            .write_read(self.addr, &[register], &mut data)
            .await?;
        Ok(u16::from_be_bytes(data))
    }

    async fn write_word(&mut self, register: u8, data: u16) -> Result<(), DriverError> {
        let bytes = data.to_be_bytes();
        self.i2c
            .write(self.addr, &[register, bytes[0], bytes[1]])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<I2C: I2c> Sensor for Ina226<I2C> {
    fn name(&self) -> &str {
        "INA226"
    }

    fn address(&self) -> u8 {
        self.addr
    }

    async fn probe(&mut self) -> bool {
        match self.read_word(registers::MANUFACTURER_ID).await {
            Ok(id) => id == MANUFACTURER_ID,
            Err(e) => {
                debug!("INA226 probe at 0x{:02X} failed: {}", self.addr, e);
                false
            }
        }
    }

    async fn read_measurement(&mut self) -> Result<Measurement, DriverError> {
        let (voltage, current, power) = self.read_raw().await?;
        debug!(
            "INA226 0x{:02X}: {:.3}V {:.4}A {:.3}W",
            self.addr, voltage, current, power
        );

        Ok(Measurement::new(self.prefix.as_deref())
            .with("voltage", voltage)
            .with("current", current)
            .with("power", power))
    }
}
