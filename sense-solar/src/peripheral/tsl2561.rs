//! TAOS/AMS TSL2561 ambient light sensor driver.
//!
//! Datasheet: <https://cdn-shop.adafruit.com/datasheets/TSL2561.pdf>
//!
//! Every register access is prefixed by a command byte: bit 7 (CMD) set, bit
//! 5 (WORD) for word/block protocol, low nibble is the register address.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time;

use crate::convert::{self, Gain, Integration};
use crate::hw_trait::I2c;
use crate::sensor::{DriverError, Measurement, Sensor};
use crate::tracing::prelude::*;

/// Default I2C address (ADDR SEL floating); 0x29 or 0x49 otherwise.
pub const DEFAULT_ADDR: u8 = 0x39;

/// Command bytes.
pub mod commands {
    /// CONTROL register, write access
    pub const CONTROL: u8 = 0xE0;
    /// CONTROL register readback used to check power state
    pub const CONTROL_READ: u8 = 0x90;
    /// TIMING register
    pub const TIMING: u8 = 0xA1;
    /// ID register
    pub const ID: u8 = 0xAA;
    /// DATA0LOW..DATA1HIGH, 4-byte block
    pub const DATA: u8 = 0xAC;
}

/// CONTROL register value for power on.
pub const POWER_ON: u8 = 0x03;

/// Part number nibble of the ID register.
const PART_NUMBER: u8 = 0x1;

/// Extra time after power-on before the first conversion is trusted.
const STARTUP_MARGIN: Duration = Duration::from_millis(200);

/// TSL2561 driver
pub struct Tsl2561<I2C> {
    i2c: I2C,
    addr: u8,
    prefix: Option<String>,
    gain: Gain,
    integration: Integration,
    initialized: bool,
}

impl<I2C: I2c> Tsl2561<I2C> {
    /// Create a new TSL2561 instance with 1x gain and 402 ms integration.
    pub fn new(i2c: I2C, addr: u8, prefix: Option<String>) -> Self {
        Self {
            i2c,
            addr,
            prefix,
            gain: Gain::default(),
            integration: Integration::default(),
            initialized: false,
        }
    }

    pub fn with_timing(mut self, gain: Gain, integration: Integration) -> Self {
        self.set_gain(gain);
        self.set_integration(integration);
        self
    }

    /// Takes effect at the next measurement.
    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
        self.initialized = false;
    }

    /// Takes effect at the next measurement.
    pub fn set_integration(&mut self, integration: Integration) {
        self.integration = integration;
        self.initialized = false;
    }

    /// Configure timing and power the device on, unless it already is.
    ///
    /// A device that is already powered keeps whatever timing it has.
    async fn init(&mut self) -> Result<(), DriverError> {
        let control = self.read_byte(commands::CONTROL_READ).await?;

        if control & 0x0F != POWER_ON {
            let timing = self.gain.bits() | self.integration.bits();
            debug!(
                "TSL2561 0x{:02X}: powering on, gain {}, integration {}",
                self.addr, self.gain, self.integration
            );
            self.i2c.write(self.addr, &[commands::TIMING, timing]).await?;
            self.i2c.write(self.addr, &[commands::CONTROL, POWER_ON]).await?;
            time::sleep(self.integration.duration() + STARTUP_MARGIN).await;
        } else {
            trace!("TSL2561 0x{:02X}: already powered (0x{:02X})", self.addr, control);
        }

        self.initialized = true;
        Ok(())
    }

    /// Read the broadband and infrared channel counts.
    pub async fn read_channels(&mut self) -> Result<(u16, u16), DriverError> {
        if !self.initialized {
            self.init().await?;
        }

        let mut data = [0u8; 4];
        self.i2c
            .write_read(self.addr, &[commands::DATA], &mut data)
            .await?;
        trace!("TSL2561 0x{:02X} sample: {:02X?}", self.addr, data);

        let ch0 = u16::from_le_bytes([data[0], data[1]]);
        let ch1 = u16::from_le_bytes([data[2], data[3]]);
        Ok((ch0, ch1))
    }

    async fn read_byte(&mut self, command: u8) -> Result<u8, DriverError> {
        let mut data = [0u8; 1];
        self.i2c.write_read(self.addr, &[command], &mut data).await?;
        Ok(data[0])
    }
}

#[async_trait]
impl<I2C: I2c> Sensor for Tsl2561<I2C> {
    fn name(&self) -> &str {
        "TSL2561"
    }

    fn address(&self) -> u8 {
        self.addr
    }

    async fn probe(&mut self) -> bool {
        match self.read_byte(commands::ID).await {
            Ok(id) => id >> 4 == PART_NUMBER,
            Err(e) => {
                debug!("TSL2561 probe at 0x{:02X} failed: {}", self.addr, e);
                false
            }
        }
    }

    async fn read_measurement(&mut self) -> Result<Measurement, DriverError> {
        let (ch0, ch1) = self.read_channels().await?;
        let lux = convert::lux(ch0, ch1, self.gain, self.integration);
        debug!("TSL2561 0x{:02X}: ch0={} ch1={} -> {:.1} lux", self.addr, ch0, ch1, lux);

        Ok(Measurement::new(self.prefix.as_deref()).with("lux", lux))
    }
}
