//! Sensirion SHT3x (SHT-31, SHT-35) temperature and humidity sensor driver.
//!
//! Datasheet: <https://sensirion.com/media/documents/213E6A3B/63A5A569/Datasheet_SHT3x_DIS.pdf>

use async_trait::async_trait;
use std::time::Duration;
use tokio::time;

use crate::convert;
use crate::crc;
use crate::hw_trait::I2c;
use crate::sensor::{DriverError, Measurement, Sensor};
use crate::tracing::prelude::*;

/// Default I2C address (ADDR pin low); 0x45 with ADDR high.
pub const DEFAULT_ADDR: u8 = 0x44;

/// Two-byte commands, MSB first.
pub mod commands {
    /// Single shot, high repeatability, no clock stretching
    pub const MEASURE: [u8; 2] = [0x24, 0x00];
    /// Read status register
    pub const STATUS: [u8; 2] = [0xF3, 0x2D];
    /// Soft reset
    pub const SOFT_RESET: [u8; 2] = [0x30, 0xA2];
}

const RESET_DELAY: Duration = Duration::from_millis(10);
const MEASURE_DELAY: Duration = Duration::from_millis(50);

/// SHT3x driver
pub struct Sht3x<I2C> {
    i2c: I2C,
    addr: u8,
    prefix: Option<String>,
}

impl<I2C: I2c> Sht3x<I2C> {
    /// Create a new SHT3x instance
    pub fn new(i2c: I2C, addr: u8, prefix: Option<String>) -> Self {
        Self { i2c, addr, prefix }
    }

    /// Read temperature (°C) and relative humidity (%).
    pub async fn read_raw(&mut self) -> Result<(f64, f64), DriverError> {
        self.i2c.write(self.addr, &commands::SOFT_RESET).await?;
        time::sleep(RESET_DELAY).await;

        self.i2c.write(self.addr, &commands::MEASURE).await?;
        time::sleep(MEASURE_DELAY).await;

        let mut data = [0u8; 6];
        self.i2c.read(self.addr, &mut data).await?;
        trace!("SHT3x 0x{:02X} sample: {:02X?}", self.addr, data);

        let temp = verified_word("temperature", [data[0], data[1]], data[2])?;
        let humi = verified_word("humidity", [data[3], data[4]], data[5])?;

        Ok((
            convert::temperature_celsius(temp),
            convert::relative_humidity(humi),
        ))
    }

    async fn read_status(&mut self) -> Result<[u8; 3], DriverError> {
        let mut data = [0u8; 3];
        self.i2c.write(self.addr, &commands::STATUS).await?;
        self.i2c.read(self.addr, &mut data).await?;
        Ok(data)
    }
}

fn verified_word(what: &'static str, word: [u8; 2], crc: u8) -> Result<u16, DriverError> {
    let expected = crc::crc8(&word);
    if expected != crc {
        return Err(DriverError::Integrity {
            what,
            expected,
            actual: crc,
        });
    }
    Ok(u16::from_be_bytes(word))
}

#[async_trait]
impl<I2C: I2c> Sensor for Sht3x<I2C> {
    fn name(&self) -> &str {
        "SHT3x"
    }

    fn address(&self) -> u8 {
        self.addr
    }

    async fn probe(&mut self) -> bool {
        match self.read_status().await {
            Ok(status) => crc::check_word([status[0], status[1]], status[2]),
            Err(e) => {
                debug!("SHT3x probe at 0x{:02X} failed: {}", self.addr, e);
                false
            }
        }
    }

    async fn read_measurement(&mut self) -> Result<Measurement, DriverError> {
        let (temp, humi) = self.read_raw().await?;
        debug!("SHT3x 0x{:02X}: {:.2}°C {:.1}%RH", self.addr, temp, humi);

        Ok(Measurement::new(self.prefix.as_deref())
            .with("temp", temp)
            .with("humi", humi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_trait::mock::MockI2c;

    fn bus() -> MockI2c {
        let bus = MockI2c::new();
        bus.attach(DEFAULT_ADDR);
        bus
    }

    #[tokio::test(start_paused = true)]
    async fn measurement_sequence_and_conversion() {
        let bus = bus();
        // 0x6666 -> 25.0 °C, 0x8000 -> 50.0 %RH
        bus.queue_read(DEFAULT_ADDR, &[0x66, 0x66, 0x93, 0x80, 0x00, 0xA2]);
        let mut sht = Sht3x::new(bus.clone(), DEFAULT_ADDR, None);

        let m = sht.read_measurement().await.unwrap();

        assert_eq!(m.get("temp"), Some(25.0));
        assert_eq!(m.get("humi"), Some(50.0));
        assert_eq!(
            bus.writes_to(DEFAULT_ADDR),
            vec![commands::SOFT_RESET.to_vec(), commands::MEASURE.to_vec()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_reset_and_conversion() {
        let bus = bus();
        bus.queue_read(DEFAULT_ADDR, &[0x66, 0x66, 0x93, 0x80, 0x00, 0xA2]);
        let mut sht = Sht3x::new(bus, DEFAULT_ADDR, None);

        let start = time::Instant::now();
        sht.read_measurement().await.unwrap();
        assert!(start.elapsed() >= RESET_DELAY + MEASURE_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn prefix_is_applied() {
        let bus = bus();
        bus.queue_read(DEFAULT_ADDR, &[0x66, 0x66, 0x93, 0x80, 0x00, 0xA2]);
        let mut sht = Sht3x::new(bus, DEFAULT_ADDR, Some("outdoor_".into()));

        let m = sht.read_measurement().await.unwrap();
        assert_eq!(m.get("outdoor_temp"), Some(25.0));
        assert_eq!(m.get("outdoor_humi"), Some(50.0));
    }

    #[tokio::test(start_paused = true)]
    async fn temperature_crc_mismatch_is_integrity_error() {
        let bus = bus();
        bus.queue_read(DEFAULT_ADDR, &[0x66, 0x66, 0x00, 0x80, 0x00, 0xA2]);
        let mut sht = Sht3x::new(bus, DEFAULT_ADDR, None);

        match sht.read_measurement().await {
            Err(DriverError::Integrity { what, expected, actual }) => {
                assert_eq!(what, "temperature");
                assert_eq!(expected, 0x93);
                assert_eq!(actual, 0x00);
            }
            other => panic!("expected integrity error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn humidity_crc_mismatch_is_integrity_error() {
        let bus = bus();
        bus.queue_read(DEFAULT_ADDR, &[0x66, 0x66, 0x93, 0x80, 0x01, 0xA2]);
        let mut sht = Sht3x::new(bus, DEFAULT_ADDR, None);

        assert!(matches!(
            sht.read_measurement().await,
            Err(DriverError::Integrity { what: "humidity", .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn absent_device_is_transport_error() {
        let bus = MockI2c::new();
        let mut sht = Sht3x::new(bus, DEFAULT_ADDR, None);

        assert!(matches!(
            sht.read_measurement().await,
            Err(DriverError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn probe_checks_status_crc() {
        let bus = bus();
        bus.queue_read(DEFAULT_ADDR, &[0xBE, 0xEF, 0x92]);
        bus.queue_read(DEFAULT_ADDR, &[0xBE, 0xEF, 0x92]);
        bus.queue_read(DEFAULT_ADDR, &[0xBE, 0xEF, 0x00]);
        let mut sht = Sht3x::new(bus.clone(), DEFAULT_ADDR, None);

        assert!(sht.probe().await);
        assert!(sht.probe().await);
        assert!(!sht.probe().await);
        assert_eq!(bus.writes_to(DEFAULT_ADDR)[0], commands::STATUS.to_vec());
    }

    #[tokio::test]
    async fn probe_swallows_bus_errors() {
        let mut sht = Sht3x::new(MockI2c::new(), DEFAULT_ADDR, None);

        assert!(!sht.probe().await);
        assert!(!sht.probe().await);
    }
}
