//! Conversion of raw register values into physical units.
//!
//! These are pure functions; the drivers in [`crate::peripheral`] decode
//! register bytes into integers and hand them here.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::Display;

const FULL_SCALE_16: f64 = 65535.0; // 2^16 - 1

/// Round to `places` decimals from the exact binary value, ties to even.
pub(crate) fn round_to(value: f64, places: usize) -> f64 {
    format!("{:.*}", places, value).parse().unwrap_or(value)
}

/// Sensirion temperature word to degrees Celsius, rounded to 4 places.
pub fn temperature_celsius(raw: u16) -> f64 {
    round_to(-45.0 + 175.0 * f64::from(raw) / FULL_SCALE_16, 4)
}

/// Sensirion humidity word to percent relative humidity, rounded to 1 place.
pub fn relative_humidity(raw: u16) -> f64 {
    round_to(100.0 * f64::from(raw) / FULL_SCALE_16, 1)
}

/// TSL2561 analog gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gain {
    /// 1x
    #[default]
    #[strum(to_string = "1x")]
    Low,
    /// 16x
    #[strum(to_string = "16x")]
    High,
}

impl Gain {
    /// Bits for the timing register.
    pub fn bits(self) -> u8 {
        match self {
            Gain::Low => 0x00,
            Gain::High => 0x10,
        }
    }

    // Counts are normalised to 16x gain.
    fn channel_scale(self) -> f64 {
        match self {
            Gain::Low => 16.0,
            Gain::High => 1.0,
        }
    }
}

/// TSL2561 integration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Deserialize, Serialize)]
pub enum Integration {
    #[serde(rename = "13ms")]
    #[strum(to_string = "13ms")]
    Ms13,
    #[serde(rename = "101ms")]
    #[strum(to_string = "101ms")]
    Ms101,
    #[default]
    #[serde(rename = "402ms")]
    #[strum(to_string = "402ms")]
    Ms402,
}

impl Integration {
    /// Bits for the timing register.
    pub fn bits(self) -> u8 {
        match self {
            Integration::Ms13 => 0x00,
            Integration::Ms101 => 0x01,
            Integration::Ms402 => 0x02,
        }
    }

    /// Nominal integration time.
    pub fn duration(self) -> Duration {
        match self {
            Integration::Ms13 => Duration::from_millis(13),
            Integration::Ms101 => Duration::from_millis(101),
            Integration::Ms402 => Duration::from_millis(402),
        }
    }

    // Counts are normalised to the 402 ms integration window.
    fn channel_scale(self) -> f64 {
        match self {
            Integration::Ms13 => 322.0 / 11.0,
            Integration::Ms101 => 322.0 / 81.0,
            Integration::Ms402 => 1.0,
        }
    }
}

/// Illuminance in lux from the broadband (`ch0`) and infrared (`ch1`) counts,
/// rounded to 1 place.
///
/// This is the TAOS empirical approximation of the photopic response for the
/// T/FN/CL package. Each ratio band includes its upper threshold.
pub fn lux(ch0: u16, ch1: u16, gain: Gain, integration: Integration) -> f64 {
    let scale = gain.channel_scale() * integration.channel_scale();
    let ch0 = f64::from(ch0) * scale;
    let ch1 = f64::from(ch1) * scale;

    if ch0 == 0.0 {
        return 0.0;
    }

    let ratio = ch1 / ch0;
    let lux = if ratio <= 0.52 {
        0.0304 * ch0 - 0.062 * ch0 * ratio.powf(1.4)
    } else if ratio <= 0.65 {
        0.0224 * ch0 - 0.031 * ch1
    } else if ratio <= 0.80 {
        0.0128 * ch0 - 0.0153 * ch1
    } else if ratio <= 1.30 {
        0.00146 * ch0 - 0.00112 * ch1
    } else {
        return 0.0;
    };

    round_to(lux, 1)
}

/// INA226 bus voltage LSB (V).
pub const BUS_VOLTAGE_LSB: f64 = 0.00125;

/// Scale factors of an INA226 current/power monitor.
///
/// The calibration register is derived from the shunt resistance and the
/// chosen current LSB; current and power readings are then plain multiples
/// of that LSB.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PowerCalibration {
    /// Shunt resistance (ohm)
    pub shunt_ohms: f64,
    /// Current register LSB (A)
    pub current_lsb: f64,
}

impl Default for PowerCalibration {
    fn default() -> Self {
        // R100 shunt on the common breakout boards, 0.1 mA resolution
        Self {
            shunt_ohms: 0.1,
            current_lsb: 0.0001,
        }
    }
}

impl PowerCalibration {
    /// Value for the calibration register, truncated like the datasheet says.
    pub fn register(&self) -> u16 {
        let cal = (0.00512 / (self.current_lsb * self.shunt_ohms)).trunc();
        cal.clamp(0.0, f64::from(u16::MAX)) as u16
    }

    /// Bus voltage register to volts.
    pub fn bus_volts(&self, raw: u16) -> f64 {
        f64::from(raw) * BUS_VOLTAGE_LSB
    }

    /// Current register (two's complement) to amperes.
    pub fn current_amps(&self, raw: i16) -> f64 {
        f64::from(raw) * self.current_lsb
    }

    /// Power register to watts; the power LSB is 25 times the current LSB.
    pub fn power_watts(&self, raw: u16) -> f64 {
        f64::from(raw) * 25.0 * self.current_lsb
    }
}
