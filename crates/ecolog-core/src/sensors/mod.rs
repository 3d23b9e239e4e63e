//! Sensor capabilities and driver adapters
//!
//! The node reads two physical sensors every sampling tick: a climate sensor
//! (temperature, humidity, pressure) and a light sensor (illuminance). Each
//! driver is wrapped so it produces typed readings in the units the log and the
//! payload encoder expect, and [`SensorHub`] bundles them with the clock.

#[cfg(feature = "sensor-bh1750")]
mod bh1750;
#[cfg(feature = "sensor-bme280")]
mod bme280;
mod hub;

#[cfg(feature = "sensor-bh1750")]
pub use bh1750::BH1750Sensor;
#[cfg(feature = "sensor-bme280")]
pub use bme280::BME280Sensor;
pub use hub::*;

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: failed to {operation} ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: initialization failed ({details})")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: timed out while trying to {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// Trait for sensors that produce typed readings.
pub trait Sensor {
    /// The type of readings this sensor produces.
    type Readings;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Readings, SensorError>>;
}

/// Readings from the combined temperature/humidity/pressure sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReadings {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub pressure_hpa: f32,
}

/// Readings from the ambient light sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightReadings {
    pub lux: f32,
}
