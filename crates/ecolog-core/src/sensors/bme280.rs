use bme280::i2c::AsyncBME280;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info};

use super::{ClimateReadings, Sensor, SensorError};

const PASCALS_PER_HECTOPASCAL: f32 = 100.0;

/// BME280 on its secondary address (0x77, SDO pulled high).
pub struct BME280Sensor<I, D> {
    sensor: AsyncBME280<I>,
    delay: D,
    initialized: bool,
}

impl<I: I2c, D: DelayNs> BME280Sensor<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            sensor: AsyncBME280::new_secondary(i2c),
            delay,
            initialized: false,
        }
    }

    /// Load the calibration coefficients and configure oversampling.
    /// Runs once, on the first read.
    async fn initialize(&mut self) -> Result<(), SensorError> {
        self.sensor.init(&mut self.delay).await.map_err(|e| {
            error!("BME280 init failed: {:?}", e);
            SensorError::InitializationFailed {
                sensor: "BME280",
                details: "Chip ID mismatch or calibration read failed",
            }
        })?;

        info!("BME280: calibration loaded");
        self.initialized = true;
        Ok(())
    }
}

impl<I: I2c, D: DelayNs> Sensor for BME280Sensor<I, D> {
    type Readings = ClimateReadings;

    async fn read(&mut self) -> Result<ClimateReadings, SensorError> {
        if !self.initialized {
            self.initialize().await?;
        }

        let measurement = self.sensor.measure(&mut self.delay).await.map_err(|e| {
            error!("BME280 measurement failed: {:?}", e);
            SensorError::ReadFailed {
                sensor: "BME280",
                operation: "measure temperature/humidity/pressure",
                details: "I2C communication error or sensor not responding",
            }
        })?;

        Ok(ClimateReadings {
            temperature_celsius: measurement.temperature,
            humidity_percent: measurement.humidity,
            pressure_hpa: measurement.pressure / PASCALS_PER_HECTOPASCAL,
        })
    }
}
