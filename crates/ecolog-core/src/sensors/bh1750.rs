use bh1750_embedded::{Address, Resolution, r#async::Bh1750Async};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{debug, error};

use super::{LightReadings, Sensor, SensorError};

pub struct BH1750Sensor<I, D> {
    sensor: Bh1750Async<I, D>,
}

impl<I: I2c, D: DelayNs> BH1750Sensor<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            sensor: Bh1750Async::<I, D>::new(i2c, delay, Address::Low),
        }
    }
}

impl<I: I2c, D: DelayNs> Sensor for BH1750Sensor<I, D> {
    type Readings = LightReadings;

    async fn read(&mut self) -> Result<LightReadings, SensorError> {
        self.sensor
            .one_time_measurement(Resolution::High)
            .await
            .map(|lux| {
                debug!("BH1750: measured {} lux", lux);
                LightReadings { lux }
            })
            .map_err(|e| {
                error!("BH1750 one_time_measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "BH1750",
                    operation: "one_time_measurement",
                    details: "Failed to read lux value during a single one-time measurement",
                }
            })
    }
}
