use log::{error, info};
use thiserror_no_std::Error;

use super::{ClimateReadings, LightReadings, Sensor, SensorError};
use crate::clock::{Clock, ClockError, Timestamp};
use crate::storage::Sample;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),
}

/// Produces timestamped samples for the scheduler.
pub trait SampleSource {
    /// Read the clock and every sensor once.
    fn acquire(&mut self) -> impl Future<Output = Result<Sample, AcquireError>>;

    /// Read only the clock.
    fn now(&mut self) -> impl Future<Output = Result<Timestamp, ClockError>>;
}

/// The node's climate sensor, light sensor and real-time clock.
pub struct SensorHub<C, L, K> {
    climate: C,
    light: L,
    clock: K,
}

impl<C, L, K> SensorHub<C, L, K>
where
    C: Sensor<Readings = ClimateReadings>,
    L: Sensor<Readings = LightReadings>,
    K: Clock,
{
    pub fn new(climate: C, light: L, clock: K) -> Self {
        Self {
            climate,
            light,
            clock,
        }
    }

    /// Read every device once to prove it answers. Used at startup, where
    /// any failure is fatal. Returns the clock reading.
    pub async fn probe(&mut self) -> Result<Timestamp, AcquireError> {
        let now = self.clock.now().await.inspect_err(|e| {
            error!("RTC probe failed: {}", e);
        })?;
        self.climate.read().await.inspect_err(|e| {
            error!("Climate sensor probe failed: {}", e);
        })?;
        self.light.read().await.inspect_err(|e| {
            error!("Light sensor probe failed: {}", e);
        })?;

        info!("Sensors OK, clock reads {}", now);
        Ok(now)
    }

    pub fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }
}

impl<C, L, K> SampleSource for SensorHub<C, L, K>
where
    C: Sensor<Readings = ClimateReadings>,
    L: Sensor<Readings = LightReadings>,
    K: Clock,
{
    async fn acquire(&mut self) -> Result<Sample, AcquireError> {
        let timestamp = self.clock.now().await?;
        let climate = self.climate.read().await?;
        let light = self.light.read().await?;

        Ok(Sample {
            timestamp,
            temperature: climate.temperature_celsius,
            humidity: climate.humidity_percent,
            pressure: climate.pressure_hpa,
            illuminance: light.lux,
        })
    }

    async fn now(&mut self) -> Result<Timestamp, ClockError> {
        self.clock.now().await
    }
}
