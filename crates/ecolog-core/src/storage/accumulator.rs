use super::{AveragedSample, Sample};
use crate::clock::Timestamp;

/// Running per-channel sums over the samples taken since the last send.
///
/// The accumulator never stores samples, only four sums and a count, so its
/// footprint is constant no matter how long a send is deferred.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleAccumulator {
    sum_temperature: f32,
    sum_humidity: f32,
    sum_pressure: f32,
    sum_illuminance: f32,
    count: u32,
}

impl SampleAccumulator {
    pub const fn new() -> Self {
        Self {
            sum_temperature: 0.0,
            sum_humidity: 0.0,
            sum_pressure: 0.0,
            sum_illuminance: 0.0,
            count: 0,
        }
    }

    /// Add a sample to the running sums.
    pub fn fold(&mut self, sample: &Sample) {
        self.sum_temperature += sample.temperature;
        self.sum_humidity += sample.humidity;
        self.sum_pressure += sample.pressure;
        self.sum_illuminance += sample.illuminance;
        self.count += 1;
    }

    /// Mean of every channel, or `None` when nothing was folded.
    pub fn average(&self, timestamp: Timestamp) -> Option<AveragedSample> {
        if self.count == 0 {
            return None;
        }

        let n = self.count as f32;
        Some(AveragedSample {
            timestamp,
            temperature: self.sum_temperature / n,
            humidity: self.sum_humidity / n,
            pressure: self.sum_pressure / n,
            illuminance: self.sum_illuminance / n,
            sample_count: self.count,
        })
    }

    pub fn reset_to_zero(&mut self) {
        *self = Self::new();
    }

    pub const fn len(&self) -> u32 {
        self.count
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}
