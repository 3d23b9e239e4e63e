//! Acquisition scheduler
//!
//! Drives the two cadences of the node from a single free-running millisecond
//! counter. Every call to [`AcquisitionScheduler::run_pass`] checks the
//! sampling interval first, then the send interval, then drains whatever the
//! modem sent back. Nothing in a pass blocks on the other cadence, and no
//! failure after startup stops the loop.

use log::{info, warn};

use crate::clock::{ElapsedMillis, Timestamp};
use crate::config::ScheduleConfig;
use crate::radio::Uplink;
use crate::sensors::SampleSource;
use crate::storage::{LogWriter, RecordStore, SampleAccumulator};
use crate::telemetry::{TelemetryPayload, encode};

/// What a single pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// A sample was taken and folded.
    pub sampled: bool,
    /// The payload handed to the uplink, if a send window closed.
    pub sent: Option<TelemetryPayload>,
    /// Modem bytes drained at the end of the pass.
    pub response_bytes: usize,
}

pub struct AcquisitionScheduler<H, S, U> {
    source: H,
    log: LogWriter<S>,
    uplink: U,
    accumulator: SampleAccumulator,
    schedule: ScheduleConfig,
    last_sample: ElapsedMillis,
    last_send: ElapsedMillis,
    /// Most recent clock reading, used to stamp an average when the clock
    /// fails at send time.
    last_timestamp: Timestamp,
}

impl<H, S, U> AcquisitionScheduler<H, S, U>
where
    H: SampleSource,
    S: RecordStore,
    U: Uplink,
{
    /// Both interval marks start at `started`.
    pub fn new(
        source: H,
        log: LogWriter<S>,
        uplink: U,
        schedule: ScheduleConfig,
        started: ElapsedMillis,
        clock_at_start: Timestamp,
    ) -> Self {
        Self {
            source,
            log,
            uplink,
            accumulator: SampleAccumulator::new(),
            schedule,
            last_sample: started,
            last_send: started,
            last_timestamp: clock_at_start,
        }
    }

    pub async fn run_pass(&mut self, now: ElapsedMillis) -> PassOutcome {
        let mut outcome = PassOutcome::default();

        if now.has_elapsed(self.last_sample, self.schedule.sample_period_ms) {
            self.last_sample = now;
            outcome.sampled = self.sample().await;
        }

        // An empty window leaves the mark alone, so the send fires on the
        // first pass after a sample lands.
        if now.has_elapsed(self.last_send, self.schedule.send_period_ms)
            && !self.accumulator.is_empty()
        {
            self.last_send = now;
            outcome.sent = self.send().await;
        }

        outcome.response_bytes = self.uplink.drain_responses().await;
        outcome
    }

    async fn sample(&mut self) -> bool {
        let sample = match self.source.acquire().await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Sampling tick dropped: {}", e);
                return false;
            }
        };

        info!(
            "Sample at {}: {:.2} C, {:.2} %, {:.2} hPa, {:.2} lx",
            sample.timestamp,
            sample.temperature,
            sample.humidity,
            sample.pressure,
            sample.illuminance
        );
        self.last_timestamp = sample.timestamp;
        self.accumulator.fold(&sample);
        if let Err(e) = self.log.append_raw(&sample) {
            warn!("RAW record lost: {}", e);
        }
        true
    }

    async fn send(&mut self) -> Option<TelemetryPayload> {
        let timestamp = match self.source.now().await {
            Ok(now) => {
                self.last_timestamp = now;
                now
            }
            Err(e) => {
                warn!("Clock read failed at send, stamping with {}: {}", self.last_timestamp, e);
                self.last_timestamp
            }
        };

        let avg = self.accumulator.average(timestamp)?;
        info!(
            "Average of {} samples: {:.2} C, {:.2} %, {:.2} hPa, {:.2} lx",
            avg.sample_count, avg.temperature, avg.humidity, avg.pressure, avg.illuminance
        );

        if let Err(e) = self.log.append_average(&avg) {
            warn!("AVG record lost: {}", e);
        }

        let payload = encode(&avg);
        info!("Payload {}", payload);
        if let Err(e) = self.uplink.transmit(&payload).await {
            warn!("Transmission failed: {}", e);
        }

        self.accumulator.reset_to_zero();
        Some(payload)
    }

    pub fn accumulator(&self) -> &SampleAccumulator {
        &self.accumulator
    }

    pub fn last_sample_mark(&self) -> ElapsedMillis {
        self.last_sample
    }

    pub fn last_send_mark(&self) -> ElapsedMillis {
        self.last_send
    }

    pub fn log_writer(&self) -> &LogWriter<S> {
        &self.log
    }

    pub fn uplink(&self) -> &U {
        &self.uplink
    }

    pub fn source_mut(&mut self) -> &mut H {
        &mut self.source
    }
}
