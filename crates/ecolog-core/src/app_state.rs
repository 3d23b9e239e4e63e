//! Startup sequence and run state for ecolog
//!
//! [`bring_up`] takes the node from power-on to a running
//! [`AcquisitionScheduler`]. The log medium, the sensors and the clock must
//! all answer before sampling starts; the modem is configured on a best-effort
//! basis because nothing it says is ever read back.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_io::ReadReady;
use embedded_io_async::{Read, Write};
use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::clock::{Clock, ElapsedMillis};
use crate::config::{ConfigError, NodeConfig};
use crate::radio::RadioSession;
use crate::scheduler::AcquisitionScheduler;
use crate::sensors::{AcquireError, ClimateReadings, LightReadings, Sensor, SensorHub};
use crate::storage::{LogWriter, RecordStore, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Starting,
    Running,
    /// Startup failed; the node logs the cause and does nothing else.
    Halted,
}

impl RunState {
    pub fn after_startup<T>(startup: &Result<T, InitError>) -> Self {
        match startup {
            Ok(_) => RunState::Running,
            Err(_) => RunState::Halted,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Log storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Sensor check failed: {0}")]
    Sensors(#[from] AcquireError),
}

pub type Node<C, L, K, S, M, P, D> =
    AcquisitionScheduler<SensorHub<C, L, K>, S, RadioSession<M, P, D>>;

/// Check every peripheral, configure the modem and build the scheduler.
///
/// `uptime` is read once, after the modem has been configured, to seed both
/// interval marks.
pub async fn bring_up<C, L, K, S, M, P, D>(
    config: &NodeConfig,
    mut hub: SensorHub<C, L, K>,
    store: S,
    mut radio: RadioSession<M, P, D>,
    uptime: impl FnOnce() -> ElapsedMillis,
) -> Result<Node<C, L, K, S, M, P, D>, InitError>
where
    C: Sensor<Readings = ClimateReadings>,
    L: Sensor<Readings = LightReadings>,
    K: Clock,
    S: RecordStore,
    M: Read + Write + ReadReady,
    P: OutputPin,
    D: DelayNs,
{
    info!("Run state: {:?}", RunState::Starting);
    config.validate()?;

    let mut log = LogWriter::new(store, config.storage.log_file.as_str());
    log.init().inspect_err(|e| {
        error!("SD card check failed: {}", e);
    })?;

    let clock_at_start = hub.probe().await?;

    if let Err(e) = radio.configure().await {
        warn!("Modem configuration incomplete: {}", e);
    }

    let scheduler = AcquisitionScheduler::new(
        hub,
        log,
        radio,
        config.schedule,
        uptime(),
        clock_at_start,
    );
    info!("Run state: {:?}", RunState::Running);
    Ok(scheduler)
}
