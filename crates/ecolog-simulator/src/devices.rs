//! Host stand-ins for the node's peripherals.
//!
//! Everything here runs on one virtual millisecond clock. Delays advance it
//! instead of sleeping, so a day of node time takes well under a second.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::f32::consts::TAU;
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ecolog_core::clock::{Clock, ClockError, ElapsedMillis, Timestamp};
use ecolog_core::sensors::{ClimateReadings, LightReadings, Sensor, SensorError};
use ecolog_core::storage::{RecordStore, StorageError};
use log::{debug, error, info};

const MS_PER_DAY: f32 = 86_400_000.0;

// ---------------------------------------------------------------------------
// Virtual time
// ---------------------------------------------------------------------------

/// Shared virtual time in milliseconds since the simulator started.
#[derive(Debug, Clone, Default)]
pub struct VirtualTime(Rc<Cell<u64>>);

impl VirtualTime {
    pub fn now_ms(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }

    /// The node's wrapping uptime counter, offset by `start_ms`.
    pub fn uptime(&self, start_ms: u32) -> ElapsedMillis {
        ElapsedMillis::from_millis(start_ms).wrapping_add(self.now_ms() as u32)
    }
}

/// Delay that moves virtual time forward.
#[derive(Debug, Clone)]
pub struct VirtualDelay(pub VirtualTime);

impl embedded_hal_async::delay::DelayNs for VirtualDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.advance(u64::from(ns).div_ceil(1_000_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.advance(u64::from(ms));
    }
}

/// Wall clock anchored at `start_unix` seconds.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    time: VirtualTime,
    start_unix: u64,
}

impl VirtualClock {
    pub fn new(time: VirtualTime, start_unix: u64) -> Self {
        Self { time, start_unix }
    }
}

impl Clock for VirtualClock {
    async fn now(&mut self) -> Result<Timestamp, ClockError> {
        Timestamp::from_unix_secs(self.start_unix + self.time.now_ms() / 1_000)
    }
}

// ---------------------------------------------------------------------------
// Synthetic sensors
// ---------------------------------------------------------------------------

/// Fraction of the day elapsed, 0.0..1.0, with 0.0 at 06:00.
fn day_phase(time: &VirtualTime, start_unix: u64) -> f32 {
    let ms_of_day = (start_unix * 1_000 + time.now_ms()) % 86_400_000;
    ms_of_day as f32 / MS_PER_DAY - 0.25
}

/// Diurnal temperature/humidity cycle with a slow pressure swell.
pub struct SyntheticClimate {
    time: VirtualTime,
    start_unix: u64,
    reads: u32,
    /// Fail every n-th read, if set.
    fail_every: Option<u32>,
}

impl SyntheticClimate {
    pub fn new(time: VirtualTime, start_unix: u64, fail_every: Option<u32>) -> Self {
        Self {
            time,
            start_unix,
            reads: 0,
            fail_every,
        }
    }
}

impl Sensor for SyntheticClimate {
    type Readings = ClimateReadings;

    async fn read(&mut self) -> Result<ClimateReadings, SensorError> {
        self.reads += 1;
        if self.fail_every.is_some_and(|n| n > 0 && self.reads % n == 0) {
            return Err(SensorError::Timeout {
                sensor: "synthetic climate",
                operation: "read measurement",
            });
        }

        let phase = day_phase(&self.time, self.start_unix);
        let hours = self.time.now_ms() as f32 / 3_600_000.0;
        Ok(ClimateReadings {
            temperature_celsius: 14.0 + 6.0 * (TAU * phase).sin(),
            humidity_percent: 65.0 - 15.0 * (TAU * phase).sin(),
            pressure_hpa: 1013.0 + 4.0 * (TAU * hours / 30.0).sin(),
        })
    }
}

/// Daylight curve, dark between 18:00 and 06:00.
pub struct SyntheticLight {
    time: VirtualTime,
    start_unix: u64,
}

impl SyntheticLight {
    pub fn new(time: VirtualTime, start_unix: u64) -> Self {
        Self { time, start_unix }
    }
}

impl Sensor for SyntheticLight {
    type Readings = LightReadings;

    async fn read(&mut self) -> Result<LightReadings, SensorError> {
        let phase = day_phase(&self.time, self.start_unix);
        let lux = (TAU * phase).sin().max(0.0) * 25_000.0;
        Ok(LightReadings { lux })
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Record store backed by a host directory.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RecordStore for DirectoryStore {
    fn verify(&mut self) -> Result<(), StorageError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            error!("Output directory {} is missing", self.root.display());
            Err(StorageError::Unavailable)
        }
    }

    fn exists(&mut self, name: &str) -> Result<bool, StorageError> {
        self.verify()?;
        Ok(self.root.join(name).is_file())
    }

    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.root.join(name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                error!("Failed to open {}: {}", path.display(), e);
                StorageError::OpenFailed { operation: "log file" }
            })?;
        file.write_all(bytes).map_err(|e| {
            error!("Failed to append to {}: {}", path.display(), e);
            StorageError::WriteRejected
        })
    }
}

/// Create the output directory if needed.
pub fn prepare_output_dir(root: &Path) -> std::io::Result<()> {
    fs::create_dir_all(root)
}

// ---------------------------------------------------------------------------
// Modem
// ---------------------------------------------------------------------------

/// Modem that acknowledges every line with `+OK`.
#[derive(Debug, Default)]
pub struct EchoModem {
    line: Vec<u8>,
    pending: VecDeque<u8>,
    transmissions: Rc<RefCell<Vec<String>>>,
}

impl EchoModem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto every `AT+TX` line the modem has received.
    pub fn transmissions(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.transmissions)
    }

    fn complete_line(&mut self) {
        let line = String::from_utf8_lossy(&self.line).trim_end().to_string();
        self.line.clear();
        if line.is_empty() {
            return;
        }

        debug!("modem received {}", line);
        if line.starts_with("AT+TX=") {
            self.transmissions.borrow_mut().push(line);
        }
        self.pending.extend(b"+OK\r\n");
    }
}

impl embedded_io::ErrorType for EchoModem {
    type Error = Infallible;
}

impl embedded_io::ReadReady for EchoModem {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.pending.is_empty())
    }
}

impl embedded_io_async::Read for EchoModem {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl embedded_io_async::Write for EchoModem {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            if byte == b'\n' {
                self.complete_line();
            } else {
                self.line.push(byte);
            }
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Modem power switch.
#[derive(Debug, Default)]
pub struct PowerSwitch;

impl embedded_hal::digital::ErrorType for PowerSwitch {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for PowerSwitch {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        info!("modem power off");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        info!("modem power on");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal_async::delay::DelayNs;
    use ecolog_core::config::RadioConfig;
    use ecolog_core::radio::{RadioSession, Uplink};
    use ecolog_core::storage::AveragedSample;
    use ecolog_core::telemetry::encode;
    use embedded_io_async::{Read, Write};

    #[test]
    fn delays_advance_the_shared_clock() {
        let time = VirtualTime::default();
        let mut delay = VirtualDelay(time.clone());
        let mut clock = VirtualClock::new(time.clone(), 1_735_689_600);

        block_on(delay.delay_ms(8_000));
        block_on(delay.delay_ms(1_200));
        assert_eq!(time.now_ms(), 9_200);
        assert_eq!(block_on(clock.now()).unwrap().second(), 9);
    }

    #[test]
    fn uptime_wraps_like_the_hardware_counter() {
        let time = VirtualTime::default();
        time.advance(20_000);
        assert_eq!(time.uptime(u32::MAX - 9_999), ElapsedMillis::from_millis(10_000));
    }

    #[test]
    fn synthetic_readings_stay_plausible() {
        let time = VirtualTime::default();
        let mut climate = SyntheticClimate::new(time.clone(), 1_735_689_600, None);
        let mut light = SyntheticLight::new(time.clone(), 1_735_689_600);

        for _ in 0..48 {
            let c = block_on(climate.read()).unwrap();
            let l = block_on(light.read()).unwrap();
            assert!((8.0..=20.0).contains(&c.temperature_celsius));
            assert!((50.0..=80.0).contains(&c.humidity_percent));
            assert!((1009.0..=1017.0).contains(&c.pressure_hpa));
            assert!((0.0..=25_000.0).contains(&l.lux));
            time.advance(1_800_000);
        }
    }

    #[test]
    fn climate_fault_injection_fails_every_nth_read() {
        let mut climate = SyntheticClimate::new(VirtualTime::default(), 0, Some(3));
        let results: Vec<bool> = (0..6).map(|_| block_on(climate.read()).is_ok()).collect();
        assert_eq!(results, [true, true, false, true, true, false]);
    }

    #[test]
    fn directory_store_appends_to_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());

        store.verify().unwrap();
        assert!(!store.exists("data.csv").unwrap());
        store.append("data.csv", b"a\r\n").unwrap();
        store.append("data.csv", b"b\r\n").unwrap();
        assert!(store.exists("data.csv").unwrap());
        assert_eq!(
            fs::read_to_string(dir.path().join("data.csv")).unwrap(),
            "a\r\nb\r\n"
        );
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path().join("absent"));
        assert_eq!(store.verify(), Err(StorageError::Unavailable));
    }

    #[test]
    fn echo_modem_acknowledges_lines_and_records_transmissions() {
        let mut modem = EchoModem::new();
        let sent = modem.transmissions();

        block_on(modem.write_all(b"AT+PING=?\r\n")).unwrap();
        block_on(modem.write_all(b"AT+TX=0000,00\r\n")).unwrap();

        let mut buf = [0u8; 32];
        let n = block_on(modem.read(&mut buf)).unwrap();
        assert_eq!(&buf[..n], b"+OK\r\n+OK\r\n");
        assert_eq!(*sent.borrow(), ["AT+TX=0000,00"]);
    }

    #[test]
    fn radio_session_runs_over_the_echo_modem() {
        let time = VirtualTime::default();
        let modem = EchoModem::new();
        let sent = modem.transmissions();
        let mut radio = RadioSession::new(
            modem,
            PowerSwitch,
            VirtualDelay(time.clone()),
            RadioConfig::default(),
        );

        assert_eq!(block_on(radio.configure()), Ok(4));
        assert_eq!(time.now_ms(), 8_000 + 4 * 1_200);

        let payload = encode(&AveragedSample {
            timestamp: Timestamp::from_unix_secs(1_735_689_600).unwrap(),
            temperature: 21.34,
            humidity: 55.6,
            pressure: 1013.2,
            illuminance: 450.0,
            sample_count: 20,
        });
        block_on(radio.transmit(&payload)).unwrap();

        assert_eq!(*sent.borrow(), ["AT+TX=085615B82794000001C2000000000000,00"]);
        assert_eq!(block_on(radio.drain_responses()), 5 * "+OK\r\n".len());
    }
}
