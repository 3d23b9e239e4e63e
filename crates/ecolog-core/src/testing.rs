//! Test doubles for the node's capabilities.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::convert::Infallible;

use crate::clock::{Clock, ClockError, Timestamp};
use crate::sensors::{ClimateReadings, LightReadings, Sensor, SensorError};
use crate::storage::{AveragedSample, RecordStore, StorageError};

pub fn climate(t: f32, h: f32, p: f32) -> ClimateReadings {
    ClimateReadings {
        temperature_celsius: t,
        humidity_percent: h,
        pressure_hpa: p,
    }
}

pub fn light(lux: f32) -> LightReadings {
    LightReadings { lux }
}

pub fn averaged(t: f32, h: f32, p: f32, l: f32) -> AveragedSample {
    AveragedSample {
        timestamp: Timestamp::new(2025, 1, 1, 0, 0, 0).unwrap(),
        temperature: t,
        humidity: h,
        pressure: p,
        illuminance: l,
        sample_count: 1,
    }
}

/// Parse the four value columns and the kind tag of a CSV row.
pub fn parse_row(line: &str) -> ([f32; 4], String) {
    let fields: Vec<&str> = line.split(',').collect();
    assert_eq!(fields.len(), 7, "malformed row {line:?}");
    let mut values = [0.0; 4];
    for (value, field) in values.iter_mut().zip(&fields[2..6]) {
        *value = field.parse().unwrap();
    }
    (values, fields[6].to_string())
}

std::thread_local! {
    static CAPTURED_LOGS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Logger that keeps each test thread's messages apart.
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        CAPTURED_LOGS.with(|logs| logs.borrow_mut().push(record.args().to_string()));
    }

    fn flush(&self) {}
}

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;

/// Start recording this thread's log messages, dropping earlier ones.
pub fn capture_logs() {
    if log::set_logger(&CAPTURE_LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
    CAPTURED_LOGS.with(|logs| logs.borrow_mut().clear());
}

pub fn captured_logs() -> Vec<String> {
    CAPTURED_LOGS.with(|logs| logs.borrow().clone())
}

/// In-memory named files.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, Vec<u8>>,
    unavailable: bool,
    reject_appends: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&mut self, available: bool) {
        self.unavailable = !available;
    }

    pub fn reject_appends(&mut self, reject: bool) {
        self.reject_appends = reject;
    }

    /// Rows of a file, without terminators.
    pub fn lines(&self, name: &str) -> Vec<String> {
        let Some(bytes) = self.files.get(name) else {
            return Vec::new();
        };
        String::from_utf8_lossy(bytes)
            .split("\r\n")
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

impl RecordStore for MemoryStore {
    fn verify(&mut self) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }

    fn exists(&mut self, name: &str) -> Result<bool, StorageError> {
        self.verify()?;
        Ok(self.files.contains_key(name))
    }

    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.verify()?;
        if self.reject_appends {
            return Err(StorageError::WriteRejected);
        }
        self.files
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(bytes);
        Ok(())
    }
}

/// Sensor that replays queued results, then repeats a fallback forever.
pub struct ScriptedSensor<R> {
    queue: VecDeque<Result<R, SensorError>>,
    fallback: Result<R, SensorError>,
}

impl<R: Copy> ScriptedSensor<R> {
    pub fn repeating(readings: R) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: Ok(readings),
        }
    }

    pub fn failing(sensor: &'static str) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: Err(read_failed(sensor)),
        }
    }

    /// Replay `readings` in order, then keep returning the last one.
    pub fn sequence(readings: impl IntoIterator<Item = R>) -> Self {
        let queue: VecDeque<_> = readings.into_iter().map(Ok).collect();
        let fallback = *queue.back().expect("sequence needs at least one reading");
        Self {
            queue,
            fallback,
        }
    }

    /// Fail the first `count` reads, then return `readings`.
    pub fn failing_first(count: usize, sensor: &'static str, readings: R) -> Self {
        Self {
            queue: (0..count).map(|_| Err(read_failed(sensor))).collect(),
            fallback: Ok(readings),
        }
    }
}

fn read_failed(sensor: &'static str) -> SensorError {
    SensorError::ReadFailed {
        sensor,
        operation: "read",
        details: "scripted failure",
    }
}

impl<R: Copy> Sensor for ScriptedSensor<R> {
    type Readings = R;

    async fn read(&mut self) -> Result<R, SensorError> {
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}

/// Clock that advances a fixed step on every read.
pub struct SteppingClock {
    next_unix_secs: u64,
    step_secs: u64,
    failing: bool,
}

impl SteppingClock {
    pub fn starting_at(unix_secs: u64, step_secs: u64) -> Self {
        Self {
            next_unix_secs: unix_secs,
            step_secs,
            failing: false,
        }
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl Clock for SteppingClock {
    async fn now(&mut self) -> Result<Timestamp, ClockError> {
        if self.failing {
            return Err(ClockError::Unreachable {
                details: "scripted failure",
            });
        }
        let now = Timestamp::from_unix_secs(self.next_unix_secs)?;
        self.next_unix_secs += self.step_secs;
        Ok(now)
    }
}

/// Serial link that records writes and replays queued modem output.
#[derive(Debug, Default)]
pub struct ScriptedModem {
    written: Vec<u8>,
    responses: VecDeque<u8>,
    /// Remaining number of lines the link accepts; `None` is unlimited.
    line_budget: Option<usize>,
}

impl ScriptedModem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `lines` complete lines, then reject every write.
    pub fn fail_writes_after(&mut self, lines: usize) {
        self.line_budget = Some(lines);
    }

    pub fn push_response(&mut self, bytes: &[u8]) {
        self.responses.extend(bytes.iter().copied());
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    pub fn written_lines(&self) -> Vec<String> {
        self.written()
            .split("\r\n")
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

impl embedded_io::ErrorType for ScriptedModem {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::ReadReady for ScriptedModem {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.responses.is_empty())
    }
}

impl embedded_io_async::Read for ScriptedModem {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.responses.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl embedded_io_async::Write for ScriptedModem {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.line_budget == Some(0) {
            return Err(embedded_io::ErrorKind::BrokenPipe);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        if let Some(budget) = self.line_budget.as_mut() {
            *budget = budget.saturating_sub(1);
        }
        Ok(())
    }
}

/// Modem power pin.
#[derive(Debug, Default)]
pub struct RecordingPin {
    pub is_high: bool,
}

impl embedded_hal::digital::ErrorType for RecordingPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.is_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.is_high = true;
        Ok(())
    }
}

/// Delay that returns immediately and remembers what was asked of it.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub delays_ms: Vec<u32>,
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.delays_ms.push(ns / 1_000_000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.delays_ms.push(us / 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}
