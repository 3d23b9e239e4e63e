pub mod accumulator;
pub mod log_writer;
pub mod record;
pub mod sd_card;

pub use accumulator::SampleAccumulator;
pub use log_writer::LogWriter;
pub use record::{LOG_HEADER, LogLine, LogRecord, RecordKind};
pub use sd_card::SdCardStore;

use thiserror_no_std::Error;

use crate::clock::Timestamp;

/// One reading of every channel, taken on a sampling tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Timestamp,
    /// °C
    pub temperature: f32,
    /// % relative humidity
    pub humidity: f32,
    /// hPa
    pub pressure: f32,
    /// lux
    pub illuminance: f32,
}

/// Per-channel mean of the samples folded since the last send, stamped with
/// the clock time at which it was computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AveragedSample {
    pub timestamp: Timestamp,
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub illuminance: f32,
    /// Number of samples behind the mean
    pub sample_count: u32,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage medium unavailable")]
    Unavailable,
    #[error("Failed to open {operation}")]
    OpenFailed { operation: &'static str },
    #[error("Write rejected by the storage medium")]
    WriteRejected,
    #[error("Record does not fit the line buffer")]
    RecordTooLong,
}

/// Append-only named record store (the SD card on the device).
///
/// Every call is self-contained: implementations open, write and close
/// whatever they need before returning, so the medium can be pulled between
/// any two calls without losing an acknowledged record.
pub trait RecordStore {
    /// Check that the medium is present and mountable.
    fn verify(&mut self) -> Result<(), StorageError>;

    /// Whether a file with this name exists.
    fn exists(&mut self, name: &str) -> Result<bool, StorageError>;

    /// Append bytes to the named file, creating it if needed.
    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

impl<T: RecordStore + ?Sized> RecordStore for &mut T {
    fn verify(&mut self) -> Result<(), StorageError> {
        (**self).verify()
    }

    fn exists(&mut self, name: &str) -> Result<bool, StorageError> {
        (**self).exists(name)
    }

    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).append(name, bytes)
    }
}
