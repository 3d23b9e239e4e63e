use alloc::string::String;

use log::{debug, info};

use super::record::LINE_ENDING;
use super::{AveragedSample, LOG_HEADER, LogRecord, RecordStore, Sample, StorageError};

/// What [`LogWriter::init`] found on the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFileState {
    /// The file was missing and has been created with its header.
    Created,
    /// The file was already there; nothing was written.
    Existing,
}

/// Appends RAW and AVG rows to the CSV log on a [`RecordStore`].
pub struct LogWriter<S> {
    store: S,
    file_name: String,
}

impl<S: RecordStore> LogWriter<S> {
    pub fn new(store: S, file_name: impl Into<String>) -> Self {
        Self {
            store,
            file_name: file_name.into(),
        }
    }

    /// Check the medium and create the log with its header row if it does
    /// not exist yet. An existing log is never touched.
    pub fn init(&mut self) -> Result<LogFileState, StorageError> {
        self.store.verify()?;

        if self.store.exists(&self.file_name)? {
            info!("Log {} found, appending", self.file_name);
            return Ok(LogFileState::Existing);
        }

        let mut header = String::with_capacity(LOG_HEADER.len() + LINE_ENDING.len());
        header.push_str(LOG_HEADER);
        header.push_str(LINE_ENDING);
        self.store.append(&self.file_name, header.as_bytes())?;

        info!("Log {} created with header", self.file_name);
        Ok(LogFileState::Created)
    }

    pub fn append_raw(&mut self, sample: &Sample) -> Result<(), StorageError> {
        self.append(&LogRecord::from(sample))
    }

    pub fn append_average(&mut self, avg: &AveragedSample) -> Result<(), StorageError> {
        self.append(&LogRecord::from(avg))
    }

    fn append(&mut self, record: &LogRecord) -> Result<(), StorageError> {
        let line = record.to_line()?;
        self.store.append(&self.file_name, line.as_bytes())?;
        debug!("SD {} OK", record.kind.tag());
        Ok(())
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
