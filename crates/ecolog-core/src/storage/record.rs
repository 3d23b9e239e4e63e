//! CSV rows of the on-card log.

use core::fmt::Write;

use super::{AveragedSample, Sample, StorageError};
use crate::clock::Timestamp;

/// Column names, written once when the log file is created.
pub const LOG_HEADER: &str = "Date,Heure,Temp,Hum,Pres,Lux,Type";

/// Line terminator used for every row, header included.
pub const LINE_ENDING: &str = "\r\n";

/// Upper bound on the length of one formatted row.
pub const MAX_LINE_LEN: usize = 128;

pub type LogLine = heapless::String<MAX_LINE_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// One sampling tick
    Raw,
    /// Mean over a send window
    Avg,
}

impl RecordKind {
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::Avg => "AVG",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub timestamp: Timestamp,
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub illuminance: f32,
    pub kind: RecordKind,
}

impl LogRecord {
    /// Render the record as a terminated CSV row, values with two decimals.
    pub fn to_line(&self) -> Result<LogLine, StorageError> {
        let mut line = LogLine::new();
        write!(
            line,
            "{},{},{:.2},{:.2},{:.2},{:.2},{}{}",
            self.timestamp.date(),
            self.timestamp.time(),
            self.temperature,
            self.humidity,
            self.pressure,
            self.illuminance,
            self.kind.tag(),
            LINE_ENDING,
        )
        .map_err(|_| StorageError::RecordTooLong)?;
        Ok(line)
    }
}

impl From<&Sample> for LogRecord {
    fn from(sample: &Sample) -> Self {
        Self {
            timestamp: sample.timestamp,
            temperature: sample.temperature,
            humidity: sample.humidity,
            pressure: sample.pressure,
            illuminance: sample.illuminance,
            kind: RecordKind::Raw,
        }
    }
}

impl From<&AveragedSample> for LogRecord {
    fn from(avg: &AveragedSample) -> Self {
        Self {
            timestamp: avg.timestamp,
            temperature: avg.temperature,
            humidity: avg.humidity,
            pressure: avg.pressure,
            illuminance: avg.illuminance,
            kind: RecordKind::Avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_row_matches_column_layout() {
        let sample = Sample {
            timestamp: Timestamp::new(2025, 1, 9, 7, 5, 3).unwrap(),
            temperature: 21.346,
            humidity: 55.2,
            pressure: 1013.25,
            illuminance: 450.0,
        };

        let line = LogRecord::from(&sample).to_line().unwrap();
        assert_eq!(
            line.as_str(),
            "2025/01/09,07:05:03,21.35,55.20,1013.25,450.00,RAW\r\n"
        );
    }

    #[test]
    fn avg_row_carries_avg_tag_and_negative_values() {
        let avg = AveragedSample {
            timestamp: Timestamp::new(2024, 12, 31, 23, 59, 59).unwrap(),
            temperature: -5.0,
            humidity: 80.125,
            pressure: 987.6,
            illuminance: 0.0,
            sample_count: 20,
        };

        let line = LogRecord::from(&avg).to_line().unwrap();
        assert!(line.starts_with("2024/12/31,23:59:59,-5.00,"));
        assert!(line.ends_with(",AVG\r\n"));
        assert_eq!(line.split(',').count(), 7);
    }

    #[test]
    fn absurd_values_overflow_instead_of_truncating() {
        let sample = Sample {
            timestamp: Timestamp::new(2025, 1, 1, 0, 0, 0).unwrap(),
            temperature: f32::MAX,
            humidity: f32::MAX,
            pressure: f32::MAX,
            illuminance: f32::MAX,
        };

        assert_eq!(
            LogRecord::from(&sample).to_line(),
            Err(StorageError::RecordTooLong)
        );
    }

    #[test]
    fn header_names_every_column() {
        assert_eq!(LOG_HEADER.split(',').count(), 7);
        assert!(LOG_HEADER.ends_with("Type"));
    }
}
