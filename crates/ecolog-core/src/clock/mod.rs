//! Wall-clock and elapsed-time sources
//!
//! Two notions of time exist on the node. [`Timestamp`] is the calendar time
//! read from the real-time clock and written into every log record.
//! [`ElapsedMillis`] is the free-running millisecond counter that drives the
//! acquisition cadence. It is 32 bits wide and wraps after ~49.7 days, so all
//! interval checks go through wrapping subtraction.

pub mod ds3231;

use core::fmt;

use thiserror_no_std::Error;

pub use ds3231::Ds3231;

/// Earliest year a [`Timestamp`] can carry (FAT epoch).
pub const MIN_YEAR: u16 = 1970;
/// Latest year a [`Timestamp`] can carry (DS3231 century limit).
pub const MAX_YEAR: u16 = 2099;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    #[error("Clock not responding: {details}")]
    Unreachable { details: &'static str },
    #[error("Clock returned an invalid calendar time")]
    InvalidTime,
}

/// Calendar time with second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl Timestamp {
    /// Build a timestamp from calendar fields, rejecting impossible dates.
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, ClockError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year)
            || !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(ClockError::InvalidTime);
        }

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Convert seconds since the Unix epoch into a calendar timestamp.
    ///
    /// Times past [`MAX_YEAR`] are rejected.
    pub fn from_unix_secs(secs: u64) -> Result<Self, ClockError> {
        let days = secs / 86_400;
        let rem = secs % 86_400;

        // Civil-from-days, shifted so the year starts on March 1st.
        let z = days as i64 + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
        let year = yoe + era * 400 + i64::from(month <= 2);

        if year > i64::from(MAX_YEAR) {
            return Err(ClockError::InvalidTime);
        }

        Self::new(
            year as u16,
            month,
            day,
            (rem / 3_600) as u8,
            ((rem % 3_600) / 60) as u8,
            (rem % 60) as u8,
        )
    }

    pub const fn year(&self) -> u16 {
        self.year
    }

    pub const fn month(&self) -> u8 {
        self.month
    }

    pub const fn day(&self) -> u8 {
        self.day
    }

    pub const fn hour(&self) -> u8 {
        self.hour
    }

    pub const fn minute(&self) -> u8 {
        self.minute
    }

    pub const fn second(&self) -> u8 {
        self.second
    }

    /// The `YYYY/MM/DD` column of a log record.
    pub fn date(&self) -> DateColumn {
        DateColumn(*self)
    }

    /// The `HH:MM:SS` column of a log record.
    pub fn time(&self) -> TimeColumn {
        TimeColumn(*self)
    }

    /// Convert into the timestamp format used for FAT directory entries.
    pub fn to_fat(&self) -> embedded_sdmmc::Timestamp {
        embedded_sdmmc::Timestamp {
            year_since_1970: (self.year - MIN_YEAR) as u8,
            zero_indexed_month: self.month - 1,
            zero_indexed_day: self.day - 1,
            hours: self.hour,
            minutes: self.minute,
            seconds: self.second,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date(), self.time())
    }
}

pub struct DateColumn(Timestamp);

impl fmt::Display for DateColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.0.year, self.0.month, self.0.day)
    }
}

pub struct TimeColumn(Timestamp);

impl fmt::Display for TimeColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0.hour, self.0.minute, self.0.second
        )
    }
}

const fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

const fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Source of the current calendar time.
pub trait Clock {
    /// Read the current wall-clock time.
    fn now(&mut self) -> impl Future<Output = Result<Timestamp, ClockError>>;
}

/// Hands the filesystem a fixed modification time.
///
/// The SD card driver wants a synchronous, shared time source while the RTC
/// sits behind an async I2C bus, so the firmware snapshots the RTC at boot.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(Timestamp);

impl FixedTimeSource {
    pub const fn new(at: Timestamp) -> Self {
        Self(at)
    }
}

impl embedded_sdmmc::TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> embedded_sdmmc::Timestamp {
        self.0.to_fat()
    }
}

/// Reading of a free-running, wrapping millisecond counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElapsedMillis(pub u32);

impl ElapsedMillis {
    pub const fn from_millis(millis: u32) -> Self {
        Self(millis)
    }

    /// Milliseconds from `earlier` to `self`, correct across one counter wrap.
    pub const fn since(self, earlier: ElapsedMillis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Whether at least `period_ms` has passed since `mark`.
    pub const fn has_elapsed(self, mark: ElapsedMillis, period_ms: u32) -> bool {
        self.since(mark) >= period_ms
    }

    pub const fn wrapping_add(self, millis: u32) -> Self {
        Self(self.0.wrapping_add(millis))
    }
}
