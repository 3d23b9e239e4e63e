//! DS3231 real-time clock over async I2C.
//!
//! Only the timekeeping registers and the oscillator-stop flag are used; the
//! alarms, square-wave output and aging offset are left at their defaults.

use embedded_hal_async::i2c::I2c;
use log::{error, info};

use super::{Clock, ClockError, Timestamp};

const DS3231_ADDRESS: u8 = 0x68;

const REG_SECONDS: u8 = 0x00;
const REG_STATUS: u8 = 0x0F;

const STATUS_OSCILLATOR_STOPPED: u8 = 0x80;
const HOUR_12H_MODE: u8 = 0x40;
const HOUR_PM: u8 = 0x20;
const MONTH_CENTURY: u8 = 0x80;

pub struct Ds3231<I> {
    i2c: I,
}

impl<I: I2c> Ds3231<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Whether the oscillator stopped since the time was last set, which
    /// means the backup battery ran out and the stored time is garbage.
    pub async fn lost_power(&mut self) -> Result<bool, ClockError> {
        let status = self.read_register(REG_STATUS).await?;
        Ok(status & STATUS_OSCILLATOR_STOPPED != 0)
    }

    /// Set the time (24-hour mode) and clear the oscillator-stop flag.
    pub async fn set(&mut self, at: &Timestamp) -> Result<(), ClockError> {
        let frame = encode_time(at);
        self.i2c.write(DS3231_ADDRESS, &frame).await.map_err(|e| {
            error!("DS3231 time write failed: {:?}", e);
            ClockError::Unreachable {
                details: "Failed to write timekeeping registers",
            }
        })?;

        let status = self.read_register(REG_STATUS).await?;
        self.i2c
            .write(
                DS3231_ADDRESS,
                &[REG_STATUS, status & !STATUS_OSCILLATOR_STOPPED],
            )
            .await
            .map_err(|e| {
                error!("DS3231 status write failed: {:?}", e);
                ClockError::Unreachable {
                    details: "Failed to clear oscillator-stop flag",
                }
            })?;

        info!("DS3231: time set to {}", at);
        Ok(())
    }

    async fn read_register(&mut self, register: u8) -> Result<u8, ClockError> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(DS3231_ADDRESS, &[register], &mut value)
            .await
            .map_err(|e| {
                error!("DS3231 register {:#04x} read failed: {:?}", register, e);
                ClockError::Unreachable {
                    details: "I2C communication error",
                }
            })?;
        Ok(value[0])
    }
}

impl<I: I2c> Clock for Ds3231<I> {
    async fn now(&mut self) -> Result<Timestamp, ClockError> {
        let mut raw = [0u8; 7];
        self.i2c
            .write_read(DS3231_ADDRESS, &[REG_SECONDS], &mut raw)
            .await
            .map_err(|e| {
                error!("DS3231 time read failed: {:?}", e);
                ClockError::Unreachable {
                    details: "Failed to read timekeeping registers",
                }
            })?;

        decode_time(&raw)
    }
}

const fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

const fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Decode registers 0x00..=0x06 into a timestamp.
fn decode_time(raw: &[u8; 7]) -> Result<Timestamp, ClockError> {
    let second = from_bcd(raw[0] & 0x7F);
    let minute = from_bcd(raw[1] & 0x7F);
    let hour = if raw[2] & HOUR_12H_MODE != 0 {
        let hour12 = from_bcd(raw[2] & 0x1F) % 12;
        if raw[2] & HOUR_PM != 0 {
            hour12 + 12
        } else {
            hour12
        }
    } else {
        from_bcd(raw[2] & 0x3F)
    };
    // raw[3] is the day of week, which the log does not carry.
    let day = from_bcd(raw[4] & 0x3F);
    let month = from_bcd(raw[5] & 0x1F);
    let century = if raw[5] & MONTH_CENTURY != 0 { 100 } else { 0 };
    let year = 2000 + century + u16::from(from_bcd(raw[6]));

    Timestamp::new(year, month, day, hour, minute, second)
}

/// Register address followed by registers 0x00..=0x06.
fn encode_time(at: &Timestamp) -> [u8; 8] {
    let year = at.year().saturating_sub(2000) as u8 % 100;
    [
        REG_SECONDS,
        to_bcd(at.second()),
        to_bcd(at.minute()),
        to_bcd(at.hour()),
        1,
        to_bcd(at.day()),
        to_bcd(at.month()),
        to_bcd(year),
    ]
}
