//! Node configuration
//!
//! Defaults reproduce the field deployment: sample every 30 s, send every
//! 10 min, 8 s modem warm-up and 1.2 s between AT commands. The firmware
//! bakes the radio network key in at build time; the simulator can load the
//! whole structure from TOML.

use alloc::string::String;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

pub const DEFAULT_SAMPLE_PERIOD_MS: u32 = 30_000;
pub const DEFAULT_SEND_PERIOD_MS: u32 = 600_000;
pub const DEFAULT_MODEM_WARMUP_MS: u32 = 8_000;
pub const DEFAULT_COMMAND_SETTLE_MS: u32 = 1_200;
pub const DEFAULT_LOG_FILE: &str = "data.csv";

/// Length of the radio network key, in hex characters.
pub const NETWORK_KEY_LEN: usize = 32;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct NodeConfig {
    pub schedule: ScheduleConfig,
    pub radio: RadioConfig,
    pub storage: StorageConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub sample_period_ms: u32,
    pub send_period_ms: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
            send_period_ms: DEFAULT_SEND_PERIOD_MS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RadioConfig {
    /// Network/key identifier passed to `AT+RCONF`
    pub network_key: String,
    /// Time between powering the modem and the first command
    pub warmup_ms: u32,
    /// Pause after every configuration command
    pub settle_ms: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            network_key: "0".repeat(NETWORK_KEY_LEN),
            warmup_ms: DEFAULT_MODEM_WARMUP_MS,
            settle_ms: DEFAULT_COMMAND_SETTLE_MS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// 8.3 name of the CSV log in the card's root directory
    pub log_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_file: String::from(DEFAULT_LOG_FILE),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Sample and send periods must be non-zero")]
    ZeroPeriod,
    #[error("Send period ({send_ms} ms) is shorter than the sample period ({sample_ms} ms)")]
    SendFasterThanSample { sample_ms: u32, send_ms: u32 },
    #[error("Network key must be 32 hex characters, got {len}")]
    NetworkKeyLength { len: usize },
    #[error("Network key contains non-hex characters")]
    NetworkKeyNotHex,
    #[error("Log file name is not a valid 8.3 name")]
    LogFileName,
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let schedule = &self.schedule;
        if schedule.sample_period_ms == 0 || schedule.send_period_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if schedule.send_period_ms < schedule.sample_period_ms {
            return Err(ConfigError::SendFasterThanSample {
                sample_ms: schedule.sample_period_ms,
                send_ms: schedule.send_period_ms,
            });
        }

        let key = &self.radio.network_key;
        if key.len() != NETWORK_KEY_LEN {
            return Err(ConfigError::NetworkKeyLength { len: key.len() });
        }
        if !key.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ConfigError::NetworkKeyNotHex);
        }

        if !is_short_file_name(&self.storage.log_file) {
            return Err(ConfigError::LogFileName);
        }

        Ok(())
    }
}

fn is_short_file_name(name: &str) -> bool {
    let (base, ext) = match name.split_once('.') {
        Some((base, ext)) => (base, ext),
        None => (name, ""),
    };
    let valid_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';

    (1..=8).contains(&base.len())
        && ext.len() <= 3
        && base.chars().all(valid_char)
        && ext.chars().all(valid_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = NodeConfig::default();
        assert_eq!(config.schedule.sample_period_ms, 30_000);
        assert_eq!(config.schedule.send_period_ms, 600_000);
        assert_eq!(config.radio.warmup_ms, 8_000);
        assert_eq!(config.radio.settle_ms, 1_200);
        assert_eq!(config.storage.log_file, "data.csv");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn schedule_must_be_consistent() {
        let mut config = NodeConfig::default();
        config.schedule.sample_period_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPeriod));

        config.schedule.sample_period_ms = 60_000;
        config.schedule.send_period_ms = 30_000;
        assert_eq!(
            config.validate(),
            Err(ConfigError::SendFasterThanSample {
                sample_ms: 60_000,
                send_ms: 30_000
            })
        );
    }

    #[test]
    fn network_key_must_be_32_hex_chars() {
        let mut config = NodeConfig::default();
        config.radio.network_key = String::from("abc");
        assert_eq!(
            config.validate(),
            Err(ConfigError::NetworkKeyLength { len: 3 })
        );

        config.radio.network_key = "g".repeat(NETWORK_KEY_LEN);
        assert_eq!(config.validate(), Err(ConfigError::NetworkKeyNotHex));

        config.radio.network_key = String::from("A1B2C3D4E5F60718293A4B5C6D7E8F90");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn log_file_must_fit_fat_short_names() {
        let mut config = NodeConfig::default();
        for bad in ["", "toolongname.csv", "data.json", "a b.csv", "x.y.z"] {
            config.storage.log_file = String::from(bad);
            assert_eq!(config.validate(), Err(ConfigError::LogFileName), "{bad}");
        }

        config.storage.log_file = String::from("LOG_2025.CSV");
        assert_eq!(config.validate(), Ok(()));
    }
}
