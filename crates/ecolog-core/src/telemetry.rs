//! Telemetry payload encoding
//!
//! The uplink carries one fixed 16-byte frame per send window, written as 32
//! upper-case hex characters. All fields are big-endian:
//!
//! | chars  | field       | encoding                                   |
//! |--------|-------------|--------------------------------------------|
//! | 0..4   | temperature | `round(°C × 100)` as `i16`, two's complement |
//! | 4..8   | humidity    | `round(% × 100)` as `u16`                  |
//! | 8..12  | pressure    | `round(hPa × 10)` as `u16`                 |
//! | 12..20 | illuminance | `lux` truncated to `u32`                   |
//! | 20..32 | reserved    | zero                                       |
//!
//! Values outside a field's range saturate to its bounds and NaN encodes as
//! zero.

use core::fmt::{self, Write};

use crate::storage::AveragedSample;

/// Number of hex characters in a payload.
pub const PAYLOAD_HEX_LEN: usize = 32;

const RESERVED_HEX: &str = "000000000000";

/// A 32-character hex frame ready for `AT+TX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryPayload(heapless::String<PAYLOAD_HEX_LEN>);

impl TelemetryPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TelemetryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Round half away from zero. `as` casts from float saturate and map NaN to 0.
/// Values just below one half round toward zero.
fn round_scaled(value: f32, scale: f32) -> f32 {
    let scaled = value * scale;
    let whole = scaled as i32;
    let frac = scaled - whole as f32;
    if frac >= 0.5 {
        whole.saturating_add(1) as f32
    } else if frac <= -0.5 {
        whole.saturating_sub(1) as f32
    } else {
        whole as f32
    }
}

pub fn encode(avg: &AveragedSample) -> TelemetryPayload {
    let temperature = round_scaled(avg.temperature, 100.0) as i16 as u16;
    let humidity = round_scaled(avg.humidity, 100.0) as u16;
    let pressure = round_scaled(avg.pressure, 10.0) as u16;
    let illuminance = avg.illuminance as u32;

    let mut hex = heapless::String::new();
    // 4 + 4 + 4 + 8 + 12 characters always fit the buffer.
    let _ = write!(
        hex,
        "{:04X}{:04X}{:04X}{:08X}{}",
        temperature, humidity, pressure, illuminance, RESERVED_HEX
    );
    TelemetryPayload(hex)
}
