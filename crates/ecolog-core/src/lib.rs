//! Hardware-independent core library for ecolog
//!
//! This crate contains all platform-agnostic logic for the ecolog telemetry
//! node: the acquisition scheduler, the sample accumulator, the append-only
//! CSV log, the telemetry payload encoder and the AT-command radio session,
//! plus the capability traits the firmware and the simulator plug into.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod clock;
pub mod config;
pub mod radio;
pub mod scheduler;
pub mod sensors;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;
