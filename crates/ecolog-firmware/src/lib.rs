//! ESP32-S3 firmware-specific modules for ecolog
//!
//! This crate contains the code that cannot compile on desktop targets:
//! ESP32 peripheral initialization, the shared async I2C bus and the UART
//! link to the satellite modem. Everything else lives in `ecolog_core`.

#![no_std]

pub mod async_i2c_bus;
pub mod board;
pub mod modem_link;
