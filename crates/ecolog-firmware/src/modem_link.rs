//! UART link to the satellite modem
//!
//! Exposes the async UART through the `embedded-io` traits the radio session
//! is written against.

use embedded_io::{ErrorKind, ErrorType, ReadReady};
use embedded_io_async::{Read, Write};
use esp_hal::Async;
use esp_hal::uart::{Config as UartConfig, Uart};
use log::warn;

/// Modem UART baud rate.
pub const MODEM_BAUD_RATE: u32 = 9_600;

pub fn modem_uart_config() -> UartConfig {
    UartConfig::default().with_baudrate(MODEM_BAUD_RATE)
}

pub struct ModemLink {
    uart: Uart<'static, Async>,
}

impl ModemLink {
    pub fn new(uart: Uart<'static, Async>) -> Self {
        Self { uart }
    }
}

impl ErrorType for ModemLink {
    type Error = ErrorKind;
}

impl ReadReady for ModemLink {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.uart.read_ready())
    }
}

impl Read for ModemLink {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.uart.read_async(buf).await.map_err(|e| {
            warn!("Modem UART rx error: {:?}", e);
            ErrorKind::Other
        })
    }
}

impl Write for ModemLink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart.write_async(buf).await.map_err(|e| {
            warn!("Modem UART tx error: {:?}", e);
            ErrorKind::Other
        })
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart.flush_async().await.map_err(|e| {
            warn!("Modem UART flush error: {:?}", e);
            ErrorKind::Other
        })
    }
}
