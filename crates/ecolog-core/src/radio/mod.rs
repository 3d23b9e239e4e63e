//! AT-command session with the satellite modem
//!
//! The modem is driven fire-and-forget: commands are written as `\r\n`
//! terminated lines and the session never waits for, or interprets, an answer.
//! Whatever the modem sends back is drained between passes and echoed to the
//! log so a technician on the debug probe can follow the exchange.

mod commands;

pub use commands::*;

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_io::ReadReady;
use embedded_io_async::{Read, Write};
use log::{info, warn};
use thiserror_no_std::Error;

use crate::config::RadioConfig;
use crate::telemetry::TelemetryPayload;

/// Size of the scratch buffer used when draining modem output.
const DRAIN_CHUNK: usize = 64;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    #[error("Modem link rejected a write")]
    LinkWrite,
    #[error("Modem power pin could not be driven")]
    PowerPin,
    #[error("Command does not fit the line buffer")]
    CommandTooLong,
}

/// Anything that can carry a telemetry frame off the node.
pub trait Uplink {
    /// Queue one payload for transmission.
    fn transmit(
        &mut self,
        payload: &TelemetryPayload,
    ) -> impl Future<Output = Result<(), RadioError>>;

    /// Read and log whatever the modem has sent back, without blocking.
    /// Returns the number of bytes drained.
    fn drain_responses(&mut self) -> impl Future<Output = usize>;
}

/// Owns the modem's serial link and power pin.
pub struct RadioSession<L, P, D> {
    link: L,
    power: P,
    delay: D,
    config: RadioConfig,
}

impl<L, P, D> RadioSession<L, P, D>
where
    L: Read + Write + ReadReady,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(link: L, power: P, delay: D, config: RadioConfig) -> Self {
        Self {
            link,
            power,
            delay,
            config,
        }
    }

    /// Power the modem, let it boot, then push the configuration sequence.
    ///
    /// Every command is attempted even if an earlier one failed. Returns the
    /// number of commands the link accepted.
    pub async fn configure(&mut self) -> Result<usize, RadioError> {
        info!("Powering modem");
        self.power.set_high().map_err(|_| RadioError::PowerPin)?;
        self.delay.delay_ms(self.config.warmup_ms).await;

        let radio_conf = radio_config_command(&self.config.network_key)?;
        let sequence = [PING, radio_conf.as_str(), READ_RADIO_CONFIG, KINEIS_MAC_MODE];

        let mut accepted = 0;
        for command in sequence {
            match self.send_command(command).await {
                Ok(()) => accepted += 1,
                Err(e) => warn!("[AT>>] {} not sent: {}", command, e),
            }
        }

        info!(
            "Modem configured ({}/{} commands accepted)",
            accepted,
            sequence.len()
        );
        Ok(accepted)
    }

    /// Write one command line and wait the settle delay.
    pub async fn send_command(&mut self, command: &str) -> Result<(), RadioError> {
        info!("[AT>>] {}", command);
        let written = self.write_line(command).await;
        self.delay.delay_ms(self.config.settle_ms).await;
        written
    }

    async fn write_line(&mut self, line: &str) -> Result<(), RadioError> {
        self.link
            .write_all(line.as_bytes())
            .await
            .map_err(|_| RadioError::LinkWrite)?;
        self.link
            .write_all(LINE_ENDING.as_bytes())
            .await
            .map_err(|_| RadioError::LinkWrite)?;
        self.link.flush().await.map_err(|_| RadioError::LinkWrite)
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

impl<L, P, D> Uplink for RadioSession<L, P, D>
where
    L: Read + Write + ReadReady,
    P: OutputPin,
    D: DelayNs,
{
    async fn transmit(&mut self, payload: &TelemetryPayload) -> Result<(), RadioError> {
        let command = transmit_command(payload)?;
        info!("Transmitting {}", command);
        self.write_line(&command).await
    }

    async fn drain_responses(&mut self) -> usize {
        let mut drained = 0;
        let mut chunk = [0u8; DRAIN_CHUNK];

        while matches!(self.link.read_ready(), Ok(true)) {
            match self.link.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    drained += n;
                    match core::str::from_utf8(&chunk[..n]) {
                        Ok(text) => info!("[AT<<] {}", text.trim_end()),
                        Err(_) => info!("[AT<<] {:02X?}", &chunk[..n]),
                    }
                }
            }
        }

        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::encode;
    use crate::testing::{RecordingDelay, RecordingPin, ScriptedModem, averaged};
    use embassy_futures::block_on;

    const NETWORK_KEY: &str = "0123456789abcdef0123456789abcdef";

    fn session(
        modem: ScriptedModem,
    ) -> RadioSession<ScriptedModem, RecordingPin, RecordingDelay> {
        let config = RadioConfig {
            network_key: NETWORK_KEY.into(),
            ..RadioConfig::default()
        };
        RadioSession::new(
            modem,
            RecordingPin::default(),
            RecordingDelay::default(),
            config,
        )
    }

    #[test]
    fn configure_powers_up_then_sends_the_sequence() {
        let mut radio = session(ScriptedModem::new());
        let accepted = block_on(radio.configure()).unwrap();

        assert_eq!(accepted, 4);
        assert!(radio.power.is_high);

        let lines = radio.link.written_lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "AT+PING=?");
        assert_eq!(lines[1], "AT+RCONF=0123456789abcdef0123456789abcdef");
        assert_eq!(lines[2], "AT+RCONF=?");
        assert_eq!(lines[3], "AT+KMAC=1");

        // warm-up, then one settle delay per command
        assert_eq!(radio.delay.delays_ms, [8_000, 1_200, 1_200, 1_200, 1_200]);
    }

    #[test]
    fn configure_keeps_going_when_a_write_fails() {
        let mut modem = ScriptedModem::new();
        modem.fail_writes_after(1);
        let mut radio = session(modem);

        let accepted = block_on(radio.configure()).unwrap();
        assert_eq!(accepted, 1);
        // every command still paid its settle delay
        assert_eq!(radio.delay.delays_ms.len(), 5);
    }

    #[test]
    fn transmit_frames_the_payload() {
        let mut radio = session(ScriptedModem::new());
        let payload = encode(&averaged(21.34, 55.20, 1013.2, 450.0));

        block_on(radio.transmit(&payload)).unwrap();

        assert_eq!(
            radio.link.written(),
            "AT+TX=085615902794000001C2000000000000,00\r\n"
        );
        // no settle delay after a data command
        assert!(radio.delay.delays_ms.is_empty());
    }

    #[test]
    fn transmit_surfaces_link_failures() {
        let mut modem = ScriptedModem::new();
        modem.fail_writes_after(0);
        let mut radio = session(modem);
        let payload = encode(&averaged(0.0, 0.0, 0.0, 0.0));

        assert_eq!(
            block_on(radio.transmit(&payload)),
            Err(RadioError::LinkWrite)
        );
    }

    #[test]
    fn drain_consumes_pending_responses_only() {
        let mut modem = ScriptedModem::new();
        modem.push_response(b"+OK\r\n");
        modem.push_response(&[0xFF; 100]);
        let mut radio = session(modem);

        assert_eq!(block_on(radio.drain_responses()), 105);
        assert_eq!(block_on(radio.drain_responses()), 0);
    }
}
