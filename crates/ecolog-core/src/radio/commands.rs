use core::fmt::Write;

use super::RadioError;
use crate::telemetry::TelemetryPayload;

pub const LINE_ENDING: &str = "\r\n";

/// Liveness query.
pub const PING: &str = "AT+PING=?";
/// Read back the radio configuration.
pub const READ_RADIO_CONFIG: &str = "AT+RCONF=?";
/// Select the Kinéis MAC profile.
pub const KINEIS_MAC_MODE: &str = "AT+KMAC=1";

/// Longest command the session ever builds.
pub const MAX_COMMAND_LEN: usize = 64;

pub type Command = heapless::String<MAX_COMMAND_LEN>;

/// `AT+RCONF=<key>`: load the radio parameters for the network.
pub fn radio_config_command(network_key: &str) -> Result<Command, RadioError> {
    let mut command = Command::new();
    write!(command, "AT+RCONF={}", network_key).map_err(|_| RadioError::CommandTooLong)?;
    Ok(command)
}

/// `AT+TX=<payload>,00`: queue one frame for the next satellite pass.
pub fn transmit_command(payload: &TelemetryPayload) -> Result<Command, RadioError> {
    let mut command = Command::new();
    write!(command, "AT+TX={},00", payload).map_err(|_| RadioError::CommandTooLong)?;
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_network_key_is_rejected() {
        let key = "0123456789abcdef".repeat(4);
        assert_eq!(
            radio_config_command(&key),
            Err(RadioError::CommandTooLong)
        );
    }
}
