//! Motor controller wire protocol.
//!
//! The ESP32 motor driver accepts single ASCII command bytes over an RFCOMM
//! serial stream. No framing, no length prefix, no checksum, and nothing is
//! read back.

use std::fmt;

/// Bluetooth name the motor driver board advertises.
pub const DEVICE_NAME: &str = "ESP32_Motor_Control";

/// RFCOMM channel the peripheral listens on.
pub const RFCOMM_CHANNEL: u8 = 1;

/// Bounded discovery duration, in seconds.
pub const SCAN_DURATION_SECS: u64 = 8;

/// Motion directive understood by the peripheral.
///
/// The set is closed; the board ignores any other byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Forward,
    Backward,
    Stop,
}

impl Command {
    /// Single-byte wire encoding.
    pub fn wire_byte(&self) -> u8 {
        match self {
            Self::Forward => b'f',
            Self::Backward => b'b',
            Self::Stop => b's',
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Stop => "stop",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_bytes() {
        assert_eq!(Command::Forward.wire_byte(), b'f');
        assert_eq!(Command::Backward.wire_byte(), b'b');
        assert_eq!(Command::Stop.wire_byte(), b's');
    }

    #[test]
    fn test_command_labels() {
        assert_eq!(Command::Forward.to_string(), "forward");
        assert_eq!(Command::Stop.to_string(), "stop");
    }
}
