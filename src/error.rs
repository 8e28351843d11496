//! # Error Types
//!
//! Custom error types for MSP telemetry using `thiserror`.

use std::time::Duration;
use thiserror::Error;

/// Frame-level protocol violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Response did not start with `$M>`
    #[error("bad frame header: {0:02X?}")]
    BadHeader([u8; 3]),

    /// Received checksum byte does not match the XOR fold of the frame
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{received:02X}")]
    ChecksumMismatch { expected: u8, received: u8 },

    /// Command id is not in the registry
    #[error("unknown command id {0}")]
    UnknownCommand(u8),

    /// Command id is known but has no payload decoder
    #[error("no decoder available for command {name} ({id})")]
    NoDecoder { id: u8, name: &'static str },

    /// Response answers a different command than the one requested
    #[error("mismatched response: requested command {requested}, received {received}")]
    MismatchedResponse { requested: u8, received: u8 },
}

/// Payload content errors raised by the command decoders
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("{command} payload too short: need {expected} bytes, got {actual}")]
    InsufficientPayload {
        command: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Main error type for MSP telemetry
#[derive(Debug, Error)]
pub enum MspError {
    /// Transport could not be opened
    #[error("Failed to open {target}: {reason}")]
    Connection { target: String, reason: String },

    /// I/O errors (link loss, write failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No data within the configured read bound
    #[error("Timed out after {0:?} waiting for response")]
    Timeout(Duration),

    /// Connection was used after it was closed
    #[error("Connection is closed")]
    ConnectionClosed,

    /// Poll period the ticker cannot run at
    #[error("Invalid poll interval {0:?}: must be non-zero")]
    InvalidInterval(Duration),

    /// Request payload cannot be framed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// MSP protocol errors
    #[error("MSP protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Payload decoding errors
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Telemetry record serialization errors
    #[error("Telemetry log error: {0}")]
    TelemetryLog(#[from] serde_json::Error),
}

impl MspError {
    /// Whether the error means the link is gone and polling must stop.
    ///
    /// Timeouts, protocol and data errors only spoil a single exchange.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MspError::Io(_) | MspError::ConnectionClosed)
    }
}

/// Result type alias for MSP telemetry
pub type Result<T> = std::result::Result<T, MspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let io = MspError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"));
        assert!(io.is_fatal());
        assert!(MspError::ConnectionClosed.is_fatal());

        assert!(!MspError::Timeout(Duration::from_millis(10)).is_fatal());
        assert!(!MspError::InvalidInterval(Duration::ZERO).is_fatal());
        assert!(!MspError::Protocol(ProtocolError::BadHeader(*b"xyz")).is_fatal());
        assert!(!MspError::Protocol(ProtocolError::ChecksumMismatch {
            expected: 1,
            received: 2
        })
        .is_fatal());
        assert!(!MspError::Data(DataError::InsufficientPayload {
            command: "MSP_ATTITUDE",
            expected: 6,
            actual: 2,
        })
        .is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = MspError::from(ProtocolError::ChecksumMismatch {
            expected: 0x6C,
            received: 0x6D,
        });
        assert_eq!(
            err.to_string(),
            "MSP protocol error: checksum mismatch: expected 0x6C, got 0x6D"
        );

        let err = MspError::from(DataError::InsufficientPayload {
            command: "MSP_ANALOG",
            expected: 1,
            actual: 0,
        });
        assert!(err.to_string().contains("MSP_ANALOG payload too short"));
    }
}
