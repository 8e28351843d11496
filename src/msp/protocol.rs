//! # MSP Protocol Constants and Types
//!
//! Core protocol definitions for MSP v1 communication.
//!
//! ```text
//! '$' 'M' <dir> <length> <command> <payload...> <checksum>
//! ```

use super::checksum::frame_checksum;
use crate::error::{MspError, Result};

/// Frame preamble byte
pub const MSP_PREAMBLE: u8 = b'$';

/// Protocol marker byte (MSP v1)
pub const MSP_MARKER: u8 = b'M';

/// Direction byte for frames sent to the flight controller
pub const MSP_DIRECTION_REQUEST: u8 = b'<';

/// Direction byte for frames sent by the flight controller
pub const MSP_DIRECTION_RESPONSE: u8 = b'>';

/// Full request header
pub const MSP_REQUEST_HEADER: [u8; 3] = [MSP_PREAMBLE, MSP_MARKER, MSP_DIRECTION_REQUEST];

/// Full response header
pub const MSP_RESPONSE_HEADER: [u8; 3] = [MSP_PREAMBLE, MSP_MARKER, MSP_DIRECTION_RESPONSE];

/// Header size in bytes
pub const MSP_HEADER_SIZE: usize = 3;

/// Maximum payload size (length field is a single byte)
pub const MSP_MAX_PAYLOAD_SIZE: usize = 255;

/// Bytes surrounding the payload: header(3) + length(1) + command(1) + checksum(1)
pub const MSP_FRAME_OVERHEAD: usize = MSP_HEADER_SIZE + 3;

/// Bytes scanned for a response header before giving up (one maximal frame)
pub const MSP_RESYNC_LIMIT: usize = MSP_MAX_PAYLOAD_SIZE + MSP_FRAME_OVERHEAD;

/// Raw IMU readings (reserved, no decoder)
pub const MSP_RAW_IMU: u8 = 102;

/// Attitude (roll, pitch, yaw)
pub const MSP_ATTITUDE: u8 = 108;

/// Analog readings (battery voltage, current, RSSI)
pub const MSP_ANALOG: u8 = 110;

/// Frame direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to flight controller (`$M<`)
    Request,
    /// Flight controller to host (`$M>`)
    Response,
}

impl Direction {
    /// Direction byte on the wire
    pub fn marker(self) -> u8 {
        match self {
            Direction::Request => MSP_DIRECTION_REQUEST,
            Direction::Response => MSP_DIRECTION_RESPONSE,
        }
    }

    /// Complete three-byte header for this direction
    pub fn header(self) -> [u8; 3] {
        [MSP_PREAMBLE, MSP_MARKER, self.marker()]
    }
}

/// MSP frame structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MspFrame {
    /// Frame direction
    pub direction: Direction,

    /// Command id
    pub command_id: u8,

    /// Payload data
    pub payload: Vec<u8>,

    /// Checksum byte as carried on the wire
    pub checksum: u8,
}

impl MspFrame {
    /// Create a new MSP frame with a freshly computed checksum
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if payload exceeds MSP_MAX_PAYLOAD_SIZE (255 bytes)
    pub fn new(direction: Direction, command_id: u8, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > MSP_MAX_PAYLOAD_SIZE {
            return Err(MspError::InvalidPayload(format!(
                "Payload size {} exceeds maximum {}",
                payload.len(),
                MSP_MAX_PAYLOAD_SIZE
            )));
        }

        let checksum = frame_checksum(payload.len() as u8, command_id, &payload);

        Ok(Self {
            direction,
            command_id,
            payload,
            checksum,
        })
    }

    /// Length field value
    ///
    /// Cannot truncate since payload is validated to be ≤ 255 bytes
    pub fn length(&self) -> u8 {
        self.payload.len() as u8
    }

    /// Whether the stored checksum matches the frame contents
    pub fn is_checksum_valid(&self) -> bool {
        frame_checksum(self.length(), self.command_id, &self.payload) == self.checksum
    }
}
