//! # MSP Command Registry
//!
//! Known command ids and the decoders that turn their response payloads into
//! typed readings.

use serde::Serialize;

use super::protocol::*;
use crate::error::{DataError, ProtocolError, Result};

/// MSP_ATTITUDE payload size (roll, pitch, yaw as i16)
pub const MSP_ATTITUDE_PAYLOAD_SIZE: usize = 6;

/// Bytes of MSP_ANALOG consumed (vbat only)
pub const MSP_ANALOG_MIN_PAYLOAD_SIZE: usize = 1;

/// Payload decoder signature
pub type Decoder = fn(&[u8]) -> Result<Reading>;

/// Aircraft attitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttitudeReading {
    /// Roll in degrees
    pub roll: f32,

    /// Pitch in degrees
    pub pitch: f32,

    /// Yaw in raw wire units
    ///
    /// Betaflight sends whole degrees here, unlike the decidegrees used for
    /// roll and pitch, so the value is passed through unscaled.
    pub yaw: i16,
}

/// Battery state from MSP_ANALOG
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryReading {
    /// Battery voltage in volts
    pub voltage: f32,
}

/// Typed reading produced by a command decoder
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    Attitude(AttitudeReading),
    Battery(BatteryReading),
}

/// Registry entry
#[derive(Clone, Copy)]
pub struct Command {
    /// Command id on the wire
    pub id: u8,

    /// Protocol name (e.g. "MSP_ATTITUDE")
    pub name: &'static str,

    /// Payload decoder, `None` for ids that are recognized but not decoded
    pub decoder: Option<Decoder>,
}

/// All commands this client knows about
pub const COMMANDS: &[Command] = &[
    Command {
        id: MSP_RAW_IMU,
        name: "MSP_RAW_IMU",
        decoder: None,
    },
    Command {
        id: MSP_ATTITUDE,
        name: "MSP_ATTITUDE",
        decoder: Some(decode_attitude_reading),
    },
    Command {
        id: MSP_ANALOG,
        name: "MSP_ANALOG",
        decoder: Some(decode_battery_reading),
    },
];

/// Look up a command by id
///
/// # Errors
///
/// Returns `UnknownCommand` if the id is not registered
pub fn lookup(command_id: u8) -> Result<&'static Command> {
    COMMANDS
        .iter()
        .find(|command| command.id == command_id)
        .ok_or_else(|| ProtocolError::UnknownCommand(command_id).into())
}

/// Decode a validated response payload for the given command
///
/// # Errors
///
/// - `UnknownCommand` for ids not in the registry
/// - `NoDecoder` for recognized ids without a decoder (MSP_RAW_IMU)
/// - `InsufficientPayload` when the payload is too short
pub fn decode(command_id: u8, payload: &[u8]) -> Result<Reading> {
    let command = lookup(command_id)?;
    let decoder = command.decoder.ok_or(ProtocolError::NoDecoder {
        id: command.id,
        name: command.name,
    })?;
    decoder(payload)
}

/// Decode MSP_ATTITUDE payload
///
/// # Arguments
///
/// * `payload` - At least 6 bytes: roll ×10, pitch ×10, yaw (all i16 little-endian)
///
/// # Returns
///
/// * `Result<AttitudeReading>` - Roll/pitch in degrees, yaw unscaled
pub fn decode_attitude(payload: &[u8]) -> Result<AttitudeReading> {
    require_len("MSP_ATTITUDE", payload, MSP_ATTITUDE_PAYLOAD_SIZE)?;

    let roll_raw = i16::from_le_bytes([payload[0], payload[1]]);
    let pitch_raw = i16::from_le_bytes([payload[2], payload[3]]);
    let yaw = i16::from_le_bytes([payload[4], payload[5]]);

    Ok(AttitudeReading {
        roll: roll_raw as f32 / 10.0,
        pitch: pitch_raw as f32 / 10.0,
        yaw,
    })
}

/// Decode MSP_ANALOG payload
///
/// Only vbat (byte 0, volts ×10) is read. Current, mAh drawn and RSSI follow
/// on the wire and are ignored.
pub fn decode_battery(payload: &[u8]) -> Result<BatteryReading> {
    require_len("MSP_ANALOG", payload, MSP_ANALOG_MIN_PAYLOAD_SIZE)?;

    Ok(BatteryReading {
        voltage: payload[0] as f32 / 10.0,
    })
}

fn decode_attitude_reading(payload: &[u8]) -> Result<Reading> {
    decode_attitude(payload).map(Reading::Attitude)
}

fn decode_battery_reading(payload: &[u8]) -> Result<Reading> {
    decode_battery(payload).map(Reading::Battery)
}

fn require_len(command: &'static str, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() < expected {
        return Err(DataError::InsufficientPayload {
            command,
            expected,
            actual: payload.len(),
        }
        .into());
    }
    Ok(())
}
