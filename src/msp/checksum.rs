//! # MSP v1 Checksum
//!
//! XOR fold over the length byte, the command byte and every payload byte.
//! The header bytes are never part of the checksum.

/// XOR-fold a byte slice (the empty slice folds to 0)
pub fn xor_fold(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &byte| acc ^ byte)
}

/// Calculate the checksum of an MSP v1 frame
///
/// # Examples
///
/// ```
/// use msp_telemetry::msp::checksum::frame_checksum;
///
/// // Empty attitude request: 0 ^ 108
/// assert_eq!(frame_checksum(0, 108, &[]), 108);
/// ```
pub fn frame_checksum(length: u8, command_id: u8, payload: &[u8]) -> u8 {
    length ^ command_id ^ xor_fold(payload)
}
