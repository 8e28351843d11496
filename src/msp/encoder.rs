//! # MSP Frame Encoder
//!
//! Builds complete MSP v1 frames from a command id and payload.

use bytes::{BufMut, Bytes, BytesMut};

use super::checksum::frame_checksum;
use super::protocol::*;
use crate::error::{MspError, Result};

/// Encode a request frame (`$M<`) to send to the flight controller
///
/// # Arguments
///
/// * `command_id` - MSP command id
/// * `payload` - Request payload (max 255 bytes, usually empty for queries)
///
/// # Returns
///
/// * `Result<Bytes>` - Complete frame: header + length + command + payload + checksum
///
/// # Errors
///
/// Returns `InvalidPayload` if the payload is longer than 255 bytes
///
/// # Examples
///
/// ```
/// use msp_telemetry::msp::encoder::encode_request;
/// use msp_telemetry::msp::protocol::MSP_ATTITUDE;
///
/// let frame = encode_request(MSP_ATTITUDE, &[]).unwrap();
/// assert_eq!(&frame[..], &[b'$', b'M', b'<', 0, 108, 108]);
/// ```
pub fn encode_request(command_id: u8, payload: &[u8]) -> Result<Bytes> {
    encode_frame(Direction::Request, command_id, payload)
}

/// Encode a response frame (`$M>`), as a flight controller would send it
///
/// Used by simulators and test harnesses standing in for real hardware.
pub fn encode_response(command_id: u8, payload: &[u8]) -> Result<Bytes> {
    encode_frame(Direction::Response, command_id, payload)
}

/// Encode a frame in either direction
pub fn encode_frame(direction: Direction, command_id: u8, payload: &[u8]) -> Result<Bytes> {
    if payload.len() > MSP_MAX_PAYLOAD_SIZE {
        return Err(MspError::InvalidPayload(format!(
            "Payload size {} exceeds maximum {}",
            payload.len(),
            MSP_MAX_PAYLOAD_SIZE
        )));
    }

    let length = payload.len() as u8;

    let mut frame = BytesMut::with_capacity(MSP_FRAME_OVERHEAD + payload.len());
    frame.put_slice(&direction.header());
    frame.put_u8(length);
    frame.put_u8(command_id);
    frame.put_slice(payload);
    frame.put_u8(frame_checksum(length, command_id, payload));

    Ok(frame.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msp::checksum::xor_fold;

    #[test]
    fn test_encode_empty_attitude_request() {
        let frame = encode_request(MSP_ATTITUDE, &[]).unwrap();
        assert_eq!(&frame[..], b"$M<\x00\x6C\x6C");
    }

    #[test]
    fn test_encode_empty_analog_request() {
        let frame = encode_request(MSP_ANALOG, &[]).unwrap();
        assert_eq!(&frame[..], b"$M<\x00\x6E\x6E");
    }

    #[test]
    fn test_encode_request_structure() {
        let payload = [0x10, 0x20, 0x30];
        let frame = encode_request(200, &payload).unwrap();

        assert_eq!(frame.len(), MSP_FRAME_OVERHEAD + payload.len());
        assert_eq!(&frame[0..3], &MSP_REQUEST_HEADER);
        assert_eq!(frame[3], 3);
        assert_eq!(frame[4], 200);
        assert_eq!(&frame[5..8], &payload);
        assert_eq!(frame[8], 3 ^ 200 ^ 0x10 ^ 0x20 ^ 0x30);
    }

    #[test]
    fn test_encode_response_uses_response_marker() {
        let frame = encode_response(MSP_ANALOG, &[0x7B]).unwrap();
        assert_eq!(&frame[0..3], &MSP_RESPONSE_HEADER);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let result = encode_request(MSP_ATTITUDE, &[0u8; 256]);
        assert!(matches!(result, Err(MspError::InvalidPayload(_))));
    }

    #[test]
    fn test_encode_max_payload() {
        let frame = encode_request(MSP_ATTITUDE, &[0xAA; 255]).unwrap();
        assert_eq!(frame.len(), 261);
        assert_eq!(frame[3], 255);
    }

    #[test]
    fn test_checksum_recomputes_from_encoded_fields() {
        // Every frame's last byte equals the XOR fold of length..payload
        let pattern: Vec<u8> = (0..MSP_MAX_PAYLOAD_SIZE).map(|i| (i * 37 + 11) as u8).collect();

        for command_id in 0..=u8::MAX {
            for length in 0..=MSP_MAX_PAYLOAD_SIZE {
                let payload = &pattern[..length];
                let frame = encode_request(command_id, payload).unwrap();

                assert_eq!(frame.len(), MSP_FRAME_OVERHEAD + length);
                assert_eq!(frame[3] as usize, length);
                assert_eq!(frame[4], command_id);
                assert_eq!(&frame[5..5 + length], payload);

                let body = &frame[MSP_HEADER_SIZE..frame.len() - 1];
                assert_eq!(
                    xor_fold(body),
                    frame[frame.len() - 1],
                    "checksum mismatch for command {} with {} byte payload",
                    command_id,
                    length
                );
            }
        }
    }

    #[test]
    fn test_encoded_checksum_matches_frame() {
        let frame = MspFrame::new(Direction::Response, MSP_ATTITUDE, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let bytes = encode_response(frame.command_id, &frame.payload).unwrap();
        assert_eq!(bytes[bytes.len() - 1], frame.checksum);
    }
}
