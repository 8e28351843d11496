//! # MSP Response Decoder
//!
//! Reads a response frame field by field from a transport, validating the
//! header and the checksum, and scans past stray bytes to the next header.

use std::time::Duration;
use tracing::debug;

use super::checksum::frame_checksum;
use super::protocol::*;
use crate::error::{ProtocolError, Result};
use crate::serial::Transport;

/// Decode one response frame from the transport
///
/// Every read is bounded by `timeout`.
///
/// # Errors
///
/// Returns error if:
/// - The first three bytes are not `$M>` (nothing further is read)
/// - Any read times out or hits an I/O failure
/// - The checksum byte does not match the frame contents
pub async fn decode_response<T>(transport: &mut T, timeout: Duration) -> Result<MspFrame>
where
    T: Transport + ?Sized,
{
    let mut header = [0u8; MSP_HEADER_SIZE];
    transport.read_exact(&mut header, timeout).await?;
    if header != MSP_RESPONSE_HEADER {
        return Err(ProtocolError::BadHeader(header).into());
    }

    read_frame_body(transport, timeout).await
}

/// Scan forward for the next `$M>` and decode the frame that follows it
///
/// `rejected` is the header `decode_response` refused; a response header
/// that straddles it is still found. At most `MSP_RESYNC_LIMIT` further
/// bytes are scanned, one bounded read each.
///
/// # Errors
///
/// Returns `BadHeader` with the last three bytes seen if no header turns up
/// within the limit, plus any error `decode_response` can return.
pub async fn resync_response<T>(
    transport: &mut T,
    rejected: [u8; MSP_HEADER_SIZE],
    timeout: Duration,
) -> Result<MspFrame>
where
    T: Transport + ?Sized,
{
    let mut window = rejected;
    let mut skipped = 0;

    while window != MSP_RESPONSE_HEADER {
        if skipped == MSP_RESYNC_LIMIT {
            return Err(ProtocolError::BadHeader(window).into());
        }

        let mut next = [0u8; 1];
        transport.read_exact(&mut next, timeout).await?;
        window = [window[1], window[2], next[0]];
        skipped += 1;
    }

    debug!("Found response header after skipping {} bytes", skipped);
    read_frame_body(transport, timeout).await
}

/// Length, command id, payload and checksum following a valid header
async fn read_frame_body<T>(transport: &mut T, timeout: Duration) -> Result<MspFrame>
where
    T: Transport + ?Sized,
{
    // Length and command id
    let mut fields = [0u8; 2];
    transport.read_exact(&mut fields, timeout).await?;
    let [length, command_id] = fields;

    let mut payload = vec![0u8; length as usize];
    if !payload.is_empty() {
        transport.read_exact(&mut payload, timeout).await?;
    }

    let mut received = [0u8; 1];
    transport.read_exact(&mut received, timeout).await?;
    let received = received[0];

    let expected = frame_checksum(length, command_id, &payload);
    if expected != received {
        return Err(ProtocolError::ChecksumMismatch { expected, received }.into());
    }

    debug!("Received MSP response {} ({} byte payload)", command_id, length);

    Ok(MspFrame {
        direction: Direction::Response,
        command_id,
        payload,
        checksum: received,
    })
}
