//! # MSP Client Module
//!
//! Request/response client for MSP flight controllers.
//!
//! This module handles:
//! - One request/response exchange at a time (MSP has no pipelining)
//! - Bounded waits for every response
//! - Typed attitude and battery queries
//! - The telemetry polling loop with cooperative cancellation

pub mod connection;

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{MspError, ProtocolError, Result};
use crate::msp::decoder::{decode_response, resync_response};
use crate::msp::encoder::encode_request;
use crate::msp::protocol::{MspFrame, MSP_ANALOG, MSP_ATTITUDE};
use crate::msp::registry::{self, AttitudeReading, BatteryReading, Reading};
use crate::serial::Transport;
pub use connection::{Connection, ConnectionState};

/// Default bound on each transport read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Responses to other commands skipped before a request gives up
const MAX_STALE_RESPONSES: usize = 4;

/// Commands issued on every poll tick, in order
const POLL_COMMANDS: [u8; 2] = [MSP_ATTITUDE, MSP_ANALOG];

/// Counters reported when the poll loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Ticks started
    pub ticks: u64,
    /// Readings delivered to the callback
    pub readings: u64,
    /// Requests that failed without ending the loop
    pub failures: u64,
}

/// MSP protocol client
///
/// Exclusively owns the connection; `&mut self` on every operation keeps
/// exchanges strictly sequential.
#[derive(Debug)]
pub struct MspClient<T: Transport> {
    connection: Connection<T>,
    read_timeout: Duration,
    enforce_response_match: bool,
}

impl<T: Transport> MspClient<T> {
    /// Create a client with a 1 s read bound and response matching enabled
    pub fn new(transport: T) -> Self {
        Self {
            connection: Connection::new(transport),
            read_timeout: DEFAULT_READ_TIMEOUT,
            enforce_response_match: true,
        }
    }

    /// Create a client from configuration values
    pub fn with_config(transport: T, read_timeout: Duration, config: &ClientConfig) -> Self {
        Self::new(transport)
            .with_read_timeout(read_timeout)
            .with_response_match(config.enforce_response_match)
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Require responses to carry the requested command id
    pub fn with_response_match(mut self, enforce: bool) -> Self {
        self.enforce_response_match = enforce;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    /// Perform one request/response exchange
    ///
    /// # Arguments
    ///
    /// * `command_id` - MSP command id to query
    /// * `payload` - Request payload (empty for plain queries)
    ///
    /// # Returns
    ///
    /// * `Result<Reading>` - Typed reading decoded from the response
    ///
    /// # Errors
    ///
    /// Transport, codec and registry errors are returned as-is. An I/O error
    /// closes the connection before it is returned. With response matching
    /// on, frames answering other commands are skipped; if only those arrive
    /// the request fails with `MismatchedResponse`.
    pub async fn request(&mut self, command_id: u8, payload: &[u8]) -> Result<Reading> {
        let result = self.exchange(command_id, payload).await;

        if let Err(MspError::Io(ref e)) = result {
            warn!("Link failure during command {}: {}", command_id, e);
            if let Err(close_err) = self.connection.close().await {
                warn!("Failed to close connection: {}", close_err);
            }
        }

        result
    }

    async fn exchange(&mut self, command_id: u8, payload: &[u8]) -> Result<Reading> {
        let frame = encode_request(command_id, payload)?;
        self.connection.write_all(&frame).await?;

        let mut response = self.read_response().await?;
        let mut skipped = 0;

        // Late answers to earlier requests are still in the stream
        while self.enforce_response_match && response.command_id != command_id {
            let mismatch = ProtocolError::MismatchedResponse {
                requested: command_id,
                received: response.command_id,
            };
            if skipped == MAX_STALE_RESPONSES {
                return Err(mismatch.into());
            }
            skipped += 1;
            debug!("Discarding stale response {} while waiting for {}", response.command_id, command_id);

            response = match self.read_response().await {
                Ok(next) => next,
                Err(MspError::Timeout(_)) => return Err(mismatch.into()),
                Err(e) => return Err(e),
            };
        }

        registry::decode(response.command_id, &response.payload)
    }

    /// Read one response, scanning past stray bytes if the header is off
    async fn read_response(&mut self) -> Result<MspFrame> {
        let read_timeout = self.read_timeout;
        let transport = self.connection.transport()?;

        match decode_response(&mut *transport, read_timeout).await {
            Err(MspError::Protocol(ProtocolError::BadHeader(header))) => {
                warn!("Bad frame header {:02X?}, resynchronizing", header);
                resync_response(transport, header, read_timeout).await
            }
            other => other,
        }
    }

    /// Query MSP_ATTITUDE
    pub async fn get_attitude(&mut self) -> Result<AttitudeReading> {
        match self.request(MSP_ATTITUDE, &[]).await? {
            Reading::Attitude(attitude) => Ok(attitude),
            Reading::Battery(_) => Err(ProtocolError::MismatchedResponse {
                requested: MSP_ATTITUDE,
                received: MSP_ANALOG,
            }
            .into()),
        }
    }

    /// Query MSP_ANALOG
    pub async fn get_battery(&mut self) -> Result<BatteryReading> {
        match self.request(MSP_ANALOG, &[]).await? {
            Reading::Battery(battery) => Ok(battery),
            Reading::Attitude(_) => Err(ProtocolError::MismatchedResponse {
                requested: MSP_ANALOG,
                received: MSP_ATTITUDE,
            }
            .into()),
        }
    }

    /// Poll attitude and battery until cancelled or the link fails
    ///
    /// Non-fatal errors (timeouts, protocol and data errors) are logged and
    /// the loop moves on to the next request. Cancellation is checked between
    /// ticks only, never in the middle of a frame. The connection is closed on
    /// every exit path.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error (I/O failure or closed connection), or
    /// `InvalidInterval` for a zero `period`
    pub async fn poll_loop<F>(
        &mut self,
        period: Duration,
        cancel: CancellationToken,
        mut on_reading: F,
    ) -> Result<PollSummary>
    where
        F: FnMut(&Reading),
    {
        if period.is_zero() {
            self.shutdown().await;
            return Err(MspError::InvalidInterval(period));
        }

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut summary = PollSummary::default();
        info!("Polling telemetry every {:?}", period);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Polling cancelled after {} ticks", summary.ticks);
                    self.shutdown().await;
                    return Ok(summary);
                }

                _ = ticker.tick() => {
                    summary.ticks += 1;

                    for command_id in POLL_COMMANDS {
                        match self.request(command_id, &[]).await {
                            Ok(reading) => {
                                summary.readings += 1;
                                on_reading(&reading);
                            }
                            Err(e) if e.is_fatal() => {
                                warn!("Stopping telemetry polling: {}", e);
                                self.shutdown().await;
                                return Err(e);
                            }
                            Err(e) => {
                                summary.failures += 1;
                                warn!("Command {} failed: {}", command_id, e);
                            }
                        }
                    }

                    debug!("Tick {} complete ({} readings, {} failures)",
                        summary.ticks, summary.readings, summary.failures);
                }
            }
        }
    }

    /// Close the connection (idempotent)
    pub async fn close(&mut self) -> Result<()> {
        self.connection.close().await
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.connection.close().await {
            warn!("Failed to close connection: {}", e);
        }
    }
}
