//! # Connection
//!
//! Owns the transport and tracks whether it may still be used.

use tracing::{debug, info};

use crate::error::{MspError, Result};
use crate::serial::Transport;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Exclusive owner of a transport handle
///
/// I/O on a closed connection fails with `ConnectionClosed`. Closing is
/// idempotent: the transport is released exactly once.
pub struct Connection<T: Transport> {
    transport: T,
    state: ConnectionState,
}

impl<T: Transport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Connection<T> {
    /// Take ownership of an already-open transport
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Open,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Mutable access to the transport for a single exchange
    ///
    /// # Errors
    ///
    /// Returns `ConnectionClosed` once the connection has been closed
    pub fn transport(&mut self) -> Result<&mut T> {
        match self.state {
            ConnectionState::Open => Ok(&mut self.transport),
            ConnectionState::Closed => Err(MspError::ConnectionClosed),
        }
    }

    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.transport()?.write_all(data).await
    }

    /// Close the connection
    ///
    /// The state becomes `Closed` even if releasing the transport fails.
    /// Closing an already-closed connection does nothing.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            debug!("Connection already closed");
            return Ok(());
        }

        self.state = ConnectionState::Closed;
        self.transport.close().await?;
        info!("Connection closed");
        Ok(())
    }
}
