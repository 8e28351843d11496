//! # Serial Communication Module
//!
//! Handles the byte channel to the flight controller.
//!
//! This module handles:
//! - Opening the USB serial port (VCP) of the flight controller
//! - Opening a TCP socket for boards bridged over Wi-Fi
//! - Bounded reads and flushed writes over either link
//! - Orderly shutdown of the channel

pub mod port_trait;

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, ConnectionKind};
use crate::error::{MspError, Result};
pub use port_trait::Transport;

/// Default MSP baud rate for Betaflight/INAV USB VCP
pub const MSP_DEFAULT_BAUD_RATE: u32 = 115_200;

/// Port setting that enables probing of DEFAULT_DEVICE_PATHS
pub const AUTO_DETECT_PORT: &str = "auto";

/// Default flight controller device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // STM32 USB CDC (most flight controllers)
    "/dev/ttyUSB0", // USB-to-serial adapters on a UART
];

/// Transport over any async byte stream
///
/// Wraps a serial port or a TCP socket and applies the per-read bound.
pub struct StreamTransport<S> {
    /// Stream handle, `None` once closed
    stream: Option<S>,
    /// Device path or socket address
    name: String,
}

impl<S> std::fmt::Debug for StreamTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("name", &self.name)
            .field("open", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-open stream
    pub fn new(stream: S, name: impl Into<String>) -> Self {
        Self {
            stream: Some(stream),
            name: name.into(),
        }
    }

    /// Device path or socket address of the link
    pub fn name(&self) -> &str {
        &self.name
    }

    fn stream(&mut self) -> Result<&mut S> {
        self.stream.as_mut().ok_or(MspError::ConnectionClosed)
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let stream = self.stream()?;

        match tokio::time::timeout(timeout, stream.read_exact(buf)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(MspError::Io(e)),
            Err(_) => Err(MspError::Timeout(timeout)),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream()?;

        stream.write_all(data).await?;
        stream.flush().await?;

        debug!("Sent MSP frame ({} bytes)", data.len());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                warn!("Error shutting down {}: {}", self.name, e);
            }
            info!("Closed link to {}", self.name);
        }
        Ok(())
    }
}

/// Flight controller serial port
pub type SerialTransport = StreamTransport<tokio_serial::SerialStream>;

/// Flight controller reached over TCP (e.g. ESP8266 Wi-Fi bridge)
pub type TcpTransport = StreamTransport<TcpStream>;

impl SerialTransport {
    /// Open the serial port named in the configuration
    ///
    /// A port of `"auto"` probes the default device paths.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use msp_telemetry::serial::SerialTransport;
    ///
    /// let serial = SerialTransport::open_path("/dev/ttyACM0", 115_200)?;
    /// println!("Connected to: {}", serial.name());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        if config.port == AUTO_DETECT_PORT {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)
        } else {
            Self::open_path(&config.port, config.baud_rate)
        }
    }

    /// Try each device path in turn and keep the first that opens
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_path(path, baud_rate) {
                Ok(transport) => return Ok(transport),
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            }
        }

        Err(MspError::Connection {
            target: paths.join(", "),
            reason: "no flight controller found".to_string(),
        })
    }

    /// Open a specific serial port with 8N1 settings
    pub fn open_path(path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| MspError::Connection {
                target: path.to_string(),
                reason: e.to_string(),
            })?;

        info!("Opened flight controller at {} ({} baud)", path, baud_rate);
        Ok(Self::new(port, path))
    }
}

impl TcpTransport {
    /// Connect to a flight controller exposed over TCP
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(MspError::Connection {
                    target: address.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(MspError::Connection {
                    target: address.to_string(),
                    reason: format!("no answer within {:?}", timeout),
                })
            }
        };

        // MSP frames are tiny; do not let Nagle hold them back
        stream.set_nodelay(true)?;

        info!("Connected to flight controller at {}", address);
        Ok(Self::new(stream, address))
    }
}

/// Open whichever link the configuration selects
pub async fn open(config: &ConnectionConfig) -> Result<Box<dyn Transport>> {
    match config.kind {
        ConnectionKind::Serial => Ok(Box::new(SerialTransport::open(config)?)),
        ConnectionKind::Tcp => Ok(Box::new(
            TcpTransport::connect(&config.tcp_address, config.timeout()).await?,
        )),
    }
}
