//! Trait abstraction for byte-channel operations to enable testing

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Byte channel the MSP client runs over
///
/// Every read takes an explicit bound; implementations must return
/// `MspError::Timeout` rather than block past it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send {
    /// Fill `buf` completely or fail
    async fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()>;

    /// Write all data to the channel and flush it
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Release the underlying handle
    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        (**self).read_exact(buf, timeout).await
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::MspError;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Scripted transport for testing
    ///
    /// Reads are served from a queue of canned response bytes. Asking for more
    /// bytes than are queued consumes what is there and times out.
    #[derive(Clone, Default)]
    pub struct ScriptedTransport {
        pub incoming: Arc<Mutex<VecDeque<u8>>>,
        pub written_data: Arc<Mutex<Vec<Vec<u8>>>>,
        pub read_error: Arc<Mutex<Option<io::ErrorKind>>>,
        pub write_error: Arc<Mutex<Option<io::ErrorKind>>>,
        pub close_count: Arc<Mutex<usize>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn queue_response(&self, bytes: &[u8]) {
            self.incoming.lock().unwrap().extend(bytes.iter().copied());
        }

        pub fn remaining(&self) -> usize {
            self.incoming.lock().unwrap().len()
        }

        pub fn get_written_data(&self) -> Vec<Vec<u8>> {
            self.written_data.lock().unwrap().clone()
        }

        pub fn set_read_error(&self, error: io::ErrorKind) {
            *self.read_error.lock().unwrap() = Some(error);
        }

        pub fn set_write_error(&self, error: io::ErrorKind) {
            *self.write_error.lock().unwrap() = Some(error);
        }

        pub fn close_count(&self) -> usize {
            *self.close_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
            if let Some(error) = *self.read_error.lock().unwrap() {
                return Err(MspError::Io(io::Error::new(error, "Mock read error")));
            }

            // Like a real stream, bytes that did arrive are gone after a timeout
            let mut incoming = self.incoming.lock().unwrap();
            if incoming.len() < buf.len() {
                incoming.clear();
                return Err(MspError::Timeout(timeout));
            }
            for slot in buf.iter_mut() {
                *slot = incoming.pop_front().unwrap_or_default();
            }
            Ok(())
        }

        async fn write_all(&mut self, data: &[u8]) -> Result<()> {
            if let Some(error) = *self.write_error.lock().unwrap() {
                return Err(MspError::Io(io::Error::new(error, "Mock write error")));
            }
            self.written_data.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            *self.close_count.lock().unwrap() += 1;
            Ok(())
        }
    }
}
