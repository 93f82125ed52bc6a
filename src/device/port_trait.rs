//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;

use crate::config::SerialConfig;
use crate::error::{Result, SurveyError};

/// Trait for serial port I/O operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DevicePort: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Read available bytes into `buf`, returning the count read
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Source of freshly opened ports.
///
/// The device link goes through this seam every time it transitions
/// Closed -> Open: the initial open, the close/reopen halves of a reset,
/// and fault recovery. Tests substitute a scripted opener.
pub trait PortOpener: Send {
    type Port: DevicePort;

    /// Open a new port with the transport's fixed parameters
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::TransportUnavailable`] if the underlying
    /// device cannot be opened (missing, busy, or permission-denied).
    fn open(&mut self) -> Result<Self::Port>;
}

/// Wrapper around tokio_serial::SerialStream that implements DevicePort
pub struct TokioDevicePort {
    port: tokio_serial::SerialStream,
}

impl TokioDevicePort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl DevicePort for TokioDevicePort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;
        self.port.read(buf).await
    }
}

/// Opens the configured serial device as 8N1 with no flow control
pub struct SerialPortOpener {
    path: String,
    baud_rate: u32,
}

impl SerialPortOpener {
    pub fn new(config: &SerialConfig) -> Self {
        Self {
            path: config.port.clone(),
            baud_rate: config.baud_rate,
        }
    }

    /// Device path this opener targets (e.g., "/dev/ttyUSB0")
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl PortOpener for SerialPortOpener {
    type Port = TokioDevicePort;

    fn open(&mut self) -> Result<TokioDevicePort> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(self.path.as_str(), self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                SurveyError::TransportUnavailable(format!("failed to open {}: {}", self.path, e))
            })?;

        Ok(TokioDevicePort::new(port))
    }
}
