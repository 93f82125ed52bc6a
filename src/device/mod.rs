//! # Device Link Module
//!
//! Handles the AT command/response link to the LoRa end device.
//!
//! This module handles:
//! - Opening the serial port with the device's fixed parameters (8N1, no
//!   flow control, bounded read timeout)
//! - One command round-trip per call: write a CR-LF-terminated line, then
//!   collect whatever the device answers within the timeout window
//! - Join, join-status, uplink-send and signal-quality operations
//! - Reset (close, settle, reopen) to clear stale buffered bytes before
//!   queries that depend on exact response framing

pub mod port_trait;

use bytes::BytesMut;
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::at::{commands, response};
use crate::config::SerialConfig;
use crate::error::{Result, SurveyError};
use port_trait::{DevicePort, PortOpener, SerialPortOpener};

/// Command/response link to the end device.
///
/// Owns the serial transport exclusively. The port handle doubles as the
/// session state: `None` is Closed, `Some` is Open. Join status is never
/// cached here; the control loop re-queries it whenever it matters.
pub struct DeviceLink<O: PortOpener> {
    opener: O,
    port: Option<O::Port>,
    last_response: String,
    timeout: Duration,
    reset_settle: Duration,
    response_limit: usize,
}

impl DeviceLink<SerialPortOpener> {
    /// Build a link over the configured serial device. The link starts
    /// Closed; call [`DeviceLink::open`] before issuing commands.
    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(SerialPortOpener::new(config), config)
    }
}

impl<O: PortOpener> DeviceLink<O> {
    pub fn new(opener: O, config: &SerialConfig) -> Self {
        Self {
            opener,
            port: None,
            last_response: String::new(),
            timeout: Duration::from_millis(config.timeout_ms),
            reset_settle: Duration::from_millis(config.reset_settle_ms),
            response_limit: config.response_limit,
        }
    }

    /// Open the transport, replacing any existing handle.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::TransportUnavailable`] if the port cannot be
    /// opened. Not retried here; the caller decides whether the failure is
    /// recoverable.
    pub fn open(&mut self) -> Result<()> {
        self.port = Some(self.opener.open()?);
        info!("Device transport open");
        Ok(())
    }

    /// Close the transport. Dropping the handle releases the port.
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Device transport closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Raw text of the most recent response
    pub fn last_response(&self) -> &str {
        &self.last_response
    }

    /// Close and reopen the transport with a settle delay in between,
    /// discarding any bytes the device pushed since the last command.
    pub async fn reset(&mut self) -> Result<()> {
        self.close();
        tokio::time::sleep(self.reset_settle).await;
        self.open()
    }

    /// Send a single command line and collect the device's answer.
    ///
    /// The command is terminated with CR-LF on the wire. Reading stops at
    /// the response byte budget or when the timeout window closes; a
    /// timeout is not an error and returns whatever arrived (possibly
    /// nothing).
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::TransportUnavailable`] if the link is closed
    /// or the port faults mid-transfer.
    pub async fn send_command(&mut self, command: &str) -> Result<String> {
        let port = self.port.as_mut().ok_or_else(|| {
            SurveyError::TransportUnavailable("port not open".to_string())
        })?;

        debug!("Sending command: {}", command);
        let line = format!("{}{}", command, commands::LINE_ENDING);
        port.write_all(line.as_bytes())
            .await
            .map_err(|e| SurveyError::TransportUnavailable(format!("write failed: {}", e)))?;
        port.flush()
            .await
            .map_err(|e| SurveyError::TransportUnavailable(format!("flush failed: {}", e)))?;

        let raw = Self::read_response(port, self.timeout, self.response_limit).await?;
        debug!("Received {} response bytes", raw.len());
        self.last_response = raw.clone();
        Ok(raw)
    }

    /// Collect response bytes until the byte budget is met or the timeout
    /// window closes. Timeouts end collection; other I/O faults surface as
    /// transport errors.
    async fn read_response(
        port: &mut O::Port,
        timeout: Duration,
        limit: usize,
    ) -> Result<String> {
        let mut collected = BytesMut::with_capacity(limit);
        let mut chunk = vec![0u8; limit];
        let deadline = Instant::now() + timeout;

        while collected.len() < limit {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match tokio::time::timeout(deadline - now, port.read(&mut chunk)).await {
                Err(_) => break, // window closed mid-read
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    let take = n.min(limit - collected.len());
                    collected.extend_from_slice(&chunk[..take]);
                }
                Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => break,
                Ok(Err(e)) => {
                    return Err(SurveyError::TransportUnavailable(format!(
                        "read failed: {}",
                        e
                    )));
                }
            }
        }

        Ok(String::from_utf8_lossy(&collected).into_owned())
    }

    /// Request a network join. The device acknowledges asynchronously, so
    /// the answer is collected but not interpreted; confirmation comes from
    /// [`DeviceLink::join_status`].
    pub async fn join(&mut self) -> Result<()> {
        self.send_command(commands::JOIN).await?;
        Ok(())
    }

    /// Query whether the device has joined the network
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::ProtocolParse`] if the response carries no
    /// usable status token; the run cannot safely continue without link
    /// state.
    pub async fn join_status(&mut self) -> Result<bool> {
        let raw = self.send_command(commands::JOIN_STATUS_QUERY).await?;
        response::parse_join_status(&raw)
    }

    /// Transmit an uplink test packet carrying `sequence_id` as payload
    pub async fn send_uplink(&mut self, sequence_id: u32) -> Result<()> {
        self.send_command(&commands::uplink(sequence_id)).await?;
        Ok(())
    }

    /// Measure the RSSI of the most recently received downlink.
    ///
    /// Resets the transport first so the response framing is not polluted
    /// by bytes buffered from earlier traffic.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::ProtocolParse`] if the response carries no
    /// integer token.
    pub async fn query_rssi(&mut self) -> Result<i32> {
        self.reset().await?;
        let raw = self.send_command(commands::RSSI_QUERY).await?;
        response::parse_rssi(&raw)
    }
}
