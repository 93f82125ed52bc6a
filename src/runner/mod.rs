//! # Runner Module
//!
//! Orchestrates the end-to-end packet cycles of a survey run.
//!
//! This module handles:
//! - The join phase: request a network join, then poll the join status
//!   until confirmed or the poll budget runs out
//! - One packet cycle per sequence id: pull a fix, send the uplink, wait
//!   out the air round-trip, query RSSI, persist the composite record
//! - Duty-cycle pacing between cycles
//! - Retry-once recovery when the device transport faults mid-cycle

pub mod reconnect;

use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{Config, RunConfig};
use crate::device::port_trait::PortOpener;
use crate::device::DeviceLink;
use crate::error::{Result, SurveyError};
use crate::recorder::{CycleRecord, Recorder};
use crate::telemetry::nmea::PositionFix;
use crate::telemetry::TelemetrySource;

/// Outcome of a completed run
#[derive(Debug)]
pub struct RunSummary {
    pub packets_sent: u32,
    pub log_path: PathBuf,
}

/// Sequential driver of the survey's packet cycles.
///
/// Owns every component for the duration of the run and is the single
/// place deciding retry-vs-fatal for their errors: a transport fault
/// mid-cycle gets one reconnect-and-retry, everything else halts the run.
pub struct ControlLoop<O: PortOpener, R> {
    device: DeviceLink<O>,
    telemetry: TelemetrySource<R>,
    recorder: Recorder,
    run: RunConfig,
    fix_retry_limit: u32,
}

impl<O, R> ControlLoop<O, R>
where
    O: PortOpener,
    R: AsyncRead + Unpin + Send,
{
    pub fn new(
        device: DeviceLink<O>,
        telemetry: TelemetrySource<R>,
        recorder: Recorder,
        config: &Config,
    ) -> Self {
        Self {
            device,
            telemetry,
            recorder,
            run: config.run.clone(),
            fix_retry_limit: config.telemetry.fix_retry_limit,
        }
    }

    /// Run the configured number of packet cycles.
    ///
    /// Sequence ids are `0..packet_count`, strictly increasing and
    /// gap-free; a cycle retried after a transport fault keeps its id. A
    /// record is appended only once both the uplink send and the RSSI
    /// query for that id have succeeded.
    ///
    /// # Errors
    ///
    /// Surfaces the first fatal error: join timeout, protocol parse
    /// failure, telemetry loss, or a transport fault that recovery could
    /// not clear.
    pub async fn run(&mut self) -> Result<RunSummary> {
        self.ensure_joined().await?;

        info!("Sending {} control packets", self.run.packet_count);
        for sequence_id in 0..self.run.packet_count {
            let fix = self.next_fix().await?;
            debug!(
                "Cycle {}: fix {:.6},{:.6} ({} sats) captured at {}",
                sequence_id, fix.latitude, fix.longitude, fix.satellites, fix.timestamp
            );

            let sent_at = Local::now();
            let rssi = match self.transmit_and_measure(sequence_id).await {
                Ok(rssi) => rssi,
                Err(SurveyError::TransportUnavailable(reason)) => {
                    warn!("Cycle {} transport fault: {}", sequence_id, reason);
                    reconnect::recover(&mut self.device)?;
                    // same fix, same sequence id, one retry only
                    self.transmit_and_measure(sequence_id).await?
                }
                Err(e) => return Err(e),
            };

            self.recorder.append(&CycleRecord {
                sent_at,
                sequence_id,
                fix,
                rssi,
            })?;
            info!("Packet {} recorded (RSSI {} dBm)", sequence_id, rssi);

            if sequence_id + 1 < self.run.packet_count {
                sleep(Duration::from_secs(self.run.pacing_secs)).await;
            }
        }

        Ok(RunSummary {
            packets_sent: self.run.packet_count,
            log_path: self.recorder.path().to_path_buf(),
        })
    }

    /// Release the device transport. The telemetry socket closes when the
    /// loop is dropped.
    pub fn shutdown(&mut self) {
        self.device.close();
        info!("Resources released");
    }

    pub fn is_device_open(&self) -> bool {
        self.device.is_open()
    }

    /// Confirm the device is on the network, joining it first if needed
    async fn ensure_joined(&mut self) -> Result<()> {
        if self.device.join_status().await? {
            info!("Device already joined");
            return Ok(());
        }

        info!("Requesting network join");
        self.device.join().await?;
        for attempt in 1..=self.run.join_poll_attempts {
            sleep(Duration::from_millis(self.run.join_poll_interval_ms)).await;
            if self.device.join_status().await? {
                info!("Device joined the network");
                return Ok(());
            }
            debug!(
                "Join not confirmed (poll {}/{})",
                attempt, self.run.join_poll_attempts
            );
        }
        Err(SurveyError::JoinTimeout(self.run.join_poll_attempts))
    }

    /// Pull the next fix, re-reading fix-free chunks up to the configured
    /// budget (0 keeps the first miss fatal)
    async fn next_fix(&mut self) -> Result<PositionFix> {
        let mut rereads = 0;
        loop {
            match self.telemetry.next_fix().await {
                Ok(fix) => return Ok(fix),
                Err(SurveyError::TelemetryParse(reason)) if rereads < self.fix_retry_limit => {
                    rereads += 1;
                    warn!(
                        "{}; re-reading ({}/{})",
                        reason, rereads, self.fix_retry_limit
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Steps 2-3 of a cycle: uplink send, air-time settle, RSSI query
    async fn transmit_and_measure(&mut self, sequence_id: u32) -> Result<i32> {
        self.device.send_uplink(sequence_id).await?;
        sleep(Duration::from_millis(self.run.tx_settle_ms)).await;
        self.device.query_rssi().await
    }
}
