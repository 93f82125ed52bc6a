//! # Recorder Module
//!
//! Append-only persistence of one record per completed packet cycle.
//!
//! This module handles:
//! - Deriving the run's file name from its start timestamp
//! - Writing the fixed column header once, lazily on first append
//! - Appending one flushed row per completed cycle, so a run cut short
//!   keeps every cycle that finished

use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::LogConfig;
use crate::error::Result;
use crate::telemetry::nmea::PositionFix;

/// Fixed column header, written as the file's first row
pub const RECORD_HEADER: &str =
    "Time, Packet #, Latitude, Longitude, Altitude, GPS Precision, # Satellites, ED RSSI";

/// Suffix appended to the run-start timestamp to form the file name
const RUN_FILE_SUFFIX: &str = "lora-gps-rssi.csv";

/// One completed transmission cycle.
///
/// Assembled by the control loop only after both the uplink send and the
/// RSSI query for this sequence id succeeded.
#[derive(Debug, Clone)]
pub struct CycleRecord {
    /// Wall-clock time the uplink was sent
    pub sent_at: DateTime<Local>,

    /// Strictly increasing, gap-free packet counter (from 0)
    pub sequence_id: u32,

    /// The positional fix correlated with this transmission
    pub fix: PositionFix,

    /// RSSI of the downlink measured after this transmission, in dBm
    pub rssi: i32,
}

/// Append-only CSV writer, one file per run
pub struct Recorder {
    path: PathBuf,
    file: Option<fs::File>,
}

impl Recorder {
    /// Derive the run's file path from its start timestamp. The file
    /// itself is not created until the first append.
    pub fn new(config: &LogConfig, started: DateTime<Local>) -> Self {
        let name = format!("{}_{}", started.format("%Y-%m-%d_%H-%M-%S"), RUN_FILE_SUFFIX);
        Self {
            path: Path::new(&config.dir).join(name),
            file: None,
        }
    }

    /// Path of this run's record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row in the fixed column order, flushed immediately.
    ///
    /// The first append creates the log directory and file and writes the
    /// column header.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory, file, or row cannot be
    /// written.
    pub fn append(&mut self, record: &CycleRecord) -> Result<()> {
        self.ensure_open()?;
        if let Some(file) = self.file.as_mut() {
            writeln!(
                file,
                "{},{},{},{},{},{},{},{}",
                record.sent_at.format("%H:%M:%S"),
                record.sequence_id,
                record.fix.latitude,
                record.fix.longitude,
                record.fix.altitude,
                record.fix.quality,
                record.fix.satellites,
                record.rssi,
            )?;
            file.flush()?;
        }
        Ok(())
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.file.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", RECORD_HEADER)?;
        file.flush()?;
        info!("Writing records to {}", self.path.display());
        self.file = Some(file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fix() -> PositionFix {
        PositionFix {
            latitude: 1.0,
            longitude: 2.0,
            altitude: 10.0,
            quality: 1,
            satellites: 5,
            timestamp: Local::now(),
        }
    }

    fn sample_record(sequence_id: u32, rssi: i32) -> CycleRecord {
        CycleRecord {
            sent_at: Local::now(),
            sequence_id,
            fix: sample_fix(),
            rssi,
        }
    }

    fn test_recorder(dir: &Path) -> Recorder {
        let config = LogConfig {
            dir: dir.to_string_lossy().into_owned(),
        };
        Recorder::new(&config, Local::now())
    }

    #[test]
    fn test_file_name_carries_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = test_recorder(dir.path());
        let name = recorder.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(RUN_FILE_SUFFIX));
    }

    #[test]
    fn test_file_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = test_recorder(dir.path());
        assert!(!recorder.path().exists());

        recorder.append(&sample_record(0, -40)).unwrap();
        assert!(recorder.path().exists());
    }

    #[test]
    fn test_header_then_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = test_recorder(dir.path());
        recorder.append(&sample_record(0, -40)).unwrap();
        recorder.append(&sample_record(1, -41)).unwrap();

        let contents = fs::read_to_string(recorder.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], RECORD_HEADER);

        let row: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(row[1], "0");
        assert_eq!(row[2], "1");
        assert_eq!(row[3], "2");
        assert_eq!(row[4], "10");
        assert_eq!(row[5], "1");
        assert_eq!(row[6], "5");
        assert_eq!(row[7], "-40");

        let next: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(next[1], "1");
        assert_eq!(next[7], "-41");
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = test_recorder(dir.path());
        for i in 0..3 {
            recorder.append(&sample_record(i, -40)).unwrap();
        }

        let contents = fs::read_to_string(recorder.path()).unwrap();
        let headers = contents
            .lines()
            .filter(|l| *l == RECORD_HEADER)
            .count();
        assert_eq!(headers, 1);
    }

    #[test]
    fn test_creates_missing_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("field");
        let mut recorder = test_recorder(&nested);
        recorder.append(&sample_record(0, -40)).unwrap();
        assert!(recorder.path().exists());
    }
}
