//! # Telemetry Module
//!
//! Client of the streaming GPS telemetry bridge.
//!
//! This module handles:
//! - Connecting to the bridge's TCP socket (typically an adb-forwarded
//!   phone GPS server on localhost)
//! - Pulling one chunk of sentence text per fix request
//! - Selecting and parsing the positional-fix sentence into a
//!   [`nmea::PositionFix`]
//!
//! Reads carry no timeout: the stream is expected to be continuously live
//! while an operator drives a run, and a stalled bridge stalls the run
//! visibly rather than fabricating data.

pub mod nmea;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::config::TelemetryConfig;
use crate::error::{Result, SurveyError};
use nmea::PositionFix;

/// Bytes pulled from the stream per fix request
const CHUNK_SIZE: usize = 1024;

/// Pull-based source of positional fixes over a byte stream
pub struct TelemetrySource<R> {
    stream: R,
}

impl TelemetrySource<TcpStream> {
    /// Connect to the GPS bridge.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::TelemetryUnavailable`] if the connection is
    /// refused. Without position data the test packets carry no value, so
    /// this is fatal for the run.
    pub async fn connect(config: &TelemetryConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let stream = TcpStream::connect(&addr).await.map_err(|e| {
            SurveyError::TelemetryUnavailable(format!("connection to {} failed: {}", addr, e))
        })?;
        info!("Connected to telemetry stream at {}", addr);
        Ok(Self { stream })
    }
}

impl<R: AsyncRead + Unpin + Send> TelemetrySource<R> {
    /// Wrap an already-open byte stream
    pub fn from_stream(stream: R) -> Self {
        Self { stream }
    }

    /// Read one chunk from the stream and parse the first positional-fix
    /// sentence in it.
    ///
    /// # Errors
    ///
    /// - [`SurveyError::TelemetryUnavailable`] if the stream faults or
    ///   reaches end-of-stream
    /// - [`SurveyError::TelemetryParse`] if the chunk just read carries no
    ///   parseable fix sentence (chunk boundaries do not guarantee one)
    pub async fn next_fix(&mut self) -> Result<PositionFix> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = self.stream.read(&mut buf).await.map_err(|e| {
            SurveyError::TelemetryUnavailable(format!("stream read failed: {}", e))
        })?;
        if n == 0 {
            return Err(SurveyError::TelemetryUnavailable(
                "stream closed by peer".to_string(),
            ));
        }

        let chunk = String::from_utf8_lossy(&buf[..n]);
        debug!("Telemetry chunk: {} bytes", n);

        let sentence = nmea::find_fix_sentence(&chunk).ok_or_else(|| {
            SurveyError::TelemetryParse(format!("no fix sentence in {}-byte chunk", n))
        })?;
        nmea::parse_gga(sentence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GGA: &[u8] =
        b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";

    #[tokio::test]
    async fn test_next_fix_parses_gga_chunk() {
        let stream = tokio_test::io::Builder::new().read(GGA).build();
        let mut source = TelemetrySource::from_stream(stream);

        let fix = source.next_fix().await.unwrap();
        assert!((fix.latitude - 48.1173).abs() < 1e-4);
        assert_eq!(fix.satellites, 8);
    }

    #[tokio::test]
    async fn test_next_fix_skips_non_positional_sentences() {
        let chunk = b"$GPGSV,3,1,11,03,03,111,00*74\r\n\
                      $GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
        let stream = tokio_test::io::Builder::new().read(chunk).build();
        let mut source = TelemetrySource::from_stream(stream);

        let fix = source.next_fix().await.unwrap();
        assert_eq!(fix.quality, 1);
    }

    #[tokio::test]
    async fn test_next_fix_without_gga_is_parse_error() {
        let chunk = b"$GPGSV,3,1,11,03,03,111,00*74\r\n$GPRMC,123519,V*22\r\n";
        let stream = tokio_test::io::Builder::new().read(chunk).build();
        let mut source = TelemetrySource::from_stream(stream);

        let err = source.next_fix().await.unwrap_err();
        assert!(matches!(err, SurveyError::TelemetryParse(_)));
    }

    #[tokio::test]
    async fn test_next_fix_consumes_one_chunk_per_call() {
        let second = b"$GPGGA,123520,4807.100,N,01131.100,E,1,09,0.9,550.0,M,46.9,M,,*47\r\n";
        let stream = tokio_test::io::Builder::new().read(GGA).read(second).build();
        let mut source = TelemetrySource::from_stream(stream);

        let first = source.next_fix().await.unwrap();
        let next = source.next_fix().await.unwrap();
        assert_eq!(first.satellites, 8);
        assert_eq!(next.satellites, 9);
    }

    #[tokio::test]
    async fn test_closed_stream_is_unavailable() {
        let stream = tokio_test::io::Builder::new().build();
        let mut source = TelemetrySource::from_stream(stream);

        let err = source.next_fix().await.unwrap_err();
        assert!(matches!(err, SurveyError::TelemetryUnavailable(_)));
    }
}
