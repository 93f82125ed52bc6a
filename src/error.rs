//! # Error Types
//!
//! Custom error types for LoRa Survey using `thiserror`.
//!
//! The control loop inspects the variant to decide between
//! retry-once-then-fatal ([`SurveyError::TransportUnavailable`] mid-cycle)
//! and immediately-fatal (everything else).

use thiserror::Error;

/// Main error type for LoRa Survey
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Serial transport cannot be opened, or faulted mid-command
    #[error("serial transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Device response lacks the expected token shape
    #[error("malformed device response: {0}")]
    ProtocolParse(String),

    /// Telemetry socket connection refused or dropped
    #[error("telemetry stream unavailable: {0}")]
    TelemetryUnavailable(String),

    /// No usable positional sentence in a telemetry chunk
    #[error("no positional fix in telemetry chunk: {0}")]
    TelemetryParse(String),

    /// Device never confirmed a network join within the poll budget
    #[error("device did not join the network after {0} status polls")]
    JoinTimeout(u32),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for LoRa Survey
pub type Result<T> = std::result::Result<T, SurveyError>;
