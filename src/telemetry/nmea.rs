//! # NMEA 0183 Positional Sentences
//!
//! Parses GGA fix sentences out of the raw text the GPS bridge streams.
//!
//! Only the GGA (global positioning fix data) sentence type is consumed;
//! everything else in a chunk is ignored. Checksums are carried by the
//! sentences but not enforced, matching the tolerant bridges this tool is
//! pointed at.

use chrono::{DateTime, Local};

use crate::error::{Result, SurveyError};

/// Sentence type carrying the positional fix
const FIX_SENTENCE_TYPE: &str = "GGA";

/// One parsed GPS reading.
///
/// Immutable once parsed; produced here, consumed exactly once per packet
/// cycle by the control loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    /// Latitude in decimal degrees (south negative)
    pub latitude: f64,

    /// Longitude in decimal degrees (west negative)
    pub longitude: f64,

    /// Altitude above mean sea level in meters
    pub altitude: f64,

    /// GPS fix quality code (0 = invalid, 1 = GPS fix, 2 = DGPS, ...)
    pub quality: u8,

    /// Number of satellites in use
    pub satellites: u32,

    /// Wall-clock time the fix was parsed
    pub timestamp: DateTime<Local>,
}

/// Select the first positional-fix sentence from a chunk of stream text.
///
/// A chunk is split on line boundaries; a line qualifies when it is a
/// `$`-led sentence whose type field is GGA, from any talker (GP, GN, ...).
pub fn find_fix_sentence(chunk: &str) -> Option<&str> {
    chunk
        .lines()
        .map(str::trim)
        .find(|line| is_fix_sentence(line))
}

fn is_fix_sentence(line: &str) -> bool {
    let Some(body) = line.strip_prefix('$') else {
        return false;
    };
    let header = body.split(',').next().unwrap_or("");
    // two-character talker id followed by the sentence type
    header.len() >= 5 && header.ends_with(FIX_SENTENCE_TYPE)
}

/// Parse a GGA sentence into a [`PositionFix`].
///
/// GGA field layout after the header: UTC time, latitude (ddmm.mmmm),
/// N/S, longitude (dddmm.mmmm), E/W, quality, satellite count, HDOP,
/// altitude, altitude unit, ...
///
/// # Errors
///
/// Returns [`SurveyError::TelemetryParse`] if the sentence is truncated or
/// any coordinate field fails to parse (a receiver without a fix streams
/// GGA sentences with empty coordinate fields).
pub fn parse_gga(sentence: &str) -> Result<PositionFix> {
    let trimmed = sentence.trim();
    let body = trimmed.strip_prefix('$').unwrap_or(trimmed);
    // drop the checksum tail; it is not verified
    let body = body.split('*').next().unwrap_or(body);

    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() < 10 {
        return Err(SurveyError::TelemetryParse(format!(
            "GGA sentence has {} fields, expected at least 10",
            fields.len()
        )));
    }

    let latitude = parse_coordinate(fields[2], fields[3], "latitude")?;
    let longitude = parse_coordinate(fields[4], fields[5], "longitude")?;
    let quality = fields[6]
        .parse::<u8>()
        .map_err(|_| bad_field("quality", fields[6]))?;
    let satellites = fields[7]
        .parse::<u32>()
        .map_err(|_| bad_field("satellite count", fields[7]))?;
    let altitude = fields[9]
        .parse::<f64>()
        .map_err(|_| bad_field("altitude", fields[9]))?;

    Ok(PositionFix {
        latitude,
        longitude,
        altitude,
        quality,
        satellites,
        timestamp: Local::now(),
    })
}

/// Convert an NMEA ddmm.mmmm / dddmm.mmmm coordinate plus hemisphere
/// letter into signed decimal degrees
fn parse_coordinate(value: &str, hemisphere: &str, what: &str) -> Result<f64> {
    let raw = value
        .parse::<f64>()
        .map_err(|_| bad_field(what, value))?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;

    match hemisphere {
        "N" | "E" => Ok(decimal),
        "S" | "W" => Ok(-decimal),
        other => Err(bad_field(&format!("{what} hemisphere"), other)),
    }
}

fn bad_field(what: &str, value: &str) -> SurveyError {
    SurveyError::TelemetryParse(format!("unparseable {what} field: {value:?}"))
}
