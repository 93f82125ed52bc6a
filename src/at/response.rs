//! # AT Response Parsing
//!
//! Decodes the device's free-form response text into the tokens the link
//! state machine needs.
//!
//! The device interleaves echo, URCs and banner noise with the values we
//! ask for, so parsing is a token scan rather than a line grammar:
//! [`parse_integers`] extracts every integer in document order, and the
//! interpretation layer decides whether the resulting sequence is usable.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, SurveyError};

static INT_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+").unwrap());

/// Extract all integer tokens (including negatives) from raw response text,
/// in document order.
///
/// Empty or token-free input yields an empty vector, never an error; callers
/// decide what an empty scan means for their query.
///
/// # Examples
///
/// ```
/// use lora_survey::at::response::parse_integers;
///
/// assert_eq!(parse_integers("-42\n-50\n-30\n-45"), vec![-42, -50, -30, -45]);
/// assert_eq!(parse_integers("OK"), Vec::<i64>::new());
/// ```
pub fn parse_integers(text: &str) -> Vec<i64> {
    INT_TOKEN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<i64>().ok())
        .collect()
}

/// Interpret a join-status response: first integer token `0` → not joined,
/// `1` → joined.
///
/// # Errors
///
/// Returns [`SurveyError::ProtocolParse`] if the response carries no integer
/// token, or a first token outside `{0, 1}`. Without a trustworthy join
/// status the run cannot safely continue.
pub fn parse_join_status(text: &str) -> Result<bool> {
    let tokens = parse_integers(text);
    match tokens.first() {
        Some(&0) => Ok(false),
        Some(&1) => Ok(true),
        Some(&other) => Err(SurveyError::ProtocolParse(format!(
            "join status token out of range: {other}"
        ))),
        None => Err(SurveyError::ProtocolParse(format!(
            "no join status token in response: {text:?}"
        ))),
    }
}

/// Interpret a signal-quality response: the first integer token is the RSSI
/// of the most recently received downlink since the last device reset.
///
/// # Errors
///
/// Returns [`SurveyError::ProtocolParse`] if the response carries no integer
/// token.
pub fn parse_rssi(text: &str) -> Result<i32> {
    let tokens = parse_integers(text);
    match tokens.first() {
        Some(&value) => i32::try_from(value).map_err(|_| {
            SurveyError::ProtocolParse(format!("RSSI token out of range: {value}"))
        }),
        None => Err(SurveyError::ProtocolParse(format!(
            "no RSSI token in response: {text:?}"
        ))),
    }
}
