//! # AT Command Builders
//!
//! Formats the command lines the end device understands.

/// Network join request. The device acknowledges asynchronously; join
/// completion is confirmed via [`JOIN_STATUS_QUERY`].
pub const JOIN: &str = "AT+JOIN";

/// Join status query, answered with a `0` (not joined) or `1` (joined) token
pub const JOIN_STATUS_QUERY: &str = "AT+NJS?";

/// Signal-quality query, answered with the RSSI values seen since the last
/// device reset (last, min, max, avg)
pub const RSSI_QUERY: &str = "AT+RSSI";

/// Line ending terminating every command on the wire
pub const LINE_ENDING: &str = "\r\n";

/// Format an uplink-transmit command carrying the packet's sequence id
///
/// # Examples
///
/// ```
/// use lora_survey::at::commands::uplink;
///
/// assert_eq!(uplink(7), "AT+SEND=7");
/// ```
pub fn uplink(sequence_id: u32) -> String {
    format!("AT+SEND={sequence_id}")
}
