//! # AT Command Protocol Module
//!
//! Implementation of the end device's line-oriented AT command protocol.
//!
//! This module handles:
//! - Command line formatting (join, join status, uplink send, RSSI query)
//! - Response token extraction (integer scan over raw response text)
//! - Join status and RSSI interpretation

pub mod commands;
pub mod response;
