//! # LoRa Survey Library
//!
//! Field-survey a LoRaWAN end device over its AT command link.
//!
//! This library provides the core functionality for driving a join/transmit
//! test run: the serial command/response link to the end device, the GPS
//! telemetry client, the per-packet CSV recorder, and the control loop that
//! ties one positional fix to each sequenced uplink and its measured RSSI.

pub mod config;
pub mod error;
pub mod at;
pub mod device;
pub mod telemetry;
pub mod recorder;
pub mod runner;
