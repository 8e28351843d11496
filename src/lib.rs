//! # MSP Telemetry Library
//!
//! Read attitude and battery telemetry from a flight controller over the
//! MultiWii Serial Protocol (MSP v1).
//!
//! This library provides the protocol engine (frame encoding, checksum,
//! response decoding, command registry) and a request/response client that
//! drives a serial or TCP link.

pub mod config;
pub mod error;
pub mod msp;
pub mod client;
pub mod serial;
pub mod telemetry;
