//! # MSP Protocol Module
//!
//! Implementation of the MultiWii Serial Protocol (MSP v1) used by
//! Betaflight/INAV/MultiWii flight controllers.
//!
//! This module handles:
//! - Request frame encoding (`$M<`)
//! - Response frame decoding and validation (`$M>`)
//! - XOR checksum calculation
//! - Command registry with typed payload decoders (attitude, analog)

pub mod protocol;
pub mod checksum;
pub mod encoder;
pub mod decoder;
pub mod registry;
