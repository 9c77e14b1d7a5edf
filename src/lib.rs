#![cfg_attr(not(test), no_std)]
// src/lib.rs

//! RC522 card reader driver for an attendance kiosk: REQUEST, anti-collision
//! and SELECT over SPI, yielding the 4-byte identifier of a tapped tag.
//!
//! The driver owns the bus and both control lines for its whole lifetime and
//! does no locking. If the bus is shared, the caller serializes access.

pub mod card_types;
pub mod commands;
pub mod config;
pub mod cs_pin_wrapper;
pub mod diagnostics;
pub mod errors;
pub mod registers;
pub mod rfid_rc522;

#[cfg(test)]
mod mock;

pub use card_types::{Card, CardType, Uid};
pub use commands::{AuthKey, Command, RequestMode};
pub use config::{AntennaGain, Config};
pub use diagnostics::{Diagnostics, NoLog};
pub use errors::{Error, InitError, Status, TransportFault};
pub use rfid_rc522::{CardReader, Response, KNOWN_VERSIONS};
