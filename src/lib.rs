//! Peripheral drivers used inside the motor-controller firmware.
//!
//! - [`EncoderLink`] samples a 16-bit magnetic angle sensor over SPI and applies its
//!   on-chip filter configuration once at startup.
//! - [`I2cReader`] reads a register block from an I2C slave as a polled state machine,
//!   so the control loop never blocks on the bus.
#![no_std]

#[macro_use]
mod log;

mod error;

pub mod config;
pub mod encoder;
pub mod i2c_reader;
pub mod interface;
pub mod params;
pub mod registers;

pub use crate::config::{Config, SpiSettings};
pub use crate::encoder::{EncoderLink, FilterReport};
pub use crate::error::{Error, Result};
pub use crate::i2c_reader::{I2cReader, Phase, ReadStatus};
pub use crate::params::FilterTimeConstant;
