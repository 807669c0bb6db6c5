//! Bus abstractions required by the drivers.

pub mod spi;

use crate::config::SpiSettings;
use crate::registers::{Cr2, Icr, Isr};

/// Word-oriented, full-duplex SPI access used by the encoder link.
pub trait EncoderBus {
    /// Error type produced by the concrete bus implementation.
    type Error;

    /// Applies clock frequency and mode.
    fn configure(&mut self, settings: &SpiSettings) -> core::result::Result<(), Self::Error>;

    /// Shifts `word` out and returns the word shifted in, blocking until done.
    fn transfer(&mut self, word: u16) -> core::result::Result<u16, Self::Error>;

    /// Begins a transfer of `word` without waiting for the response.
    fn start_transfer(&mut self, word: u16) -> core::result::Result<(), Self::Error>;

    /// Waits for the transfer begun by [`start_transfer`](Self::start_transfer) and
    /// returns the word shifted in.
    fn finish_transfer(&mut self) -> core::result::Result<u16, Self::Error>;
}

/// Direct register access to an I2C bus controller.
///
/// Implementations wrap the memory-mapped peripheral. Accesses cannot fail; protocol
/// errors show up as status flags.
pub trait I2cController {
    /// Programs the bus timing register.
    ///
    /// The peripheral must be disabled while `TIMINGR` changes and re-enabled after.
    fn set_timing(&mut self, timing: u32);

    /// Reads the `CR2` control register.
    fn read_cr2(&mut self) -> Cr2;

    /// Writes the `CR2` control register.
    fn write_cr2(&mut self, value: Cr2);

    /// Reads the `ISR` status register.
    fn read_isr(&mut self) -> Isr;

    /// Writes the `ICR` flag-clear register.
    fn write_icr(&mut self, value: Icr);

    /// Writes the next outgoing byte.
    fn write_txdr(&mut self, byte: u8);

    /// Reads the last received byte.
    fn read_rxdr(&mut self) -> u8;
}
