//! Encoder bus implementation built on top of `embedded-hal` `SpiBus<u16>`.

use embedded_hal::spi::SpiBus;

use super::EncoderBus;
use crate::config::SpiSettings;

/// SPI-based bus implementation for the encoder link.
///
/// `embedded-hal` buses cannot be reclocked through the trait, so the requested
/// [`SpiSettings`] are recorded for the board layer to apply via [`settings`](Self::settings).
pub struct SpiInterface<SPI> {
    spi: SPI,
    settings: Option<SpiSettings>,
    response: u16,
}

impl<SPI> SpiInterface<SPI> {
    /// Creates a new interface from the provided SPI bus.
    pub const fn new(spi: SPI) -> Self {
        Self {
            spi,
            settings: None,
            response: 0,
        }
    }

    /// Settings most recently requested by the driver, if any.
    pub fn settings(&self) -> Option<SpiSettings> {
        self.settings
    }

    /// Provides mutable access to the wrapped SPI bus.
    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }

    /// Consumes the interface and returns the owned SPI bus.
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI> EncoderBus for SpiInterface<SPI>
where
    SPI: SpiBus<u16>,
{
    type Error = SPI::Error;

    fn configure(&mut self, settings: &SpiSettings) -> core::result::Result<(), Self::Error> {
        self.settings = Some(*settings);
        Ok(())
    }

    fn transfer(&mut self, word: u16) -> core::result::Result<u16, Self::Error> {
        let mut frame = [word];
        self.spi.transfer_in_place(&mut frame)?;
        Ok(frame[0])
    }

    fn start_transfer(&mut self, word: u16) -> core::result::Result<(), Self::Error> {
        self.response = self.transfer(word)?;
        Ok(())
    }

    fn finish_transfer(&mut self) -> core::result::Result<u16, Self::Error> {
        self.spi.flush()?;
        Ok(self.response)
    }
}
