//! SPI link to the magnetic angle sensor.
//!
//! Steady-state sampling is a single full-duplex word transfer and never waits on a
//! timer. The filter configuration sequence blocks for tens of milliseconds and is
//! meant to run once, before the control loop starts.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiBus;

use crate::config::SpiSettings;
use crate::error::{Error, Result};
use crate::interface::EncoderBus;
use crate::interface::spi::SpiInterface;
use crate::params::FilterTimeConstant;
use crate::registers::{EncoderCommand, REG_FILTER, RegisterResponse};

// Sensor turnaround between a register read command and the word carrying its value.
const REGISTER_READ_TURNAROUND_US: u32 = 2;
// Sensor commit time after a register write.
const REGISTER_COMMIT_DELAY_MS: u32 = 20;

/// Synchronous driver for the angle sensor.
pub struct EncoderLink<BUS> {
    bus: BUS,
}

/// Outcome of [`EncoderLink::set_filter_us`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterReport {
    /// Raw filter code found in the sensor before the call.
    pub previous: u8,
    /// Setting now active in the sensor.
    pub applied: FilterTimeConstant,
    /// Whether a write cycle was needed.
    pub written: bool,
}

impl<BUS> EncoderLink<BUS> {
    // ==================================================================
    // == Driver Ownership ==============================================
    // ==================================================================
    /// Consumes the driver and returns the owned bus.
    pub fn release(self) -> BUS {
        self.bus
    }

    /// Provides mutable access to the underlying bus.
    pub fn bus_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }
}

impl<SPI> EncoderLink<SpiInterface<SPI>>
where
    SPI: SpiBus<u16>,
{
    /// Convenience constructor for `embedded-hal` SPI buses.
    pub fn new_spi(spi: SPI) -> Result<Self, SPI::Error> {
        Self::new(SpiInterface::new(spi))
    }

    /// Releases the driver, returning the SPI bus.
    pub fn release_spi(self) -> SPI {
        self.release().release()
    }
}

impl<BUS, CommE> EncoderLink<BUS>
where
    BUS: EncoderBus<Error = CommE>,
{
    /// Creates the driver and reclocks the bus to [`SpiSettings::ENCODER`].
    pub fn new(mut bus: BUS) -> Result<Self, CommE> {
        bus.configure(&SpiSettings::ENCODER)?;
        Ok(Self { bus })
    }

    // ==================================================================
    // == Sampling ======================================================
    // ==================================================================
    /// Reads the current 16-bit angle word.
    #[inline]
    pub fn sample(&mut self) -> Result<u16, CommE> {
        self.bus
            .transfer(EncoderCommand::angle().into())
            .map_err(Error::from)
    }

    /// Begins an angle read so the transfer can overlap other work.
    ///
    /// Overlap needs a bus with a native split transfer. [`SpiInterface`] runs the
    /// whole blocking transfer here and only flushes in
    /// [`finish_sample`](Self::finish_sample).
    ///
    /// Must be paired with exactly one [`finish_sample`](Self::finish_sample) before the
    /// next sample of either kind.
    #[inline]
    pub fn start_sample(&mut self) -> Result<(), CommE> {
        self.bus
            .start_transfer(EncoderCommand::angle().into())
            .map_err(Error::from)
    }

    /// Completes the read begun by [`start_sample`](Self::start_sample).
    #[inline]
    pub fn finish_sample(&mut self) -> Result<u16, CommE> {
        self.bus.finish_transfer().map_err(Error::from)
    }

    // ==================================================================
    // == Startup Configuration =========================================
    // ==================================================================
    /// Reads the raw filter code currently stored in the sensor.
    pub fn read_filter(&mut self, delay: &mut impl DelayNs) -> Result<u8, CommE> {
        self.bus.transfer(EncoderCommand::read(REG_FILTER).into())?;
        delay.delay_us(REGISTER_READ_TURNAROUND_US);

        let current = self.bus.transfer(EncoderCommand::angle().into())?;
        Ok(RegisterResponse::from(current).value())
    }

    /// Applies the low-pass filter setting closest to `filter_us`, if it differs.
    ///
    /// Blocks for the sensor commit time when a write is needed, so call it only during
    /// startup. A failed read-back returns [`Error::FilterMismatch`], which firmware
    /// should treat as fatal.
    pub fn set_filter_us(
        &mut self,
        filter_us: u16,
        delay: &mut impl DelayNs,
    ) -> Result<FilterReport, CommE> {
        let previous = self.read_filter(delay)?;
        let desired = FilterTimeConstant::from_us(filter_us);

        if previous == desired.code() {
            debug!("encoder filter already {}", desired.code());
            return Ok(FilterReport {
                previous,
                applied: desired,
                written: false,
            });
        }

        info!("encoder filter {} -> {}", previous, desired.code());
        self.bus
            .transfer(EncoderCommand::write(REG_FILTER, desired.code()).into())?;
        delay.delay_ms(REGISTER_COMMIT_DELAY_MS);

        let readback = self.bus.transfer(EncoderCommand::angle().into())?;
        let actual = RegisterResponse::from(readback).value();
        if actual != desired.code() {
            error!(
                "encoder filter verify failed: wrote {}, read {}",
                desired.code(),
                actual
            );
            return Err(Error::FilterMismatch {
                expected: desired.code(),
                actual,
            });
        }

        Ok(FilterReport {
            previous,
            applied: desired,
            written: true,
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{EncoderLink, FilterReport};
    use crate::config::SpiSettings;
    use crate::error::Error;
    use crate::interface::EncoderBus;
    use crate::params::FilterTimeConstant;
    use crate::registers::{EncoderCommand, Opcode};
    use core::convert::Infallible;
    use embedded_hal::delay::DelayNs;
    use std::vec::Vec;

    /// Register-level model of the sensor: every word returns the response queued by
    /// the previous one.
    struct FakeSensor {
        filter: u8,
        angle: u16,
        next: u16,
        commits: bool,
        writes: usize,
        words: Vec<u16>,
        settings: Option<SpiSettings>,
        latched: u16,
    }

    impl FakeSensor {
        fn new(filter: u8, angle: u16) -> Self {
            Self {
                filter,
                angle,
                next: angle,
                commits: true,
                writes: 0,
                words: Vec::new(),
                settings: None,
                latched: 0,
            }
        }

        fn shift(&mut self, word: u16) -> u16 {
            self.words.push(word);
            let out = self.next;
            let command = EncoderCommand::from(word);
            self.next = match command.opcode() {
                Opcode::Angle => self.angle,
                Opcode::ReadRegister => u16::from(self.filter) << 8,
                Opcode::WriteRegister => {
                    self.writes += 1;
                    if self.commits {
                        self.filter = command.value();
                    }
                    u16::from(self.filter) << 8
                }
            };
            out
        }
    }

    impl EncoderBus for FakeSensor {
        type Error = Infallible;

        fn configure(&mut self, settings: &SpiSettings) -> Result<(), Self::Error> {
            self.settings = Some(*settings);
            Ok(())
        }

        fn transfer(&mut self, word: u16) -> Result<u16, Self::Error> {
            Ok(self.shift(word))
        }

        fn start_transfer(&mut self, word: u16) -> Result<(), Self::Error> {
            self.latched = self.shift(word);
            Ok(())
        }

        fn finish_transfer(&mut self) -> Result<u16, Self::Error> {
            Ok(self.latched)
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        total_ns: u64,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    #[test]
    fn new_reclocks_the_bus() {
        let link = EncoderLink::new(FakeSensor::new(119, 0)).unwrap();
        assert_eq!(link.release().settings, Some(SpiSettings::ENCODER));
    }

    #[test]
    fn sample_returns_the_angle_word() {
        let mut link = EncoderLink::new(FakeSensor::new(119, 0x3A7F)).unwrap();

        assert_eq!(link.sample().unwrap(), 0x3A7F);
        assert_eq!(link.sample().unwrap(), 0x3A7F);
        assert_eq!(link.bus_mut().words, [0x0000, 0x0000]);
    }

    #[test]
    fn split_sample_returns_the_angle_word() {
        let mut link = EncoderLink::new(FakeSensor::new(119, 0x0123)).unwrap();

        link.start_sample().unwrap();
        assert_eq!(link.finish_sample().unwrap(), 0x0123);
    }

    #[test]
    fn set_filter_writes_then_verifies() {
        let mut link = EncoderLink::new(FakeSensor::new(119, 0)).unwrap();
        let mut delay = RecordingDelay::default();

        let report = link.set_filter_us(100, &mut delay).unwrap();

        assert_eq!(
            report,
            FilterReport {
                previous: 119,
                applied: FilterTimeConstant::Us128,
                written: true,
            }
        );
        let sensor = link.release();
        assert_eq!(sensor.filter, 68);
        assert_eq!(sensor.words, [0x4E00, 0x0000, 0x8E44, 0x0000]);
        assert_eq!(delay.total_ns, 2_000 + 20_000_000);
    }

    #[test]
    fn set_filter_skips_write_when_already_applied() {
        let mut link = EncoderLink::new(FakeSensor::new(119, 0)).unwrap();
        let mut delay = RecordingDelay::default();

        let report = link.set_filter_us(1000, &mut delay).unwrap();

        assert!(!report.written);
        assert_eq!(report.applied, FilterTimeConstant::Us1024);
        let sensor = link.release();
        assert_eq!(sensor.writes, 0);
        assert_eq!(sensor.words, [0x4E00, 0x0000]);
        assert_eq!(delay.total_ns, 2_000);
    }

    #[test]
    fn set_filter_is_idempotent() {
        let mut link = EncoderLink::new(FakeSensor::new(119, 0)).unwrap();
        let mut delay = RecordingDelay::default();

        assert!(link.set_filter_us(5000, &mut delay).unwrap().written);
        let second = link.set_filter_us(5000, &mut delay).unwrap();

        assert!(!second.written);
        assert_eq!(second.previous, 170);
        assert_eq!(link.release().writes, 1);
    }

    #[test]
    fn set_filter_reports_verification_mismatch() {
        let mut sensor = FakeSensor::new(119, 0);
        sensor.commits = false;
        let mut link = EncoderLink::new(sensor).unwrap();
        let mut delay = RecordingDelay::default();

        let result = link.set_filter_us(64, &mut delay);

        assert_eq!(
            result,
            Err(Error::FilterMismatch {
                expected: 51,
                actual: 119,
            })
        );
    }

    #[test]
    fn set_filter_programs_each_threshold_bucket() {
        let cases: [(u16, u8); 11] = [
            (0, 51),
            (64, 51),
            (65, 68),
            (128, 68),
            (256, 102),
            (1024, 119),
            (2048, 136),
            (4096, 153),
            (8192, 170),
            (16384, 187),
            (20000, 187),
        ];

        for (filter_us, code) in cases {
            // Start from a code no request maps to so every case writes.
            let mut link = EncoderLink::new(FakeSensor::new(0, 0)).unwrap();
            let mut delay = RecordingDelay::default();

            let report = link.set_filter_us(filter_us, &mut delay).unwrap();

            assert_eq!(report.applied.code(), code, "filter_us = {}", filter_us);
            assert_eq!(link.release().filter, code, "filter_us = {}", filter_us);
        }
    }

    #[test]
    fn read_filter_returns_upper_byte() {
        let mut link = EncoderLink::new(FakeSensor::new(153, 0)).unwrap();
        let mut delay = RecordingDelay::default();

        assert_eq!(link.read_filter(&mut delay).unwrap(), 153);
    }
}
