//! Configuration primitives for the peripheral drivers.

use embedded_hal::spi::{MODE_0, Mode};

/// Bus settings requested by the encoder link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiSettings {
    /// SCK frequency in hertz.
    pub frequency_hz: u32,
    /// Clock polarity and phase.
    pub mode: Mode,
}

impl SpiSettings {
    /// Settings used for the angle sensor.
    ///
    /// 12 MHz is slightly above the sensor's rated clock, but the next step down on
    /// the controller is 6 MHz and the sample sits on the control-loop critical path.
    pub const ENCODER: Self = Self {
        frequency_hz: 12_000_000,
        mode: MODE_0,
    };
}

/// User-facing configuration for the [`I2cReader`](crate::i2c_reader::I2cReader).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Raw `TIMINGR` value programmed into the controller.
    pub timing: u32,
    /// Number of consecutive `poll` calls without progress before a transaction is
    /// failed. `None` waits forever.
    pub poll_timeout: Option<u32>,
}

impl Config {
    /// `TIMINGR` value for a ~400 kHz bus on the firmware's peripheral clock.
    pub const DEFAULT_TIMING: u32 = 0x10A0_A6FB;

    /// Begins building a [`Config`] using the builder pattern.
    pub fn new() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Checks whether this configuration is usable.
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.poll_timeout == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }
}

/// Builder for [`Config`] allowing piecemeal construction.
#[derive(Debug, Clone, Copy)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder seeded with [`Config::default()`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Overrides the raw bus timing value.
    pub fn timing(mut self, timing: u32) -> Self {
        self.config.timing = timing;
        self
    }

    /// Fails transactions that make no progress for `polls` consecutive calls.
    pub fn poll_timeout(mut self, polls: u32) -> Self {
        self.config.poll_timeout = Some(polls);
        self
    }

    /// Finalizes the builder and returns the [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: Self::DEFAULT_TIMING,
            poll_timeout: None,
        }
    }
}

/// Validation errors generated while verifying a [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A stall timeout of zero polls would fail every transaction on its first poll.
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_starts_from_defaults() {
        let config = Config::new().build();
        assert_eq!(config, Config::default());
        assert_eq!(config.timing, 0x10A0_A6FB);
        assert_eq!(config.poll_timeout, None);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = Config::new().timing(0x1234).poll_timeout(50).build();
        assert_eq!(config.timing, 0x1234);
        assert_eq!(config.poll_timeout, Some(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = Config::new().poll_timeout(0).build();
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn encoder_bus_runs_mode_zero_at_twelve_megahertz() {
        assert_eq!(SpiSettings::ENCODER.frequency_hz, 12_000_000);
        assert_eq!(SpiSettings::ENCODER.mode, MODE_0);
    }
}
