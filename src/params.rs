//! Strongly typed parameter enumerations for the peripheral drivers.
//!
//! These enums map directly to device field encodings. Prefer them over raw
//! integers to keep configuration values valid and explicit.
//!
//! # Examples
//!
//! ```rust
//! use motor_periph::params::FilterTimeConstant;
//!
//! let filter = FilterTimeConstant::from_us(300);
//! assert_eq!(filter, FilterTimeConstant::Us1024);
//! assert_eq!(filter.code(), 119);
//! ```

/// Angle sensor low-pass filter time constant (filter register, upper byte).
///
/// Each variant is named after the largest requested time constant, in microseconds,
/// that maps onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FilterTimeConstant {
    /// Up to 64 µs.
    Us64 = 51,
    /// Up to 128 µs.
    Us128 = 68,
    /// Up to 256 µs.
    Us256 = 102,
    /// Up to 1024 µs. Power-on default of the sensor.
    #[default]
    Us1024 = 119,
    /// Up to 2048 µs.
    Us2048 = 136,
    /// Up to 4096 µs.
    Us4096 = 153,
    /// Up to 8192 µs.
    Us8192 = 170,
    /// 16384 µs; also used for every longer request.
    Us16384 = 187,
}

impl FilterTimeConstant {
    /// All settings ordered by increasing time constant.
    pub const ALL: [Self; 8] = [
        Self::Us64,
        Self::Us128,
        Self::Us256,
        Self::Us1024,
        Self::Us2048,
        Self::Us4096,
        Self::Us8192,
        Self::Us16384,
    ];

    /// Picks the setting for a requested time constant.
    ///
    /// Thresholds are inclusive upper bounds; requests above the largest one saturate.
    pub const fn from_us(filter_us: u16) -> Self {
        match filter_us {
            0..=64 => Self::Us64,
            65..=128 => Self::Us128,
            129..=256 => Self::Us256,
            257..=1024 => Self::Us1024,
            1025..=2048 => Self::Us2048,
            2049..=4096 => Self::Us4096,
            4097..=8192 => Self::Us8192,
            _ => Self::Us16384,
        }
    }

    /// Returns the raw register code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a raw register code, if it is one of the documented settings.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|filter| filter.code() == code)
    }

    /// Returns the inclusive upper bound, in microseconds, that selects this setting.
    pub const fn max_us(self) -> u16 {
        match self {
            Self::Us64 => 64,
            Self::Us128 => 128,
            Self::Us256 => 256,
            Self::Us1024 => 1_024,
            Self::Us2048 => 2_048,
            Self::Us4096 => 4_096,
            Self::Us8192 => 8_192,
            Self::Us16384 => 16_384,
        }
    }
}
