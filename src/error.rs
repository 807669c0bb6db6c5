//! Error handling primitives for the peripheral drivers.

/// Crate-wide result type alias.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error variants produced by the encoder driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Any error reported by the underlying bus interface.
    Interface(E),
    /// The filter register read back a different code than the one just written.
    ///
    /// Only produced by the startup filter sequence; firmware should halt on it.
    FilterMismatch {
        /// Code written to the filter register.
        expected: u8,
        /// Code observed in the verification read.
        actual: u8,
    },
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Interface(err)
    }
}
