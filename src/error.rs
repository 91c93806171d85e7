//! Our error types for the Cotek PSUs.

use thiserror::Error;

pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Custom error type for Cotek PSU communications.
///
/// `E` is the error type of the underlying [`BusTransport`](crate::bus::BusTransport).
#[derive(Error, Debug)]
pub enum Error<E> {
    /// The bus transport failed to complete a transaction. Passed through untouched.
    #[error("Bus transaction error")]
    Bus(E),
    /// The bus lock could not be acquired.
    #[error("Bus is locked by another user")]
    BusBusy,
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Range error: {0}")]
    Range(#[from] RangeError),
    /// The device set its command error bit after a commit.
    ///
    /// The write transactions themselves succeeded; the device refused to apply them.
    #[error("Command rejected by the device")]
    CommandRejected,
}

impl<E> Error<E> {
    /// True for [`Error::CommandRejected`], the one soft failure a caller can recover from
    /// by adjusting what it asked for.
    pub fn is_command_rejected(&self) -> bool {
        matches!(self, Error::CommandRejected)
    }
}

/// A byte span could not be interpreted by its codec.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected {expected} bytes, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
    #[error("malformed date of manufacture")]
    MalformedDate,
}

/// A value does not fit the field it is meant for.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RangeError {
    #[error("{value} is outside 0..={max}")]
    OutOfRange { value: f32, max: f32 },
    #[error("value is not a number")]
    NotANumber,
    #[error("device index {0} is outside 0..=15")]
    DeviceIndex(u8),
}
