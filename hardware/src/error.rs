//! Error types for hardware inputs

use thiserror::Error;

/// Errors raised by a digital input
#[derive(Debug, Error)]
pub enum InputError {
    #[cfg(feature = "rpi")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// The input cannot deliver events any more
    #[error("Input unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a tag reader
#[derive(Debug, Error)]
pub enum ReaderError {
    #[cfg(feature = "rpi")]
    #[error("SPI error: {0}")]
    Spi(#[from] rppal::spi::Error),

    #[cfg(feature = "rpi")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    /// The card answered but the frame was malformed
    #[error("Reader protocol error: {0}")]
    Protocol(String),

    /// The reader cannot deliver tags any more
    #[error("Reader unavailable: {0}")]
    Unavailable(String),
}
