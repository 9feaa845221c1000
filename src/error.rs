//! Error types for spixfer

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run
///
/// Every error here is fatal: nothing is retried or downgraded to a warning,
/// so the operator never sees a bus state the tool did not actually apply.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to open the spidev device
    #[error("Failed to open {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to set or read back a bus parameter
    #[error("Failed to apply {property}: {source}")]
    DeviceProperty {
        property: &'static str,
        #[source]
        source: io::Error,
    },

    /// SPI transfer failed
    #[error("SPI transfer failed: {0}")]
    Transfer(#[source] io::Error),

    /// The kernel acknowledged fewer bytes than requested
    #[error("Short SPI transfer: {transferred} of {requested} bytes")]
    ShortTransfer {
        requested: usize,
        transferred: usize,
    },

    /// Hex input contained something other than a hex digit or space
    #[error("Unknown character ({code:#04x}|{ch}) in hex input")]
    MalformedHex { ch: char, code: u32 },

    /// Decoded hex would not fit the output buffer
    #[error("Hex data too long: needs {needed} bytes, buffer holds {capacity}")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// Transfer frame with no bytes
    #[error("Empty transfer frame")]
    EmptyFrame,

    /// Config file line reached the line buffer capacity
    #[error("Config file line exceeds {max} bytes")]
    LineTooLong { max: usize },

    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for spixfer operations
pub type Result<T> = std::result::Result<T, Error>;
