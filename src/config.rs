//! Per-run bus configuration
//!
//! Built once from the parsed command line and read-only afterwards; no
//! component mutates it.

use bitflags::bitflags;
use std::path::PathBuf;

/// Upper bound on a single transfer frame, in bytes
pub const MAX_FRAME_LEN: usize = 1024;

bitflags! {
    /// SPI mode byte as understood by the spidev driver
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SpiMode: u8 {
        /// Clock phase
        const CPHA = 0x01;
        /// Clock polarity
        const CPOL = 0x02;
        /// Chip select active high
        const CS_HIGH = 0x04;
        /// Least significant bit first
        const LSB_FIRST = 0x08;
        /// SI/SO signals shared
        const THREE_WIRE = 0x10;
        /// Loopback mode
        const LOOP = 0x20;
        /// No chip select
        const NO_CS = 0x40;
        /// Slave pulls low to pause
        const READY = 0x80;
    }
}

/// Where transmit frames come from
#[derive(Debug, Clone)]
pub enum TxSource {
    /// A single in-memory frame: explicit `-X` bytes or the built-in default
    Literal(Vec<u8>),
    /// One hex-encoded frame per line of a config file
    File(PathBuf),
}

/// Immutable configuration for one run
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Device path (e.g. "/dev/spidev1.0")
    pub device: String,
    /// Requested SPI mode bits
    pub mode: SpiMode,
    /// Word size in bits
    pub bits_per_word: u8,
    /// Max clock speed in Hz
    pub speed_hz: u32,
    /// Per-transfer delay in microseconds, applied by the driver
    pub delay_us: u16,
    /// Blocking pause between transfers, in milliseconds
    pub interval_ms: u32,
    /// Number of outer repetitions
    pub repeat: u32,
    /// Transmit data source
    pub source: TxSource,
}
