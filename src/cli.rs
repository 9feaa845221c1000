//! CLI argument parsing

use crate::config::{BusConfig, SpiMode, TxSource, MAX_FRAME_LEN};
use crate::error::{Error, Result};
use crate::source::DEFAULT_TX_DATA;

use clap::Parser;
use std::path::PathBuf;

/// Parse one transmit byte given as hex (0xNN) or decimal
fn parse_tx_byte(s: &str) -> std::result::Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex byte: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid byte: {}", e))
    }
}

#[derive(Parser, Debug)]
#[command(name = "spixfer")]
#[command(author, version, about = "Full-duplex SPI transfer tool for spidev devices", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Device to use
    #[arg(short = 'D', long, default_value = "/dev/spidev1.0")]
    pub device: String,

    /// Max clock speed (Hz)
    #[arg(short, long, default_value_t = 1_000_000)]
    pub speed: u32,

    /// Per-transfer delay (usec)
    #[arg(short, long, default_value_t = 20)]
    pub delay: u16,

    /// Bits per word
    #[arg(short, long, default_value_t = 8)]
    pub bpw: u8,

    /// Loopback mode
    #[arg(short = 'l', long = "loop")]
    pub loopback: bool,

    /// Clock phase
    #[arg(short = 'H', long)]
    pub cpha: bool,

    /// Clock polarity
    #[arg(short = 'O', long)]
    pub cpol: bool,

    /// Least significant bit first
    #[arg(short = 'L', long)]
    pub lsb: bool,

    /// Chip select active high
    #[arg(short = 'C', long = "cs-high")]
    pub cs_high: bool,

    /// SI/SO signals shared
    #[arg(short = '3', long = "3wire")]
    pub three_wire: bool,

    /// No chip select
    #[arg(short = 'N', long = "no-cs")]
    pub no_cs: bool,

    /// Slave pulls low to pause
    #[arg(short = 'R', long)]
    pub ready: bool,

    /// Number of times to repeat the transmission
    #[arg(short, long, default_value_t = 1)]
    pub repeat: u32,

    /// Interval between transfers (ms)
    #[arg(short, long, default_value_t = 10)]
    pub interval: u32,

    /// Read transmit frames from a file, one hex line per frame
    #[arg(short, long, conflicts_with = "xdata")]
    pub file: Option<PathBuf>,

    /// Transmit bytes, hex (0xNN) or decimal
    #[arg(short = 'X', long, num_args = 1.., value_parser = parse_tx_byte)]
    pub xdata: Vec<u8>,
}

impl Cli {
    /// Build the immutable run configuration
    pub fn into_config(self) -> Result<BusConfig> {
        let mut mode = SpiMode::empty();
        mode.set(SpiMode::LOOP, self.loopback);
        mode.set(SpiMode::CPHA, self.cpha);
        mode.set(SpiMode::CPOL, self.cpol);
        mode.set(SpiMode::LSB_FIRST, self.lsb);
        mode.set(SpiMode::CS_HIGH, self.cs_high);
        mode.set(SpiMode::THREE_WIRE, self.three_wire);
        mode.set(SpiMode::NO_CS, self.no_cs);
        mode.set(SpiMode::READY, self.ready);

        let source = if let Some(path) = self.file {
            TxSource::File(path)
        } else if !self.xdata.is_empty() {
            if self.xdata.len() > MAX_FRAME_LEN {
                return Err(Error::BufferTooSmall {
                    needed: self.xdata.len(),
                    capacity: MAX_FRAME_LEN,
                });
            }
            TxSource::Literal(self.xdata)
        } else {
            TxSource::Literal(DEFAULT_TX_DATA.to_vec())
        };

        Ok(BusConfig {
            device: self.device,
            mode,
            bits_per_word: self.bpw,
            speed_hz: self.speed,
            delay_us: self.delay,
            interval_ms: self.interval,
            repeat: self.repeat,
            source,
        })
    }
}
