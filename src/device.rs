//! spidev device handle
//!
//! Wraps a `/dev/spidevX.Y` character device: opens it, applies the bus
//! parameters via ioctl, and issues synchronous full-duplex transfers.
//! Every parameter is written and then read back, since the driver may
//! coerce requested values; transfers use the applied values.

use crate::config::BusConfig;
use crate::error::{Error, Result};

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_read;
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    // Generate ioctl functions
    ioctl_read!(spi_ioc_rd_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_read!(
        spi_ioc_rd_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_read!(
        spi_ioc_rd_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of spi_ioc_transfer struct (for 64-bit systems)
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    ///
    /// SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])
    /// where _IOC(dir, type, nr, size) = (dir << 30) | (size << 16) | (type << 8) | nr
    /// and _IOC_WRITE = 1.
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// One synchronous full-duplex exchange
///
/// The returned receive buffer always has the same length as `tx`.
pub trait DuplexTransfer {
    fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>>;
}

/// Open spidev handle carrying the applied bus parameters
///
/// Opened and configured once; the kernel closes the descriptor when the
/// handle is dropped.
pub struct SpiDevice {
    file: File,
    speed_hz: u32,
    delay_us: u16,
    bits_per_word: u8,
}

impl SpiDevice {
    /// Open the device and apply the bus configuration
    pub fn open(config: &BusConfig) -> Result<Self> {
        log::debug!("Opening {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| Error::DeviceOpen {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        let mut mode = config.mode.bits();
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| property_error("spi mode", e))?;
            ioctl::spi_ioc_rd_mode(fd, &mut mode).map_err(|e| property_error("spi mode", e))?;
        }

        let mut bits = config.bits_per_word;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits)
                .map_err(|e| property_error("bits per word", e))?;
            ioctl::spi_ioc_rd_bits_per_word(fd, &mut bits)
                .map_err(|e| property_error("bits per word", e))?;
        }

        let mut speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed)
                .map_err(|e| property_error("max speed hz", e))?;
            ioctl::spi_ioc_rd_max_speed_hz(fd, &mut speed)
                .map_err(|e| property_error("max speed hz", e))?;
        }

        log::info!("spi mode: {}", mode);
        log::info!("bits per word: {}", bits);
        log::info!("max speed: {} Hz ({} kHz)", speed, speed / 1000);

        Ok(Self {
            file,
            speed_hz: speed,
            delay_us: config.delay_us,
            bits_per_word: bits,
        })
    }
}

impl DuplexTransfer for SpiDevice {
    fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>> {
        let mut rx = vec![0u8; tx.len()];

        let transfer = SpiIocTransfer {
            tx_buf: tx.as_ptr() as u64,
            rx_buf: rx.as_mut_ptr() as u64,
            len: tx.len() as u32,
            speed_hz: self.speed_hz,
            delay_usecs: self.delay_us,
            bits_per_word: self.bits_per_word,
            ..Default::default()
        };

        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                ioctl::spi_ioc_message(1),
                &transfer,
            )
        };

        if ret < 0 {
            return Err(Error::Transfer(std::io::Error::last_os_error()));
        }
        // The kernel reports the byte count it actually clocked; anything
        // short of the request means the bus state is unknown.
        if (ret as usize) < tx.len() {
            return Err(Error::ShortTransfer {
                requested: tx.len(),
                transferred: ret as usize,
            });
        }

        Ok(rx)
    }
}

fn property_error(property: &'static str, errno: nix::errno::Errno) -> Error {
    Error::DeviceProperty {
        property,
        source: std::io::Error::from_raw_os_error(errno as i32),
    }
}
