//! Transfer orchestration
//!
//! Runs the configured number of outer repetitions, pulling frames from the
//! source and handing each one to the device for a single full-duplex
//! exchange. Any device or source error aborts the run immediately; nothing
//! is retried.

use crate::config::BusConfig;
use crate::device::DuplexTransfer;
use crate::error::Result;
use crate::hex;
use crate::source::FrameSource;

use std::thread;
use std::time::Duration;

/// Tag identifying one reported transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTag {
    /// Outer repetition index
    pub repetition: u32,
    /// Run-global frame number; file mode only
    pub frame: Option<u64>,
}

/// Run all repetitions, returning the tag of every transfer performed.
///
/// File mode drains the source every repetition, rewinding it to the first
/// line each time; the frame number in the report keeps counting across
/// repetitions. Buffer mode performs exactly one transfer per repetition.
pub fn run<D: DuplexTransfer>(
    config: &BusConfig,
    source: &mut FrameSource,
    device: &mut D,
) -> Result<Vec<TransferTag>> {
    let mut tags = Vec::new();
    // Never reset; carries across repetitions.
    let mut frame_index = 0u64;

    for rep in 0..config.repeat {
        source.rewind();

        if source.is_file_backed() {
            while let Some(frame) = source.next_frame()? {
                println!("\n{}.{}", rep, frame_index);
                let rx = device.exchange(frame.as_bytes())?;
                report(frame.as_bytes(), &rx);
                tags.push(TransferTag {
                    repetition: rep,
                    frame: Some(frame_index),
                });
                frame_index += 1;
                pause_ms(config.interval_ms);
            }
        } else if let Some(frame) = source.next_frame()? {
            println!("\n{}", rep);
            let rx = device.exchange(frame.as_bytes())?;
            report(frame.as_bytes(), &rx);
            tags.push(TransferTag {
                repetition: rep,
                frame: None,
            });
            pause_ms(config.interval_ms);
        }
    }

    Ok(tags)
}

/// One report line, byte-identical to the original tool's output: a trailing
/// space after the last pair and a CR LF terminator.
fn report_line(label: &str, bytes: &[u8]) -> String {
    format!("{}: {} \r\n", label, hex::encode_line(bytes))
}

fn report(tx: &[u8], rx: &[u8]) {
    print!("{}", report_line("TX", tx));
    print!("{}", report_line("RX", rx));
}

fn pause_ms(ms: u32) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SpiMode, TxSource};
    use crate::error::Error;
    use crate::source::DEFAULT_TX_DATA;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Echoes every frame back and records what it was asked to send.
    struct LoopbackDevice {
        sent: Vec<Vec<u8>>,
        fail_after: Option<usize>,
    }

    impl LoopbackDevice {
        fn new() -> Self {
            Self {
                sent: Vec::new(),
                fail_after: None,
            }
        }

        fn failing_after(n: usize) -> Self {
            Self {
                sent: Vec::new(),
                fail_after: Some(n),
            }
        }
    }

    impl DuplexTransfer for LoopbackDevice {
        fn exchange(&mut self, tx: &[u8]) -> Result<Vec<u8>> {
            if self.fail_after == Some(self.sent.len()) {
                return Err(Error::Transfer(std::io::Error::other("mock bus fault")));
            }
            self.sent.push(tx.to_vec());
            Ok(tx.to_vec())
        }
    }

    fn test_config(source: TxSource, repeat: u32) -> BusConfig {
        BusConfig {
            device: "/dev/spidev1.0".into(),
            mode: SpiMode::empty(),
            bits_per_word: 8,
            speed_hz: 1_000_000,
            delay_us: 0,
            interval_ms: 0,
            repeat,
            source,
        }
    }

    fn frame_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_buffer_mode_one_transfer_per_repetition() {
        let config = test_config(TxSource::Literal(DEFAULT_TX_DATA.to_vec()), 3);
        let mut source = FrameSource::from_config(&config.source).unwrap();
        let mut device = LoopbackDevice::new();

        let tags = run(&config, &mut source, &mut device).unwrap();

        assert_eq!(tags.len(), 3);
        for (rep, tag) in tags.iter().enumerate() {
            assert_eq!(tag.repetition, rep as u32);
            assert_eq!(tag.frame, None);
        }
        assert_eq!(device.sent.len(), 3);
        for sent in &device.sent {
            assert_eq!(sent.as_slice(), &DEFAULT_TX_DATA);
        }
    }

    #[test]
    fn test_file_mode_rereads_file_every_repetition() {
        let file = frame_file("0102\n0304\n0506\n");
        let config = test_config(TxSource::File(file.path().to_path_buf()), 2);
        let mut source = FrameSource::from_config(&config.source).unwrap();
        let mut device = LoopbackDevice::new();

        let tags = run(&config, &mut source, &mut device).unwrap();

        assert_eq!(tags.len(), 6);
        assert_eq!(device.sent[0], vec![0x01, 0x02]);
        assert_eq!(device.sent[2], vec![0x05, 0x06]);
        // Second repetition starts over from the first line.
        assert_eq!(device.sent[3], vec![0x01, 0x02]);
        assert_eq!(device.sent[5], vec![0x05, 0x06]);
    }

    #[test]
    fn test_frame_counter_spans_repetitions() {
        let file = frame_file("01\n02\n03\n");
        let config = test_config(TxSource::File(file.path().to_path_buf()), 2);
        let mut source = FrameSource::from_config(&config.source).unwrap();
        let mut device = LoopbackDevice::new();

        let tags = run(&config, &mut source, &mut device).unwrap();

        // Frame numbers keep counting into the second repetition instead of
        // restarting at zero.
        let expected: Vec<TransferTag> = (0..6)
            .map(|i| TransferTag {
                repetition: (i / 3) as u32,
                frame: Some(i as u64),
            })
            .collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn test_received_length_matches_frame_length() {
        let file = frame_file("01\naabbcc\n");
        let config = test_config(TxSource::File(file.path().to_path_buf()), 1);
        let mut source = FrameSource::from_config(&config.source).unwrap();
        let mut device = LoopbackDevice::new();

        run(&config, &mut source, &mut device).unwrap();

        assert_eq!(device.sent[0].len(), 1);
        assert_eq!(device.sent[1].len(), 3);
    }

    #[test]
    fn test_device_failure_halts_the_run() {
        let file = frame_file("01\n02\n03\n");
        let config = test_config(TxSource::File(file.path().to_path_buf()), 1);
        let mut source = FrameSource::from_config(&config.source).unwrap();
        let mut device = LoopbackDevice::failing_after(1);

        let result = run(&config, &mut source, &mut device);

        assert!(matches!(result, Err(Error::Transfer(_))));
        // Only the frame before the fault went out.
        assert_eq!(device.sent, vec![vec![0x01]]);
    }

    #[test]
    fn test_source_error_halts_the_run() {
        let file = frame_file("01\nnot hex\n03\n");
        let config = test_config(TxSource::File(file.path().to_path_buf()), 1);
        let mut source = FrameSource::from_config(&config.source).unwrap();
        let mut device = LoopbackDevice::new();

        let result = run(&config, &mut source, &mut device);

        assert!(matches!(result, Err(Error::MalformedHex { .. })));
        assert_eq!(device.sent.len(), 1);
    }

    #[test]
    fn test_zero_repeat_does_nothing() {
        let config = test_config(TxSource::Literal(DEFAULT_TX_DATA.to_vec()), 0);
        let mut source = FrameSource::from_config(&config.source).unwrap();
        let mut device = LoopbackDevice::new();

        assert!(run(&config, &mut source, &mut device).unwrap().is_empty());
        assert!(device.sent.is_empty());
    }

    #[test]
    fn test_report_line_format() {
        assert_eq!(
            report_line("TX", &[0xFD, 0x01, 0x51, 0xA7]),
            "TX: fd 01 51 a7 \r\n"
        );
        assert_eq!(report_line("RX", &[0x00]), "RX: 00 \r\n");
    }
}
