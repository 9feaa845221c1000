//! Transmit frame acquisition
//!
//! Frames come either from a single in-memory buffer or from a text config
//! file with one hex-encoded frame per line, read through a resumable cursor
//! so the file never has to be re-scanned from the start between frames.

use crate::config::{TxSource, MAX_FRAME_LEN};
use crate::error::{Error, Result};
use crate::hex;

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Built-in transmit payload used when no data was supplied
pub const DEFAULT_TX_DATA: [u8; 4] = [0xFD, 0x01, 0x51, 0xA7];

/// Maximum accepted length of one config file line, terminator included
const MAX_LINE_LEN: usize = MAX_FRAME_LEN;

/// One frame of transmit data
///
/// Invariant: `0 < len <= MAX_FRAME_LEN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Wrap raw bytes, enforcing the frame length bounds
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::EmptyFrame);
        }
        if bytes.len() > MAX_FRAME_LEN {
            return Err(Error::BufferTooSmall {
                needed: bytes.len(),
                capacity: MAX_FRAME_LEN,
            });
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Resumable byte offset into a frame file
///
/// Advances to the position after the last consumed line on every successful
/// read; never moves backwards within one repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileCursor(u64);

impl FileCursor {
    /// Cursor at the start of the file
    pub fn start() -> Self {
        FileCursor(0)
    }

    pub fn offset(self) -> u64 {
        self.0
    }
}

/// Read and decode the line at `cursor`, returning the frame together with
/// the cursor positioned after the consumed line.
///
/// Returns `Ok(None)` once the file is exhausted: end of file, or a blank
/// line (trailing blank lines terminate reading). A line that reaches the
/// line buffer capacity is a hard `LineTooLong` error, never a silent
/// truncation.
pub fn read_frame_at(path: &Path, cursor: FileCursor) -> Result<Option<(Frame, FileCursor)>> {
    let config_err = |e| Error::ConfigFile {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::open(path).map_err(config_err)?;
    let mut reader = BufReader::new(file);
    reader
        .seek(SeekFrom::Start(cursor.offset()))
        .map_err(config_err)?;

    let mut line = String::new();
    let consumed = reader.read_line(&mut line).map_err(config_err)?;
    if consumed == 0 {
        return Ok(None);
    }
    if consumed >= MAX_LINE_LEN {
        return Err(Error::LineTooLong { max: MAX_LINE_LEN });
    }

    let mut buf = [0u8; MAX_FRAME_LEN];
    let len = hex::decode_line(&line, &mut buf)?;
    if len == 0 {
        // Blank line: treat like end of file.
        return Ok(None);
    }

    let frame = Frame::from_bytes(buf[..len].to_vec())?;
    Ok(Some((frame, FileCursor(cursor.offset() + consumed as u64))))
}

/// Produces successive transmit frames within one outer repetition
#[derive(Debug)]
pub enum FrameSource {
    /// Single pre-loaded frame, served once per repetition
    Literal { frame: Frame, served: bool },
    /// One frame per file line, resumed via a byte-offset cursor
    FileBacked { path: PathBuf, cursor: FileCursor },
}

impl FrameSource {
    /// Build a source from the configured transmit data
    pub fn from_config(source: &TxSource) -> Result<Self> {
        match source {
            TxSource::Literal(bytes) => Ok(FrameSource::Literal {
                frame: Frame::from_bytes(bytes.clone())?,
                served: false,
            }),
            TxSource::File(path) => Ok(FrameSource::FileBacked {
                path: path.clone(),
                cursor: FileCursor::start(),
            }),
        }
    }

    /// Restart the source for the next outer repetition
    pub fn rewind(&mut self) {
        match self {
            FrameSource::Literal { served, .. } => *served = false,
            FrameSource::FileBacked { cursor, .. } => *cursor = FileCursor::start(),
        }
    }

    /// Next frame, or `None` once this repetition is exhausted
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self {
            FrameSource::Literal { frame, served } => {
                if *served {
                    Ok(None)
                } else {
                    *served = true;
                    Ok(Some(frame.clone()))
                }
            }
            FrameSource::FileBacked { path, cursor } => match read_frame_at(path, *cursor)? {
                Some((frame, next)) => {
                    *cursor = next;
                    Ok(Some(frame))
                }
                None => Ok(None),
            },
        }
    }

    pub fn is_file_backed(&self) -> bool {
        matches!(self, FrameSource::FileBacked { .. })
    }
}
