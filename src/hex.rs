//! Whitespace-tolerant hexadecimal line codec
//!
//! Decodes one line of hex text into bytes and formats bytes back into the
//! space-separated form used by the console report. The two directions round
//! trip: `decode_line(&encode_line(frame))` yields `frame` again.

use crate::error::{Error, Result};

/// Decode one line of hex text into `out`, returning the byte count produced.
///
/// Carriage returns and line feeds are stripped wherever they occur, spaces
/// between digits are skipped, and an odd digit count is resolved by giving
/// the first byte an implicit leading zero: `"abc"` decodes to `[0x0A, 0xBC]`.
///
/// The capacity check is deliberately conservative: it is computed from the
/// stripped character count before any digit is decoded, so a line padded
/// with spaces may be rejected even though its digits alone would fit.
pub fn decode_line(text: &str, out: &mut [u8]) -> Result<usize> {
    let stripped: Vec<u8> = text
        .bytes()
        .filter(|&b| b != b'\r' && b != b'\n')
        .collect();

    let needed = (stripped.len() + 1) / 2;
    if needed > out.len() {
        return Err(Error::BufferTooSmall {
            needed,
            capacity: out.len(),
        });
    }

    let mut nibbles = Vec::with_capacity(stripped.len());
    for &b in &stripped {
        match b {
            b'0'..=b'9' => nibbles.push(b - b'0'),
            b'a'..=b'f' => nibbles.push(b - b'a' + 10),
            b'A'..=b'F' => nibbles.push(b - b'A' + 10),
            b' ' => {}
            other => {
                return Err(Error::MalformedHex {
                    ch: other as char,
                    code: other as u32,
                })
            }
        }
    }

    // An odd digit count makes the first byte a lone low nibble.
    let mut produced = 0;
    let mut idx = 0;
    if nibbles.len() % 2 == 1 {
        out[produced] = nibbles[0];
        produced += 1;
        idx = 1;
    }
    while idx < nibbles.len() {
        out[produced] = (nibbles[idx] << 4) | nibbles[idx + 1];
        produced += 1;
        idx += 2;
    }

    Ok(produced)
}

/// Format bytes as space-separated two-digit lowercase hex pairs
pub fn encode_line(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
