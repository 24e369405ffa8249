//! Boundary scanner: delimiter-bounded reads from a buffered async source.
//!
//! This is the only place raw stream bytes are read; every other component
//! operates on already-materialized lines. The scanner tracks a rolling
//! XOR checksum over the trailing window of the payload so that a full
//! byte-compare against the delimiter only happens when the checksums
//! already agree — checksum equality is necessary but not sufficient, so a
//! candidate match is always confirmed exactly before acceptance.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{Error, Result};

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Delimiter found; the stream is positioned just past it.
    Delimited,
    /// Source exhausted before the delimiter; the partial payload is kept.
    EndOfInput,
    /// Payload hit the size ceiling before the delimiter was found.
    Overflow,
    /// The source yielded no bytes at all.
    Empty,
}

/// Result of one scan: the payload (delimiter excluded) and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Accumulated bytes, without the delimiter.
    pub payload: Vec<u8>,
    /// How the scan ended.
    pub outcome: ScanOutcome,
}

/// Consumes bytes from `reader` until `delimiter` is matched, the source
/// ends, or the payload exceeds `max_len`.
///
/// An I/O fault on the source surfaces as [`Error::Io`]; it is never folded
/// into [`ScanOutcome::EndOfInput`].
///
/// # Panics
///
/// Panics if `delimiter` is empty.
pub async fn scan_until<R>(reader: &mut R, delimiter: &[u8], max_len: usize) -> Result<Scan>
where
    R: AsyncBufRead + Unpin,
{
    assert!(!delimiter.is_empty(), "delimiter must be non-empty");

    let delimiter_xor = delimiter.iter().fold(0u8, |acc, &b| acc ^ b);
    let delimiter_last = delimiter[delimiter.len() - 1];

    let mut payload: Vec<u8> = Vec::new();
    // XOR over the trailing `delimiter.len()` bytes of the payload,
    // updated one byte in and one byte out per step.
    let mut window_xor = 0u8;

    loop {
        let (advance, stop) = {
            let buf = reader.fill_buf().await.map_err(Error::Io)?;
            if buf.is_empty() {
                let outcome = if payload.is_empty() {
                    ScanOutcome::Empty
                } else {
                    ScanOutcome::EndOfInput
                };
                return Ok(Scan { payload, outcome });
            }

            let mut advance = buf.len();
            let mut stop = None;
            for (index, &byte) in buf.iter().enumerate() {
                if payload.len() == max_len {
                    advance = index;
                    stop = Some(ScanOutcome::Overflow);
                    break;
                }
                payload.push(byte);
                window_xor ^= byte;
                if payload.len() > delimiter.len() {
                    window_xor ^= payload[payload.len() - 1 - delimiter.len()];
                }
                if window_xor == delimiter_xor
                    && byte == delimiter_last
                    && payload.len() >= delimiter.len()
                    && payload.ends_with(delimiter)
                {
                    advance = index + 1;
                    stop = Some(ScanOutcome::Delimited);
                    break;
                }
            }
            (advance, stop)
        };

        reader.consume(advance);

        match stop {
            Some(ScanOutcome::Delimited) => {
                payload.truncate(payload.len() - delimiter.len());
                return Ok(Scan {
                    payload,
                    outcome: ScanOutcome::Delimited,
                });
            }
            Some(outcome) => return Ok(Scan { payload, outcome }),
            None => {}
        }
    }
}
