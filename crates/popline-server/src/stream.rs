//! Line-oriented I/O for the POP3 wire format.
//!
//! POP3 requests and replies are CRLF-terminated lines; multi-line reply
//! bodies are dot-stuffed and closed by a lone-period line. This module
//! wraps a duplex stream with buffered reading through the boundary
//! scanner and buffered, single-flush reply writing.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::Result;
use crate::scanner::{Scan, scan_until};

/// Default buffer size for reading.
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// The POP3 line delimiter.
pub const CRLF: &[u8] = b"\r\n";

/// Buffered line stream over a duplex transport.
///
/// The session owns this exclusively for its lifetime; reads and writes
/// never interleave within one request/response cycle.
pub struct LineStream<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> LineStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new line stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads one CRLF-delimited request line, bounded by `max_len`.
    ///
    /// The returned payload excludes the delimiter.
    pub async fn read_line(&mut self, max_len: usize) -> Result<Scan> {
        scan_until(&mut self.reader, CRLF, max_len).await
    }

    /// Writes a single reply line, appending CRLF, and flushes.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(line.as_bytes());
        self.write_buffer.extend_from_slice(CRLF);
        self.flush_buffer().await
    }

    /// Writes a multi-line reply: the status line, the dot-stuffed body,
    /// and the lone-period terminator, in one buffered write.
    pub async fn write_multiline(&mut self, status: &str, body: &[String]) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.extend_from_slice(status.as_bytes());
        self.write_buffer.extend_from_slice(CRLF);
        for line in body {
            // Byte-stuffing: a leading period is doubled so a data line is
            // never mistaken for the terminator.
            if line.starts_with('.') {
                self.write_buffer.extend_from_slice(b".");
            }
            self.write_buffer.extend_from_slice(line.as_bytes());
            self.write_buffer.extend_from_slice(CRLF);
        }
        self.write_buffer.extend_from_slice(b".");
        self.write_buffer.extend_from_slice(CRLF);
        self.flush_buffer().await
    }

    /// Shuts down the write half of the transport.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }

    async fn flush_buffer(&mut self) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;
    use crate::scanner::ScanOutcome;

    #[tokio::test]
    async fn test_read_line_strips_delimiter() {
        let mock = Builder::new().read(b"STAT\r\n").build();
        let mut stream = LineStream::new(mock);

        let scan = stream.read_line(1024).await.unwrap();
        assert_eq!(scan.outcome, ScanOutcome::Delimited);
        assert_eq!(scan.payload, b"STAT");
    }

    #[tokio::test]
    async fn test_write_line_appends_crlf() {
        let mock = Builder::new().write(b"+OK 2 320\r\n").build();
        let mut stream = LineStream::new(mock);

        stream.write_line("+OK 2 320").await.unwrap();
    }

    #[tokio::test]
    async fn test_multiline_body_is_stuffed_and_terminated() {
        let mock = Builder::new()
            .write(b"+OK 120 octets\r\nfirst line\r\n..starts with a period\r\n.\r\n")
            .build();
        let mut stream = LineStream::new(mock);

        stream
            .write_multiline(
                "+OK 120 octets",
                &[
                    "first line".to_string(),
                    ".starts with a period".to_string(),
                ],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_body_is_just_the_terminator() {
        let mock = Builder::new().write(b"+OK\r\n.\r\n").build();
        let mut stream = LineStream::new(mock);

        stream.write_multiline("+OK", &[]).await.unwrap();
    }
}
