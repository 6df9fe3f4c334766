//! Feed reader
//!
//! Turns a byte source (in-memory buffer or stream handle) into a lazy,
//! single-pass sequence of raw lines. Reads fixed-size chunks so peak memory
//! is O(chunk size + longest record), independent of total feed size. The
//! same chunked path serves both inputs; a buffer is wrapped in an in-memory
//! cursor, so no copies are made either way.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::errors::{AppResult, IngestError};

/// Raw bytes backing one ingestion attempt
pub enum ByteFeed {
    /// Already-fetched feed body
    Buffer(Bytes),
    /// Open stream handle (file or network body)
    Stream(Box<dyn AsyncRead + Send + Unpin>),
}

impl ByteFeed {
    pub fn from_buffer(bytes: impl Into<Bytes>) -> Self {
        Self::Buffer(bytes.into())
    }

    pub fn from_stream(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }

    fn into_reader(self) -> Box<dyn AsyncRead + Send + Unpin> {
        match self {
            Self::Buffer(bytes) => Box::new(io::Cursor::new(bytes)),
            Self::Stream(reader) => reader,
        }
    }
}

/// Chunked line reader over a [`ByteFeed`]
///
/// Lines are emitted without their trailing delimiter; a truncated final
/// record (no trailing newline) is flushed as the last entry. A line that is
/// not valid UTF-8 is skipped with a debug log, never fatal to the stream.
pub struct LineReader {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    chunk: Vec<u8>,
    buf: Vec<u8>,
    consumed: usize,
    read_timeout: Duration,
    eof: bool,
}

impl LineReader {
    pub fn new(feed: ByteFeed, chunk_size: usize, read_timeout: Duration) -> Self {
        Self {
            reader: feed.into_reader(),
            chunk: vec![0u8; chunk_size.max(1)],
            buf: Vec::new(),
            consumed: 0,
            read_timeout,
            eof: false,
        }
    }

    /// Next line of the feed, or `None` at end of stream
    pub async fn next_line(&mut self) -> AppResult<Option<String>> {
        loop {
            // Emit any complete line already buffered
            if let Some(offset) = memchr_newline(&self.buf[self.consumed..]) {
                let end = self.consumed + offset;
                let line = self.take_line(self.consumed, end, end + 1);
                match line {
                    Some(line) => return Ok(Some(line)),
                    None => continue,
                }
            }

            if self.eof {
                // Flush a truncated final record
                if self.consumed < self.buf.len() {
                    let end = self.buf.len();
                    match self.take_line(self.consumed, end, end) {
                        Some(line) => return Ok(Some(line)),
                        None => continue,
                    }
                }
                return Ok(None);
            }

            // Compact before refilling so the buffer only ever holds the
            // current partial record plus one chunk.
            if self.consumed > 0 {
                self.buf.drain(..self.consumed);
                self.consumed = 0;
            }

            let read = tokio::time::timeout(self.read_timeout, self.reader.read(&mut self.chunk))
                .await
                .map_err(|_| IngestError::Timeout {
                    seconds: self.read_timeout.as_secs(),
                })?
                .map_err(|e| IngestError::read_failed(e.to_string()))?;

            if read == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&self.chunk[..read]);
            }
        }
    }

    /// Decode `buf[start..end]` as one line, advancing past `next`.
    /// Returns `None` when the line has to be skipped (bad encoding).
    fn take_line(&mut self, start: usize, end: usize, next: usize) -> Option<String> {
        let mut bytes = &self.buf[start..end];
        if bytes.last() == Some(&b'\r') {
            bytes = &bytes[..bytes.len() - 1];
        }
        let line = std::str::from_utf8(bytes).map(str::to_string);
        self.consumed = next;
        match line {
            Ok(line) => Some(line),
            Err(_) => {
                debug!("Skipping feed line with invalid encoding");
                None
            }
        }
    }
}

fn memchr_newline(haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == b'\n')
}
