//! Newline framing for NDJSON byte streams.
//!
//! The decoder works on raw bytes and only splits on `\n`. A newline byte
//! never occurs inside a multi-byte UTF-8 sequence, so a character cut in half
//! by a chunk boundary is reassembled before the record is decoded.

use crate::error::{StreamError, StreamResult};
use crate::record::Record;

/// Default limit for a single record (10MB).
pub const DEFAULT_MAX_RECORD_LEN: usize = 10 * 1024 * 1024;

/// Incremental NDJSON framer.
///
/// Between calls to [`feed`](Self::feed) the buffer only ever holds the
/// unterminated tail of the stream.
#[derive(Debug)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    max_record_len: usize,
    lines: u64,
}

impl NdjsonDecoder {
    /// Create a decoder with the default record limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_record_len(DEFAULT_MAX_RECORD_LEN)
    }

    /// Create a decoder with a custom record limit.
    #[must_use]
    pub fn with_max_record_len(max_record_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_record_len,
            lines: 0,
        }
    }

    /// Feed a chunk and collect every record it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> StreamResult<Vec<Record>> {
        let mut records = Vec::new();
        self.feed_into(chunk, &mut records)?;
        Ok(records)
    }

    /// Feed a chunk, appending completed records to `out` in stream order.
    ///
    /// On error, records completed earlier in the same chunk have already
    /// been appended.
    pub fn feed_into<E: Extend<Record>>(&mut self, chunk: &[u8], out: &mut E) -> StreamResult<()> {
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.append(&rest[..pos])?;
            rest = &rest[pos + 1..];

            let segment = std::mem::take(&mut self.buffer);
            self.lines += 1;
            if !Record::is_blank(&segment) {
                out.extend(Some(Record::new(self.lines, segment)));
            }
        }

        self.append(rest)
    }

    /// Flush the unterminated tail at end of stream.
    ///
    /// Returns `None` when the tail is empty or whitespace only.
    pub fn finish(&mut self) -> Option<Record> {
        let tail = std::mem::take(&mut self.buffer);
        if Record::is_blank(&tail) {
            return None;
        }
        self.lines += 1;
        Some(Record::new(self.lines, tail))
    }

    /// Bytes currently held for the pending record.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop the pending tail without emitting it.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn append(&mut self, bytes: &[u8]) -> StreamResult<()> {
        let size = self.buffer.len() + bytes.len();
        if size > self.max_record_len {
            self.buffer.clear();
            return Err(StreamError::RecordTooLarge {
                size,
                max: self.max_record_len,
            });
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }
}

impl Default for NdjsonDecoder {
    fn default() -> Self {
        Self::new()
    }
}
