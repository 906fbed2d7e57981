use bytes::{Bytes, BytesMut};

use crate::protocol::ollama::ChatChunk;

/// Incremental splitter for the backend's newline-delimited JSON stream.
///
/// Upstream chunk boundaries are arbitrary: one network read may carry half a
/// line or several. Bytes are buffered until a newline arrives; `next_line`
/// hands back one complete line at a time.
#[derive(Default)]
pub struct NdjsonLines {
    buf: BytesMut,
}

impl NdjsonLines {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line, without its trailing newline. Returns `None` until
    /// a full line has been buffered.
    pub fn next_line(&mut self) -> Option<Bytes> {
        let pos = memchr::memchr(b'\n', &self.buf)?;
        let mut line = self.buf.split_to(pos + 1);
        line.truncate(pos);
        if line.last() == Some(&b'\r') {
            line.truncate(pos - 1);
        }
        Some(line.freeze())
    }
}

/// Parse one stream line as a native chunk. Blank lines and malformed JSON
/// are skipped rather than treated as fatal.
#[must_use]
pub fn parse_chunk_line(line: &[u8]) -> Option<ChatChunk> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(line) {
        Ok(chunk) => Some(chunk),
        Err(err) => {
            tracing::warn!(error = %err, "skipping malformed stream line");
            None
        }
    }
}
