//! Incremental JSON frame detection.
//!
//! Frames carry no delimiter or length prefix. After every chunk the decoder
//! tries to parse the accumulated bytes; a parse that fails only because the
//! input ended early means "keep reading", any other failure is final.

use serde_json::Value;

use crate::errors::FrameError;

/// Upper bound applied when callers do not configure one (1 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Accumulates raw bytes until they form one complete JSON value.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_bytes: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl FrameDecoder {
    /// Creates a decoder that rejects frames larger than `max_bytes`.
    #[must_use]
    pub const fn new(max_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_bytes,
        }
    }

    /// Appends a chunk read from the peer.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] when the buffered frame would exceed
    /// the configured limit. The chunk is not retained in that case.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), FrameError> {
        let size = self.buffer.len().saturating_add(chunk.len());
        if size > self.max_bytes {
            return Err(FrameError::TooLarge {
                size,
                max_size: self.max_bytes,
            });
        }
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    /// Attempts to decode the buffered bytes as a single JSON value.
    ///
    /// Returns `Ok(None)` while the buffer holds only whitespace or a valid
    /// prefix of a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Malformed`] when the buffered bytes can never be
    /// completed into a single valid JSON value, including when a complete
    /// value is followed by trailing non-whitespace bytes.
    pub fn try_decode(&self) -> Result<Option<Value>, FrameError> {
        let payload = trim_ascii_whitespace(&self.buffer);
        if payload.is_empty() {
            return Ok(None);
        }
        match serde_json::from_slice::<Value>(payload) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.is_eof() => Ok(None),
            Err(error) => Err(FrameError::malformed(error)),
        }
    }

    /// Pushes a chunk and immediately attempts to decode the buffer.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`FrameDecoder::push`] and
    /// [`FrameDecoder::try_decode`].
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<Value>, FrameError> {
        self.push(chunk)?;
        self.try_decode()
    }

    /// Number of bytes buffered so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` when no bytes have been buffered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discards any partially buffered frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let Some(start) = bytes.iter().position(|b| !b.is_ascii_whitespace()) else {
        return &[];
    };
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |pos| pos + 1);
    bytes.get(start..end).unwrap_or_default()
}
