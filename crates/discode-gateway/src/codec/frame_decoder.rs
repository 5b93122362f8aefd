//! zlib-stream frame decoder
//!
//! With `compress=zlib-stream` the server deflates every frame into one shared
//! zlib stream and ends each frame with a sync flush. A frame may arrive split
//! across several binary messages; it is complete once the accumulated bytes
//! end with the sync-flush marker `00 00 FF FF`.

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::{DecodeError, GatewayError};
use crate::transport::TransportMessage;

/// Trailing bytes of a sync-flushed zlib block
pub const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// Growth step for the inflate output buffer
const INFLATE_CHUNK: usize = 16 * 1024;

/// Reassembles and inflates frames for one connection
pub struct FrameDecoder {
    buffer: Vec<u8>,
    inflater: Decompress,
}

impl FrameDecoder {
    /// Create a decoder expecting a zlib header on the first frame
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            inflater: Decompress::new(true),
        }
    }

    /// Feed one transport message
    ///
    /// Returns `Ok(Some(text))` for a complete frame, `Ok(None)` while a
    /// compressed frame is still incomplete.
    pub fn decode(&mut self, message: TransportMessage) -> Result<Option<String>, GatewayError> {
        match message {
            TransportMessage::Text(text) => Ok(Some(text)),
            TransportMessage::Binary(chunk) => Ok(self.push(&chunk)?),
            TransportMessage::Close(code) => Err(GatewayError::from_close_code(code)),
        }
    }

    /// Discard buffered bytes and the compression context
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.inflater.reset(true);
    }

    /// Number of bytes waiting for the end of a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn push(&mut self, chunk: &[u8]) -> Result<Option<String>, DecodeError> {
        if chunk.is_empty() {
            return Ok(None);
        }

        self.buffer.extend_from_slice(chunk);
        if !self.buffer.ends_with(&ZLIB_SUFFIX) {
            return Ok(None);
        }

        // Taking the buffer clears it on both the success and error path
        let compressed = std::mem::take(&mut self.buffer);
        let inflated = self.inflate(&compressed)?;
        Ok(Some(String::from_utf8(inflated)?))
    }

    fn inflate(&mut self, input: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut output = Vec::with_capacity(input.len().saturating_mul(4).max(INFLATE_CHUNK));
        let mut offset = 0;

        loop {
            if output.len() == output.capacity() {
                output.reserve(INFLATE_CHUNK);
            }

            let in_before = self.inflater.total_in();
            let out_before = self.inflater.total_out();
            let status =
                self.inflater
                    .decompress_vec(&input[offset..], &mut output, FlushDecompress::Sync)?;
            offset += (self.inflater.total_in() - in_before) as usize;
            let progressed =
                self.inflater.total_in() != in_before || self.inflater.total_out() != out_before;

            let drained = offset >= input.len() && output.len() < output.capacity();
            if drained || status == Status::StreamEnd || !progressed {
                break;
            }
        }

        Ok(output)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDecoder")
            .field("buffered", &self.buffer.len())
            .field("total_in", &self.inflater.total_in())
            .finish()
    }
}
