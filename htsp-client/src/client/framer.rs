//! Splits the inbound byte stream into HTSP frames.

use bytes::{Buf, Bytes, BytesMut};
use log::trace;

use htsp_protocol::{
    decode_map, encode_frame, peek_frame_len, EncodeError, FramingError, Map, LENGTH_PREFIX_SIZE,
};

/// Initial receive buffer capacity.
const INITIAL_CAPACITY: usize = 64 * 1024;

/// Sliding receive window over the socket.
///
/// Bytes are appended at the tail (either through [`extend`](Self::extend) or by
/// reading straight into [`buffer_mut`](Self::buffer_mut)) and complete frames
/// are split off the head.
pub struct Framer {
    buf: BytesMut,
    max_frame_size: u32,
}

impl Framer {
    pub fn new(max_frame_size: u32) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_CAPACITY),
            max_frame_size,
        }
    }

    /// Append received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// The receive buffer, for `AsyncReadExt::read_buf`.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Number of buffered bytes not yet consumed as frames.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Extract the next complete frame.
    ///
    /// Returns `Ok(None)` while the frame at the head is still partial. An
    /// oversized length prefix is rejected as soon as it is seen.
    pub fn next_frame(&mut self) -> Result<Option<Map>, FramingError> {
        let Some(payload_len) = peek_frame_len(&self.buf) else {
            return Ok(None);
        };
        if payload_len > self.max_frame_size {
            return Err(FramingError::FrameTooLarge(payload_len, self.max_frame_size));
        }

        let total_len = LENGTH_PREFIX_SIZE + payload_len as usize;
        if self.buf.len() < total_len {
            self.buf.reserve(total_len - self.buf.len());
            return Ok(None);
        }

        self.buf.advance(LENGTH_PREFIX_SIZE);
        let payload = self.buf.split_to(payload_len as usize);
        trace!("Frame extracted: {} bytes, {} buffered", payload_len, self.buf.len());

        Ok(Some(decode_map(&payload)?))
    }

    /// Extract every complete frame currently buffered.
    pub fn drain(&mut self) -> Result<Vec<Map>, FramingError> {
        let mut frames = Vec::new();
        while let Some(map) = self.next_frame()? {
            frames.push(map);
        }
        Ok(frames)
    }
}

/// Encode a request into one contiguous frame, ready for a single `write_all`.
pub fn encode_request(map: &Map) -> Result<Bytes, EncodeError> {
    encode_frame(map)
}
