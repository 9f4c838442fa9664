//! NUL-delimited JSON framing.
//!
//! Each DTC frame on the wire is one UTF-8 JSON object terminated by a
//! single NUL byte. TCP gives no message boundaries, so inbound bytes are
//! accumulated in a `FrameBuffer` and complete frames are peeled off as
//! the delimiter arrives. A read may carry zero, one, or many frames, and
//! a frame may span several reads.

use crate::error::TransportResult;
use serde_json::Value;

/// Frame delimiter on the wire.
pub const FRAME_DELIMITER: u8 = 0;

/// Encode one JSON value as a wire frame (JSON bytes plus trailing NUL).
pub fn encode_frame(value: &Value) -> TransportResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec(value)?;
    bytes.push(FRAME_DELIMITER);
    Ok(bytes)
}

/// Reassembly buffer for inbound frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the socket.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete frame, without its delimiter.
    ///
    /// Empty frames (consecutive delimiters) are skipped silently.
    /// Returns `None` when no complete frame is buffered; any partial
    /// tail stays buffered for the next read.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let pos = self.buf.iter().position(|&b| b == FRAME_DELIMITER)?;
            let mut frame: Vec<u8> = self.buf.drain(..=pos).collect();
            frame.pop(); // delimiter
            if !frame.is_empty() {
                return Some(frame);
            }
        }
    }

    /// Bytes currently buffered (incomplete tail included).
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

/// Decode one frame into a JSON value.
pub fn decode_frame(frame: &[u8]) -> TransportResult<Value> {
    Ok(serde_json::from_slice(frame)?)
}
