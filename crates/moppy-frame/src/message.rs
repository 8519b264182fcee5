use bytes::Bytes;

use crate::codec::{decode_binary, encode_binary, Frame, FRAME_SIZE};
use crate::error::Result;

/// The bytes one reader call produced.
///
/// Normally a single 3-byte frame. Datagram sources forward whatever arrived
/// and the serial source may forward a short read, so a message is kept
/// opaque until a sink needs to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Bytes,
}

impl Message {
    /// Wrap raw bytes as received.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Encode a frame as a message.
    pub fn from_frame(frame: &Frame) -> Self {
        Self::new(Bytes::copy_from_slice(&encode_binary(frame)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the message is exactly one frame.
    pub fn is_complete(&self) -> bool {
        self.bytes.len() == FRAME_SIZE
    }

    /// Interpret the message as a single frame.
    pub fn frame(&self) -> Result<Frame> {
        decode_binary(&self.bytes)
    }

    /// Lowercase hex rendering for logs.
    pub fn hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        Self::from_frame(&frame)
    }
}
