use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Wire size of a command frame: pin (1) + value (2).
pub const FRAME_SIZE: usize = 3;

/// Pin reserved for the reset control frame. The value is ignored.
pub const RESET_PIN: u8 = 100;

/// First pin that maps onto an output channel.
const FIRST_CHANNEL_PIN: u8 = 2;

/// A single command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Output / control identifier.
    pub pin: u8,
    /// Command argument (period, tick count, ...).
    pub value: u16,
}

impl Frame {
    /// Create a new frame.
    pub fn new(pin: u8, value: u16) -> Self {
        Self { pin, value }
    }

    /// The reset control frame.
    pub fn reset() -> Self {
        Self::new(RESET_PIN, 0)
    }

    /// Whether this is a reset control frame.
    pub fn is_reset(&self) -> bool {
        self.pin == RESET_PIN
    }

    /// Output channel addressed by this frame.
    ///
    /// Pins come in step/direction pairs starting at pin 2, so pins 2 and 3
    /// drive channel 0, pins 4 and 5 channel 1, and so on. Pins 0 and 1
    /// address no channel.
    pub fn channel(&self) -> Option<u8> {
        self.pin
            .checked_sub(FIRST_CHANNEL_PIN)
            .map(|offset| offset / 2)
    }
}

/// Encode a frame into its 3-byte wire form.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────────┐
/// │ Pin (1B) │ Value (2B BE)    │
/// └──────────┴──────────────────┘
/// ```
pub fn encode_binary(frame: &Frame) -> [u8; FRAME_SIZE] {
    let [hi, lo] = frame.value.to_be_bytes();
    [frame.pin, hi, lo]
}

/// Append a frame's wire form to a buffer.
pub fn put_frame(frame: &Frame, dst: &mut BytesMut) {
    dst.reserve(FRAME_SIZE);
    dst.put_u8(frame.pin);
    dst.put_u16(frame.value);
}

/// Decode a frame from exactly 3 bytes.
///
/// Accumulating or discarding short reads is the caller's job.
pub fn decode_binary(src: &[u8]) -> Result<Frame> {
    match *src {
        [pin, hi, lo] => Ok(Frame::new(pin, u16::from_be_bytes([hi, lo]))),
        _ => Err(FrameError::InvalidLength { len: src.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_big_endian() {
        let frame = Frame::new(4, 300);
        assert_eq!(encode_binary(&frame), [4, 0x01, 0x2C]);
    }

    #[test]
    fn test_decode_exact_frame() {
        let frame = decode_binary(&[2, 0x01, 0xF4]).unwrap();
        assert_eq!(frame, Frame::new(2, 500));
    }

    #[test]
    fn test_decode_rejects_short_and_long_input() {
        assert!(matches!(
            decode_binary(&[1, 2]),
            Err(FrameError::InvalidLength { len: 2 })
        ));
        assert!(matches!(
            decode_binary(&[1, 2, 3, 4]),
            Err(FrameError::InvalidLength { len: 4 })
        ));
        assert!(matches!(
            decode_binary(&[]),
            Err(FrameError::InvalidLength { len: 0 })
        ));
    }

    #[test]
    fn test_roundtrip_all_pins_and_value_edges() {
        for pin in 0..=u8::MAX {
            for value in [0u16, 1, 0x00FF, 0x0100, 0x7FFF, 0x8000, u16::MAX] {
                let frame = Frame::new(pin, value);
                let wire = encode_binary(&frame);
                let decoded = decode_binary(&wire).unwrap();
                assert_eq!(encode_binary(&decoded), wire);
            }
        }
    }

    #[test]
    fn test_put_frame_matches_encode() {
        let mut buf = BytesMut::new();
        put_frame(&Frame::new(7, 0xBEEF), &mut buf);
        put_frame(&Frame::reset(), &mut buf);
        assert_eq!(buf.as_ref(), &[7, 0xBE, 0xEF, RESET_PIN, 0, 0]);
    }

    #[test]
    fn test_channel_mapping() {
        assert_eq!(Frame::new(0, 0).channel(), None);
        assert_eq!(Frame::new(1, 0).channel(), None);
        assert_eq!(Frame::new(2, 0).channel(), Some(0));
        assert_eq!(Frame::new(3, 0).channel(), Some(0));
        assert_eq!(Frame::new(4, 0).channel(), Some(1));
        assert_eq!(Frame::new(17, 0).channel(), Some(7));
    }

    #[test]
    fn test_reset_frame() {
        assert!(Frame::reset().is_reset());
        assert!(Frame::new(RESET_PIN, 1234).is_reset());
        assert!(!Frame::new(2, 0).is_reset());
    }
}
