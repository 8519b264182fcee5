//! Fixed-size command framing for moppy transports.
//!
//! Every command on a binary transport is exactly 3 bytes:
//! - 1 byte pin (output / control identifier)
//! - 2 byte big-endian value
//!
//! Recorded sessions use a text form of the same frame, one line per
//! command, prefixed with the delay since the previous command.

pub mod codec;
pub mod error;
pub mod message;
pub mod text;

pub use codec::{decode_binary, encode_binary, put_frame, Frame, FRAME_SIZE, RESET_PIN};
pub use error::{FrameError, Result};
pub use message::Message;
pub use text::{decode_text_line, encode_text_line, TextFrame};
