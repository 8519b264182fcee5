//! Recorded-session line format.
//!
//! ```text
//! <delay seconds>, <pin>, <value>\n
//! ```
//!
//! The delay is relative to the previous line, and is `0` on the first line
//! and on every reset line.

use std::time::Duration;

use crate::codec::Frame;
use crate::error::{FrameError, Result};

/// A frame together with the delay that preceded it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextFrame {
    pub delay: Duration,
    pub frame: Frame,
}

/// Parse one recorded line. A trailing newline is accepted.
pub fn decode_text_line(line: &str) -> Result<TextFrame> {
    let trimmed = line.trim_end_matches(['\n', '\r']);
    let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();

    let [delay, pin, value] = fields.as_slice() else {
        return Err(FrameError::malformed(
            trimmed,
            format!("expected 3 fields, found {}", fields.len()),
        ));
    };

    let delay: f64 = delay
        .parse()
        .map_err(|_| FrameError::malformed(trimmed, format!("invalid delay {delay:?}")))?;
    let delay = Duration::try_from_secs_f64(delay)
        .map_err(|err| FrameError::malformed(trimmed, format!("invalid delay: {err}")))?;
    let pin: u8 = pin
        .parse()
        .map_err(|_| FrameError::malformed(trimmed, format!("invalid pin {pin:?}")))?;
    let value: u16 = value
        .parse()
        .map_err(|_| FrameError::malformed(trimmed, format!("invalid value {value:?}")))?;

    Ok(TextFrame {
        delay,
        frame: Frame::new(pin, value),
    })
}

/// Render one recorded line, newline included.
pub fn encode_text_line(delay: Duration, frame: &Frame) -> String {
    format!("{:.6}, {}, {}\n", delay.as_secs_f64(), frame.pin, frame.value)
}
