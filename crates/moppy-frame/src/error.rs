/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A binary frame must be exactly 3 bytes.
    #[error("invalid frame length ({len} bytes, expected 3)")]
    InvalidLength { len: usize },

    /// A recorded text line could not be parsed.
    #[error("malformed line {line:?}: {reason}")]
    MalformedLine { line: String, reason: String },
}

impl FrameError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::MalformedLine {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
