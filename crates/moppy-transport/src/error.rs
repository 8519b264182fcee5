use std::path::PathBuf;

use moppy_frame::FrameError;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open a device or file.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to configure a terminal device.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write to a device or file.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to bind a socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to resolve a destination address.
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to allocate a pseudo-terminal pair.
    #[error("failed to create pseudo-terminal: {0}")]
    Pty(std::io::Error),

    /// The pty symlink already exists, most likely from another proxy.
    #[error("already running? {path} exists")]
    AlreadyRunning { path: PathBuf },

    /// The baud rate has no termios equivalent.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),

    /// The frame's pin does not address an output channel.
    #[error("pin {0} does not address a channel")]
    InvalidPin(u8),

    /// The reader has no more frames.
    #[error("end of stream: {0}")]
    EndOfStream(String),

    /// A message could not be interpreted as a frame.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// An I/O error occurred on an open transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the reader ran out of frames (a clean stop, not a failure).
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream(_))
    }

    /// The underlying I/O error, if this is a device failure.
    pub fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            Self::Open { source, .. }
            | Self::Configure { source, .. }
            | Self::Write { source, .. }
            | Self::Bind { source, .. }
            | Self::Resolve { source, .. } => Some(source),
            Self::Pty(source) | Self::Io(source) => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
