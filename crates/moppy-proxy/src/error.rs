use std::path::PathBuf;

use moppy_transport::TransportError;

/// Errors that end a proxy run.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// A reader or writer could not be constructed.
    #[error("transport setup failed: {0}")]
    Setup(TransportError),

    /// The reader failed with something other than end of stream.
    #[error("read failed ({reader}): {source}")]
    Read {
        reader: &'static str,
        source: TransportError,
    },

    /// The writer failed. Writes are never retried.
    #[error("write failed ({writer}): {source}")]
    Write {
        writer: &'static str,
        source: TransportError,
    },

    /// The proxy already stopped and cannot be run again.
    #[error("proxy already stopped")]
    Stopped,

    /// A configuration file could not be loaded.
    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl ProxyError {
    /// The transport error behind this failure, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Setup(err) => Some(err),
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
            Self::Stopped | Self::Config { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
