//! Frame relay between one reader and one writer.
//!
//! The [`Proxy`] pulls messages from a [`FrameSource`] and forwards them,
//! unmodified and in order, to a [`FrameSink`]. It runs until a
//! [`StopToken`] is triggered, the reader reaches the end of its stream, or
//! a read or write fails.
//!
//! [`ProxyConfig`] describes a reader/writer pair as plain data so callers
//! can assemble a proxy from flags or a JSON file.
//!
//! [`FrameSource`]: moppy_transport::FrameSource
//! [`FrameSink`]: moppy_transport::FrameSink

pub mod cancel;
pub mod config;
pub mod error;
pub mod observer;
pub mod proxy;

pub use cancel::StopToken;
pub use config::{ProxyConfig, ReaderConfig, WriterConfig, DEFAULT_READ_TIMEOUT};
pub use error::{ProxyError, Result};
pub use observer::{TracingObserver, Transfer, TransferObserver};
pub use proxy::{Proxy, ProxyState, ProxyStats, Step, StopReason};
