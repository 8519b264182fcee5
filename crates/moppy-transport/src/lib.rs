//! Interchangeable frame sources and sinks.
//!
//! Readers:
//! - [`SerialReader`]: byte-stream device (tty, USB serial adapter)
//! - [`PtyReader`]: pseudo-terminal published through a symlink
//! - [`UdpReader`]: bound datagram socket
//! - [`FileReader`]: recorded text log, replayed with its original timing
//! - [`SocketReader`]: unix domain stream socket
//!
//! Writers:
//! - [`SerialWriter`], [`UdpWriter`], [`SysfsWriter`], [`FileWriter`]
//!
//! Every reader implements [`FrameSource`] and every writer [`FrameSink`].
//! The closed [`Reader`] and [`Writer`] enums cover the concrete variants.

#[cfg(not(unix))]
compile_error!("moppy-transport requires a unix platform");

pub mod error;
pub mod file;
pub mod pty;
pub mod reader;
pub mod serial;
pub mod socket;
pub mod sysfs;
pub mod traits;
pub mod udp;
mod wait;
pub mod writer;

pub use error::{Result, TransportError};
pub use file::{FileReader, FileWriter};
pub use pty::{PtyReader, SymlinkGuard, DEFAULT_PTY_LINK};
pub use reader::Reader;
pub use serial::{PartialFramePolicy, SerialReader, SerialWriter, DEFAULT_BAUD_RATE};
pub use socket::SocketReader;
pub use sysfs::{SysfsLayout, SysfsWriter, DEFAULT_SYSFS_DIR};
pub use traits::{FrameSink, FrameSource};
pub use udp::{UdpReader, UdpWriter, MAX_DATAGRAM_SIZE};
pub use wait::wait_readable;
pub use writer::Writer;
