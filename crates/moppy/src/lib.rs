//! Frame relay for floppy-drive music hardware.
//!
//! A moppy proxy reads 3-byte note frames from one source (a serial port, a
//! pseudo-terminal, a UDP socket, a Unix socket or a recorded text log) and
//! forwards each of them, unchanged and in order, to one sink (a serial
//! port, a UDP peer, the moppy kernel module's sysfs attributes or a text
//! log).
//!
//! # Crate Structure
//!
//! - [`frame`]: the binary frame and the text log line codecs
//! - [`transport`]: readers, writers and the traits they implement
//! - [`proxy`]: the relay loop, cancellation and reader/writer configuration

/// Re-export frame types.
pub mod frame {
    pub use moppy_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use moppy_transport::*;
}

/// Re-export proxy types.
pub mod proxy {
    pub use moppy_proxy::*;
}
