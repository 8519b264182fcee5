use std::time::Duration;

use moppy_frame::Message;

use crate::error::Result;
use crate::file::FileReader;
use crate::pty::PtyReader;
use crate::serial::SerialReader;
use crate::socket::SocketReader;
use crate::traits::FrameSource;
use crate::udp::UdpReader;

/// Every frame source the proxy can be wired to.
#[derive(Debug)]
pub enum Reader {
    Serial(SerialReader),
    Pty(PtyReader),
    Udp(UdpReader),
    File(FileReader),
    Socket(SocketReader),
}

impl FrameSource for Reader {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Message>> {
        match self {
            Reader::Serial(r) => r.read_frame(timeout),
            Reader::Pty(r) => r.read_frame(timeout),
            Reader::Udp(r) => r.read_frame(timeout),
            Reader::File(r) => r.read_frame(timeout),
            Reader::Socket(r) => r.read_frame(timeout),
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Reader::Serial(r) => r.tag(),
            Reader::Pty(r) => r.tag(),
            Reader::Udp(r) => r.tag(),
            Reader::File(r) => r.tag(),
            Reader::Socket(r) => r.tag(),
        }
    }
}

impl From<SerialReader> for Reader {
    fn from(r: SerialReader) -> Self {
        Reader::Serial(r)
    }
}

impl From<PtyReader> for Reader {
    fn from(r: PtyReader) -> Self {
        Reader::Pty(r)
    }
}

impl From<UdpReader> for Reader {
    fn from(r: UdpReader) -> Self {
        Reader::Udp(r)
    }
}

impl From<FileReader> for Reader {
    fn from(r: FileReader) -> Self {
        Reader::File(r)
    }
}

impl From<SocketReader> for Reader {
    fn from(r: SocketReader) -> Self {
        Reader::Socket(r)
    }
}
