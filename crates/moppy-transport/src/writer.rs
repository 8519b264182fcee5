use moppy_frame::Message;

use crate::error::Result;
use crate::file::FileWriter;
use crate::serial::SerialWriter;
use crate::sysfs::SysfsWriter;
use crate::traits::FrameSink;
use crate::udp::UdpWriter;

/// Every frame sink the proxy can be wired to.
#[derive(Debug)]
pub enum Writer {
    Serial(SerialWriter),
    Udp(UdpWriter),
    Sysfs(SysfsWriter),
    File(FileWriter),
}

impl FrameSink for Writer {
    fn write_frame(&mut self, message: &Message) -> Result<()> {
        match self {
            Writer::Serial(w) => w.write_frame(message),
            Writer::Udp(w) => w.write_frame(message),
            Writer::Sysfs(w) => w.write_frame(message),
            Writer::File(w) => w.write_frame(message),
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            Writer::Serial(w) => w.tag(),
            Writer::Udp(w) => w.tag(),
            Writer::Sysfs(w) => w.tag(),
            Writer::File(w) => w.tag(),
        }
    }
}

impl From<SerialWriter> for Writer {
    fn from(w: SerialWriter) -> Self {
        Writer::Serial(w)
    }
}

impl From<UdpWriter> for Writer {
    fn from(w: UdpWriter) -> Self {
        Writer::Udp(w)
    }
}

impl From<SysfsWriter> for Writer {
    fn from(w: SysfsWriter) -> Self {
        Writer::Sysfs(w)
    }
}

impl From<FileWriter> for Writer {
    fn from(w: FileWriter) -> Self {
        Writer::File(w)
    }
}
