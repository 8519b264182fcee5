use std::time::Duration;

use moppy_frame::Message;

use crate::error::Result;

/// A source of command frames.
pub trait FrameSource {
    /// Read the next message, waiting at most `timeout` for it to arrive.
    ///
    /// `Ok(None)` means nothing complete arrived in time; it is the idle
    /// path, not an error.
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Message>>;

    /// Short name used in trace records.
    fn tag(&self) -> &'static str;
}

/// A sink for command frames.
pub trait FrameSink {
    /// Deliver one message.
    fn write_frame(&mut self, message: &Message) -> Result<()>;

    /// Short name used in trace records.
    fn tag(&self) -> &'static str;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Message>> {
        (**self).read_frame(timeout)
    }

    fn tag(&self) -> &'static str {
        (**self).tag()
    }
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn write_frame(&mut self, message: &Message) -> Result<()> {
        (**self).write_frame(message)
    }

    fn tag(&self) -> &'static str {
        (**self).tag()
    }
}
