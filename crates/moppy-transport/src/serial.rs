use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use moppy_frame::Message;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{FrameSink, FrameSource};
use crate::wait::{fill_frame, make_raw, Fill};

/// Line speed the controller firmware listens at.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// What the serial reader does with a frame cut short by its timeout.
///
/// The pty, socket and UDP readers never hand out a short frame. The serial
/// reader historically forwarded whatever it had collected, and downstream
/// controllers may rely on that, so the choice stays explicit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialFramePolicy {
    /// Return the short read as a message.
    #[default]
    Forward,
    /// Drop the short read and report an idle poll.
    Discard,
}

/// An open, raw-mode serial line.
#[derive(Debug)]
struct SerialPort {
    file: File,
    path: PathBuf,
}

impl SerialPort {
    fn open(path: &Path, baud: u32) -> Result<Self> {
        let speed = baud_to_speed(baud).ok_or(TransportError::UnsupportedBaudRate(baud))?;

        // O_NONBLOCK keeps open() from waiting on carrier detect; it is
        // cleared again once CLOCAL is set.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| TransportError::Open {
                path: path.to_path_buf(),
                source: e,
            })?;

        make_raw(file.as_fd(), Some(speed))
            .and_then(|()| clear_nonblocking(&file))
            .map_err(|e| TransportError::Configure {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

fn clear_nonblocking(file: &File) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let fd = file.as_raw_fd();
    // SAFETY: `fd` is owned by `file`, which outlives both calls.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

fn baud_to_speed(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        _ => return None,
    };
    Some(speed)
}

/// Reads frames from a serial device.
#[derive(Debug)]
pub struct SerialReader {
    port: SerialPort,
    partial: PartialFramePolicy,
}

impl SerialReader {
    /// Open `path` at the default baud rate, forwarding partial frames.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, DEFAULT_BAUD_RATE, PartialFramePolicy::default())
    }

    pub fn open_with(
        path: impl AsRef<Path>,
        baud: u32,
        partial: PartialFramePolicy,
    ) -> Result<Self> {
        let port = SerialPort::open(path.as_ref(), baud)?;
        info!(path = ?port.path, baud, ?partial, "serial reader created");
        Ok(Self { port, partial })
    }

    pub fn path(&self) -> &Path {
        &self.port.path
    }

    pub fn partial_policy(&self) -> PartialFramePolicy {
        self.partial
    }

    fn hangup(&self) -> TransportError {
        TransportError::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("{} hung up", self.port.path.display()),
        ))
    }
}

impl FrameSource for SerialReader {
    /// Collects bytes until a frame is complete or one byte takes longer
    /// than `timeout`. A short read is handled per [`PartialFramePolicy`].
    ///
    /// A hangup is a device failure. A forwarded partial frame is returned
    /// first and the next call reports the hangup.
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Message>> {
        let (collected, closed) = match fill_frame(&mut self.port.file, timeout)? {
            Fill::Complete(bytes) => return Ok(Some(Message::new(bytes))),
            Fill::TimedOut(bytes) => (bytes, false),
            Fill::Closed(bytes) => (bytes, true),
        };

        if collected.is_empty() {
            if closed {
                return Err(self.hangup());
            }
            return Ok(None);
        }

        match self.partial {
            PartialFramePolicy::Forward => {
                debug!(len = collected.len(), "forwarding partial serial frame");
                Ok(Some(Message::new(collected)))
            }
            PartialFramePolicy::Discard if closed => {
                warn!(len = collected.len(), "discarding partial serial frame");
                Err(self.hangup())
            }
            PartialFramePolicy::Discard => {
                warn!(len = collected.len(), "discarding partial serial frame");
                Ok(None)
            }
        }
    }

    fn tag(&self) -> &'static str {
        "serialr"
    }
}

/// Writes frames to a serial device.
#[derive(Debug)]
pub struct SerialWriter {
    port: SerialPort,
}

impl SerialWriter {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_baud(path, DEFAULT_BAUD_RATE)
    }

    pub fn open_with_baud(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        let port = SerialPort::open(path.as_ref(), baud)?;
        info!(path = ?port.path, baud, "serial writer created");
        Ok(Self { port })
    }

    pub fn path(&self) -> &Path {
        &self.port.path
    }
}

impl FrameSink for SerialWriter {
    fn write_frame(&mut self, message: &Message) -> Result<()> {
        let bytes = message.as_bytes();
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.port.file.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(TransportError::Write {
                        path: self.port.path.clone(),
                        source: std::io::Error::from(ErrorKind::WriteZero),
                    })
                }
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(TransportError::Write {
                        path: self.port.path.clone(),
                        source: err,
                    })
                }
            }
        }

        self.port.file.flush().map_err(|e| TransportError::Write {
            path: self.port.path.clone(),
            source: e,
        })
    }

    fn tag(&self) -> &'static str {
        "serialw"
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::pty::open_pty_pair;

    #[test]
    fn reads_complete_frame_from_tty() {
        let (mut master, slave_path, _slave) = open_pty_pair().unwrap();
        let mut reader = SerialReader::open(&slave_path).unwrap();

        master.write_all(&[2, 0x01, 0xF4]).unwrap();
        let msg = reader
            .read_frame(Duration::from_millis(500))
            .unwrap()
            .unwrap();
        assert_eq!(msg.as_bytes(), &[2, 0x01, 0xF4]);
    }

    #[test]
    fn idle_line_reads_nothing() {
        let (_master, slave_path, _slave) = open_pty_pair().unwrap();
        let mut reader = SerialReader::open(&slave_path).unwrap();

        let msg = reader.read_frame(Duration::from_millis(30)).unwrap();
        assert!(msg.is_none());
    }

    #[test]
    fn forwards_partial_frame_by_default() {
        let (mut master, slave_path, _slave) = open_pty_pair().unwrap();
        let mut reader = SerialReader::open(&slave_path).unwrap();
        assert_eq!(reader.partial_policy(), PartialFramePolicy::Forward);

        master.write_all(&[4, 0x01]).unwrap();
        let msg = reader
            .read_frame(Duration::from_millis(50))
            .unwrap()
            .unwrap();
        assert_eq!(msg.as_bytes(), &[4, 0x01]);
        assert!(!msg.is_complete());
    }

    #[test]
    fn discards_partial_frame_when_configured() {
        let (mut master, slave_path, _slave) = open_pty_pair().unwrap();
        let mut reader = SerialReader::open_with(
            &slave_path,
            DEFAULT_BAUD_RATE,
            PartialFramePolicy::Discard,
        )
        .unwrap();

        master.write_all(&[4, 0x01]).unwrap();
        let msg = reader.read_frame(Duration::from_millis(50)).unwrap();
        assert!(msg.is_none());
    }

    #[test]
    fn hangup_is_a_device_error() {
        let (master, slave_path, slave) = open_pty_pair().unwrap();
        let mut reader = SerialReader::open(&slave_path).unwrap();
        drop(master);
        drop(slave);

        let err = reader.read_frame(Duration::from_millis(500)).unwrap_err();
        assert!(!err.is_end_of_stream());
        assert_eq!(
            err.io_source().map(|e| e.kind()),
            Some(ErrorKind::UnexpectedEof),
            "{err:?}"
        );
    }

    #[test]
    fn bytes_before_hangup_are_forwarded_first() {
        let (mut master, slave_path, slave) = open_pty_pair().unwrap();
        let mut reader = SerialReader::open(&slave_path).unwrap();
        master.write_all(&[4, 0x01]).unwrap();
        // Let the line discipline move the bytes to the slave side.
        std::thread::sleep(Duration::from_millis(50));
        drop(master);
        drop(slave);

        let first = reader.read_frame(Duration::from_millis(500));
        let err = match first {
            Ok(Some(msg)) => {
                assert_eq!(msg.as_bytes(), &[4, 0x01]);
                reader.read_frame(Duration::from_millis(500)).unwrap_err()
            }
            Ok(None) => panic!("hangup reported as idle"),
            Err(err) => err,
        };
        assert!(!err.is_end_of_stream());
    }

    #[test]
    fn writer_sends_raw_bytes() {
        let (mut master, slave_path, _slave) = open_pty_pair().unwrap();
        let mut writer = SerialWriter::open(&slave_path).unwrap();

        writer
            .write_frame(&Message::from(moppy_frame::Frame::new(6, 0x0102)))
            .unwrap();

        let mut buf = [0u8; 3];
        master.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [6, 0x01, 0x02]);
    }

    #[test]
    fn rejects_unsupported_baud_rate() {
        let err = SerialReader::open_with("/dev/null", 12345, PartialFramePolicy::Forward)
            .unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaudRate(12345)));
    }

    #[test]
    fn open_missing_device_fails() {
        let err = SerialWriter::open("/nonexistent/moppy-tty").unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }
}
