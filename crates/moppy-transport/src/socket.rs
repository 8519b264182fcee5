use std::os::fd::AsFd;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use moppy_frame::Message;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::FrameSource;
use crate::wait::{fill_frame, wait_readable, Fill};

/// Reads frames from producers connecting over a unix domain socket.
///
/// One producer is served at a time. When it disconnects the reader goes
/// back to accepting.
#[derive(Debug)]
pub struct SocketReader {
    listener: UnixListener,
    file: SocketFile,
    stream: Option<UnixStream>,
}

/// The bound socket path. Removed on drop unless another socket has taken
/// its place.
#[derive(Debug)]
struct SocketFile {
    path: PathBuf,
    inode: u64,
}

impl Drop for SocketFile {
    fn drop(&mut self) {
        match std::fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.ino() == self.inode => {
                debug!(path = ?self.path, "removing socket file");
                let _ = std::fs::remove_file(&self.path);
            }
            Ok(_) => debug!(path = ?self.path, "socket file replaced; skipping cleanup"),
            Err(_) => {}
        }
    }
}

impl SocketReader {
    /// Bind a socket at `path`.
    ///
    /// A socket left behind by an earlier run is replaced. Any other kind
    /// of file at `path` is an error and is left untouched.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bind_err = |source: std::io::Error| TransportError::Bind {
            addr: path.display().to_string(),
            source,
        };

        match std::fs::symlink_metadata(&path) {
            Ok(meta) if meta.file_type().is_socket() => {
                std::fs::remove_file(&path).map_err(bind_err)?;
            }
            Ok(_) => {
                return Err(bind_err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
            Err(_) => {}
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        let inode = std::fs::symlink_metadata(&path).map_err(bind_err)?.ino();
        info!(?path, "socket reader listening");

        Ok(Self {
            listener,
            file: SocketFile { path, inode },
            stream: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }

    /// Whether a producer is currently attached.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

impl FrameSource for SocketReader {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Message>> {
        if self.stream.is_none() {
            if !wait_readable(self.listener.as_fd(), timeout)? {
                return Ok(None);
            }
            let (stream, _addr) = self.listener.accept()?;
            debug!(path = ?self.file.path, "producer connected");
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        match fill_frame(stream, timeout)? {
            Fill::Complete(bytes) => Ok(Some(Message::new(bytes))),
            Fill::TimedOut(partial) => {
                if !partial.is_empty() {
                    debug!(len = partial.len(), "dropping incomplete socket frame");
                }
                Ok(None)
            }
            Fill::Closed(_) => {
                debug!(path = ?self.file.path, "producer disconnected");
                self.stream = None;
                Ok(None)
            }
        }
    }

    fn tag(&self) -> &'static str {
        "sockr"
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn unique_socket(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("moppy-sock-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("proxy.sock")
    }

    #[test]
    fn idle_listener_reads_nothing() {
        let path = unique_socket("idle");
        let mut reader = SocketReader::bind(&path).unwrap();

        assert!(reader
            .read_frame(Duration::from_millis(20))
            .unwrap()
            .is_none());
        assert!(!reader.is_connected());

        drop(reader);
        assert!(!path.exists(), "socket file should be cleaned up on drop");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn reads_frames_from_connected_producer() {
        let path = unique_socket("frames");
        let mut reader = SocketReader::bind(&path).unwrap();

        let mut producer = UnixStream::connect(&path).unwrap();
        producer.write_all(&[2, 0x01, 0xF4, 4, 0x00]).unwrap();

        let first = reader
            .read_frame(Duration::from_millis(500))
            .unwrap()
            .unwrap();
        assert_eq!(first.as_bytes(), &[2, 0x01, 0xF4]);

        // Second frame is incomplete until the last byte arrives.
        assert!(reader
            .read_frame(Duration::from_millis(20))
            .unwrap()
            .is_none());

        drop(reader);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn returns_to_accepting_after_disconnect() {
        let path = unique_socket("reconnect");
        let mut reader = SocketReader::bind(&path).unwrap();

        let producer = UnixStream::connect(&path).unwrap();
        drop(producer);
        assert!(reader
            .read_frame(Duration::from_millis(200))
            .unwrap()
            .is_none());
        assert!(!reader.is_connected());

        let mut producer = UnixStream::connect(&path).unwrap();
        producer.write_all(&[100, 0, 0]).unwrap();
        let msg = reader
            .read_frame(Duration::from_millis(500))
            .unwrap()
            .unwrap();
        assert_eq!(msg.as_bytes(), &[100, 0, 0]);

        drop(reader);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn replaces_leftover_socket() {
        let path = unique_socket("leftover");
        let stale = UnixListener::bind(&path).unwrap();
        drop(stale);
        assert!(path.exists());

        let reader = SocketReader::bind(&path).unwrap();
        let mut producer = UnixStream::connect(&path).unwrap();
        producer.write_all(&[2, 0, 1]).unwrap();

        drop(reader);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn leaves_replacement_socket_in_place() {
        let path = unique_socket("replaced");
        let reader = SocketReader::bind(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        let other = UnixListener::bind(&path).unwrap();

        drop(reader);
        assert!(path.exists(), "another listener's socket must survive");
        drop(other);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn refuses_existing_non_socket_file() {
        let path = unique_socket("regular");
        std::fs::write(&path, b"regular-file").unwrap();

        let result = SocketReader::bind(&path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
        assert!(path.exists());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
