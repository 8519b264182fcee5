use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use moppy_frame::Message;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::FrameSource;
use crate::wait::{fill_frame, make_raw, Fill};

/// Where producers find the proxy's pty unless configured otherwise.
pub const DEFAULT_PTY_LINK: &str = "/tmp/.moppy_proxy_pty";

/// A symlink owned by this process, removed when dropped.
///
/// Creation never replaces an existing path. Removal only happens while the
/// link still points at the target it was created with, so a link that was
/// replaced by someone else is left alone.
#[derive(Debug)]
pub struct SymlinkGuard {
    link: PathBuf,
    target: PathBuf,
}

impl SymlinkGuard {
    /// Create `link` pointing at `target`.
    ///
    /// Fails with [`TransportError::AlreadyRunning`] if anything exists at
    /// `link`, including a dangling symlink.
    pub fn create(target: impl AsRef<Path>, link: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let link = link.as_ref().to_path_buf();

        match std::os::unix::fs::symlink(&target, &link) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(TransportError::AlreadyRunning { path: link });
            }
            Err(e) => {
                return Err(TransportError::Open {
                    path: link,
                    source: e,
                })
            }
        }

        debug!(?link, ?target, "symlink created");
        Ok(Self { link, target })
    }

    pub fn link(&self) -> &Path {
        &self.link
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl Drop for SymlinkGuard {
    fn drop(&mut self) {
        match std::fs::read_link(&self.link) {
            Ok(current) if current == self.target => {
                debug!(link = ?self.link, "removing symlink");
                let _ = std::fs::remove_file(&self.link);
            }
            Ok(_) => {
                debug!(link = ?self.link, "symlink target changed; skipping cleanup");
            }
            Err(_) => {}
        }
    }
}

/// Allocate a pseudo-terminal pair with the slave in raw mode.
///
/// Returns the master, the slave's device path, and an open slave handle.
/// Keeping the slave open stops the master from reporting EIO while no
/// producer is attached.
pub(crate) fn open_pty_pair() -> std::io::Result<(File, PathBuf, File)> {
    // SAFETY: posix_openpt has no pointer arguments.
    let fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: `fd` was just returned by posix_openpt and nothing else owns it.
    let master = unsafe { OwnedFd::from_raw_fd(fd) };

    // SAFETY: `master` is an open pty master descriptor.
    if unsafe { libc::grantpt(master.as_raw_fd()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::unlockpt(master.as_raw_fd()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    let slave_path = slave_name(&master)?;
    let slave = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(&slave_path)?;
    make_raw(slave.as_fd(), None)?;

    Ok((File::from(master), slave_path, slave))
}

#[cfg(target_os = "linux")]
fn slave_name(master: &OwnedFd) -> std::io::Result<PathBuf> {
    let mut buf = [0 as libc::c_char; 128];
    // SAFETY: `buf` is writable for `buf.len()` bytes and ptsname_r
    // NUL-terminates on success.
    let rc = unsafe { libc::ptsname_r(master.as_raw_fd(), buf.as_mut_ptr(), buf.len()) };
    if rc != 0 {
        return Err(std::io::Error::from_raw_os_error(rc));
    }
    // SAFETY: ptsname_r succeeded, so `buf` holds a NUL-terminated string.
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(PathBuf::from(name.to_string_lossy().into_owned()))
}

#[cfg(not(target_os = "linux"))]
fn slave_name(master: &OwnedFd) -> std::io::Result<PathBuf> {
    // SAFETY: `master` is an unlocked pty master. The returned pointer refers
    // to static storage that is copied out before any other ptsname call.
    let ptr = unsafe { libc::ptsname(master.as_raw_fd()) };
    if ptr.is_null() {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: non-null result of ptsname is a NUL-terminated string.
    let name = unsafe { CStr::from_ptr(ptr) };
    Ok(PathBuf::from(name.to_string_lossy().into_owned()))
}

/// Reads frames that a producer writes into a pseudo-terminal.
///
/// The pty's slave device is published as a symlink so producers can open
/// a stable path. The symlink is removed when the reader is dropped.
#[derive(Debug)]
pub struct PtyReader {
    master: File,
    slave_path: PathBuf,
    _slave: File,
    link: SymlinkGuard,
}

impl PtyReader {
    /// Create a pty and publish it at `link`.
    pub fn open(link: impl AsRef<Path>) -> Result<Self> {
        let (master, slave_path, slave) = open_pty_pair().map_err(TransportError::Pty)?;
        let link = SymlinkGuard::create(&slave_path, link)?;

        info!(pty = ?slave_path, link = ?link.link(), "pty reader created");

        Ok(Self {
            master,
            slave_path,
            _slave: slave,
            link,
        })
    }

    /// Device path of the pty slave.
    pub fn slave_path(&self) -> &Path {
        &self.slave_path
    }

    /// Published symlink path.
    pub fn link_path(&self) -> &Path {
        self.link.link()
    }
}

impl FrameSource for PtyReader {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Message>> {
        match fill_frame(&mut self.master, timeout)? {
            Fill::Complete(bytes) => Ok(Some(Message::new(bytes))),
            Fill::TimedOut(partial) | Fill::Closed(partial) => {
                if !partial.is_empty() {
                    debug!(len = partial.len(), "dropping incomplete pty frame");
                }
                Ok(None)
            }
        }
    }

    fn tag(&self) -> &'static str {
        "ptyr"
    }
}
