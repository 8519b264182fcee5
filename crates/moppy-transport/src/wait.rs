use std::io::{ErrorKind, Read};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::time::Duration;

use moppy_frame::FRAME_SIZE;

/// Wait until `fd` is readable or `timeout` elapses.
///
/// Returns `Ok(false)` on timeout. A signal interrupting the wait is also
/// reported as `Ok(false)` so the caller gets a chance to observe
/// cancellation before waiting again.
pub fn wait_readable(fd: BorrowedFd<'_>, timeout: Duration) -> std::io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd: fd.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = timeout
        .as_nanos()
        .div_ceil(1_000_000)
        .min(libc::c_int::MAX as u128) as libc::c_int;

    // SAFETY: `pfd` is a valid pollfd for the duration of the call and the
    // count passed matches the single entry.
    let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
    if rc < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0)
}

/// Outcome of accumulating one frame from a byte stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Fill {
    /// Exactly one frame's worth of bytes.
    Complete(Vec<u8>),
    /// The wait elapsed first; holds whatever arrived (possibly nothing).
    TimedOut(Vec<u8>),
    /// The stream reported EOF; holds whatever arrived before it.
    Closed(Vec<u8>),
}

/// Read one byte per readiness event until a frame is assembled.
///
/// Each byte gets its own `timeout`, so a producer that keeps trickling
/// bytes faster than the timeout always completes its frame.
pub(crate) fn fill_frame<S: Read + AsFd>(src: &mut S, timeout: Duration) -> std::io::Result<Fill> {
    let mut buf = Vec::with_capacity(FRAME_SIZE);
    while buf.len() < FRAME_SIZE {
        if !wait_readable(src.as_fd(), timeout)? {
            return Ok(Fill::TimedOut(buf));
        }

        let mut byte = [0u8; 1];
        match src.read(&mut byte) {
            Ok(0) => return Ok(Fill::Closed(buf)),
            // A tty whose other side went away reports EIO instead of EOF.
            Err(err) if err.raw_os_error() == Some(libc::EIO) => return Ok(Fill::Closed(buf)),
            Ok(_) => buf.push(byte[0]),
            Err(err)
                if err.kind() == ErrorKind::Interrupted || err.kind() == ErrorKind::WouldBlock =>
            {
                return Ok(Fill::TimedOut(buf));
            }
            Err(err) => return Err(err),
        }
    }
    Ok(Fill::Complete(buf))
}

/// Put a terminal into raw mode, optionally at a fixed line speed.
pub(crate) fn make_raw(fd: BorrowedFd<'_>, speed: Option<libc::speed_t>) -> std::io::Result<()> {
    let raw = fd.as_raw_fd();
    let mut tio = std::mem::MaybeUninit::<libc::termios>::uninit();

    // SAFETY: `raw` is an open descriptor borrowed for this call and `tio`
    // points to writable storage of the right size.
    if unsafe { libc::tcgetattr(raw, tio.as_mut_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: tcgetattr succeeded and fully initialised `tio`.
    let mut tio = unsafe { tio.assume_init() };

    // SAFETY: `tio` is a valid, initialised termios struct.
    unsafe { libc::cfmakeraw(&mut tio) };

    if let Some(speed) = speed {
        // SAFETY: as above; the speed constant comes from libc.
        unsafe {
            if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
                return Err(std::io::Error::last_os_error());
            }
        }
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cflag &= !(libc::CSTOPB | libc::CRTSCTS);
    }
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;

    // SAFETY: `raw` is open and `tio` is a valid termios struct.
    if unsafe { libc::tcsetattr(raw, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
