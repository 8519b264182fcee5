use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::os::fd::AsFd;
use std::time::Duration;

use bytes::Bytes;
use moppy_frame::Message;
use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::{FrameSink, FrameSource};
use crate::wait::wait_readable;

/// Largest datagram the reader accepts; anything longer is truncated.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Reads datagrams from a bound UDP socket.
///
/// Each datagram is one message, forwarded as received. A datagram holding
/// several frames, or part of one, is not re-framed.
#[derive(Debug)]
pub struct UdpReader {
    socket: UdpSocket,
    buf: Box<[u8; MAX_DATAGRAM_SIZE]>,
}

impl UdpReader {
    pub fn bind(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let socket = UdpSocket::bind((host, port)).map_err(|e| TransportError::Bind {
            addr: addr.clone(),
            source: e,
        })?;

        info!(%addr, "udp reader created");

        Ok(Self {
            socket,
            buf: Box::new([0u8; MAX_DATAGRAM_SIZE]),
        })
    }

    /// The bound local address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl FrameSource for UdpReader {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Message>> {
        if !wait_readable(self.socket.as_fd(), timeout)? {
            return Ok(None);
        }

        let n = match self.socket.recv(&mut self.buf[..]) {
            Ok(n) => n,
            Err(err)
                if err.kind() == std::io::ErrorKind::Interrupted
                    || err.kind() == std::io::ErrorKind::WouldBlock =>
            {
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        if n == 0 {
            return Ok(None);
        }
        Ok(Some(Message::new(Bytes::copy_from_slice(&self.buf[..n]))))
    }

    fn tag(&self) -> &'static str {
        "udpr"
    }
}

/// Sends each message as one datagram to a fixed destination.
///
/// Delivery is fire-and-forget.
#[derive(Debug)]
pub struct UdpWriter {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpWriter {
    /// Resolve `host:port` once and bind an ephemeral local socket.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let dest = (host, port)
            .to_socket_addrs()
            .and_then(|mut addrs| {
                addrs.next().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found")
                })
            })
            .map_err(|e| TransportError::Resolve {
                addr: addr.clone(),
                source: e,
            })?;

        let local: SocketAddr = match dest {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).map_err(|e| TransportError::Bind {
            addr: local.to_string(),
            source: e,
        })?;

        info!(%addr, %dest, "udp writer created");

        Ok(Self { socket, dest })
    }

    pub fn destination(&self) -> SocketAddr {
        self.dest
    }
}

impl FrameSink for UdpWriter {
    fn write_frame(&mut self, message: &Message) -> Result<()> {
        self.socket.send_to(message.as_bytes(), self.dest)?;
        Ok(())
    }

    fn tag(&self) -> &'static str {
        "udpw"
    }
}
