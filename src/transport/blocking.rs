use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Receive buffer size.
///
/// The largest sessionless frame is 269 bytes; anything beyond this is not IPMI.
const DEFAULT_MAX_PACKET_SIZE: usize = 1024;

/// Blocking UDP transport for RMCP/IPMI.
///
/// The socket is unconnected: every send names its target, and the receive timeout is
/// fixed when the transport is opened.
pub struct UdpTransport {
    socket: UdpSocket,
    max_packet_size: usize,
}

impl UdpTransport {
    /// Create an IPv4 UDP endpoint on an ephemeral port with the given receive timeout.
    pub fn open(timeout: Duration) -> Result<Self> {
        Self::bind(SocketAddr::from(([0, 0, 0, 0], 0)), timeout)
    }

    /// Create a UDP endpoint bound to `local` with the given receive timeout.
    pub fn bind(local: SocketAddr, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::InvalidArgument("timeout must be non-zero"));
        }

        let socket = UdpSocket::bind(local)?;
        socket.set_read_timeout(Some(timeout))?;

        Ok(Self {
            socket,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        })
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn send_to(&self, datagram: &[u8], target: SocketAddr) -> Result<usize> {
        Ok(self.socket.send_to(datagram, target)?)
    }

    fn recv(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.max_packet_size];
        match self.socket.recv_from(&mut buf) {
            Ok((n, from)) => {
                tracing::debug!(%from, len = n, "received datagram");
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if is_timeout(&e) => Err(Error::Timeout),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.socket.local_addr().ok())
            .field("max_packet_size", &self.max_packet_size)
            .finish()
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
