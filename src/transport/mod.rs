use std::net::SocketAddr;

use crate::error::Result;

/// A synchronous datagram transport for RMCP/IPMI frames.
///
/// A session performs exactly one [`send_to`](Transport::send_to) followed by at most
/// one [`recv`](Transport::recv) per request.
pub trait Transport {
    /// Send one datagram to `target`, returning the number of bytes the OS accepted.
    fn send_to(&self, datagram: &[u8], target: SocketAddr) -> Result<usize>;

    /// Block for one datagram, bounded by the transport's receive timeout.
    ///
    /// A timeout must be reported as [`Error::Timeout`](crate::Error::Timeout).
    fn recv(&self) -> Result<Vec<u8>>;
}

pub(crate) mod blocking;

pub use blocking::UdpTransport;
