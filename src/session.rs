use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::{decode_response, encode_request};
use crate::transport::{Transport, UdpTransport};
use crate::types::{Message, SIX_BIT_MAX};

/// Default RMCP port.
pub const DEFAULT_PORT: u16 = 623;

/// Default receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default retry count (configuration only; see [`SessionContext::retries`]).
pub const DEFAULT_RETRIES: u32 = 3;

/// How a response whose sequence number differs from the request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencePolicy {
    /// Log a warning and return the response anyway.
    #[default]
    Tolerant,
    /// Reject the response with a protocol error.
    Strict,
}

/// Connection parameters and state for one BMC.
///
/// A context is used through `&mut self`, so at most one request is in flight at a
/// time. The receive timeout is applied when the transport is opened; changing it
/// afterwards takes effect on the next [`open`](Self::open).
pub struct SessionContext {
    host: String,
    port: u16,
    timeout: Duration,
    retries: u32,
    sequence_policy: SequencePolicy,
    dump_packets: bool,
    next_seq: u32,
    transport: Option<Box<dyn Transport + Send>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// Create an unconfigured, closed context.
    pub fn new() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            sequence_policy: SequencePolicy::Tolerant,
            dump_packets: false,
            next_seq: 1,
            transport: None,
        }
    }

    /// Set the BMC host (IP literal or hostname) and port. A port of `0` keeps the current one.
    pub fn set_target(&mut self, host: impl Into<String>, port: u16) -> Result<()> {
        let host = host.into();
        if host.is_empty() {
            return Err(Error::InvalidArgument("host must not be empty"));
        }
        self.host = host;
        if port > 0 {
            self.port = port;
        }
        Ok(())
    }

    /// Set the receive timeout used by the next [`open`](Self::open).
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            return Err(Error::InvalidArgument("timeout must be non-zero"));
        }
        self.timeout = timeout;
        Ok(())
    }

    /// Set the configured retry count.
    pub fn set_retries(&mut self, retries: u32) {
        self.retries = retries;
    }

    /// Choose how sequence mismatches are handled.
    pub fn set_sequence_policy(&mut self, policy: SequencePolicy) {
        self.sequence_policy = policy;
    }

    /// Dump every sent and received frame at trace level.
    pub fn set_dump_packets(&mut self, enabled: bool) {
        self.dump_packets = enabled;
    }

    /// Target host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Target port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Configured receive timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Configured retry count.
    ///
    /// [`send_receive`](Self::send_receive) always makes a single attempt; retrying is
    /// left to an outer policy such as [`RetryPolicy`](crate::RetryPolicy).
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Sequence mismatch handling.
    pub fn sequence_policy(&self) -> SequencePolicy {
        self.sequence_policy
    }

    /// Whether a transport is open.
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Open a UDP transport with the configured timeout. Opening twice is a no-op.
    pub fn open(&mut self) -> Result<()> {
        if self.is_open() {
            tracing::warn!("transport already open");
            return Ok(());
        }
        let transport = UdpTransport::open(self.timeout)?;
        tracing::debug!(local = ?transport.local_addr().ok(), "transport opened");
        self.transport = Some(Box::new(transport));
        Ok(())
    }

    /// Use a caller-supplied transport instead of opening a UDP socket.
    ///
    /// Any previously open transport is dropped.
    pub fn open_with(&mut self, transport: Box<dyn Transport + Send>) {
        self.transport = Some(transport);
    }

    /// Close the transport. Closing a closed context is a no-op.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            tracing::debug!("transport closed");
        }
    }

    /// Return the current sequence counter and advance it.
    ///
    /// The counter is a wrapping `u32`; only its low 6 bits are sent.
    pub fn next_seq(&mut self) -> u32 {
        let current = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        current
    }

    /// Send one request and wait for one response.
    ///
    /// The request's sequence number is taken from the context counter. Performs
    /// exactly one send and at most one receive; never retries.
    ///
    /// # Errors
    ///
    /// - [`Error::Network`] when the context is not open, the host does not resolve,
    ///   or the datagram is only partially sent; [`Error::Io`] for OS-level failures.
    /// - [`Error::Timeout`] when nothing arrives within the timeout.
    /// - Encode/decode errors unchanged.
    /// - [`Error::Protocol`] on sequence mismatch under [`SequencePolicy::Strict`].
    pub fn send_receive(&mut self, request: &Message) -> Result<Message> {
        if self.transport.is_none() {
            return Err(Error::network("transport not open"));
        }

        let target = self.resolve()?;

        let seq = (self.next_seq() & u32::from(SIX_BIT_MAX)) as u8;
        let frame = encode_request(request, seq)?;

        let transport = self
            .transport
            .as_deref()
            .ok_or_else(|| Error::network("transport not open"))?;

        tracing::debug!(%target, len = frame.len(), seq, "sending request");
        crate::debug::dump_hex(self.dump_packets, "ipmi request", &frame);

        let sent = transport.send_to(&frame, target)?;
        if sent != frame.len() {
            return Err(Error::network(format!(
                "partial send: {sent}/{} bytes",
                frame.len()
            )));
        }

        let bytes = transport.recv()?;
        crate::debug::dump_hex(self.dump_packets, "ipmi response", &bytes);

        let response = decode_response(&bytes)?;

        if response.seq != seq {
            match self.sequence_policy {
                SequencePolicy::Tolerant => {
                    tracing::warn!(request = seq, response = response.seq, "sequence mismatch");
                }
                SequencePolicy::Strict => {
                    return Err(Error::protocol_owned(format!(
                        "sequence mismatch: request {seq}, response {}",
                        response.seq
                    )));
                }
            }
        }

        Ok(response)
    }

    /// Resolve the target: IP literals directly, anything else through the system resolver.
    fn resolve(&self) -> Result<SocketAddr> {
        if self.host.is_empty() {
            return Err(Error::network("no target host configured"));
        }

        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return match ip {
                IpAddr::V4(_) => Ok(SocketAddr::new(ip, self.port)),
                IpAddr::V6(_) => Err(Error::network(format!("IPv6 target {ip} unsupported"))),
            };
        }

        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::network(format!("cannot resolve {}: {e}", self.host)))?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| Error::network(format!("no IPv4 address for {}", self.host)))
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("sequence_policy", &self.sequence_policy)
            .field("next_seq", &self.next_seq)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use crate::error::ErrorKind;
    use crate::types::netfn;

    /// Replies to every request with the frames produced by `reply`.
    struct ScriptedTransport {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        accept: Option<usize>,
        reply: fn(&[u8]) -> Result<Vec<u8>>,
    }

    impl Transport for ScriptedTransport {
        fn send_to(&self, datagram: &[u8], _target: SocketAddr) -> Result<usize> {
            self.sent.lock().expect("lock").push(datagram.to_vec());
            Ok(self.accept.unwrap_or(datagram.len()))
        }

        fn recv(&self) -> Result<Vec<u8>> {
            let sent = self.sent.lock().expect("lock");
            (self.reply)(sent.last().expect("a request was sent"))
        }
    }

    /// A well-formed response echoing the request's seq (or `seq_delta` away from it).
    fn echo_response(request: &[u8], seq_delta: u8) -> Vec<u8> {
        let seq = (request[18] >> 2).wrapping_add(seq_delta) & 0x3F;
        let netfn = (request[15] >> 2) | 1;
        let response = Message::request(netfn, request[19], vec![0x00, 0xAB]);
        encode_request(&response, seq).expect("encode response")
    }

    fn context(reply: fn(&[u8]) -> Result<Vec<u8>>) -> (SessionContext, Arc<Mutex<Vec<Vec<u8>>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = SessionContext::new();
        ctx.set_target("127.0.0.1", 0).expect("target");
        ctx.open_with(Box::new(ScriptedTransport {
            sent: Arc::clone(&sent),
            accept: None,
            reply,
        }));
        (ctx, sent)
    }

    fn request() -> Message {
        Message::request(netfn::APP, 0x01, Vec::new())
    }

    #[test]
    fn defaults() {
        let ctx = SessionContext::new();
        assert_eq!(ctx.port(), 623);
        assert_eq!(ctx.timeout(), Duration::from_secs(5));
        assert_eq!(ctx.retries(), 3);
        assert_eq!(ctx.sequence_policy(), SequencePolicy::Tolerant);
        assert!(!ctx.is_open());
    }

    #[test]
    fn configuration_validation() {
        let mut ctx = SessionContext::new();
        assert!(matches!(ctx.set_target("", 623), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            ctx.set_timeout(Duration::ZERO),
            Err(Error::InvalidArgument(_))
        ));
        ctx.set_target("bmc.local", 9623).expect("target");
        ctx.set_target("bmc.local", 0).expect("target");
        assert_eq!(ctx.port(), 9623);
    }

    #[test]
    fn sequence_counter_post_increments() {
        let mut ctx = SessionContext::new();
        assert_eq!(ctx.next_seq(), 1);
        assert_eq!(ctx.next_seq(), 2);
    }

    #[test]
    fn request_carries_the_context_sequence() {
        let (mut ctx, sent) = context(|req| Ok(echo_response(req, 0)));

        let first = ctx.send_receive(&request()).expect("first");
        let second = ctx.send_receive(&request()).expect("second");

        assert_eq!(first.seq, 1);
        assert_eq!(second.seq, 2);
        assert_eq!(first.netfn, 0x07);
        assert_eq!(first.payload, vec![0x00, 0xAB]);

        let sent = sent.lock().expect("lock");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0][18], 1 << 2);
        assert_eq!(sent[1][18], 2 << 2);
    }

    #[test]
    fn sequence_wraps_on_the_wire() {
        let (mut ctx, sent) = context(|req| Ok(echo_response(req, 0)));
        for _ in 0..63 {
            ctx.next_seq();
        }
        // Counter is now 64: low 6 bits are zero.
        let response = ctx.send_receive(&request()).expect("send");
        assert_eq!(response.seq, 0);
        assert_eq!(sent.lock().expect("lock")[0][18], 0x00);
    }

    #[test]
    fn sequence_mismatch_is_tolerated_by_default() {
        let (mut ctx, _) = context(|req| Ok(echo_response(req, 5)));
        let response = ctx.send_receive(&request()).expect("tolerated");
        assert_eq!(response.seq, 6);
    }

    #[test]
    fn strict_policy_rejects_sequence_mismatch() {
        let (mut ctx, _) = context(|req| Ok(echo_response(req, 5)));
        ctx.set_sequence_policy(SequencePolicy::Strict);
        let err = ctx.send_receive(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn timeout_propagates_unchanged() {
        let (mut ctx, sent) = context(|_| Err(Error::Timeout));
        assert!(matches!(ctx.send_receive(&request()), Err(Error::Timeout)));
        // One attempt only.
        assert_eq!(sent.lock().expect("lock").len(), 1);
    }

    #[test]
    fn decode_errors_propagate() {
        let (mut ctx, _) = context(|req| {
            let mut frame = echo_response(req, 0);
            let last = frame.len() - 1;
            frame[last] ^= 0xFF;
            Ok(frame)
        });
        let err = ctx.send_receive(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn partial_send_is_a_network_error() {
        let mut ctx = SessionContext::new();
        ctx.set_target("127.0.0.1", 0).expect("target");
        ctx.open_with(Box::new(ScriptedTransport {
            sent: Arc::new(Mutex::new(Vec::new())),
            accept: Some(3),
            reply: |_| Err(Error::Timeout),
        }));
        let err = ctx.send_receive(&request()).unwrap_err();
        assert!(matches!(err, Error::Network(_)), "got {err:?}");
    }

    #[test]
    fn closed_or_unresolvable_context_is_a_network_error() {
        let mut ctx = SessionContext::new();
        ctx.set_target("127.0.0.1", 0).expect("target");
        let err = ctx.send_receive(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);

        let (mut ctx, sent) = context(|req| Ok(echo_response(req, 0)));
        ctx.set_target("::1", 0).expect("target");
        let err = ctx.send_receive(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(sent.lock().expect("lock").is_empty());

        ctx.set_target("no-such-host.invalid", 0).expect("target");
        let err = ctx.send_receive(&request()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn open_and_close_udp_transport() {
        let mut ctx = SessionContext::new();
        ctx.set_timeout(Duration::from_millis(200)).expect("timeout");
        ctx.open().expect("open");
        assert!(ctx.is_open());
        ctx.open().expect("second open is a no-op");
        ctx.close();
        assert!(!ctx.is_open());
        ctx.close();
    }
}
