use std::time::{Duration, Instant};

use crate::commands::{
    ChassisControlCommand, ColdReset, Command, GetChassisStatus, GetDeviceId, GetSelfTestResults,
    GetSystemGuid, WarmReset,
};
use crate::error::{Error, Result};
use crate::session::{
    DEFAULT_PORT, DEFAULT_RETRIES, DEFAULT_TIMEOUT, SequencePolicy, SessionContext,
};
use crate::types::{ChassisControl, ChassisStatus, DeviceId, Message, SelfTestResult, SystemGuid};

/// Outer retry policy for [`Client`] requests.
///
/// [`SessionContext::send_receive`] makes exactly one attempt. A policy with more than
/// one attempt re-sends only after [`Error::Timeout`]; every other error is returned
/// at once. Each attempt uses a fresh sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

impl RetryPolicy {
    /// One attempt, no retries.
    pub const fn single_attempt() -> Self {
        Self { max_attempts: 1 }
    }

    /// Up to `attempts` sends per request (including the first). `0` is treated as `1`.
    pub fn attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts.max(1),
        }
    }

    /// Maximum sends per request.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn run<T>(&self, mut attempt: impl FnMut() -> Result<T>) -> (Result<T>, u32) {
        let mut n = 0;
        loop {
            n += 1;
            match attempt() {
                Err(Error::Timeout) if n < self.max_attempts => {
                    tracing::debug!(attempt = n, max = self.max_attempts, "timeout, retrying");
                }
                result => return (result, n),
            }
        }
    }
}

/// A blocking, sessionless IPMI client.
///
/// `Client` owns a [`SessionContext`] and issues typed commands over UDP port 623.
#[derive(Debug)]
pub struct Client {
    ctx: SessionContext,
    retry: RetryPolicy,
}

/// Builder for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    host: String,
    port: u16,
    timeout: Duration,
    retries: u32,
    retry_on_timeout: bool,
    sequence_policy: SequencePolicy,
    dump_packets: bool,
}

impl ClientBuilder {
    /// Create a new builder for `host` (IP literal or hostname).
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_on_timeout: false,
            sequence_policy: SequencePolicy::Tolerant,
            dump_packets: false,
        }
    }

    /// Set the UDP port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set UDP receive timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count stored in the session context.
    ///
    /// It only affects requests when [`retry_on_timeout`](Self::retry_on_timeout) is enabled,
    /// in which case it is the number of send attempts per request.
    pub fn retries(mut self, attempts: u32) -> Self {
        self.retries = attempts;
        self
    }

    /// Re-send a request after a receive timeout, up to the configured retry count.
    pub fn retry_on_timeout(mut self, enabled: bool) -> Self {
        self.retry_on_timeout = enabled;
        self
    }

    /// Reject responses whose sequence number does not match the request.
    pub fn strict_sequence(mut self, strict: bool) -> Self {
        self.sequence_policy = if strict {
            SequencePolicy::Strict
        } else {
            SequencePolicy::Tolerant
        };
        self
    }

    /// Dump every frame at trace level.
    pub fn dump_packets(mut self, enabled: bool) -> Self {
        self.dump_packets = enabled;
        self
    }

    /// Configure the session context without opening it.
    pub fn build_context(&self) -> Result<SessionContext> {
        let mut ctx = SessionContext::new();
        ctx.set_target(self.host.clone(), self.port)?;
        ctx.set_timeout(self.timeout)?;
        ctx.set_retries(self.retries);
        ctx.set_sequence_policy(self.sequence_policy);
        ctx.set_dump_packets(self.dump_packets);
        Ok(ctx)
    }

    /// Open the UDP endpoint and build the [`Client`].
    pub fn build(self) -> Result<Client> {
        let mut ctx = self.build_context()?;
        ctx.open()?;

        let retry = if self.retry_on_timeout {
            RetryPolicy::attempts(self.retries)
        } else {
            RetryPolicy::single_attempt()
        };

        Ok(Client { ctx, retry })
    }
}

impl Client {
    /// Create a [`ClientBuilder`].
    pub fn builder(host: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(host)
    }

    /// Wrap an already configured (and usually opened) context. Single attempt per request.
    pub fn from_context(ctx: SessionContext) -> Self {
        Self {
            ctx,
            retry: RetryPolicy::single_attempt(),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying session context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Mutable access to the underlying session context.
    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx
    }

    /// Execute a typed command (single request/response, subject to the retry policy).
    pub fn execute<C: Command>(&mut self, command: C) -> Result<C::Output> {
        let response = self.send_raw(C::NETFN, C::CMD, &command.request_data())?;
        command.parse_response(&response)
    }

    /// Send a raw IPMI request and return the raw response message.
    ///
    /// The response payload starts with the completion code; it is not checked here.
    pub fn send_raw(&mut self, netfn: u8, cmd: u8, data: &[u8]) -> Result<Message> {
        let request = Message::request(netfn, cmd, data);
        let start = Instant::now();
        let ctx = &mut self.ctx;
        let (result, attempts) = self.retry.run(|| ctx.send_receive(&request));
        let elapsed = start.elapsed();
        match &result {
            Ok(resp) => {
                crate::observe::record_ok(netfn, cmd, attempts, elapsed, resp.completion_code())
            }
            Err(err) => crate::observe::record_err(netfn, cmd, attempts, elapsed, err),
        }
        result
    }

    /// `Get Device ID` (App NetFn, cmd 0x01).
    pub fn get_device_id(&mut self) -> Result<DeviceId> {
        self.execute(GetDeviceId)
    }

    /// `Get Self Test Results` (App NetFn, cmd 0x04).
    pub fn get_self_test_results(&mut self) -> Result<SelfTestResult> {
        self.execute(GetSelfTestResults)
    }

    /// `Get System GUID` (App NetFn, cmd 0x37).
    pub fn get_system_guid(&mut self) -> Result<SystemGuid> {
        self.execute(GetSystemGuid)
    }

    /// `Cold Reset` (App NetFn, cmd 0x02).
    pub fn cold_reset(&mut self) -> Result<()> {
        self.execute(ColdReset)
    }

    /// `Warm Reset` (App NetFn, cmd 0x03).
    pub fn warm_reset(&mut self) -> Result<()> {
        self.execute(WarmReset)
    }

    /// `Get Chassis Status` (Chassis NetFn, cmd 0x01).
    pub fn get_chassis_status(&mut self) -> Result<ChassisStatus> {
        self.execute(GetChassisStatus)
    }

    /// `Chassis Control` (Chassis NetFn, cmd 0x02).
    pub fn chassis_control(&mut self, control: ChassisControl) -> Result<()> {
        self.execute(ChassisControlCommand { control })
    }

    /// Close the UDP endpoint. Later requests fail with a network error.
    pub fn close(&mut self) {
        self.ctx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    #[test]
    fn retry_policy_retries_only_timeouts() {
        let calls = Cell::new(0);
        let (result, attempts) = RetryPolicy::attempts(3).run(|| {
            calls.set(calls.get() + 1);
            Err::<(), _>(Error::Timeout)
        });
        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(attempts, 3);
        assert_eq!(calls.get(), 3);

        let (result, attempts) =
            RetryPolicy::attempts(3).run(|| Err::<(), _>(Error::Protocol("bad")));
        assert!(matches!(result, Err(Error::Protocol("bad"))));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn retry_policy_stops_at_first_success() {
        let calls = Cell::new(0);
        let (result, attempts) = RetryPolicy::attempts(5).run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(Error::Timeout)
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result.expect("ok"), 2);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::attempts(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::default(), RetryPolicy::single_attempt());
    }

    #[test]
    fn builder_configures_context() {
        let ctx = Client::builder("10.0.0.5")
            .port(9623)
            .timeout(Duration::from_millis(250))
            .retries(4)
            .strict_sequence(true)
            .build_context()
            .expect("context");
        assert_eq!(ctx.host(), "10.0.0.5");
        assert_eq!(ctx.port(), 9623);
        assert_eq!(ctx.timeout(), Duration::from_millis(250));
        assert_eq!(ctx.retries(), 4);
        assert_eq!(ctx.sequence_policy(), SequencePolicy::Strict);
        assert!(!ctx.is_open());

        let err = Client::builder("").build().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
