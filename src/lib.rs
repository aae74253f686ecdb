#![deny(unsafe_code)]
#![warn(missing_docs)]

//! A blocking IPMI-over-RMCP client for querying BMC devices.
//!
//! The crate implements the sessionless (authentication type "none") IPMI v1.5 LAN
//! profile over UDP:
//! - RMCP/IPMI frame encoding and validating decode, with both IPMI checksums
//! - A [`SessionContext`] that owns the UDP endpoint, the request sequence counter and
//!   the receive timeout, and performs one send plus one timed receive per request
//! - Typed commands (`Get Device ID`, `Get Chassis Status`, ...) on top
//!
//! Events are emitted through `tracing`; enable the `metrics` feature for request
//! counters and latency histograms.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! let mut client = bmc_ipmi::Client::builder("192.168.1.100")
//!     .timeout(Duration::from_secs(2))
//!     .build()?;
//! let id = client.get_device_id()?;
//! println!("firmware {}.{:02x}", id.firmware_major, id.firmware_minor);
//! # Ok::<(), bmc_ipmi::Error>(())
//! ```

mod checksum;
mod client;
pub mod commands;
mod debug;
mod error;
mod observe;
mod protocol;
mod session;
mod transport;
mod types;
mod wire;

pub use crate::checksum::{checksum, verify_checksum};
pub use crate::client::{Client, ClientBuilder, RetryPolicy};
pub use crate::debug::{command_name, describe_frame, hexdump, manufacturer_name, netfn_name};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::protocol::{
    MIN_FRAME_LEN, decode_response, encode_request, encode_request_into, encoded_len,
};
pub use crate::session::{
    DEFAULT_PORT, DEFAULT_RETRIES, DEFAULT_TIMEOUT, SequencePolicy, SessionContext,
};
pub use crate::transport::{Transport, UdpTransport};
pub use crate::types::{
    ChassisControl, ChassisStatus, DeviceId, FrontPanelControls, LastPowerEvent, MAX_PAYLOAD_LEN,
    MAX_WIRE_PAYLOAD_LEN, Message, PowerRestorePolicy, SelfTestDeviceError, SelfTestResult,
    SystemGuid, netfn,
};
