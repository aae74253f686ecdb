use std::fmt;
use std::io;

use thiserror::Error;

/// Result type used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid caller-supplied argument (out-of-range NetFn, oversize payload, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Caller-supplied buffer is smaller than the encoded frame.
    #[error("buffer too small: {required} bytes required, {available} available")]
    Capacity {
        /// Bytes needed for the frame.
        required: usize,
        /// Bytes available in the caller's buffer.
        available: usize,
    },

    /// I/O error (socket creation, send, receive).
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Network failure that is not an OS error (resolution, short write, closed socket).
    #[error("network error: {0}")]
    Network(String),

    /// No response arrived within the configured receive timeout.
    #[error("timeout waiting for response")]
    Timeout,

    /// Peer responded with an unexpected or invalid packet.
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// Peer responded with an unexpected or invalid packet.
    #[error("protocol error: {0}")]
    ProtocolOwned(String),

    /// An IPMI command completed with a non-zero completion code.
    #[error("ipmi completion code: {completion_code:#04x}")]
    CompletionCode {
        /// Raw completion code returned by the BMC.
        completion_code: u8,
    },
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Null or out-of-range input to an encode/build call.
    InvalidParameter,
    /// Buffer too small, or length arithmetic exceeds wire limits.
    Capacity,
    /// Socket, resolution, send or receive failure.
    Network,
    /// No response within the configured window.
    Timeout,
    /// Malformed frame, checksum mismatch, truncation, non-zero completion code.
    Protocol,
}

impl ErrorKind {
    /// Short, stable label (used for metric labels and log fields).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameter => "invalid_parameter",
            Self::Capacity => "capacity",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub(crate) fn protocol_owned(msg: impl Into<String>) -> Self {
        Self::ProtocolOwned(msg.into())
    }

    pub(crate) fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidParameter,
            Self::Capacity { .. } => ErrorKind::Capacity,
            Self::Io(_) | Self::Network(_) => ErrorKind::Network,
            Self::Timeout => ErrorKind::Timeout,
            Self::Protocol(_) | Self::ProtocolOwned(_) | Self::CompletionCode { .. } => {
                ErrorKind::Protocol
            }
        }
    }

    /// The completion code, if this error came from a non-zero completion code.
    pub fn completion_code(&self) -> Option<u8> {
        match self {
            Self::CompletionCode { completion_code } => Some(*completion_code),
            _ => None,
        }
    }
}
