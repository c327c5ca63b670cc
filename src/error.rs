//! Error types

use crate::socket::SocketHandle;
use crate::stack::StackCode;
use std::io;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
///
/// Nothing in this crate retries on its own: every error is surfaced to the
/// caller, who owns the retry policy.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument was rejected before any call into the stack
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Negative handle (or a descriptor referencing one)
    #[error("invalid socket handle {0}")]
    InvalidHandle(SocketHandle),

    /// Allocation or configuration of an endpoint failed
    #[error("{op} failed: {code}")]
    Unavailable {
        /// Step that failed
        op: &'static str,
        /// Vendor code
        code: StackCode,
    },

    /// Hostname resolution did not succeed
    #[error("failed to resolve '{host}': {code}")]
    ResolutionFailed {
        /// Hostname
        host: String,
        /// Vendor code
        code: StackCode,
    },

    /// Connect failed for a reason other than an untrusted root
    #[error("connect to {host}:{port} failed: {code}")]
    ConnectFailed {
        /// Hostname
        host: String,
        /// Port
        port: u16,
        /// Vendor code
        code: StackCode,
    },

    /// The peer presented a certificate chaining to an untrusted root CA
    #[error("security check failed: unknown root CA presented by {host}:{port}")]
    UntrustedRoot {
        /// Hostname
        host: String,
        /// Port
        port: u16,
    },

    /// The select primitive failed
    #[error("poll failed: {0}")]
    PollFailed(StackCode),

    /// Send or receive failed
    #[error("{op} on socket {handle} failed: {code}")]
    Transport {
        /// `"send"` or `"recv"`
        op: &'static str,
        /// Socket
        handle: SocketHandle,
        /// Vendor code
        code: StackCode,
    },

    /// The multiplexer reported an error condition on the socket
    #[error("socket {0} reported an error condition")]
    SocketError(SocketHandle),

    /// Invalid state for the requested operation
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Configuration error
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON configuration parse error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (reading configuration files)
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether the error is a failed security check that must never be
    /// retried or downgraded
    pub fn is_security_failure(&self) -> bool {
        matches!(self, Error::UntrustedRoot { .. })
    }

    /// Vendor code behind the error, if any
    pub fn stack_code(&self) -> Option<StackCode> {
        match self {
            Error::Unavailable { code, .. }
            | Error::ResolutionFailed { code, .. }
            | Error::ConnectFailed { code, .. }
            | Error::Transport { code, .. } => Some(*code),
            Error::PollFailed(code) => Some(*code),
            _ => None,
        }
    }

    /// Short label for metrics
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::InvalidHandle(_) => "invalid_handle",
            Error::Unavailable { .. } => "unavailable",
            Error::ResolutionFailed { .. } => "resolution_failed",
            Error::ConnectFailed { .. } => "connect_failed",
            Error::UntrustedRoot { .. } => "untrusted_root",
            Error::PollFailed(_) => "poll_failed",
            Error::Transport { .. } => "transport",
            Error::SocketError(_) => "socket_error",
            Error::InvalidState { .. } => "invalid_state",
            Error::Config(_) => "config",
            Error::Json(_) => "json",
            Error::Io(_) => "io",
        }
    }
}
