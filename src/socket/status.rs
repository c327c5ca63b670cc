//! Data-path outcomes

use std::fmt;

/// Non-error outcome of a read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Bytes were moved
    Ok,
    /// The operation would block; retry once the multiplexer reports readiness
    Busy,
    /// The peer closed the connection; terminal for this handle
    ConnectionReset,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Busy => write!(f, "busy"),
            Self::ConnectionReset => write!(f, "connection_reset"),
        }
    }
}

/// Result of one read or write: bytes moved and how it went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Number of bytes moved (always 0 unless `status` is [`Status::Ok`])
    pub bytes: usize,
    /// Outcome
    pub status: Status,
}

impl Transfer {
    /// `n` bytes moved
    pub fn ok(bytes: usize) -> Self {
        Self {
            bytes,
            status: Status::Ok,
        }
    }

    /// Nothing moved, try again later
    pub fn busy() -> Self {
        Self {
            bytes: 0,
            status: Status::Busy,
        }
    }

    /// Peer closed
    pub fn reset() -> Self {
        Self {
            bytes: 0,
            status: Status::ConnectionReset,
        }
    }

    /// Whether the caller should wait for readiness and retry
    pub fn is_busy(&self) -> bool {
        self.status == Status::Busy
    }

    /// Whether the handle must now be closed
    pub fn is_terminal(&self) -> bool {
        self.status == Status::ConnectionReset
    }
}

/// Outcome of a successful connect call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectProgress {
    /// The connection is established
    Connected,
    /// The handshake is still running; call connect again or poll for
    /// connect-finished
    InProgress,
}

impl fmt::Display for ConnectProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::InProgress => write!(f, "in_progress"),
        }
    }
}
