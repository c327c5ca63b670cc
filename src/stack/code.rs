//! Vendor status codes
//!
//! The vendor stack reports failures as negative integers in the return value
//! of every primitive. A handful of them are not failures at all ("would
//! block", "already in progress") and one is a security verdict ("unknown root
//! CA"); the socket layer needs to tell those apart from everything else.

use std::fmt;

/// Result type returned by every [`NetworkStack`](super::NetworkStack) primitive.
pub type StackResult<T> = std::result::Result<T, StackCode>;

/// Raw vendor error value (always negative when produced by a stack)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackCode(pub i32);

impl StackCode {
    /// Bad socket descriptor (closed or never allocated)
    pub const BAD_DESCRIPTOR: StackCode = StackCode(-9);

    /// System limit on concurrently open sockets reached
    pub const TOO_MANY_SOCKETS: StackCode = StackCode(-10);

    /// Operation would block on a non-blocking socket
    pub const WOULD_BLOCK: StackCode = StackCode(-11);

    /// Stack ran out of memory
    pub const OUT_OF_MEMORY: StackCode = StackCode(-12);

    /// Invalid argument passed to a primitive
    pub const INVALID_ARGUMENT: StackCode = StackCode(-22);

    /// Peer reset the connection
    pub const CONNECTION_RESET: StackCode = StackCode(-104);

    /// Socket is not connected
    pub const NOT_CONNECTED: StackCode = StackCode(-107);

    /// Peer refused the connection
    pub const CONNECTION_REFUSED: StackCode = StackCode(-111);

    /// Non-blocking connect already in progress
    pub const ALREADY: StackCode = StackCode(-114);

    /// Resolver could not find the host
    pub const HOST_NOT_FOUND: StackCode = StackCode(-161);

    /// Device date is outside the peer certificate's validity window
    pub const DATE_ERROR: StackCode = StackCode(-461);

    /// Peer certificate chains to a root CA the device does not trust
    pub const UNKNOWN_ROOT_CA: StackCode = StackCode(-468);

    /// Raw integer value
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Whether this is the "would block" sentinel
    pub fn is_would_block(self) -> bool {
        self == Self::WOULD_BLOCK
    }

    /// Whether this is the "connect already in progress" sentinel
    pub fn is_in_progress(self) -> bool {
        self == Self::ALREADY
    }

    /// Whether this is the "unknown root CA" security verdict
    pub fn is_untrusted_root(self) -> bool {
        self == Self::UNKNOWN_ROOT_CA
    }

    /// Symbolic name for well-known codes
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::BAD_DESCRIPTOR => "EBADF",
            Self::TOO_MANY_SOCKETS => "ENSOCK",
            Self::WOULD_BLOCK => "EAGAIN",
            Self::OUT_OF_MEMORY => "ENOMEM",
            Self::INVALID_ARGUMENT => "EINVAL",
            Self::CONNECTION_RESET => "ECONNRESET",
            Self::NOT_CONNECTED => "ENOTCONN",
            Self::CONNECTION_REFUSED => "ECONNREFUSED",
            Self::ALREADY => "EALREADY",
            Self::HOST_NOT_FOUND => "EHOSTNOTFOUND",
            Self::DATE_ERROR => "ESECDATEERROR",
            Self::UNKNOWN_ROOT_CA => "ESECUNKNOWNROOTCA",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StackCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<i32> for StackCode {
    fn from(raw: i32) -> Self {
        StackCode(raw)
    }
}
