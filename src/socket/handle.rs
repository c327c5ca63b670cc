//! Socket handles and socket types

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one transport endpoint
///
/// Handles are assigned by the underlying stack and are only valid between a
/// successful create and the matching close. Negative values are never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketHandle(i32);

impl SocketHandle {
    /// Placeholder for "no socket"
    pub const INVALID: SocketHandle = SocketHandle(-1);

    /// Wrap a raw handle value
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw handle value
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Whether the handle could refer to an endpoint
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Return the handle, or [`Error::InvalidHandle`] if it is negative
    pub fn validate(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(Error::InvalidHandle(self))
        }
    }
}

impl Default for SocketHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SocketHandle {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

/// Transport type requested at allocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketType {
    /// Connection-oriented byte stream
    #[default]
    Stream,
    /// Datagrams
    Datagram,
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => write!(f, "stream"),
            Self::Datagram => write!(f, "datagram"),
        }
    }
}
