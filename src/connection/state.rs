//! Socket state machine

use crate::{Error, Result};

/// Caller-side socket state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// Created, connect not yet issued
    Unconnected,

    /// Connect issued, handshake in flight
    Connecting,

    /// Connected, data path usable
    Connected,

    /// Peer closed the connection; only close is allowed
    PeerClosed,

    /// Closed
    Closed,
}

impl SocketState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: SocketState) -> bool {
        use SocketState::*;

        matches!(
            (self, next),
            (Unconnected, Connecting)
                | (Unconnected, Connected)
                | (Connecting, Connected)
                | (Connected, PeerClosed)
                | (_, Closed)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: SocketState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {:?}", self),
                actual: format!("{:?}", next),
            });
        }
        *self = next;
        Ok(())
    }

    /// Whether the data path may be used
    pub fn can_transfer(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl std::fmt::Display for SocketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconnected => write!(f, "unconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::PeerClosed => write!(f, "peer_closed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
