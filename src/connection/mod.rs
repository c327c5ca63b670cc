//! Connection management
//!
//! This module handles:
//! * Caller-side socket lifecycle (connecting, connected, peer closed)
//! * State machine enforcement
//! * Deriving poll interest from socket state

mod conn;
mod state;

pub use conn::Connection;
pub use state::SocketState;
