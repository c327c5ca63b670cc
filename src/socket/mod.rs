//! Socket lifecycle
//!
//! This module handles:
//! * Socket handles and types
//! * Creation in plain or secure mode, with rollback on partial failure
//! * Non-blocking connect, read, write and close
//! * Mapping vendor sentinels onto [`Status`] and [`crate::Error`]

mod guard;
mod handle;
mod manager;
mod status;

pub use handle::{SocketHandle, SocketType};
pub use manager::{SocketManager, READ_BUF_LIMIT};
pub use status::{ConnectProgress, Status, Transfer};
