//! bsp-io-net: a non-blocking socket shim for board-support layers
//!
//! This crate exposes a small, portable socket contract (create, connect, read,
//! write, close, poll) to an upper-level protocol stack while delegating the
//! actual transport to a vendor network stack.
//!
//! The vendor stack is injected through the [`stack::NetworkStack`] trait. Its
//! non-standard sentinels ("would block", "already in progress", "unknown root
//! CA") are translated into a uniform [`Status`] / [`Error`] taxonomy:
//!
//! * [`socket::SocketManager`]: socket creation, secure-mode setup, connect,
//!   read/write framing and close
//! * [`select::Multiplexer`]: select-style readiness polling over many sockets
//! * [`connection::Connection`]: caller-side per-socket state machine
//!
//! # Example
//!
//! ```ignore
//! use bsp_io_net::{NetConfig, SocketManager, SocketEvents, Interest};
//! use bsp_io_net::stack::fake::FakeStack;
//! use std::time::Duration;
//!
//! let mut stack = FakeStack::new();
//! stack.add_host("example.com", [93, 184, 216, 34].into());
//!
//! let mut manager = SocketManager::new(stack, NetConfig::default());
//! let handle = manager.connect_or_create("example.com", 443, Default::default())?;
//!
//! let mut events = [SocketEvents::new(handle, Interest::write())];
//! manager.poll(&mut events, Duration::from_secs(5))?;
//! if events[0].readiness().can_write {
//!     manager.write(handle, b"GET /\r\n")?;
//! }
//! manager.close(handle)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod secure;
pub mod select;
pub mod socket;
pub mod stack;
pub mod time;

pub use config::{NetConfig, NetConfigBuilder, SocketMode, TimeoutPolicy, TlsVersion};
pub use connection::{Connection, SocketState};
pub use error::{Error, Result};
pub use select::{Interest, Multiplexer, Readiness, SocketEvents};
pub use socket::{ConnectProgress, SocketHandle, SocketManager, SocketType, Status, Transfer};
