//! Event multiplexing
//!
//! This module handles:
//! * Interest and readiness descriptors, one per socket
//! * Translating descriptors to and from the stack's select sets
//! * Bounded waiting with a fixed internal slice

mod event;
mod multiplexer;

pub use event::{reset_all, Interest, Readiness, SocketEvents};
pub use multiplexer::{InterestSets, Multiplexer};
