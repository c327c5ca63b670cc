//! Underlying network stack abstraction
//!
//! This module handles:
//! * The [`NetworkStack`] capability the socket layer is written against
//! * Typed vendor socket options
//! * Vendor status codes and their distinguished sentinels
//! * Handle sets for the select primitive
//!
//! The vendor stack owns all per-socket state (buffers, registration tables,
//! TLS sessions). The socket layer itself is stateless and only translates.

mod code;
pub mod fake;
mod handle_set;

pub use code::{StackCode, StackResult};
pub use handle_set::{bound_of, HandleSet};

use crate::config::TlsVersion;
use crate::socket::{SocketHandle, SocketType};
use crate::time::DeviceDateTime;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

/// What to allocate when asking the stack for a new endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketKind {
    /// Stream or datagram
    pub socket_type: SocketType,
    /// Whether the endpoint is handled by the on-device TLS engine
    pub secure: bool,
}

/// Vendor socket option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketOption {
    /// Switch the endpoint between blocking and non-blocking mode
    NonBlocking(bool),
    /// TLS protocol version used by the secure endpoint
    SecureMethod(TlsVersion),
    /// Flash file holding the trusted root CA(s)
    TrustedRootFile(String),
    /// Hostname the peer certificate subject must match
    DomainNameVerification(String),
    /// Bypass the on-board certificate catalog (and its CRL)
    DisableCertificateStore,
}

impl SocketOption {
    /// Discriminant without payload, used for logging and fault injection
    pub fn kind(&self) -> OptionKind {
        match self {
            Self::NonBlocking(_) => OptionKind::NonBlocking,
            Self::SecureMethod(_) => OptionKind::SecureMethod,
            Self::TrustedRootFile(_) => OptionKind::TrustedRootFile,
            Self::DomainNameVerification(_) => OptionKind::DomainNameVerification,
            Self::DisableCertificateStore => OptionKind::DisableCertificateStore,
        }
    }
}

/// Payload-free socket option identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    /// [`SocketOption::NonBlocking`]
    NonBlocking,
    /// [`SocketOption::SecureMethod`]
    SecureMethod,
    /// [`SocketOption::TrustedRootFile`]
    TrustedRootFile,
    /// [`SocketOption::DomainNameVerification`]
    DomainNameVerification,
    /// [`SocketOption::DisableCertificateStore`]
    DisableCertificateStore,
}

impl OptionKind {
    /// Snake-case name, used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonBlocking => "non_blocking",
            Self::SecureMethod => "secure_method",
            Self::TrustedRootFile => "trusted_root_file",
            Self::DomainNameVerification => "domain_name_verification",
            Self::DisableCertificateStore => "disable_certificate_store",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitives offered by the vendor network stack
///
/// Every method maps one-to-one onto a vendor call. Failures are reported as
/// raw [`StackCode`]s; interpreting them is the socket layer's job.
///
/// Implementations are driven from a single thread. Methods take `&mut self`
/// so the owner serializes access.
pub trait NetworkStack {
    /// Allocate a new endpoint
    fn socket(&mut self, kind: SocketKind) -> StackResult<SocketHandle>;

    /// Apply a socket option
    fn set_option(&mut self, handle: SocketHandle, option: &SocketOption) -> StackResult<()>;

    /// Set the device date used for certificate validity checks
    fn set_date_time(&mut self, date_time: &DeviceDateTime) -> StackResult<()>;

    /// Resolve a hostname to an IPv4 address
    fn resolve(&mut self, host: &str) -> StackResult<Ipv4Addr>;

    /// Start (or continue) a connect; non-blocking endpoints report
    /// [`StackCode::ALREADY`] while the handshake is in flight
    fn connect(&mut self, handle: SocketHandle, addr: SocketAddrV4) -> StackResult<()>;

    /// Send bytes, returning how many were accepted
    fn send(&mut self, handle: SocketHandle, buf: &[u8]) -> StackResult<usize>;

    /// Receive bytes; `Ok(0)` means the peer closed the connection
    fn recv(&mut self, handle: SocketHandle, buf: &mut [u8]) -> StackResult<usize>;

    /// Release the endpoint
    fn close(&mut self, handle: SocketHandle) -> StackResult<()>;

    /// Wait up to `timeout` for readiness on the given sets
    ///
    /// On return each set contains only its ready handles. Returns the number
    /// of ready handles, `Ok(0)` on timeout.
    fn select(
        &mut self,
        read: &mut HandleSet,
        write: &mut HandleSet,
        error: &mut HandleSet,
        timeout: Duration,
    ) -> StackResult<usize>;
}

impl<S: NetworkStack + ?Sized> NetworkStack for &mut S {
    fn socket(&mut self, kind: SocketKind) -> StackResult<SocketHandle> {
        (**self).socket(kind)
    }

    fn set_option(&mut self, handle: SocketHandle, option: &SocketOption) -> StackResult<()> {
        (**self).set_option(handle, option)
    }

    fn set_date_time(&mut self, date_time: &DeviceDateTime) -> StackResult<()> {
        (**self).set_date_time(date_time)
    }

    fn resolve(&mut self, host: &str) -> StackResult<Ipv4Addr> {
        (**self).resolve(host)
    }

    fn connect(&mut self, handle: SocketHandle, addr: SocketAddrV4) -> StackResult<()> {
        (**self).connect(handle, addr)
    }

    fn send(&mut self, handle: SocketHandle, buf: &[u8]) -> StackResult<usize> {
        (**self).send(handle, buf)
    }

    fn recv(&mut self, handle: SocketHandle, buf: &mut [u8]) -> StackResult<usize> {
        (**self).recv(handle, buf)
    }

    fn close(&mut self, handle: SocketHandle) -> StackResult<()> {
        (**self).close(handle)
    }

    fn select(
        &mut self,
        read: &mut HandleSet,
        write: &mut HandleSet,
        error: &mut HandleSet,
        timeout: Duration,
    ) -> StackResult<usize> {
        (**self).select(read, write, error, timeout)
    }
}
