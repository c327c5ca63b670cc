//! Socket lifecycle manager

use super::guard::PendingSocket;
use super::{ConnectProgress, SocketHandle, SocketType, Transfer};
use crate::config::{NetConfig, SocketMode};
use crate::metrics::{counters, labels};
use crate::secure::{self, CertificateStore, PreinstalledCertificates};
use crate::select::{Multiplexer, SocketEvents};
use crate::stack::{NetworkStack, SocketKind, SocketOption, StackCode};
use crate::time::{Clock, DeviceDateTime, SystemClock};
use crate::{Error, Result};
use bytes::BytesMut;
use std::net::SocketAddrV4;
use std::time::Duration;

/// Largest read [`SocketManager::read_buf`] performs in one call
pub const READ_BUF_LIMIT: usize = 64 * 1024;

/// Creates, connects, reads, writes and closes sockets on a vendor stack
///
/// The manager keeps no per-socket state: everything about a socket lives in
/// the stack and in the caller's bookkeeping. Every socket it creates is in
/// non-blocking mode, so apart from [`SocketManager::poll`] no call suspends
/// the calling thread; "would block" comes back as [`Status::Busy`].
///
/// [`Status::Busy`]: super::Status::Busy
pub struct SocketManager<S, C = SystemClock, P = PreinstalledCertificates> {
    stack: S,
    clock: C,
    certificates: P,
    config: NetConfig,
    multiplexer: Multiplexer,
}

impl<S: NetworkStack> SocketManager<S> {
    /// Manager using the system clock and preinstalled certificates
    pub fn new(stack: S, config: NetConfig) -> Self {
        Self::with_collaborators(stack, SystemClock, PreinstalledCertificates, config)
    }
}

impl<S, C, P> SocketManager<S, C, P>
where
    S: NetworkStack,
    C: Clock,
    P: CertificateStore,
{
    /// Manager with explicit clock and certificate store
    pub fn with_collaborators(stack: S, clock: C, certificates: P, config: NetConfig) -> Self {
        let multiplexer = Multiplexer::from_config(&config);
        Self {
            stack,
            clock,
            certificates,
            config,
            multiplexer,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Underlying stack
    pub fn stack(&self) -> &S {
        &self.stack
    }

    /// Underlying stack, mutably
    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    /// Multiplexer used by [`SocketManager::poll`]
    pub fn multiplexer(&self) -> &Multiplexer {
        &self.multiplexer
    }

    /// Consume the manager and return the stack
    pub fn into_stack(self) -> S {
        self.stack
    }

    /// Create a stream socket in the configured mode
    pub fn create(&mut self) -> Result<SocketHandle> {
        self.create_with_type(SocketType::Stream)
    }

    /// Create a socket in the configured mode
    ///
    /// Secure mode checks the device certificates, pushes the current time to
    /// the stack, allocates a secure endpoint and applies the TLS options.
    /// Every socket is then switched to non-blocking mode.
    ///
    /// # Errors
    ///
    /// [`Error::Unavailable`] naming the failed step. If the endpoint was
    /// already allocated it is closed before the error is returned.
    pub fn create_with_type(&mut self, socket_type: SocketType) -> Result<SocketHandle> {
        let mode = self.config.mode;
        let _span = tracing::debug_span!("create", %mode, %socket_type).entered();

        if mode.is_secure() {
            self.prepare_secure()?;
        }

        let handle = self
            .stack
            .socket(SocketKind {
                socket_type,
                secure: mode.is_secure(),
            })
            .map_err(|code| create_failed(mode, "socket", code))?;

        let mut pending = PendingSocket::new(&mut self.stack, handle);

        if mode.is_secure() {
            for option in secure::creation_options(&self.config) {
                pending
                    .set_option(&option)
                    .map_err(|code| create_failed(mode, option.kind().as_str(), code))?;
            }
        }

        pending
            .set_option(&SocketOption::NonBlocking(true))
            .map_err(|code| create_failed(mode, "non_blocking", code))?;

        let handle = pending.into_handle();
        tracing::debug!(%handle, "socket created");
        counters::socket_created(mode.as_str());
        Ok(handle)
    }

    fn prepare_secure(&mut self) -> Result<()> {
        let mode = self.config.mode;

        self.certificates
            .check_or_install()
            .map_err(|code| create_failed(mode, "certificate_check", code))?;

        let now = DeviceDateTime::now(&self.clock);
        if !now.is_plausible() {
            tracing::warn!(date = %now, "device clock looks unsynchronized, certificate validity checks may fail");
        }
        self.stack
            .set_date_time(&now)
            .map_err(|code| create_failed(mode, "clock_sync", code))?;

        Ok(())
    }

    /// Start or continue a non-blocking connect
    ///
    /// "Already in progress" is success: call again (or poll for
    /// connect-finished) until [`ConnectProgress::Connected`].
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidHandle`] / [`Error::InvalidArgument`] before any stack call
    /// * [`Error::Unavailable`] if domain name verification cannot be configured
    /// * [`Error::ResolutionFailed`] if the hostname does not resolve
    /// * [`Error::UntrustedRoot`] if the peer's root CA is unknown; never retry
    /// * [`Error::ConnectFailed`] for any other connect failure
    pub fn connect(
        &mut self,
        handle: SocketHandle,
        host: &str,
        port: u16,
    ) -> Result<ConnectProgress> {
        let handle = handle.validate()?;
        if host.is_empty() {
            return Err(Error::InvalidArgument("hostname must not be empty".into()));
        }
        let _span = tracing::debug_span!("connect", %handle, host, port).entered();

        if self.config.mode.is_secure() {
            let server_name = secure::parse_server_name(host)?;
            self.stack
                .set_option(handle, &SocketOption::DomainNameVerification(server_name))
                .map_err(|code| {
                    tracing::error!(%code, "failed to configure domain name verification");
                    Error::Unavailable {
                        op: "domain_name_verification",
                        code,
                    }
                })?;
        }

        let ip = self.stack.resolve(host).map_err(|code| {
            tracing::warn!(%code, "couldn't resolve hostname");
            counters::connect_result("resolution_failed");
            Error::ResolutionFailed {
                host: host.to_string(),
                code,
            }
        })?;

        match self.stack.connect(handle, SocketAddrV4::new(ip, port)) {
            Ok(()) => {
                tracing::debug!(%ip, "connected");
                counters::connect_result(labels::OUTCOME_CONNECTED);
                Ok(ConnectProgress::Connected)
            }
            Err(code) if code.is_in_progress() => {
                tracing::trace!(%ip, "connect in progress");
                counters::connect_result(labels::OUTCOME_IN_PROGRESS);
                Ok(ConnectProgress::InProgress)
            }
            Err(code) if code.is_untrusted_root() => {
                tracing::error!("security check failed: unknown root CA, aborting connection");
                counters::untrusted_root();
                counters::connect_result("untrusted_root");
                Err(Error::UntrustedRoot {
                    host: host.to_string(),
                    port,
                })
            }
            Err(code) => {
                tracing::warn!(%code, "connect failed");
                counters::connect_result("connect_failed");
                Err(Error::ConnectFailed {
                    host: host.to_string(),
                    port,
                    code,
                })
            }
        }
    }

    /// Create a socket and connect it
    ///
    /// If creation fails no connect is attempted. If connect fails the new
    /// socket is closed, since the caller never received its handle.
    pub fn connect_or_create(
        &mut self,
        host: &str,
        port: u16,
        socket_type: SocketType,
    ) -> Result<SocketHandle> {
        let handle = match self.create_with_type(socket_type) {
            Ok(handle) => {
                tracing::info!(%handle, "socket creation [ok]");
                handle
            }
            Err(e) => {
                tracing::warn!(error = %e, "socket creation [failed]");
                return Err(e);
            }
        };

        match self.connect(handle, host, port) {
            Ok(progress) => {
                tracing::info!(%handle, %progress, "socket connect() [ok]");
                Ok(handle)
            }
            Err(e) => {
                self.release(handle);
                Err(e)
            }
        }
    }

    /// Re-issue connect on an existing socket to probe the connection
    pub fn check_connection(
        &mut self,
        handle: SocketHandle,
        host: &str,
        port: u16,
    ) -> Result<ConnectProgress> {
        self.connect(handle, host, port)
    }

    /// Send bytes
    ///
    /// Returns [`Transfer::busy`] when the stack would block; retry after the
    /// multiplexer reports the socket writable.
    pub fn write(&mut self, handle: SocketHandle, buf: &[u8]) -> Result<Transfer> {
        let handle = handle.validate()?;

        match self.stack.send(handle, buf) {
            Ok(n) => {
                counters::bytes(labels::DIRECTION_TX, n);
                Ok(Transfer::ok(n))
            }
            Err(code) if code.is_would_block() => {
                counters::busy("send");
                Ok(Transfer::busy())
            }
            Err(code) => {
                tracing::debug!(%handle, %code, "send failed");
                Err(Error::Transport {
                    op: "send",
                    handle,
                    code,
                })
            }
        }
    }

    /// Receive bytes into `buf`
    ///
    /// Returns [`Transfer::busy`] when nothing is available yet and
    /// [`Transfer::reset`] when the peer closed the connection; the latter is
    /// terminal and the socket must be closed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for an empty buffer, since a zero-length
    /// read cannot be told apart from a peer close.
    pub fn read(&mut self, handle: SocketHandle, buf: &mut [u8]) -> Result<Transfer> {
        let handle = handle.validate()?;
        if buf.is_empty() {
            return Err(Error::InvalidArgument("read buffer must not be empty".into()));
        }

        match self.stack.recv(handle, buf) {
            Ok(0) => {
                tracing::debug!(%handle, "peer closed connection");
                counters::peer_closed();
                Ok(Transfer::reset())
            }
            Ok(n) => {
                counters::bytes(labels::DIRECTION_RX, n);
                Ok(Transfer::ok(n))
            }
            Err(code) if code.is_would_block() => {
                counters::busy("recv");
                Ok(Transfer::busy())
            }
            Err(code) => {
                tracing::debug!(%handle, %code, "recv failed");
                Err(Error::Transport {
                    op: "recv",
                    handle,
                    code,
                })
            }
        }
    }

    /// Receive up to `max` bytes, appending them to `buf`
    ///
    /// At most [`READ_BUF_LIMIT`] bytes are read per call.
    pub fn read_buf(
        &mut self,
        handle: SocketHandle,
        buf: &mut BytesMut,
        max: usize,
    ) -> Result<Transfer> {
        let start = buf.len();
        let end = start
            .checked_add(max.min(READ_BUF_LIMIT))
            .ok_or_else(|| Error::InvalidArgument("read buffer length overflows".into()))?;
        buf.resize(end, 0);
        let result = self.read(handle, &mut buf[start..]);
        let n = result.as_ref().map_or(0, |t| t.bytes);
        buf.truncate(start + n);
        result
    }

    /// Close a socket
    ///
    /// A failure reported by the stack is logged and otherwise ignored: the
    /// socket is gone from the caller's point of view either way.
    pub fn close(&mut self, handle: SocketHandle) -> Result<()> {
        let handle = handle.validate()?;
        self.release(handle);
        Ok(())
    }

    fn release(&mut self, handle: SocketHandle) {
        match self.stack.close(handle) {
            Ok(()) => tracing::debug!(%handle, "socket closed"),
            Err(code) => {
                tracing::warn!(%handle, %code, "close reported failure, treating socket as closed");
                counters::close_warning();
            }
        }
    }

    /// Wait for readiness on the given sockets
    ///
    /// See [`Multiplexer::poll`].
    pub fn poll(&mut self, events: &mut [SocketEvents], timeout: Duration) -> Result<usize> {
        self.multiplexer.poll(&mut self.stack, events, timeout)
    }
}

impl<S, C, P> std::fmt::Debug for SocketManager<S, C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketManager")
            .field("config", &self.config)
            .field("multiplexer", &self.multiplexer)
            .finish_non_exhaustive()
    }
}

fn create_failed(mode: SocketMode, step: &'static str, code: StackCode) -> Error {
    tracing::error!(%mode, step, %code, "socket creation step failed");
    counters::socket_create_failed(mode.as_str(), step);
    Error::Unavailable { op: step, code }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsVersion;
    use crate::socket::Status;
    use crate::stack::fake::{ConnectBehavior, FailPoint, FakeStack};
    use crate::stack::OptionKind;
    use crate::time::FixedClock;
    use std::net::Ipv4Addr;

    const BROKER: Ipv4Addr = Ipv4Addr::new(10, 1, 2, 3);

    fn plain_manager() -> SocketManager<FakeStack> {
        let mut stack = FakeStack::new();
        stack.add_host("broker.local", BROKER);
        SocketManager::new(stack, NetConfig::default())
    }

    fn secure_manager() -> SocketManager<FakeStack, FixedClock> {
        let mut stack = FakeStack::new();
        stack.add_host("broker.local", BROKER);
        SocketManager::with_collaborators(
            stack,
            FixedClock(1_700_000_000),
            PreinstalledCertificates,
            NetConfig::secure("/cert/roots.pem"),
        )
    }

    struct MissingCertificates;

    impl CertificateStore for MissingCertificates {
        fn check_or_install(&mut self) -> crate::stack::StackResult<()> {
            Err(StackCode::OUT_OF_MEMORY)
        }
    }

    #[test]
    fn test_create_plain_sets_non_blocking_only() {
        let mut mgr = plain_manager();
        let h = mgr.create().unwrap();

        assert_eq!(
            mgr.stack().options(h).unwrap(),
            &[SocketOption::NonBlocking(true)]
        );
        assert!(!mgr.stack().kind(h).unwrap().secure);
        assert!(mgr.stack().date_time().is_none());
    }

    #[test]
    fn test_create_secure_applies_options_in_order() {
        let mut mgr = secure_manager();
        let h = mgr.create().unwrap();

        assert!(mgr.stack().kind(h).unwrap().secure);
        assert_eq!(
            mgr.stack().options(h).unwrap(),
            &[
                SocketOption::SecureMethod(TlsVersion::Tls1_2),
                SocketOption::TrustedRootFile("/cert/roots.pem".into()),
                SocketOption::NonBlocking(true),
            ]
        );
        let dt = mgr.stack().date_time().unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2023, 11, 14));
    }

    #[test]
    fn test_create_secure_fails_without_certificates() {
        let mut stack = FakeStack::new();
        stack.add_host("broker.local", BROKER);
        let mut mgr = SocketManager::with_collaborators(
            stack,
            FixedClock(1_700_000_000),
            MissingCertificates,
            NetConfig::secure("/cert/roots.pem"),
        );

        let err = mgr.create().unwrap_err();
        assert!(matches!(
            err,
            Error::Unavailable {
                op: "certificate_check",
                ..
            }
        ));
        assert_eq!(mgr.stack().open_count(), 0);
    }

    #[test]
    fn test_create_fails_when_clock_sync_fails() {
        let mut mgr = secure_manager();
        mgr.stack_mut()
            .fail(FailPoint::DateTime, StackCode::INVALID_ARGUMENT);

        let err = mgr.create().unwrap_err();
        assert!(matches!(err, Error::Unavailable { op: "clock_sync", .. }));
        assert_eq!(mgr.stack().open_count(), 0);
    }

    #[test]
    fn test_partial_create_failure_releases_endpoint() {
        let mut mgr = secure_manager();
        mgr.stack_mut().fail(
            FailPoint::Option(OptionKind::TrustedRootFile),
            StackCode::INVALID_ARGUMENT,
        );

        let err = mgr.create().unwrap_err();
        assert!(matches!(
            err,
            Error::Unavailable {
                op: "trusted_root_file",
                code: StackCode::INVALID_ARGUMENT
            }
        ));
        assert_eq!(mgr.stack().open_count(), 0);
        assert_eq!(mgr.stack().closed().len(), 1);
    }

    #[test]
    fn test_create_fails_on_socket_limit() {
        let stack = FakeStack::new().with_socket_limit(1);
        let mut mgr = SocketManager::new(stack, NetConfig::default());
        mgr.create().unwrap();

        let err = mgr.create().unwrap_err();
        assert!(matches!(
            err,
            Error::Unavailable {
                op: "socket",
                code: StackCode::TOO_MANY_SOCKETS
            }
        ));
    }

    #[test]
    fn test_connect_in_progress_is_success() {
        let mut mgr = plain_manager();
        mgr.stack_mut()
            .set_connect_behavior(BROKER, ConnectBehavior::Pending(1));
        let h = mgr.create().unwrap();

        assert_eq!(
            mgr.connect(h, "broker.local", 1883).unwrap(),
            ConnectProgress::InProgress
        );
        assert_eq!(
            mgr.check_connection(h, "broker.local", 1883).unwrap(),
            ConnectProgress::Connected
        );
        assert_eq!(
            mgr.stack().remote(h),
            Some(SocketAddrV4::new(BROKER, 1883))
        );
    }

    #[test]
    fn test_connect_secure_sets_domain_name_verification() {
        let mut mgr = secure_manager();
        let h = mgr.create().unwrap();
        mgr.connect(h, "broker.local", 8883).unwrap();

        assert_eq!(
            mgr.stack().options(h).unwrap().last(),
            Some(&SocketOption::DomainNameVerification("broker.local".into()))
        );
    }

    #[test]
    fn test_connect_untrusted_root() {
        let mut mgr = secure_manager();
        mgr.stack_mut()
            .set_connect_behavior(BROKER, ConnectBehavior::UntrustedRoot);
        let h = mgr.create().unwrap();

        let err = mgr.connect(h, "broker.local", 8883).unwrap_err();
        assert!(err.is_security_failure());
        assert!(matches!(err, Error::UntrustedRoot { port: 8883, .. }));
    }

    #[test]
    fn test_connect_resolution_failure() {
        let mut mgr = plain_manager();
        let h = mgr.create().unwrap();

        let err = mgr.connect(h, "unknown.local", 80).unwrap_err();
        assert!(matches!(
            err,
            Error::ResolutionFailed {
                code: StackCode::HOST_NOT_FOUND,
                ..
            }
        ));
    }

    #[test]
    fn test_connect_refused() {
        let mut mgr = plain_manager();
        mgr.stack_mut()
            .set_connect_behavior(BROKER, ConnectBehavior::Refuse);
        let h = mgr.create().unwrap();

        let err = mgr.connect(h, "broker.local", 80).unwrap_err();
        assert!(matches!(
            err,
            Error::ConnectFailed {
                code: StackCode::CONNECTION_REFUSED,
                ..
            }
        ));
    }

    #[test]
    fn test_connect_rejects_bad_arguments_before_stack_calls() {
        let mut mgr = plain_manager();
        assert!(matches!(
            mgr.connect(SocketHandle::INVALID, "broker.local", 80),
            Err(Error::InvalidHandle(_))
        ));

        let h = mgr.create().unwrap();
        assert!(matches!(
            mgr.connect(h, "", 80),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(mgr.stack().remote(h), None);
    }

    #[test]
    fn test_connect_or_create_closes_socket_on_connect_failure() {
        let mut mgr = plain_manager();
        mgr.stack_mut()
            .set_connect_behavior(BROKER, ConnectBehavior::Refuse);

        let err = mgr
            .connect_or_create("broker.local", 1883, SocketType::Stream)
            .unwrap_err();
        assert!(matches!(err, Error::ConnectFailed { .. }));
        assert_eq!(mgr.stack().open_count(), 0);
    }

    #[test]
    fn test_connect_or_create_skips_connect_when_create_fails() {
        let mut mgr = plain_manager();
        mgr.stack_mut()
            .fail(FailPoint::Socket, StackCode::OUT_OF_MEMORY);
        mgr.stack_mut().fail(FailPoint::Resolve, StackCode::HOST_NOT_FOUND);

        let err = mgr
            .connect_or_create("broker.local", 1883, SocketType::Stream)
            .unwrap_err();
        assert!(matches!(err, Error::Unavailable { op: "socket", .. }));
    }

    #[test]
    fn test_write_busy_and_error() {
        let mut mgr = plain_manager();
        let h = mgr
            .connect_or_create("broker.local", 1883, SocketType::Stream)
            .unwrap();

        mgr.stack_mut().set_write_budget(h, Some(3));
        assert_eq!(mgr.write(h, b"hello").unwrap(), Transfer::ok(3));
        assert_eq!(mgr.write(h, b"lo").unwrap(), Transfer::busy());
        assert_eq!(mgr.stack().outbound(h).unwrap(), b"hel");

        mgr.stack_mut().close_peer(h);
        mgr.stack_mut().set_write_budget(h, None);
        assert!(matches!(
            mgr.write(h, b"lo"),
            Err(Error::Transport { op: "send", .. })
        ));
    }

    #[test]
    fn test_read_statuses_are_distinct() {
        let mut mgr = plain_manager();
        let h = mgr
            .connect_or_create("broker.local", 1883, SocketType::Stream)
            .unwrap();
        let mut buf = [0u8; 8];

        assert_eq!(mgr.read(h, &mut buf).unwrap().status, Status::Busy);

        mgr.stack_mut().push_inbound(h, b"abc");
        assert_eq!(mgr.read(h, &mut buf).unwrap(), Transfer::ok(3));
        assert_eq!(&buf[..3], b"abc");

        mgr.stack_mut().close_peer(h);
        assert_eq!(mgr.read(h, &mut buf).unwrap(), Transfer::reset());
    }

    #[test]
    fn test_read_rejects_empty_buffer() {
        let mut mgr = plain_manager();
        let h = mgr.create().unwrap();
        assert!(matches!(
            mgr.read(h, &mut []),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_read_buf_appends() {
        let mut mgr = plain_manager();
        let h = mgr
            .connect_or_create("broker.local", 1883, SocketType::Stream)
            .unwrap();
        mgr.stack_mut().push_inbound(h, b"world");

        let mut buf = BytesMut::from(&b"hello "[..]);
        let t = mgr.read_buf(h, &mut buf, 64).unwrap();
        assert_eq!(t, Transfer::ok(5));
        assert_eq!(&buf[..], b"hello world");

        let t = mgr.read_buf(h, &mut buf, 64).unwrap();
        assert!(t.is_busy());
        assert_eq!(buf.len(), 11);
    }

    #[test]
    fn test_read_buf_caps_requested_length() {
        let mut mgr = plain_manager();
        let h = mgr
            .connect_or_create("broker.local", 1883, SocketType::Stream)
            .unwrap();
        mgr.stack_mut().push_inbound(h, b"abc");

        let mut buf = BytesMut::new();
        let t = mgr.read_buf(h, &mut buf, usize::MAX).unwrap();
        assert_eq!(t, Transfer::ok(3));
        assert_eq!(&buf[..], b"abc");

        let mut full = BytesMut::from(&b"x"[..]);
        // Appending to a non-empty buffer must not overflow either.
        assert!(mgr.read_buf(h, &mut full, usize::MAX).unwrap().is_busy());
        assert_eq!(full.len(), 1);
    }

    #[test]
    fn test_close_semantics() {
        let mut mgr = plain_manager();
        assert!(matches!(
            mgr.close(SocketHandle::new(-3)),
            Err(Error::InvalidHandle(_))
        ));

        let h = mgr.create().unwrap();
        mgr.stack_mut().fail(FailPoint::Close, StackCode::OUT_OF_MEMORY);
        assert!(mgr.close(h).is_ok());
        assert!(!mgr.stack().is_open(h));

        // Already gone: the stack reports EBADF, close still succeeds.
        assert!(mgr.close(h).is_ok());
    }

    #[test]
    fn test_operations_after_close_fail() {
        let mut mgr = plain_manager();
        let h = mgr
            .connect_or_create("broker.local", 1883, SocketType::Stream)
            .unwrap();
        mgr.close(h).unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            mgr.read(h, &mut buf),
            Err(Error::Transport {
                code: StackCode::BAD_DESCRIPTOR,
                ..
            })
        ));
        assert!(mgr.write(h, b"x").is_err());
        assert!(matches!(
            mgr.connect(h, "broker.local", 1883),
            Err(Error::ConnectFailed {
                code: StackCode::BAD_DESCRIPTOR,
                ..
            })
        ));
    }
}
