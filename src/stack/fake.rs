//! In-memory network stack
//!
//! [`FakeStack`] behaves like the vendor stack as seen through the
//! [`NetworkStack`] trait: it hands out monotonically increasing handles,
//! enforces a concurrent socket limit, answers non-blocking connects with the
//! "already in progress" sentinel while a handshake is pending, reports
//! "would block" on empty receive buffers and exhausted send budgets, and
//! implements select over its own per-socket state.
//!
//! Nothing here sleeps. `select` returns immediately and records the wait it
//! was asked for, which makes poll timing observable in tests.

use super::{HandleSet, NetworkStack, OptionKind, SocketKind, SocketOption, StackCode, StackResult};
use crate::socket::SocketHandle;
use crate::time::DeviceDateTime;
use bytes::{Buf, Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

/// Default limit on concurrently open sockets
pub const DEFAULT_SOCKET_LIMIT: usize = 16;

/// How the fake peer at an address answers connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectBehavior {
    /// First connect succeeds
    #[default]
    Immediate,
    /// The first `n` connects report "already in progress"; the handshake
    /// also completes when the socket is polled for writability
    Pending(u32),
    /// Connect is refused
    Refuse,
    /// Secure sockets get the "unknown root CA" verdict; plain sockets connect
    UntrustedRoot,
    /// Connect fails with the given code
    Fail(StackCode),
}

/// Primitive that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Endpoint allocation
    Socket,
    /// Setting a specific option
    Option(OptionKind),
    /// Setting the device date
    DateTime,
    /// Name resolution
    Resolve,
    /// Releasing an endpoint (the endpoint is still released)
    Close,
    /// The select primitive
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Idle,
    Pending(u32),
    Connected,
}

#[derive(Debug)]
struct FakeSocket {
    kind: SocketKind,
    options: Vec<SocketOption>,
    remote: Option<SocketAddrV4>,
    link: LinkState,
    inbound: BytesMut,
    outbound: BytesMut,
    peer_closed: bool,
    write_budget: Option<usize>,
    error_pending: bool,
}

impl FakeSocket {
    fn new(kind: SocketKind) -> Self {
        Self {
            kind,
            options: Vec::new(),
            remote: None,
            link: LinkState::Idle,
            inbound: BytesMut::new(),
            outbound: BytesMut::new(),
            peer_closed: false,
            write_budget: None,
            error_pending: false,
        }
    }

    fn readable(&self) -> bool {
        !self.inbound.is_empty() || self.peer_closed
    }

    fn writable(&self) -> bool {
        match self.link {
            LinkState::Connected => !self.peer_closed && self.write_budget != Some(0),
            LinkState::Pending(_) => true,
            LinkState::Idle => false,
        }
    }
}

/// Deterministic in-memory [`NetworkStack`]
#[derive(Debug)]
pub struct FakeStack {
    next_handle: i32,
    socket_limit: usize,
    sockets: BTreeMap<SocketHandle, FakeSocket>,
    hosts: HashMap<String, Ipv4Addr>,
    behaviors: HashMap<Ipv4Addr, ConnectBehavior>,
    failures: HashMap<FailPoint, StackCode>,
    date_time: Option<DeviceDateTime>,
    closed: Vec<SocketHandle>,
    select_waits: Vec<Duration>,
}

impl Default for FakeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStack {
    /// Create a stack with no hosts and the default socket limit
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            socket_limit: DEFAULT_SOCKET_LIMIT,
            sockets: BTreeMap::new(),
            hosts: HashMap::new(),
            behaviors: HashMap::new(),
            failures: HashMap::new(),
            date_time: None,
            closed: Vec::new(),
            select_waits: Vec::new(),
        }
    }

    /// Limit the number of concurrently open sockets
    pub fn with_socket_limit(mut self, limit: usize) -> Self {
        self.socket_limit = limit;
        self
    }

    /// Start handle assignment at `first`
    pub fn with_first_handle(mut self, first: i32) -> Self {
        self.next_handle = first;
        self
    }

    /// Register a resolvable hostname
    pub fn add_host(&mut self, name: impl Into<String>, addr: Ipv4Addr) {
        self.hosts.insert(name.into(), addr);
    }

    /// Configure how connects to `addr` behave
    pub fn set_connect_behavior(&mut self, addr: Ipv4Addr, behavior: ConnectBehavior) {
        self.behaviors.insert(addr, behavior);
    }

    /// Make a primitive fail with `code` until cleared
    pub fn fail(&mut self, point: FailPoint, code: StackCode) {
        self.failures.insert(point, code);
    }

    /// Stop failing a primitive
    pub fn clear_failure(&mut self, point: FailPoint) {
        self.failures.remove(&point);
    }

    /// Queue bytes from the peer
    pub fn push_inbound(&mut self, handle: SocketHandle, data: &[u8]) {
        if let Some(sock) = self.sockets.get_mut(&handle) {
            sock.inbound.extend_from_slice(data);
        }
    }

    /// Simulate an orderly shutdown by the peer
    pub fn close_peer(&mut self, handle: SocketHandle) {
        if let Some(sock) = self.sockets.get_mut(&handle) {
            sock.peer_closed = true;
        }
    }

    /// Limit how many more bytes `send` accepts (`None` = unlimited)
    pub fn set_write_budget(&mut self, handle: SocketHandle, budget: Option<usize>) {
        if let Some(sock) = self.sockets.get_mut(&handle) {
            sock.write_budget = budget;
        }
    }

    /// Flag a pending socket error, reported through the error set
    pub fn raise_error(&mut self, handle: SocketHandle) {
        if let Some(sock) = self.sockets.get_mut(&handle) {
            sock.error_pending = true;
        }
    }

    /// Bytes sent so far on `handle`
    pub fn outbound(&self, handle: SocketHandle) -> Option<&[u8]> {
        self.sockets.get(&handle).map(|s| &s.outbound[..])
    }

    /// Drain the bytes sent so far on `handle`
    pub fn take_outbound(&mut self, handle: SocketHandle) -> Bytes {
        self.sockets
            .get_mut(&handle)
            .map(|s| s.outbound.split().freeze())
            .unwrap_or_default()
    }

    /// Options applied to `handle`, in order
    pub fn options(&self, handle: SocketHandle) -> Option<&[SocketOption]> {
        self.sockets.get(&handle).map(|s| &s.options[..])
    }

    /// What `handle` was allocated as
    pub fn kind(&self, handle: SocketHandle) -> Option<SocketKind> {
        self.sockets.get(&handle).map(|s| s.kind)
    }

    /// Address `handle` connected (or is connecting) to
    pub fn remote(&self, handle: SocketHandle) -> Option<SocketAddrV4> {
        self.sockets.get(&handle).and_then(|s| s.remote)
    }

    /// Whether `handle` is currently allocated
    pub fn is_open(&self, handle: SocketHandle) -> bool {
        self.sockets.contains_key(&handle)
    }

    /// Number of allocated sockets
    pub fn open_count(&self) -> usize {
        self.sockets.len()
    }

    /// Handles released so far, in order
    pub fn closed(&self) -> &[SocketHandle] {
        &self.closed
    }

    /// Last device date pushed by the socket layer
    pub fn date_time(&self) -> Option<&DeviceDateTime> {
        self.date_time.as_ref()
    }

    /// Waits requested from `select`, in order
    pub fn select_waits(&self) -> &[Duration] {
        &self.select_waits
    }

    fn check(&self, point: FailPoint) -> StackResult<()> {
        match self.failures.get(&point) {
            Some(code) => Err(*code),
            None => Ok(()),
        }
    }

    fn socket_mut(&mut self, handle: SocketHandle) -> StackResult<&mut FakeSocket> {
        self.sockets
            .get_mut(&handle)
            .ok_or(StackCode::BAD_DESCRIPTOR)
    }
}

impl NetworkStack for FakeStack {
    fn socket(&mut self, kind: SocketKind) -> StackResult<SocketHandle> {
        self.check(FailPoint::Socket)?;
        if self.sockets.len() >= self.socket_limit {
            return Err(StackCode::TOO_MANY_SOCKETS);
        }
        let handle = SocketHandle::new(self.next_handle);
        self.next_handle += 1;
        self.sockets.insert(handle, FakeSocket::new(kind));
        Ok(handle)
    }

    fn set_option(&mut self, handle: SocketHandle, option: &SocketOption) -> StackResult<()> {
        self.check(FailPoint::Option(option.kind()))?;
        let sock = self.socket_mut(handle)?;
        let secure_only = !matches!(option, SocketOption::NonBlocking(_));
        if secure_only && !sock.kind.secure {
            return Err(StackCode::INVALID_ARGUMENT);
        }
        sock.options.push(option.clone());
        Ok(())
    }

    fn set_date_time(&mut self, date_time: &DeviceDateTime) -> StackResult<()> {
        self.check(FailPoint::DateTime)?;
        self.date_time = Some(*date_time);
        Ok(())
    }

    fn resolve(&mut self, host: &str) -> StackResult<Ipv4Addr> {
        self.check(FailPoint::Resolve)?;
        if let Ok(addr) = host.parse::<Ipv4Addr>() {
            return Ok(addr);
        }
        self.hosts
            .get(host)
            .copied()
            .ok_or(StackCode::HOST_NOT_FOUND)
    }

    fn connect(&mut self, handle: SocketHandle, addr: SocketAddrV4) -> StackResult<()> {
        let behavior = self.behaviors.get(addr.ip()).copied().unwrap_or_default();
        let sock = self.socket_mut(handle)?;
        sock.remote = Some(addr);

        match sock.link {
            LinkState::Connected => return Ok(()),
            LinkState::Pending(0) => {
                sock.link = LinkState::Connected;
                return Ok(());
            }
            LinkState::Pending(n) => {
                sock.link = LinkState::Pending(n - 1);
                return Err(StackCode::ALREADY);
            }
            LinkState::Idle => {}
        }

        match behavior {
            ConnectBehavior::Immediate => {
                sock.link = LinkState::Connected;
                Ok(())
            }
            ConnectBehavior::Pending(0) => {
                sock.link = LinkState::Connected;
                Ok(())
            }
            ConnectBehavior::Pending(n) => {
                sock.link = LinkState::Pending(n - 1);
                Err(StackCode::ALREADY)
            }
            ConnectBehavior::Refuse => Err(StackCode::CONNECTION_REFUSED),
            ConnectBehavior::UntrustedRoot if sock.kind.secure => Err(StackCode::UNKNOWN_ROOT_CA),
            ConnectBehavior::UntrustedRoot => {
                sock.link = LinkState::Connected;
                Ok(())
            }
            ConnectBehavior::Fail(code) => Err(code),
        }
    }

    fn send(&mut self, handle: SocketHandle, buf: &[u8]) -> StackResult<usize> {
        let sock = self.socket_mut(handle)?;
        match sock.link {
            LinkState::Connected => {}
            LinkState::Pending(_) => return Err(StackCode::WOULD_BLOCK),
            LinkState::Idle => return Err(StackCode::NOT_CONNECTED),
        }
        if sock.peer_closed {
            return Err(StackCode::CONNECTION_RESET);
        }

        let n = match sock.write_budget {
            Some(0) => return Err(StackCode::WOULD_BLOCK),
            Some(budget) => {
                let n = budget.min(buf.len());
                sock.write_budget = Some(budget - n);
                n
            }
            None => buf.len(),
        };
        sock.outbound.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn recv(&mut self, handle: SocketHandle, buf: &mut [u8]) -> StackResult<usize> {
        let sock = self.socket_mut(handle)?;
        match sock.link {
            LinkState::Connected => {}
            LinkState::Pending(_) => return Err(StackCode::WOULD_BLOCK),
            LinkState::Idle => return Err(StackCode::NOT_CONNECTED),
        }

        if sock.inbound.is_empty() {
            return if sock.peer_closed {
                Ok(0)
            } else {
                Err(StackCode::WOULD_BLOCK)
            };
        }

        let n = buf.len().min(sock.inbound.len());
        buf[..n].copy_from_slice(&sock.inbound[..n]);
        sock.inbound.advance(n);
        Ok(n)
    }

    fn close(&mut self, handle: SocketHandle) -> StackResult<()> {
        if self.sockets.remove(&handle).is_none() {
            return Err(StackCode::BAD_DESCRIPTOR);
        }
        self.closed.push(handle);
        self.check(FailPoint::Close)
    }

    fn select(
        &mut self,
        read: &mut HandleSet,
        write: &mut HandleSet,
        error: &mut HandleSet,
        timeout: Duration,
    ) -> StackResult<usize> {
        self.select_waits.push(timeout);
        self.check(FailPoint::Select)?;

        let unknown = read
            .iter()
            .chain(write.iter())
            .chain(error.iter())
            .any(|h| !self.sockets.contains_key(&h));
        if unknown {
            return Err(StackCode::BAD_DESCRIPTOR);
        }

        read.retain(|h| self.sockets[&h].readable());
        write.retain(|h| self.sockets[&h].writable());
        error.retain(|h| self.sockets[&h].error_pending);

        // Handshakes that were waited on are finished by the time select reports them.
        for handle in write.iter() {
            if let Some(sock) = self.sockets.get_mut(&handle) {
                if matches!(sock.link, LinkState::Pending(_)) {
                    sock.link = LinkState::Connected;
                }
            }
        }

        Ok(read.len() + write.len() + error.len())
    }
}
