//! Per-socket connection driver

use super::state::SocketState;
use crate::select::{Interest, Readiness, SocketEvents};
use crate::secure::CertificateStore;
use crate::socket::{ConnectProgress, SocketHandle, SocketManager, Transfer};
use crate::stack::NetworkStack;
use crate::time::Clock;
use crate::{Error, Result};
use bytes::BytesMut;

/// One connected stream socket and its caller-side state
///
/// The driver does not own the manager; every operation borrows it. It tracks
/// what the socket is waiting for so the caller can build poll descriptors
/// with [`Connection::events`] and feed the results back through
/// [`Connection::on_ready`].
#[derive(Debug)]
pub struct Connection {
    handle: SocketHandle,
    host: String,
    port: u16,
    state: SocketState,
    write_blocked: bool,
    errored: bool,
}

impl Connection {
    /// Create a stream socket and start connecting it
    ///
    /// The connection starts in [`SocketState::Connecting`] or
    /// [`SocketState::Connected`] depending on how far the non-blocking
    /// connect got. If connect fails the socket is closed.
    pub fn open<S, C, P>(
        manager: &mut SocketManager<S, C, P>,
        host: &str,
        port: u16,
    ) -> Result<Self>
    where
        S: NetworkStack,
        C: Clock,
        P: CertificateStore,
    {
        let handle = manager.create()?;
        let mut conn = Self {
            handle,
            host: host.to_string(),
            port,
            state: SocketState::Unconnected,
            write_blocked: false,
            errored: false,
        };

        match manager.connect(handle, host, port) {
            Ok(progress) => {
                conn.apply(progress)?;
                tracing::debug!(%handle, host, port, state = %conn.state, "connection opened");
                Ok(conn)
            }
            Err(e) => {
                manager.close(handle)?;
                Err(e)
            }
        }
    }

    /// Socket handle
    pub fn handle(&self) -> SocketHandle {
        self.handle
    }

    /// Current state
    pub fn state(&self) -> SocketState {
        self.state
    }

    /// Peer hostname
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Peer port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether a write was cut short and is waiting for writability
    pub fn is_write_blocked(&self) -> bool {
        self.write_blocked
    }

    /// Whether the multiplexer has reported an error condition
    pub fn has_error(&self) -> bool {
        self.errored
    }

    /// Interest to register for the current state
    ///
    /// A handshake that reported an error registers nothing; close it.
    pub fn interest(&self) -> Interest {
        match self.state {
            SocketState::Connecting if self.errored => Interest::NONE,
            SocketState::Connecting => Interest::connect().with_error(),
            SocketState::Connected if self.write_blocked => {
                Interest::read().with_write().with_error()
            }
            SocketState::Connected => Interest::read().with_error(),
            _ => Interest::NONE,
        }
    }

    /// Fresh poll descriptor for this connection
    pub fn events(&self) -> SocketEvents {
        SocketEvents::new(self.handle, self.interest())
    }

    /// Consume readiness reported by the multiplexer
    ///
    /// # Errors
    ///
    /// [`Error::SocketError`] if the error condition is reported while the
    /// handshake is still in flight. The connection can only be closed.
    pub fn on_ready(&mut self, readiness: Readiness) -> Result<()> {
        if readiness.errored {
            self.errored = true;
            if self.state == SocketState::Connecting {
                tracing::warn!(handle = %self.handle, host = %self.host, port = self.port, "handshake failed");
                return Err(Error::SocketError(self.handle));
            }
            tracing::debug!(handle = %self.handle, state = %self.state, "socket reported error condition");
        }
        if self.state == SocketState::Connecting
            && (readiness.connect_finished || readiness.can_write)
        {
            self.state.transition(SocketState::Connected)?;
            tracing::debug!(handle = %self.handle, "connect finished");
        }
        if readiness.can_write {
            self.write_blocked = false;
        }
        Ok(())
    }

    /// Re-issue connect until the handshake completes
    pub fn poll_connect<S, C, P>(
        &mut self,
        manager: &mut SocketManager<S, C, P>,
    ) -> Result<ConnectProgress>
    where
        S: NetworkStack,
        C: Clock,
        P: CertificateStore,
    {
        match self.state {
            SocketState::Connected => Ok(ConnectProgress::Connected),
            SocketState::Unconnected | SocketState::Connecting => {
                let progress = manager.check_connection(self.handle, &self.host, self.port)?;
                self.apply(progress)?;
                Ok(progress)
            }
            other => Err(invalid_state("unconnected or connecting", other)),
        }
    }

    /// Write bytes; see [`SocketManager::write`]
    pub fn write<S, C, P>(
        &mut self,
        manager: &mut SocketManager<S, C, P>,
        buf: &[u8],
    ) -> Result<Transfer>
    where
        S: NetworkStack,
        C: Clock,
        P: CertificateStore,
    {
        self.ensure_transfer()?;
        let transfer = manager.write(self.handle, buf)?;
        if transfer.is_busy() {
            self.write_blocked = true;
        } else {
            self.mark_connected()?;
            self.write_blocked = transfer.bytes < buf.len();
        }
        Ok(transfer)
    }

    /// Read bytes; see [`SocketManager::read`]
    pub fn read<S, C, P>(
        &mut self,
        manager: &mut SocketManager<S, C, P>,
        buf: &mut [u8],
    ) -> Result<Transfer>
    where
        S: NetworkStack,
        C: Clock,
        P: CertificateStore,
    {
        self.ensure_transfer()?;
        let transfer = manager.read(self.handle, buf)?;
        self.after_read(transfer)
    }

    /// Read up to `max` bytes, appending to `buf`
    pub fn read_buf<S, C, P>(
        &mut self,
        manager: &mut SocketManager<S, C, P>,
        buf: &mut BytesMut,
        max: usize,
    ) -> Result<Transfer>
    where
        S: NetworkStack,
        C: Clock,
        P: CertificateStore,
    {
        self.ensure_transfer()?;
        let transfer = manager.read_buf(self.handle, buf, max)?;
        self.after_read(transfer)
    }

    /// Close the socket
    pub fn close<S, C, P>(mut self, manager: &mut SocketManager<S, C, P>) -> Result<()>
    where
        S: NetworkStack,
        C: Clock,
        P: CertificateStore,
    {
        self.state.transition(SocketState::Closed)?;
        manager.close(self.handle)
    }

    fn after_read(&mut self, transfer: Transfer) -> Result<Transfer> {
        if transfer.is_busy() {
            return Ok(transfer);
        }
        self.mark_connected()?;
        if transfer.is_terminal() {
            self.state.transition(SocketState::PeerClosed)?;
            tracing::debug!(handle = %self.handle, "peer closed");
        }
        Ok(transfer)
    }

    fn apply(&mut self, progress: ConnectProgress) -> Result<()> {
        match progress {
            ConnectProgress::Connected => self.mark_connected(),
            ConnectProgress::InProgress if self.state == SocketState::Unconnected => {
                self.state.transition(SocketState::Connecting)
            }
            ConnectProgress::InProgress => Ok(()),
        }
    }

    fn mark_connected(&mut self) -> Result<()> {
        if self.state != SocketState::Connected {
            self.state.transition(SocketState::Connected)?;
        }
        Ok(())
    }

    fn ensure_transfer(&self) -> Result<()> {
        if self.state.can_transfer() {
            Ok(())
        } else {
            Err(invalid_state("connecting or connected", self.state))
        }
    }
}

fn invalid_state(expected: &str, actual: SocketState) -> Error {
    Error::InvalidState {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}
