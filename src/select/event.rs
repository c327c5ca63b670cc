//! Per-socket interest and readiness descriptors

use crate::socket::SocketHandle;

/// What the caller wants to be told about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interest {
    /// Data (or a peer close) can be read
    pub read: bool,
    /// Data can be written
    pub write: bool,
    /// A non-blocking connect finished
    pub connect: bool,
    /// A socket error is pending
    pub error: bool,
}

impl Interest {
    /// No interest at all
    pub const NONE: Interest = Interest {
        read: false,
        write: false,
        connect: false,
        error: false,
    };

    /// Readable only
    pub fn read() -> Self {
        Self::NONE.with_read()
    }

    /// Writable only
    pub fn write() -> Self {
        Self::NONE.with_write()
    }

    /// Connect completion only
    pub fn connect() -> Self {
        Self::NONE.with_connect()
    }

    /// Add read interest
    pub fn with_read(mut self) -> Self {
        self.read = true;
        self
    }

    /// Add write interest
    pub fn with_write(mut self) -> Self {
        self.write = true;
        self
    }

    /// Add connect interest
    pub fn with_connect(mut self) -> Self {
        self.connect = true;
        self
    }

    /// Add error interest
    pub fn with_error(mut self) -> Self {
        self.error = true;
        self
    }

    /// Whether nothing is requested
    pub fn is_empty(&self) -> bool {
        !(self.read || self.write || self.connect || self.error)
    }
}

/// What became ready during a poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// A read will not block
    pub can_read: bool,
    /// A write will not block
    pub can_write: bool,
    /// The pending connect finished (successfully or not)
    pub connect_finished: bool,
    /// A socket error is pending
    pub errored: bool,
}

impl Readiness {
    /// Whether no flag is set
    pub fn is_empty(&self) -> bool {
        !(self.can_read || self.can_write || self.connect_finished || self.errored)
    }
}

/// One socket's entry in a poll call
///
/// Readiness flags are only ever set by a poll, never cleared; reset the
/// descriptor before polling again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketEvents {
    /// Socket to watch
    pub handle: SocketHandle,
    /// Requested interests
    pub interest: Interest,
    /// Reported readiness
    pub readiness: Readiness,
}

impl SocketEvents {
    /// Descriptor with cleared readiness
    pub fn new(handle: SocketHandle, interest: Interest) -> Self {
        Self {
            handle,
            interest,
            readiness: Readiness::default(),
        }
    }

    /// Reported readiness
    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Clear reported readiness
    pub fn reset(&mut self) {
        self.readiness = Readiness::default();
    }
}

/// Clear reported readiness on every descriptor
pub fn reset_all(events: &mut [SocketEvents]) {
    events.iter_mut().for_each(SocketEvents::reset);
}
