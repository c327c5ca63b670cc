//! Release-on-drop guard for partially configured sockets

use super::SocketHandle;
use crate::stack::{NetworkStack, SocketOption, StackResult};

/// Endpoint that is allocated but not yet handed to the caller
///
/// Dropping the guard closes the endpoint. [`PendingSocket::into_handle`]
/// disarms it once every configuration step has succeeded.
pub(crate) struct PendingSocket<'a, S: NetworkStack + ?Sized> {
    stack: &'a mut S,
    handle: SocketHandle,
    armed: bool,
}

impl<'a, S: NetworkStack + ?Sized> PendingSocket<'a, S> {
    pub(crate) fn new(stack: &'a mut S, handle: SocketHandle) -> Self {
        Self {
            stack,
            handle,
            armed: true,
        }
    }

    pub(crate) fn set_option(&mut self, option: &SocketOption) -> StackResult<()> {
        self.stack.set_option(self.handle, option)
    }

    pub(crate) fn into_handle(mut self) -> SocketHandle {
        self.armed = false;
        self.handle
    }
}

impl<S: NetworkStack + ?Sized> Drop for PendingSocket<'_, S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.stack.close(self.handle) {
            Ok(()) => tracing::debug!(handle = %self.handle, "released partially created socket"),
            Err(code) => tracing::warn!(
                handle = %self.handle,
                %code,
                "failed to release partially created socket"
            ),
        }
    }
}
