//! Select-style readiness polling

use super::event::SocketEvents;
use crate::config::{NetConfig, TimeoutPolicy, DEFAULT_POLL_SLICE};
use crate::metrics::{counters, histograms, labels};
use crate::stack::{bound_of, HandleSet, NetworkStack};
use crate::{Error, Result};
use std::time::Duration;

/// Interest sets handed to the select primitive
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InterestSets {
    /// Handles watched for readability
    pub read: HandleSet,
    /// Handles watched for writability or connect completion
    pub write: HandleSet,
    /// Handles watched for pending errors
    pub error: HandleSet,
}

impl InterestSets {
    /// Build the sets from descriptors, in caller order
    ///
    /// Write and connect interest share the write set; they are told apart
    /// again when results are scattered.
    pub fn from_events(events: &[SocketEvents]) -> Self {
        let mut sets = Self::default();
        for ev in events {
            if ev.interest.read {
                sets.read.insert(ev.handle);
            }
            if ev.interest.write || ev.interest.connect {
                sets.write.insert(ev.handle);
            }
            if ev.interest.error {
                sets.error.insert(ev.handle);
            }
        }
        sets
    }

    /// Search-space bound across all three sets
    pub fn bound(&self) -> i32 {
        bound_of(&[&self.read, &self.write, &self.error])
    }

    /// Copy ready handles back onto the descriptors
    pub fn scatter(&self, events: &mut [SocketEvents]) {
        for ev in events.iter_mut() {
            let interest = ev.interest;
            if interest.read && self.read.contains(ev.handle) {
                ev.readiness.can_read = true;
            }
            if self.write.contains(ev.handle) {
                if interest.connect {
                    ev.readiness.connect_finished = true;
                }
                if interest.write {
                    ev.readiness.can_write = true;
                }
            }
            if interest.error && self.error.contains(ev.handle) {
                ev.readiness.errored = true;
            }
        }
    }
}

/// Waits for readiness on many sockets at once
///
/// The select primitive is never asked to wait longer than one slice per call.
/// How the caller's timeout is honoured beyond that depends on the
/// [`TimeoutPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiplexer {
    slice: Duration,
    policy: TimeoutPolicy,
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_SLICE, TimeoutPolicy::default())
    }
}

impl Multiplexer {
    /// Create a multiplexer with an explicit slice and policy
    pub fn new(slice: Duration, policy: TimeoutPolicy) -> Self {
        Self { slice, policy }
    }

    /// Create a multiplexer from configuration
    pub fn from_config(config: &NetConfig) -> Self {
        Self::new(config.poll_slice, config.timeout_policy)
    }

    /// Internal wait slice
    pub fn slice(&self) -> Duration {
        self.slice
    }

    /// Timeout policy
    pub fn policy(&self) -> TimeoutPolicy {
        self.policy
    }

    /// Wait for any requested interest to become ready
    ///
    /// Returns the number of ready handles reported by the stack; `Ok(0)` is a
    /// normal timeout and the caller should poll again. Readiness flags are
    /// set on the descriptors and never cleared.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidHandle`] if a descriptor with any interest carries a
    ///   negative handle (nothing is passed to the stack)
    /// * [`Error::PollFailed`] if the select primitive fails
    pub fn poll<S: NetworkStack + ?Sized>(
        &self,
        stack: &mut S,
        events: &mut [SocketEvents],
        timeout: Duration,
    ) -> Result<usize> {
        if let Some(bad) = events
            .iter()
            .find(|ev| !ev.interest.is_empty() && !ev.handle.is_valid())
        {
            return Err(Error::InvalidHandle(bad.handle));
        }

        let span = tracing::debug_span!(
            "poll",
            sockets = events.len(),
            timeout_ms = timeout.as_millis() as u64,
            policy = %self.policy
        );
        let _enter = span.enter();

        let mut remaining = timeout;
        loop {
            let wait = remaining.min(self.slice);
            let mut sets = InterestSets::from_events(events);
            tracing::trace!(bound = sets.bound(), wait_ms = wait.as_millis() as u64, "select");
            histograms::poll_wait(wait);

            let ready = stack
                .select(&mut sets.read, &mut sets.write, &mut sets.error, wait)
                .map_err(|code| {
                    tracing::warn!(%code, "select failed");
                    counters::poll_result("error");
                    Error::PollFailed(code)
                })?;

            if ready > 0 {
                sets.scatter(events);
                tracing::debug!(ready, "poll ready");
                counters::poll_result(labels::OUTCOME_READY);
                histograms::poll_ready_handles(ready);
                return Ok(ready);
            }

            remaining = remaining.saturating_sub(wait);
            // A zero wait cannot make progress towards the deadline.
            if self.policy == TimeoutPolicy::SingleSlice
                || remaining.is_zero()
                || wait.is_zero()
            {
                counters::poll_result(labels::OUTCOME_TIMEOUT);
                return Ok(0);
            }
        }
    }
}
