//! Histogram helpers

use std::time::Duration;

/// Ready handles reported by one poll
pub fn poll_ready_handles(count: usize) {
    metrics::histogram!("bsp_net_poll_ready_handles").record(count as f64);
}

/// Wait requested from the select primitive
pub fn poll_wait(wait: Duration) {
    metrics::histogram!("bsp_net_poll_wait_seconds").record(wait.as_secs_f64());
}
