//! Counter helpers

use super::labels;

/// A socket was created
pub fn socket_created(mode: &'static str) {
    metrics::counter!("bsp_net_sockets_created_total", labels::MODE => mode).increment(1);
}

/// Socket creation failed at `step`
pub fn socket_create_failed(mode: &'static str, step: &'static str) {
    metrics::counter!(
        "bsp_net_socket_create_failures_total",
        labels::MODE => mode,
        labels::STEP => step
    )
    .increment(1);
}

/// A connect call finished with `outcome`
pub fn connect_result(outcome: &'static str) {
    metrics::counter!("bsp_net_connects_total", labels::OUTCOME => outcome).increment(1);
}

/// A connect was aborted on an unknown root CA
pub fn untrusted_root() {
    metrics::counter!("bsp_net_untrusted_root_total").increment(1);
}

/// Bytes moved in `direction`
pub fn bytes(direction: &'static str, count: usize) {
    metrics::counter!("bsp_net_bytes_total", labels::DIRECTION => direction)
        .increment(count as u64);
}

/// An operation reported would-block
pub fn busy(op: &'static str) {
    metrics::counter!("bsp_net_busy_total", labels::OPERATION => op).increment(1);
}

/// A read observed a peer close
pub fn peer_closed() {
    metrics::counter!("bsp_net_peer_closed_total").increment(1);
}

/// A close succeeded from the caller's point of view although the stack failed
pub fn close_warning() {
    metrics::counter!("bsp_net_close_warnings_total").increment(1);
}

/// A poll finished with `outcome`
pub fn poll_result(outcome: &'static str) {
    metrics::counter!("bsp_net_polls_total", labels::OUTCOME => outcome).increment(1);
}
