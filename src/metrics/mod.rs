//! Socket layer metrics
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the
//! application installs a recorder.
//!
//! * `bsp_net_sockets_created_total` (counter): sockets created, by mode
//! * `bsp_net_socket_create_failures_total` (counter): failed creations, by mode and step
//! * `bsp_net_connects_total` (counter): connect calls, by outcome
//! * `bsp_net_untrusted_root_total` (counter): connects aborted on an unknown root CA
//! * `bsp_net_bytes_total` (counter): bytes moved, by direction
//! * `bsp_net_busy_total` (counter): would-block results, by operation
//! * `bsp_net_peer_closed_total` (counter): reads that observed a peer close
//! * `bsp_net_close_warnings_total` (counter): closes whose stack call failed
//! * `bsp_net_polls_total` (counter): polls, by outcome
//! * `bsp_net_poll_ready_handles` (histogram): ready handles per poll
//! * `bsp_net_poll_wait_seconds` (histogram): wait requested from the select primitive

pub mod counters;
pub mod histograms;
pub mod labels;
