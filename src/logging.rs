//! Log output
//!
//! The socket layer only emits `tracing` events. Applications (and tests) that
//! want them printed can install the fmt subscriber set up here.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "bsp_io_net=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`
///
/// Returns false if a global subscriber was already installed.
pub fn try_init() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Install a subscriber writing through the test harness's captured output
pub fn try_init_for_tests() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("bsp_io_net=debug"))
        .with_test_writer()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        try_init_for_tests();
        assert!(!try_init());
    }
}
