//! Label names and values

/// Socket mode label key
pub const MODE: &str = "mode";

/// Outcome label key
pub const OUTCOME: &str = "outcome";

/// Failed step label key
pub const STEP: &str = "step";

/// Direction label key
pub const DIRECTION: &str = "direction";

/// Operation label key
pub const OPERATION: &str = "op";

/// Bytes sent
pub const DIRECTION_TX: &str = "tx";

/// Bytes received
pub const DIRECTION_RX: &str = "rx";

/// Connect completed
pub const OUTCOME_CONNECTED: &str = "connected";

/// Connect still in flight
pub const OUTCOME_IN_PROGRESS: &str = "in_progress";

/// Poll returned ready handles
pub const OUTCOME_READY: &str = "ready";

/// Poll timed out
pub const OUTCOME_TIMEOUT: &str = "timeout";
