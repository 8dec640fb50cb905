//! Tracing and logging setup shared by every binary and test harness.

/// Initialize process-wide tracing with the format from `COOPBOOKS_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filter, output format).
pub mod tracing;

pub use tracing::{ENV_LOG_FORMAT, LogFormat, init_with};
