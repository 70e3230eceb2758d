//! Tracing and request correlation (shared setup).

/// Initialize process-wide tracing from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber configuration (filters, output format).
pub mod tracing;

/// Request identifiers for log correlation.
pub mod request_id;

pub use request_id::{RequestId, REQUEST_ID_HEADER};
