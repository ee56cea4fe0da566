//! Process-wide tracing and logging setup for the catalog service.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize structured logging using `RUST_LOG` and `LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    crate::tracing::init(LogFormat::from_env());
}
