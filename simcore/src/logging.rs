//! Structured logging helper.
//!
//! The crate itself only emits `tracing` events; it never installs a global
//! subscriber on behalf of an embedding application. [`init`] is a
//! convenience for binaries and tests that want a reasonable default.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber reading its filter from `RUST_LOG`, defaulting
/// to `info` when unset. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
