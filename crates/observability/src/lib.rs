//! Process-wide logging setup.

/// Initialize tracing with `RUST_LOG`, falling back to `info`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Like [`init`], with `default_filter` used when `RUST_LOG` is unset or
/// unparseable (e.g. the configured `LOG_LEVEL`).
pub fn init_with_filter(default_filter: &str) {
    tracing::init(default_filter);
}

/// Subscriber construction.
pub mod tracing;
