//! JSON logs with timestamps, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

pub(crate) fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber unless one is already set.
pub fn init(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_filter))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init("debug");
        init("warn");
        crate::init();
        ::tracing::info!(attempt = 1, "still logging");
    }

    #[test]
    fn bad_default_falls_back() {
        let _ = filter("not a [valid filter");
    }
}
