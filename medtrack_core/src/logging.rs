//! Tracing setup for the `medtrack` binary.
//!
//! Everything is written to stderr: `list`, `today` and `calendar` print JSON
//! on stdout with `--json`, and that output must stay parseable. The default
//! level is WARN, which is where skipped rows surface (malformed periods,
//! unreadable stored times and dose entries).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the stderr subscriber at WARN unless `RUST_LOG` says otherwise
pub fn init() {
    init_with_level("warn")
}

/// Install the stderr subscriber with `default_level` as the fallback filter
///
/// `RUST_LOG=medtrack_core=debug` shows storage and marking-map details.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Route log output through the test harness
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
