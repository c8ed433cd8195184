use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter,
/// e.g. `RUST_LOG=cocoa_atelier=debug`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).with_line_number(true).init();
}

/// Debug-level output captured by the test harness. Safe to call from every test.
pub fn init_test() {
    let _ = fmt().with_env_filter(EnvFilter::new("debug")).with_test_writer().try_init();
}
