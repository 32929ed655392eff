//! Tracing for test binaries.

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Later calls are
/// no-ops, so every test may call this.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
