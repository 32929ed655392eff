//! Testdata locations and harness setup.

use std::path::PathBuf;
use std::time::Duration;

use flowline_harness::HarnessConfig;

/// Absolute path of a file under `tests/testdata/`.
pub fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("testdata")
        .join(name)
}

/// Harness timing for tests that expect a quick verdict.
#[allow(dead_code)]
pub fn quick_config(deadline: Duration, poll_interval: Duration) -> HarnessConfig {
    HarnessConfig::default()
        .with_deadline(deadline)
        .with_poll_interval(poll_interval)
}

/// Route harness logs to the test writer.
pub fn init() {
    flowline_harness::logging::init_test_tracing();
}
