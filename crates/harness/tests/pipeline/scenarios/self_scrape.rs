//! The engine scrapes its own status surface and remote-writes the samples
//! into the capture sink.

use serial_test::serial;

use flowline_harness::{TestCase, run_test_case};

use crate::helpers::predicates::self_scrape_healthy;
use crate::helpers::testdata::{init, testdata};

#[tokio::test]
#[serial]
async fn test_pipeline_self_scrape_and_write() {
    init();

    // Given: scrape "self" every 100ms, forward to the capture sink
    let case = TestCase::builder(testdata("scrape_and_write.toml"))
        .predicate(self_scrape_healthy)
        .require_clean_shutdown(false)
        .build();

    // When
    let report = run_test_case(&case)
        .await
        .unwrap_or_else(|e| panic!("self-scrape pipeline failed: {e}"));

    // Then: the predicate converged after at least one round
    assert!(report.outcome.is_converged());
    assert!(report.rounds >= 1);
}
