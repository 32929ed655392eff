//! Pipeline test scenarios.

mod lifecycle;
mod load_errors;
mod properties;
mod self_scrape;
