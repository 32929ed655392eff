//! Data types exchanged between pipeline components and with write endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One numeric observation of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Metric name
    pub name: String,
    /// Label pairs, sorted by key
    pub labels: Vec<(String, String)>,
    /// Sample value
    pub value: f64,
    /// Unix epoch milliseconds
    pub timestamp_ms: i64,
}

impl Sample {
    /// Build a sample, sorting its labels by key.
    pub fn new(
        name: impl Into<String>,
        mut labels: Vec<(String, String)>,
        value: f64,
        timestamp_ms: i64,
    ) -> Self {
        labels.sort();
        Self {
            name: name.into(),
            labels,
            value,
            timestamp_ms,
        }
    }

    /// Value of the label `key`, if present.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace a label, keeping labels sorted.
    pub fn set_label(&mut self, key: &str, value: &str) {
        match self.labels.binary_search_by(|(k, _)| k.as_str().cmp(key)) {
            Ok(i) => self.labels[i].1 = value.to_owned(),
            Err(i) => self.labels.insert(i, (key.to_owned(), value.to_owned())),
        }
    }

    /// True if every `(key, value)` filter pair is present on this sample.
    pub fn matches(&self, name: &str, filters: &[(&str, &str)]) -> bool {
        self.name == name
            && filters
                .iter()
                .all(|(k, v)| self.label(k).is_some_and(|actual| actual == *v))
    }

    /// Identity of the series this sample belongs to.
    pub fn series_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Sample {
    /// Formats the series identity (`name{k="v",...}`), not the value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.labels.is_empty() {
            write!(f, "{{")?;
            for (i, (k, v)) in self.labels.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{k}=\"{v}\"")?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

/// A batch of samples delivered to a write endpoint as one JSON line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Sending component (`prometheus.remote_write.<name>`)
    pub component_id: String,
    /// Samples in scrape order
    pub samples: Vec<Sample>,
}
