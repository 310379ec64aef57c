//! Selecting which page loads take part in an analysis.

use std::collections::HashSet;

use crate::results::{FetchResult, SimTime};

/// Predicate over [`FetchResult`]s
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFilter {
    pub host_prefix: String,
    /// Allowed urls; empty means any url
    pub urls: HashSet<String>,
    /// Loads must start at or after this virtual second
    pub start_after: SimTime,
    /// Loads must complete at or before this virtual time
    pub done_before: Option<SimTime>,
}

impl LoadFilter {
    pub fn new(host_prefix: impl Into<String>, start_after: SimTime) -> Self {
        Self {
            host_prefix: host_prefix.into(),
            urls: HashSet::new(),
            start_after,
            done_before: None,
        }
    }

    pub fn matches(&self, record: &FetchResult) -> bool {
        record.host.starts_with(self.host_prefix.as_str())
            && (self.urls.is_empty() || self.urls.contains(&*record.url))
            && record.start_time_seconds as f64 >= self.start_after
            && self
                .done_before
                .map_or(true, |limit| record.timestamp_seconds <= limit)
    }

    pub fn apply<'a>(&self, records: &'a [FetchResult]) -> Vec<&'a FetchResult> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}
