use std::collections::BTreeMap;

use crate::events::{RequestFailure, RequestSuccess};

use super::entry::{StatsEntry, StatsError, error_key};
use super::report::StatsReport;

const TOTAL_NAME: &str = "Total";

/// All statistics accumulated since the last snapshot or clear.
///
/// Owned by the aggregator task; nothing else mutates it.
#[derive(Debug)]
pub struct RequestStats {
    entries: BTreeMap<(String, String), StatsEntry>,
    errors: BTreeMap<String, StatsError>,
    total: StatsEntry,
    start_time: i64,
}

impl RequestStats {
    #[must_use]
    pub fn new(now: i64) -> Self {
        Self {
            entries: BTreeMap::new(),
            errors: BTreeMap::new(),
            total: StatsEntry::new(TOTAL_NAME, "", now),
            start_time: now,
        }
    }

    pub fn log_request(&mut self, success: &RequestSuccess, now: i64) {
        self.total
            .log(&success.timings, success.content_length, now);
        self.entry(&success.name, &success.method, now).log(
            &success.timings,
            success.content_length,
            now,
        );
    }

    pub fn log_error(&mut self, failure: &RequestFailure, now: i64) {
        self.total.log_error();
        self.entry(&failure.name, &failure.method, now).log_error();

        let key = error_key(&failure.method, &failure.name, &failure.error);
        self.errors
            .entry(key)
            .or_insert_with(|| StatsError::new(&failure.method, &failure.name, &failure.error))
            .occurred();
    }

    /// Drops every entry and error and restarts the clock.
    pub fn clear_all(&mut self, now: i64) {
        *self = Self::new(now);
    }

    /// Reports every non-empty entry, the total and the error map, then
    /// resets all of them. Entries stay registered with zeroed counters.
    pub fn snapshot(&mut self, now: i64) -> StatsReport {
        let stats = self
            .entries
            .values_mut()
            .filter(|entry| !entry.is_empty())
            .map(|entry| entry.drain(now))
            .collect();
        let stats_total = self.total.drain(now);
        let errors = std::mem::take(&mut self.errors)
            .into_iter()
            .map(|(key, error)| (key, error.report()))
            .collect();
        StatsReport {
            stats,
            stats_total,
            errors,
        }
    }

    #[must_use]
    pub const fn start_time(&self) -> i64 {
        self.start_time
    }

    #[must_use]
    pub const fn total_requests(&self) -> u64 {
        self.total.num_requests
    }

    #[must_use]
    pub const fn total_failures(&self) -> u64 {
        self.total.num_failures
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn entry(&mut self, name: &str, method: &str, now: i64) -> &mut StatsEntry {
        self.entries
            .entry((name.to_owned(), method.to_owned()))
            .or_insert_with(|| StatsEntry::new(name, method, now))
    }
}
