use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::events::RequestTimings;

use super::bucket::round_response_time;
use super::report::{EntryReport, ErrorReport, TimingReport};

#[derive(Debug, Clone, Default)]
pub(super) struct TimingAccumulator {
    total_ms: u64,
    min_ms: Option<u64>,
    max_ms: u64,
    histogram: BTreeMap<u64, u64>,
}

impl TimingAccumulator {
    fn record(&mut self, ms: u64) {
        self.total_ms = self.total_ms.saturating_add(ms);
        self.min_ms = Some(self.min_ms.map_or(ms, |min| min.min(ms)));
        self.max_ms = self.max_ms.max(ms);
        let count = self.histogram.entry(round_response_time(ms)).or_insert(0);
        *count = count.saturating_add(1);
    }

    fn report(&self) -> TimingReport {
        TimingReport {
            total_response_time: self.total_ms,
            max_response_time: self.max_ms,
            min_response_time: self.min_ms.unwrap_or(0),
            response_times: self.histogram.clone(),
        }
    }
}

/// Accumulator for one `(name, method)` pair, or for the `Total` row.
#[derive(Debug, Clone)]
pub(super) struct StatsEntry {
    name: String,
    method: String,
    pub(super) num_requests: u64,
    pub(super) num_failures: u64,
    num_reqs_per_sec: BTreeMap<i64, u64>,
    total_content_length: u64,
    start_time: i64,
    last_request_timestamp: i64,
    elapsed: TimingAccumulator,
    dns_lookup: TimingAccumulator,
    tcp_connection: TimingAccumulator,
    tls_handshake: TimingAccumulator,
    server_processing: TimingAccumulator,
    name_lookup: TimingAccumulator,
    connect: TimingAccumulator,
    pre_transfer: TimingAccumulator,
    start_transfer: TimingAccumulator,
}

impl StatsEntry {
    pub(super) fn new(name: &str, method: &str, now: i64) -> Self {
        Self {
            name: name.to_owned(),
            method: method.to_owned(),
            num_requests: 0,
            num_failures: 0,
            num_reqs_per_sec: BTreeMap::new(),
            total_content_length: 0,
            start_time: now,
            last_request_timestamp: now,
            elapsed: TimingAccumulator::default(),
            dns_lookup: TimingAccumulator::default(),
            tcp_connection: TimingAccumulator::default(),
            tls_handshake: TimingAccumulator::default(),
            server_processing: TimingAccumulator::default(),
            name_lookup: TimingAccumulator::default(),
            connect: TimingAccumulator::default(),
            pre_transfer: TimingAccumulator::default(),
            start_transfer: TimingAccumulator::default(),
        }
    }

    pub(super) fn log(&mut self, timings: &RequestTimings, content_length: u64, now: i64) {
        self.num_requests = self.num_requests.saturating_add(1);
        let per_sec = self.num_reqs_per_sec.entry(now).or_insert(0);
        *per_sec = per_sec.saturating_add(1);
        self.last_request_timestamp = now;

        self.elapsed.record(timings.elapsed_ms);
        self.dns_lookup.record(timings.dns_lookup_ms);
        self.tcp_connection.record(timings.tcp_connection_ms);
        self.tls_handshake.record(timings.tls_handshake_ms);
        self.server_processing.record(timings.server_processing_ms);
        self.name_lookup.record(timings.name_lookup_ms);
        self.connect.record(timings.connect_ms);
        self.pre_transfer.record(timings.pre_transfer_ms);
        self.start_transfer.record(timings.start_transfer_ms);

        self.total_content_length = self.total_content_length.saturating_add(content_length);
    }

    pub(super) const fn log_error(&mut self) {
        self.num_failures = self.num_failures.saturating_add(1);
    }

    pub(super) const fn is_empty(&self) -> bool {
        self.num_requests == 0 && self.num_failures == 0
    }

    pub(super) fn report(&self) -> EntryReport {
        let elapsed = self.elapsed.report();
        EntryReport {
            name: self.name.clone(),
            method: self.method.clone(),
            last_request_timestamp: self.last_request_timestamp,
            start_time: self.start_time,
            num_requests: self.num_requests,
            num_failures: self.num_failures,
            total_response_time: elapsed.total_response_time,
            max_response_time: elapsed.max_response_time,
            min_response_time: elapsed.min_response_time,
            total_content_length: self.total_content_length,
            response_times: elapsed.response_times,
            num_reqs_per_sec: self.num_reqs_per_sec.clone(),
            dns_lookup: self.dns_lookup.report(),
            tcp_connection: self.tcp_connection.report(),
            tls_handshake: self.tls_handshake.report(),
            server_processing: self.server_processing.report(),
            name_lookup: self.name_lookup.report(),
            connect: self.connect.report(),
            pre_transfer: self.pre_transfer.report(),
            start_transfer: self.start_transfer.report(),
        }
    }

    /// Reports the entry and resets its counters, keeping its identity.
    pub(super) fn drain(&mut self, now: i64) -> EntryReport {
        let report = self.report();
        *self = Self::new(&self.name, &self.method, now);
        report
    }
}

#[derive(Debug, Clone)]
pub(super) struct StatsError {
    name: String,
    method: String,
    error: String,
    occurrences: u64,
}

impl StatsError {
    pub(super) fn new(method: &str, name: &str, error: &str) -> Self {
        Self {
            name: name.to_owned(),
            method: method.to_owned(),
            error: error.to_owned(),
            occurrences: 0,
        }
    }

    pub(super) const fn occurred(&mut self) {
        self.occurrences = self.occurrences.saturating_add(1);
    }

    pub(super) fn report(&self) -> ErrorReport {
        ErrorReport {
            method: self.method.clone(),
            name: self.name.clone(),
            error: self.error.clone(),
            occurrences: self.occurrences,
        }
    }
}

/// Content hash identifying an error row by method, name and message.
pub(super) fn error_key(method: &str, name: &str, error: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update([0_u8]);
    hasher.update(name.as_bytes());
    hasher.update([0_u8]);
    hasher.update(error.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
