use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Accumulated data for one timing dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingReport {
    pub total_response_time: u64,
    pub max_response_time: u64,
    pub min_response_time: u64,
    #[serde(default)]
    pub response_times: BTreeMap<u64, u64>,
}

/// Data for one `(name, method)` entry since the previous snapshot.
///
/// Field names follow the report layout coordinators already parse,
/// including the `pre_tranfer`/`start_tranfer` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryReport {
    pub name: String,
    pub method: String,
    pub last_request_timestamp: i64,
    pub start_time: i64,
    pub num_requests: u64,
    pub num_failures: u64,
    pub total_response_time: u64,
    pub max_response_time: u64,
    pub min_response_time: u64,
    pub total_content_length: u64,
    pub response_times: BTreeMap<u64, u64>,
    pub num_reqs_per_sec: BTreeMap<i64, u64>,
    pub dns_lookup: TimingReport,
    pub tcp_connection: TimingReport,
    pub tls_handshake: TimingReport,
    pub server_processing: TimingReport,
    pub name_lookup: TimingReport,
    pub connect: TimingReport,
    #[serde(rename = "pre_tranfer")]
    pub pre_transfer: TimingReport,
    #[serde(rename = "start_tranfer")]
    pub start_transfer: TimingReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub method: String,
    pub name: String,
    pub error: String,
    #[serde(rename = "occurences")]
    pub occurrences: u64,
}

/// Immutable snapshot handed to the runner every flush interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsReport {
    pub stats: Vec<EntryReport>,
    pub stats_total: EntryReport,
    pub errors: BTreeMap<String, ErrorReport>,
}
