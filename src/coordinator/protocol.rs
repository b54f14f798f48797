use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::stats::{EntryReport, ErrorReport, StatsReport};

/// Messages this worker sends to the coordinator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    ClientReady { node_id: String },
    Hatching { node_id: String },
    HatchComplete { node_id: String, count: u64 },
    Stats { node_id: String, data: Box<StatsMessage> },
    ClientStopped { node_id: String },
    Quit { node_id: String },
}

impl WorkerMessage {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ClientReady { .. } => "client_ready",
            Self::Hatching { .. } => "hatching",
            Self::HatchComplete { .. } => "hatch_complete",
            Self::Stats { .. } => "stats",
            Self::ClientStopped { .. } => "client_stopped",
            Self::Quit { .. } => "quit",
        }
    }
}

/// Payload of a `stats` message: one drained snapshot plus the live
/// worker count.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatsMessage {
    pub stats: Vec<EntryReport>,
    pub stats_total: EntryReport,
    pub errors: BTreeMap<String, ErrorReport>,
    pub user_count: u64,
}

impl StatsMessage {
    #[must_use]
    pub fn new(report: StatsReport, user_count: u64) -> Self {
        let StatsReport {
            stats,
            stats_total,
            errors,
        } = report;
        Self {
            stats,
            stats_total,
            errors,
            user_count,
        }
    }
}

/// Commands received from the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorCommand {
    Hatch {
        #[serde(default)]
        node_id: Option<String>,
        data: HatchMessage,
    },
    Stop {
        #[serde(default)]
        node_id: Option<String>,
    },
    Quit {
        #[serde(default)]
        node_id: Option<String>,
    },
}

/// Body of a `hatch` command, kept signed so bad values reach validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HatchMessage {
    #[serde(deserialize_with = "whole_number")]
    pub num_clients: i64,
    #[serde(deserialize_with = "whole_number")]
    pub hatch_rate: i64,
}

/// Masters written in dynamic languages may send `hatch_rate` as a float.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(value) = number.as_i64() {
        return Ok(value);
    }
    if number.as_u64().is_some() {
        return Ok(i64::MAX);
    }
    number
        .as_f64()
        .map(|value| value as i64)
        .ok_or_else(|| de::Error::custom(format!("invalid number {number}")))
}
