//! Request statistics: single-writer accumulation, bucketed timing
//! histograms, and drain-on-read snapshots flushed on a fixed cadence.
mod aggregator;
mod bucket;
mod entry;
mod report;
mod request_stats;


pub use aggregator::{
    OUTCOME_QUEUE_DEPTH, REPORT_QUEUE_DEPTH, STATS_FLUSH_INTERVAL, StatsHandle, StatsPipeline,
    setup_stats_aggregator,
};
pub use bucket::round_response_time;
pub use report::{EntryReport, ErrorReport, StatsReport, TimingReport};
pub use request_stats::RequestStats;
