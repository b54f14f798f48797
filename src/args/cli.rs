use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::parsers::{parse_bool_env, parse_positive_u64};
use super::types::PositiveU64;

/// Default coordinator port.
pub const DEFAULT_MASTER_PORT: u16 = 5557;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Load-generation worker: runs weighted HTTP tasks on behalf of a swarm coordinator and streams request statistics back to it."
)]
pub struct WorkerArgs {
    /// Coordinator host
    #[arg(
        long = "master-host",
        env = "SWARMER_MASTER_HOST",
        default_value = "127.0.0.1"
    )]
    pub master_host: String,

    /// Coordinator port
    #[arg(long = "master-port", env = "SWARMER_MASTER_PORT", default_value_t = DEFAULT_MASTER_PORT)]
    pub master_port: u16,

    /// Test definitions file (.json or .toml)
    #[arg(long = "test-definitions", env = "TEST_DEFINITIONS")]
    pub test_definitions: PathBuf,

    /// Aggregate requests per second across all workers (0 = unlimited)
    #[arg(long = "max-rps", env = "SWARMER_MAX_RPS", default_value_t = 0)]
    pub max_rps: u64,

    /// Seconds between task weight re-evaluations
    #[arg(
        long = "weight-sync-seconds",
        env = "SWARMER_WEIGHT_SYNC_SECONDS",
        default_value = "120",
        value_parser = parse_positive_u64
    )]
    pub weight_sync_seconds: PositiveU64,

    /// Identifier reported to the coordinator (defaults to <hostname>_<random hex>)
    #[arg(long = "node-id", env = "SWARMER_NODE_ID")]
    pub node_id: Option<String>,

    /// Run the named tasks once each and exit, without connecting (comma separated)
    #[arg(long = "run-tasks", value_delimiter = ',')]
    pub run_tasks: Vec<String>,

    /// HTTP request timeout in seconds
    #[arg(
        long = "request-timeout-secs",
        default_value = "30",
        value_parser = parse_positive_u64
    )]
    pub request_timeout_secs: PositiveU64,

    /// Idle HTTP connections kept per host
    #[arg(long = "max-idle-connections", env = "MAX_IDLE_CONNECTIONS")]
    pub max_idle_connections: Option<usize>,

    /// How long a local shutdown waits for the coordinator link to close (ms)
    #[arg(
        long = "quit-timeout-ms",
        default_value = "5000",
        value_parser = parse_positive_u64
    )]
    pub quit_timeout_ms: PositiveU64,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,
}

impl WorkerArgs {
    /// `host:port`, bracketing bare IPv6 hosts.
    #[must_use]
    pub fn coordinator_addr(&self) -> String {
        let host = self.master_host.trim();
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.master_port)
        } else {
            format!("{}:{}", host, self.master_port)
        }
    }

    #[must_use]
    pub const fn max_rps(&self) -> Option<NonZeroU64> {
        NonZeroU64::new(self.max_rps)
    }

    #[must_use]
    pub const fn weight_sync_interval(&self) -> Duration {
        Duration::from_secs(self.weight_sync_seconds.get())
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.get())
    }

    #[must_use]
    pub const fn quit_timeout(&self) -> Duration {
        Duration::from_millis(self.quit_timeout_ms.get())
    }
}
