//! Core library for the `swarmer` worker.
//!
//! A swarmer process connects to a swarm coordinator, runs a weighted pool
//! of HTTP tasks when told to hatch, and streams aggregated request
//! statistics back every few seconds. The binary wires these modules
//! together; the library exposes them for embedding and testing.
pub mod args;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod runner;
pub mod stats;
pub mod workload;

mod entry;
mod system;

pub use entry::run;
