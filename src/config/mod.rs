//! Test-definition files: the HTTP tasks a worker offers to the coordinator.
mod loader;
pub mod types;


pub use loader::load_definitions;
pub use types::{HeaderConfig, TestDefinition, WeightConfig};
