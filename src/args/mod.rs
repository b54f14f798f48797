//! Command-line and environment surface.
mod cli;
pub(crate) mod parsers;
mod types;


pub use cli::WorkerArgs;
pub use types::PositiveU64;
