//! Typed publish/subscribe bus between task bodies, the stats aggregator, and
//! lifecycle listeners.
mod bus;
mod types;


pub use bus::EventBus;
pub use types::{RequestFailure, RequestSuccess, RequestTimings};
