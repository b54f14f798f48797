mod app;
mod config;
mod coordinator;
mod validation;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use coordinator::CoordinatorError;
pub use validation::ValidationError;
