use thiserror::Error;

use super::{ConfigError, CoordinatorError, ValidationError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("HTTP client error: {source}")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },
    #[error("Join error: {source}")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn coordinator<E>(error: E) -> Self
    where
        E: Into<CoordinatorError>,
    {
        error.into().into()
    }
}

#[cfg(test)]
impl From<&'static str> for AppError {
    fn from(message: &'static str) -> Self {
        AppError::Validation(ValidationError::TestExpectation { message })
    }
}

#[cfg(test)]
impl From<String> for AppError {
    fn from(value: String) -> Self {
        AppError::Validation(ValidationError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        })
    }
}
