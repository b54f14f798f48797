use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid hatch: num_clients must be >= 1 (got {value}).")]
    InvalidClientCount { value: i64 },
    #[error("Invalid hatch: num_clients {value} exceeds the limit of {max}.")]
    ClientCountTooLarge { value: i64, max: usize },
    #[error("Invalid hatch: hatch_rate must be >= 1 (got {value}).")]
    InvalidHatchRate { value: i64 },
    #[error("At least one task is required.")]
    NoTasks,
    #[error("Missing required option: {option}")]
    MissingOption { option: &'static str },
    #[error("Value must be >= 1.")]
    NonPositive,
    #[error("Invalid number '{value}': {source}")]
    InvalidNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Invalid boolean '{value}'. Use true/false.")]
    InvalidBoolean { value: String },
    #[error("No task named '{name}'.")]
    UnknownTask { name: String },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
