use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read test definitions '{path}': {source}")]
    ReadDefinitions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML test definitions '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON test definitions '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported test definitions extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Test definitions file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid HTTP method '{value}' for {url}.")]
    InvalidMethod { value: String, url: String },
    #[error("Invalid header '{name}' for {url}.")]
    InvalidHeader { name: String, url: String },
    #[error("Body size {size} for {url} is too large.")]
    BodyTooLarge { size: u64, url: String },
}
