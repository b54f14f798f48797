use std::path::Path;

use tracing::{debug, info};

use crate::error::{AppError, AppResult, ConfigError};

use super::types::{DefinitionsDocument, TestDefinition};

/// Loads test definitions from a `.json` or `.toml` file.
///
/// # Errors
///
/// Returns an error when the file cannot be read, has an unsupported
/// extension or does not parse.
pub fn load_definitions(path: &Path) -> AppResult<Vec<TestDefinition>> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadDefinitions {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    let document: DefinitionsDocument = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })
        })?,
        Some("json") => serde_json::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            })
        })?,
        Some(ext) => {
            return Err(AppError::config(ConfigError::UnsupportedExtension {
                ext: ext.to_owned(),
            }));
        }
        None => return Err(AppError::config(ConfigError::MissingExtension)),
    };

    let definitions = document.into_definitions();
    info!(
        "Loaded {} test definitions from {}",
        definitions.len(),
        path.display()
    );
    for definition in &definitions {
        debug!(
            "{} {} (body {} bytes)",
            definition.method, definition.url, definition.body
        );
    }
    Ok(definitions)
}
