use serde::{Deserialize, Serialize};

fn default_method() -> String {
    "GET".to_owned()
}

/// One request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderConfig {
    pub name: String,
    pub value: String,
}

/// Parameters of the cosine wave that drives a task's weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightConfig {
    pub magnitude: i64,
    /// Period of the wave in seconds; `0` keeps the weight at `constant`.
    pub frequency: i64,
    pub constant: i64,
    pub phase: i64,
}

/// A single HTTP task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDefinition {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: Vec<HeaderConfig>,
    /// Size in bytes of the random request body; `0` sends none.
    #[serde(default)]
    pub body: u64,
    #[serde(default)]
    pub weight: WeightConfig,
    /// Task name; defaults to the URL.
    #[serde(default)]
    pub name: Option<String>,
}

impl TestDefinition {
    #[must_use]
    pub fn task_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// Accepted top-level layouts: a bare JSON array or a `tests` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum DefinitionsDocument {
    List(Vec<TestDefinition>),
    Table { tests: Vec<TestDefinition> },
}

impl DefinitionsDocument {
    pub(super) fn into_definitions(self) -> Vec<TestDefinition> {
        match self {
            Self::List(tests) | Self::Table { tests } => tests,
        }
    }
}
