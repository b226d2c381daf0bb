//! Error types shared across the engine.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while loading configuration or deriving capacity data.
/// All of them are fatal: the run of the current scenario is aborted.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or conflicting configuration, detected before any computation runs.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A storage size string such as "500 GB" could not be parsed.
    #[error("malformed storage size '{0}'")]
    MalformedSize(String),

    /// The usage resolver reached a fixed point with models still pending.
    #[error("unmet dependencies for models: {}", .0.join(", "))]
    UnmetDependencies(Vec<String>),

    /// Two growth models declared the same output field.
    #[error("duplicate usage field '{0}'")]
    DuplicateField(String),

    /// A consumer referenced a field that is absent from the usage table.
    #[error("usage field '{0}' is not present in the table")]
    MissingField(String),

    /// A consumer read a month that a field does not cover.
    #[error("usage field '{field}' has no value for {month}")]
    MissingMonth { field: String, month: NaiveDate },

    /// A "{placeholder}" parameter had no value in the scenario-set context.
    #[error("no value for placeholder '{0}' in set context")]
    UnknownPlaceholder(String),

    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
