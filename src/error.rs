//! Error types for loading and configuring the pipeline.
//!
//! The library returns these `thiserror` enums; the CLI and the report
//! orchestration wrap them in `anyhow`.

use thiserror::Error;

/// Errors that abort a dataset load.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("line {line}: invalid {column} value '{value}': {reason}")]
    InvalidField {
        line: u64,
        column: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors raised while reading or validating a [`crate::config::PipelineConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Returned when a grouping key or correlation variable name is not recognised.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown {kind} '{input}'")]
pub struct KeyParseError {
    pub kind: &'static str,
    pub input: String,
}
