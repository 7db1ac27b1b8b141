//! Pipeline configuration.
//!
//! Stored as a JSON object on disk; every field is optional:
//! ```json
//! {
//!   "min_age": 0,
//!   "max_wait_days": 365,
//!   "date_formats": ["%Y-%m-%d", "%d/%m/%Y"],
//!   "no_show_tokens": ["No-Show"],
//!   "attended_tokens": ["Show-Up"],
//!   "column_aliases": { "Idade": "age" },
//!   "delimiter": ";"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Records younger than this are dropped.
    pub min_age: i64,
    /// Records waiting this many days or more are dropped.
    pub max_wait_days: i64,
    /// Date-only formats tried after the RFC 3339 and date-time forms.
    pub date_formats: Vec<String>,
    pub no_show_tokens: Vec<String>,
    pub attended_tokens: Vec<String>,
    /// Extra header name to canonical column name entries.
    pub column_aliases: HashMap<String, String>,
    pub delimiter: char,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_age: 0,
            max_wait_days: 365,
            date_formats: tokens(&["%Y-%m-%d", "%d/%m/%Y"]),
            no_show_tokens: tokens(&["no-show", "noshow", "no_show", "yes", "1", "true"]),
            attended_tokens: tokens(&["show-up", "showup", "show_up", "attended", "no", "0", "false"]),
            column_aliases: HashMap::new(),
            delimiter: ',',
        }
    }
}

fn tokens(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl PipelineConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_wait_days <= 0 {
            return Err(ConfigError::Invalid(format!(
                "max_wait_days must be positive, got {}",
                self.max_wait_days
            )));
        }
        if self.no_show_tokens.is_empty() || self.attended_tokens.is_empty() {
            return Err(ConfigError::Invalid(
                "status token lists must not be empty".into(),
            ));
        }
        if let Some(shared) = self
            .no_show_tokens
            .iter()
            .find(|t| self.attended_tokens.iter().any(|a| a.eq_ignore_ascii_case(t)))
        {
            return Err(ConfigError::Invalid(format!(
                "status token '{shared}' is listed as both no-show and attended"
            )));
        }
        self.delimiter_byte()?;
        Ok(())
    }

    /// The delimiter as the single byte the CSV reader splits on.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "delimiter must be a single ASCII character, got '{}'",
                    self.delimiter
                ))
            })
    }
}
