//! Dispatcher configuration.
//!
//! Loaded from JSON, with environment variable overrides and defaults.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// How numbers are compared when diffing snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericEquality {
    /// `1` and `1.0` differ
    #[default]
    Strict,
    /// Numbers are compared by value, so `1 == 1.0`
    Loose,
}

impl std::str::FromStr for NumericEquality {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(NumericEquality::Strict),
            "loose" => Ok(NumericEquality::Loose),
            other => Err(DispatchError::Config(format!(
                "Invalid numeric_equality: {}",
                other
            ))),
        }
    }
}

/// Change dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number comparison mode (default: strict)
    pub numeric_equality: NumericEquality,
    /// Omit fields set to `null` from insert change sets (default: true)
    pub insert_skips_null: bool,
    /// Record handler panics as failures instead of unwinding (default: true)
    pub catch_panics: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            numeric_equality: NumericEquality::Strict,
            insert_skips_null: true,
            catch_panics: true,
        }
    }
}

impl DispatchConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DispatchError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DispatchError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_json_str(&content)
    }

    /// Parses configuration from a JSON string. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, DispatchError> {
        serde_json::from_str(json)
            .map_err(|e| DispatchError::Config(format!("Invalid JSON: {}", e)))
    }

    /// Applies environment variable overrides.
    ///
    /// Variables are prefixed with `FIELD_EVENTS_`, for example
    /// `FIELD_EVENTS_NUMERIC_EQUALITY=loose`.
    pub fn apply_env_overrides(&mut self) -> Result<(), DispatchError> {
        if let Ok(val) = env::var("FIELD_EVENTS_NUMERIC_EQUALITY") {
            self.numeric_equality = val.parse()?;
        }
        if let Ok(val) = env::var("FIELD_EVENTS_INSERT_SKIPS_NULL") {
            self.insert_skips_null = val.parse().map_err(|_| {
                DispatchError::Config(format!("Invalid insert_skips_null: {}", val))
            })?;
        }
        if let Ok(val) = env::var("FIELD_EVENTS_CATCH_PANICS") {
            self.catch_panics = val
                .parse()
                .map_err(|_| DispatchError::Config(format!("Invalid catch_panics: {}", val)))?;
        }
        Ok(())
    }
}
