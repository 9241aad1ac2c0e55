//! Configuration schema (apidrift.toml)

use crate::finding::{ChangeCategory, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Severity overrides for specific change categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SeverityThreshold {
    /// Map of category code to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for a change category, or the default
    pub fn get_severity(&self, category: ChangeCategory, default: Severity) -> Severity {
        self.overrides
            .get(category.as_str())
            .copied()
            .unwrap_or(default)
    }

    /// Set severity override for a category
    pub fn set_override(&mut self, category: ChangeCategory, severity: Severity) {
        self.overrides
            .insert(category.as_str().to_string(), severity);
    }
}

/// Ignore rules for schema names and operation paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IgnoreRules {
    /// Skip these component schemas during detection (glob patterns)
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Skip these operation paths during detection (glob patterns)
    #[serde(default)]
    pub paths: Vec<String>,
}

impl IgnoreRules {
    /// Check if a name matches any pattern in the list
    fn matches_pattern(name: &str, patterns: &[String]) -> bool {
        patterns.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, name)
            } else {
                pattern == name
            }
        })
    }

    /// Check if a component schema should be skipped
    pub fn is_schema_ignored(&self, name: &str) -> bool {
        Self::matches_pattern(name, &self.schemas)
    }

    /// Check if an operation path should be skipped
    pub fn is_path_ignored(&self, path: &str) -> bool {
        Self::matches_pattern(path, &self.paths)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Severity overrides
    #[serde(default)]
    pub severity: SeverityThreshold,

    /// Ignore rules
    #[serde(default)]
    pub ignore: IgnoreRules,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Simple glob matching (supports a single * wildcard)
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(star_pos) = pattern.find('*') {
        let prefix = &pattern[..star_pos];
        let suffix = &pattern[star_pos + 1..];

        text.starts_with(prefix) && text.ends_with(suffix)
    } else {
        pattern == text
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
