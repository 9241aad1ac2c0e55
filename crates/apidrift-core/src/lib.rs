//! ApiDrift Core
//!
//! Core domain model with stable, versioned types.
//! Never rename change category codes - they are part of the public API.

pub mod config;
pub mod finding;
pub mod summary;

pub use config::{Config, ConfigError, IgnoreRules, SeverityThreshold};
pub use finding::{BreakingChange, ChangeCategory, Severity};
pub use summary::ChangeSummary;
