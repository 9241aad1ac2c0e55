//! Breaking change categories, severities, and the finding record
//!
//! IMPORTANT: Category codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Breaking change category registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    /// A component schema present in the old contract is gone
    SchemaRemoved,

    /// A property was removed from a retained schema
    FieldRemoved,

    /// A property's primitive type string changed
    TypeChanged,

    /// A field became mandatory in the new contract
    RequiredFieldAdded,

    /// A field is no longer mandatory in the new contract
    RequiredFieldRemoved,

    /// An operation (path + method) was removed
    EndpointRemoved,

    /// The first declared success status code changed
    ResponseCodeChanged,
}

impl ChangeCategory {
    /// Get the category as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaRemoved => "schema_removed",
            Self::FieldRemoved => "field_removed",
            Self::TypeChanged => "type_changed",
            Self::RequiredFieldAdded => "required_field_added",
            Self::RequiredFieldRemoved => "required_field_removed",
            Self::EndpointRemoved => "endpoint_removed",
            Self::ResponseCodeChanged => "response_code_changed",
        }
    }

    /// Default severity assigned to findings of this category
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::SchemaRemoved
            | Self::FieldRemoved
            | Self::TypeChanged
            | Self::EndpointRemoved => Severity::Critical,
            Self::RequiredFieldAdded | Self::ResponseCodeChanged => Severity::High,
            Self::RequiredFieldRemoved => Severity::Medium,
        }
    }
}

impl std::fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Consumer-impact magnitude of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Relaxation or otherwise usually-safe change, recorded for review
    Medium,

    /// Breaks a subset of consumers (e.g. old request payloads)
    High,

    /// Breaks every consumer relying on the changed element
    Critical,
}

impl Severity {
    /// Get the severity as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detected incompatibility between two contract versions
///
/// Immutable once created; produced only by the change detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakingChange {
    /// Change category
    pub category: ChangeCategory,

    /// Severity level
    pub severity: Severity,

    /// Locator within the contract (e.g. "schemas/User.email", "GET /users/{id}")
    pub path: String,

    /// Value in the old contract, if any
    pub old_value: Option<Value>,

    /// Value in the new contract, if any
    pub new_value: Option<Value>,

    /// Human-readable description
    pub description: String,

    /// Consumer impact description
    pub impact: String,
}

impl BreakingChange {
    /// Create a new finding with minimal fields
    pub fn new(
        category: ChangeCategory,
        severity: Severity,
        path: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            path: path.into(),
            old_value: None,
            new_value: None,
            description: description.into(),
            impact: String::new(),
        }
    }

    /// Set old/new values
    pub fn with_values(mut self, old_value: Option<Value>, new_value: Option<Value>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    /// Set the consumer impact description
    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }
}

impl std::fmt::Display for BreakingChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} at {}",
            self.severity.as_str().to_uppercase(),
            self.category,
            self.path
        )
    }
}
