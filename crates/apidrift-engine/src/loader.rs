//! Contract document loading and lookup
//!
//! Parses an OpenAPI 3.0.x document into a schema-agnostic value tree and
//! answers lookups against it. The document is parsed once, on first
//! access, and cached for the lifetime of the loader.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Contract loading and lookup errors
///
/// Lookup misses are always explicit; the only permissive defaults in the
/// system live in the validator (unknown type and format names).
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("failed to read {0}: {1}")]
    Io(String, String),

    #[error("failed to parse {0}: {1}")]
    Parse(String, String),

    #[error("schema '{0}' not found in components")]
    SchemaNotFound(String),

    #[error("path '{0}' not found")]
    PathNotFound(String),

    #[error("method '{0}' not found for path '{1}'")]
    MethodNotFound(String, String),

    #[error("response {0} not found for {1} {2}")]
    ResponseNotFound(String, String, String),

    #[error("no JSON content schema declared for {1} {2} {0}")]
    NoJsonContent(String, String, String),

    #[error("no servers defined in contract")]
    NoServers,

    #[error("reference {0} does not name a component schema")]
    InvalidReference(String),

    #[error("unexpected shape at {0}: expected {1}")]
    Shape(String, &'static str),
}

/// Loads one OpenAPI contract document and answers lookups against it
///
/// The parsed tree is owned by the loader and never mutated after load.
/// The cache is idempotent: a concurrent first load may parse twice, but
/// the first stored value wins and all readers see the same tree.
#[derive(Debug)]
pub struct ContractLoader {
    path: PathBuf,
    document: OnceLock<Value>,
}

impl ContractLoader {
    /// Create a loader for a contract file; no I/O happens until first access
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: OnceLock::new(),
        }
    }

    /// Parse a contract from a YAML string
    pub fn from_str(yaml: &str) -> Result<Self, ContractError> {
        let parsed = parse_document("<inline>", yaml)?;
        let document = OnceLock::new();
        let _ = document.set(parsed);

        Ok(Self {
            path: PathBuf::from("<inline>"),
            document,
        })
    }

    /// Path this loader reads from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full parsed document, loading and caching it on first access
    pub fn document(&self) -> Result<&Value, ContractError> {
        if let Some(doc) = self.document.get() {
            return Ok(doc);
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| ContractError::Io(self.path.display().to_string(), e.to_string()))?;
        let parsed = parse_document(&self.path.display().to_string(), &contents)?;

        tracing::debug!(path = %self.path.display(), "loaded contract document");

        // First stored value wins under a concurrent first load.
        Ok(self.document.get_or_init(|| parsed))
    }

    /// Look up a schema in components/schemas by name
    pub fn get_schema(&self, name: &str) -> Result<&Value, ContractError> {
        let doc = self.document()?;
        doc.get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.get(name))
            .ok_or_else(|| ContractError::SchemaNotFound(name.to_string()))
    }

    /// Look up an operation by path and HTTP method (case-insensitive)
    pub fn get_operation(&self, path: &str, method: &str) -> Result<&Value, ContractError> {
        let doc = self.document()?;
        let item = doc
            .get("paths")
            .and_then(|p| p.get(path))
            .ok_or_else(|| ContractError::PathNotFound(path.to_string()))?;

        let method = method.to_ascii_lowercase();
        item.get(&method)
            .ok_or_else(|| ContractError::MethodNotFound(method, path.to_string()))
    }

    /// JSON content schema declared for an operation response
    pub fn get_response_schema(
        &self,
        path: &str,
        method: &str,
        status_code: &str,
    ) -> Result<&Value, ContractError> {
        let operation = self.get_operation(path, method)?;
        let method_upper = method.to_ascii_uppercase();

        let response = operation
            .get("responses")
            .and_then(|r| r.get(status_code))
            .ok_or_else(|| {
                ContractError::ResponseNotFound(
                    status_code.to_string(),
                    method_upper.clone(),
                    path.to_string(),
                )
            })?;

        response
            .get("content")
            .and_then(|c| c.get("application/json"))
            .and_then(|j| j.get("schema"))
            .ok_or_else(|| {
                ContractError::NoJsonContent(
                    status_code.to_string(),
                    method_upper,
                    path.to_string(),
                )
            })
    }

    /// Response schema for the conventional 200 response
    pub fn get_ok_response_schema(&self, path: &str, method: &str) -> Result<&Value, ContractError> {
        self.get_response_schema(path, method, "200")
    }

    /// First declared server URL (first-wins, no other selection policy)
    pub fn get_base_url(&self) -> Result<&str, ContractError> {
        let doc = self.document()?;
        let servers = doc
            .get("servers")
            .and_then(Value::as_array)
            .filter(|s| !s.is_empty())
            .ok_or(ContractError::NoServers)?;

        servers[0]
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ContractError::Shape("servers[0].url".to_string(), "string"))
    }

    /// Resolve a `$ref` node against this contract's component schemas
    ///
    /// Identity for nodes without a reference marker. Single-level only:
    /// references nested inside the resolved schema are left as-is.
    pub fn resolve_reference<'a>(&'a self, node: &'a Value) -> Result<&'a Value, ContractError> {
        let Some(reference) = node.get("$ref") else {
            return Ok(node);
        };

        let reference = reference
            .as_str()
            .ok_or_else(|| ContractError::InvalidReference(reference.to_string()))?;

        // '#/components/schemas/User' -> 'User'
        let name = reference.rsplit('/').next().unwrap_or(reference);
        self.get_schema(name)
    }
}

fn parse_document(origin: &str, contents: &str) -> Result<Value, ContractError> {
    serde_yaml::from_str(contents)
        .map_err(|e| ContractError::Parse(origin.to_string(), e.to_string()))
}
