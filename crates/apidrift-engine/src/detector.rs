//! Breaking change detection between two contract versions
//!
//! Four passes walk the old and new documents: schema/field removal,
//! type changes, required-field changes, and response/endpoint changes.
//! Mismatched or missing document sections are never detection errors;
//! only a failed document load aborts a run.

use crate::loader::{ContractError, ContractLoader};
use apidrift_core::{BreakingChange, ChangeCategory, ChangeSummary, Config, Severity};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Fixed method vocabulary for the response/endpoint pass
const HTTP_METHODS: [&str; 5] = ["get", "post", "put", "delete", "patch"];

/// Detects breaking changes between an old and a new contract
///
/// Stateless over its two loaders; independent detector instances are
/// safe to use concurrently as long as each has its own loader pair.
pub struct BreakingChangeDetector {
    old: ContractLoader,
    new: ContractLoader,
    config: Config,
}

impl BreakingChangeDetector {
    /// Create a detector over two loaded (or lazily loadable) contracts
    pub fn new(old: ContractLoader, new: ContractLoader) -> Self {
        Self {
            old,
            new,
            config: Config::default(),
        }
    }

    /// Create a detector for two contract files
    pub fn from_files(
        old_path: impl Into<std::path::PathBuf>,
        new_path: impl Into<std::path::PathBuf>,
    ) -> Self {
        Self::new(ContractLoader::new(old_path), ContractLoader::new(new_path))
    }

    /// Apply severity overrides and ignore rules
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Loader for the old contract
    pub fn old_contract(&self) -> &ContractLoader {
        &self.old
    }

    /// Loader for the new contract
    pub fn new_contract(&self) -> &ContractLoader {
        &self.new
    }

    /// Run all four detection passes, concatenated in fixed order
    pub fn detect_all(&self) -> Result<Vec<BreakingChange>, ContractError> {
        let mut changes = Vec::new();

        changes.extend(self.detect_schema_changes()?);
        changes.extend(self.detect_type_changes()?);
        changes.extend(self.detect_required_field_changes()?);
        changes.extend(self.detect_response_changes()?);

        tracing::debug!(count = changes.len(), "breaking change detection finished");

        Ok(changes)
    }

    /// Fold a findings list into summary counts
    pub fn summarize(&self, changes: &[BreakingChange]) -> ChangeSummary {
        ChangeSummary::from_changes(changes)
    }

    /// Removed schemas and removed fields in retained schemas
    ///
    /// A removed schema is reported at the schema level only; its
    /// properties do not produce separate field findings.
    fn detect_schema_changes(&self) -> Result<Vec<BreakingChange>, ContractError> {
        let mut changes = Vec::new();
        let empty = Map::new();

        let old_schemas = component_schemas(self.old.document()?).unwrap_or(&empty);
        let new_schemas = component_schemas(self.new.document()?).unwrap_or(&empty);

        for (schema_name, old_schema) in old_schemas {
            if self.config.ignore.is_schema_ignored(schema_name) {
                continue;
            }

            let Some(new_schema) = new_schemas.get(schema_name) else {
                changes.push(
                    self.finding(
                        ChangeCategory::SchemaRemoved,
                        format!("schemas/{schema_name}"),
                        format!("Schema '{schema_name}' was removed"),
                    )
                    .with_values(Some(Value::String(schema_name.clone())), None)
                    .with_impact(format!("All consumers using {schema_name} will break")),
                );
                continue;
            };

            let old_properties = properties(old_schema).unwrap_or(&empty);
            let new_properties = properties(new_schema).unwrap_or(&empty);

            for (field_name, old_field) in old_properties {
                if !new_properties.contains_key(field_name) {
                    changes.push(
                        self.finding(
                            ChangeCategory::FieldRemoved,
                            format!("schemas/{schema_name}.{field_name}"),
                            format!("Field '{field_name}' removed from {schema_name}"),
                        )
                        .with_values(Some(old_field.clone()), None)
                        .with_impact(format!("Consumers expecting '{field_name}' will fail")),
                    );
                }
            }
        }

        Ok(changes)
    }

    /// Primitive type changes on properties shared by both versions
    ///
    /// A property without a declared type on either side is skipped.
    fn detect_type_changes(&self) -> Result<Vec<BreakingChange>, ContractError> {
        let mut changes = Vec::new();
        let empty = Map::new();

        let old_schemas = component_schemas(self.old.document()?).unwrap_or(&empty);
        let new_schemas = component_schemas(self.new.document()?).unwrap_or(&empty);

        for (schema_name, old_schema) in old_schemas {
            if self.config.ignore.is_schema_ignored(schema_name) {
                continue;
            }
            let Some(new_schema) = new_schemas.get(schema_name) else {
                continue;
            };

            let old_properties = properties(old_schema).unwrap_or(&empty);
            let new_properties = properties(new_schema).unwrap_or(&empty);

            for (field_name, old_field) in old_properties {
                let Some(new_field) = new_properties.get(field_name) else {
                    continue;
                };
                let (Some(old_type), Some(new_type)) = (
                    old_field.get("type").and_then(Value::as_str),
                    new_field.get("type").and_then(Value::as_str),
                ) else {
                    continue;
                };

                if old_type != new_type {
                    changes.push(
                        self.finding(
                            ChangeCategory::TypeChanged,
                            format!("schemas/{schema_name}.{field_name}"),
                            format!(
                                "Field '{field_name}' type changed from {old_type} to {new_type}"
                            ),
                        )
                        .with_values(
                            Some(Value::String(old_type.to_string())),
                            Some(Value::String(new_type.to_string())),
                        )
                        .with_impact("Type mismatch will cause parsing errors"),
                    );
                }
            }
        }

        Ok(changes)
    }

    /// Required-field set deltas on schemas shared by both versions
    fn detect_required_field_changes(&self) -> Result<Vec<BreakingChange>, ContractError> {
        let mut changes = Vec::new();
        let empty = Map::new();

        let old_schemas = component_schemas(self.old.document()?).unwrap_or(&empty);
        let new_schemas = component_schemas(self.new.document()?).unwrap_or(&empty);

        for (schema_name, old_schema) in old_schemas {
            if self.config.ignore.is_schema_ignored(schema_name) {
                continue;
            }
            let Some(new_schema) = new_schemas.get(schema_name) else {
                continue;
            };

            let old_required = required_list(old_schema);
            let new_required = required_list(new_schema);
            let old_set: HashSet<&str> = old_required.iter().copied().collect();
            let new_set: HashSet<&str> = new_required.iter().copied().collect();

            let old_list = string_list(&old_required);
            let new_list = string_list(&new_required);

            for field in new_required.iter().filter(|f| !old_set.contains(*f)) {
                changes.push(
                    self.finding(
                        ChangeCategory::RequiredFieldAdded,
                        format!("schemas/{schema_name}.required"),
                        format!("Field '{field}' is now required in {schema_name}"),
                    )
                    .with_values(Some(old_list.clone()), Some(new_list.clone()))
                    .with_impact(format!(
                        "Existing requests without '{field}' will fail validation"
                    )),
                );
            }

            for field in old_required.iter().filter(|f| !new_set.contains(*f)) {
                changes.push(
                    self.finding(
                        ChangeCategory::RequiredFieldRemoved,
                        format!("schemas/{schema_name}.required"),
                        format!("Field '{field}' is no longer required in {schema_name}"),
                    )
                    .with_values(Some(old_list.clone()), Some(new_list.clone()))
                    .with_impact("Field is now optional (usually safe change)"),
                );
            }
        }

        Ok(changes)
    }

    /// Removed endpoints and changed success response codes
    ///
    /// Success codes are compared first-declared against first-declared;
    /// the document tree preserves declaration order, so the comparison
    /// is deterministic.
    fn detect_response_changes(&self) -> Result<Vec<BreakingChange>, ContractError> {
        let mut changes = Vec::new();
        let empty = Map::new();

        let old_doc = self.old.document()?;
        let new_doc = self.new.document()?;
        let old_paths = old_doc
            .get("paths")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let new_paths = new_doc
            .get("paths")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        for (path, old_item) in old_paths {
            if self.config.ignore.is_path_ignored(path) {
                continue;
            }
            let Some(new_item) = new_paths.get(path).and_then(Value::as_object) else {
                continue;
            };
            let Some(old_item) = old_item.as_object() else {
                continue;
            };

            for method in HTTP_METHODS {
                let Some(old_operation) = old_item.get(method) else {
                    continue;
                };
                let method_upper = method.to_ascii_uppercase();

                let Some(new_operation) = new_item.get(method) else {
                    changes.push(
                        self.finding(
                            ChangeCategory::EndpointRemoved,
                            format!("{method_upper} {path}"),
                            format!("Endpoint {method_upper} {path} was removed"),
                        )
                        .with_values(Some(Value::String(method.to_string())), None)
                        .with_impact("All consumers calling this endpoint will fail"),
                    );
                    continue;
                };

                let old_codes = success_codes(old_operation);
                let new_codes = success_codes(new_operation);

                if let (Some(old_code), Some(new_code)) = (old_codes.first(), new_codes.first()) {
                    if old_code != new_code {
                        changes.push(
                            self.finding(
                                ChangeCategory::ResponseCodeChanged,
                                format!("{method_upper} {path}"),
                                format!(
                                    "Success response code changed from {old_code} to {new_code}"
                                ),
                            )
                            .with_values(
                                Some(Value::String((*old_code).to_string())),
                                Some(Value::String((*new_code).to_string())),
                            )
                            .with_impact(format!(
                                "Consumers checking for {old_code} will miss successful responses"
                            )),
                        );
                    }
                }
            }
        }

        Ok(changes)
    }

    fn finding(
        &self,
        category: ChangeCategory,
        path: String,
        description: String,
    ) -> BreakingChange {
        BreakingChange::new(category, self.severity_of(category), path, description)
    }

    fn severity_of(&self, category: ChangeCategory) -> Severity {
        self.config
            .severity
            .get_severity(category, category.default_severity())
    }
}

fn component_schemas(doc: &Value) -> Option<&Map<String, Value>> {
    doc.get("components")?.get("schemas")?.as_object()
}

fn properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties")?.as_object()
}

fn required_list(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn success_codes(operation: &Value) -> Vec<&str> {
    operation
        .get("responses")
        .and_then(Value::as_object)
        .map(|responses| {
            responses
                .keys()
                .map(String::as_str)
                .filter(|code| code.starts_with('2'))
                .collect()
        })
        .unwrap_or_default()
}

fn string_list(fields: &[&str]) -> Value {
    Value::Array(
        fields
            .iter()
            .map(|f| Value::String((*f).to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidrift_core::{IgnoreRules, SeverityThreshold};

    fn detector(old: &str, new: &str) -> BreakingChangeDetector {
        BreakingChangeDetector::new(
            ContractLoader::from_str(old).unwrap(),
            ContractLoader::from_str(new).unwrap(),
        )
    }

    const USERS_V1: &str = r#"
openapi: 3.0.3
info:
  title: Users API
  version: 1.0.0
paths:
  /users:
    get:
      responses:
        '200':
          description: OK
    post:
      responses:
        '201':
          description: Created
  /users/{id}:
    get:
      responses:
        '200':
          description: OK
    delete:
      responses:
        '204':
          description: Deleted
components:
  schemas:
    User:
      type: object
      required:
        - id
        - name
        - email
      properties:
        id:
          type: integer
        name:
          type: string
        email:
          type: string
          format: email
    Company:
      type: object
      properties:
        name:
          type: string
"#;

    #[test]
    fn identical_contracts_produce_no_findings() {
        let detector = detector(USERS_V1, USERS_V1);

        assert!(detector.detect_schema_changes().unwrap().is_empty());
        assert!(detector.detect_type_changes().unwrap().is_empty());
        assert!(detector.detect_required_field_changes().unwrap().is_empty());
        assert!(detector.detect_response_changes().unwrap().is_empty());
        assert!(detector.detect_all().unwrap().is_empty());
    }

    #[test]
    fn removed_schema_reported_at_schema_level_only() {
        let new = r#"
openapi: 3.0.3
info:
  title: Users API
  version: 2.0.0
paths: {}
components:
  schemas:
    User:
      type: object
      required:
        - id
        - name
        - email
      properties:
        id:
          type: integer
        name:
          type: string
        email:
          type: string
          format: email
"#;
        let detector = detector(USERS_V1, new);

        let changes = detector.detect_schema_changes().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].category, ChangeCategory::SchemaRemoved);
        assert_eq!(changes[0].severity, Severity::Critical);
        assert_eq!(changes[0].path, "schemas/Company");
        // No field_removed findings for the removed schema's properties.
        assert!(changes
            .iter()
            .all(|c| c.category != ChangeCategory::FieldRemoved));
    }

    #[test]
    fn removed_field_reported_added_field_ignored() {
        let old = r#"
components:
  schemas:
    User:
      type: object
      properties:
        id:
          type: integer
        email:
          type: string
"#;
        let new = r#"
components:
  schemas:
    User:
      type: object
      properties:
        id:
          type: integer
        avatar:
          type: string
"#;
        let detector = detector(old, new);
        let changes = detector.detect_schema_changes().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].category, ChangeCategory::FieldRemoved);
        assert_eq!(changes[0].path, "schemas/User.email");
    }

    #[test]
    fn type_change_detected_with_old_and_new_values() {
        let old = r#"
components:
  schemas:
    User:
      type: object
      properties:
        id:
          type: integer
"#;
        let new = r#"
components:
  schemas:
    User:
      type: object
      properties:
        id:
          type: string
"#;
        let detector = detector(old, new);
        let changes = detector.detect_type_changes().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].category, ChangeCategory::TypeChanged);
        assert_eq!(changes[0].severity, Severity::Critical);
        assert_eq!(changes[0].old_value, Some("integer".into()));
        assert_eq!(changes[0].new_value, Some("string".into()));
    }

    #[test]
    fn untyped_properties_are_skipped_by_type_pass() {
        let old = r#"
components:
  schemas:
    User:
      type: object
      properties:
        meta:
          description: free-form
"#;
        let new = r#"
components:
  schemas:
    User:
      type: object
      properties:
        meta:
          type: object
"#;
        let detector = detector(old, new);
        assert!(detector.detect_type_changes().unwrap().is_empty());
    }

    #[test]
    fn required_field_deltas() {
        let old = r#"
components:
  schemas:
    User:
      type: object
      required:
        - id
        - name
      properties:
        id:
          type: integer
"#;
        let new = r#"
components:
  schemas:
    User:
      type: object
      required:
        - id
        - email
      properties:
        id:
          type: integer
"#;
        let detector = detector(old, new);
        let changes = detector.detect_required_field_changes().unwrap();

        assert_eq!(changes.len(), 2);

        let added = &changes[0];
        assert_eq!(added.category, ChangeCategory::RequiredFieldAdded);
        assert_eq!(added.severity, Severity::High);
        assert_eq!(added.path, "schemas/User.required");
        assert!(added.description.contains("email"));

        let removed = &changes[1];
        assert_eq!(removed.category, ChangeCategory::RequiredFieldRemoved);
        assert_eq!(removed.severity, Severity::Medium);
        assert!(removed.description.contains("name"));
    }

    #[test]
    fn removed_endpoint_skips_response_code_check() {
        let new = r#"
openapi: 3.0.3
info:
  title: Users API
  version: 2.0.0
paths:
  /users:
    get:
      responses:
        '200':
          description: OK
    post:
      responses:
        '201':
          description: Created
  /users/{id}:
    get:
      responses:
        '200':
          description: OK
components:
  schemas: {}
"#;
        let detector = detector(USERS_V1, new);
        let changes = detector.detect_response_changes().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].category, ChangeCategory::EndpointRemoved);
        assert_eq!(changes[0].severity, Severity::Critical);
        assert_eq!(changes[0].path, "DELETE /users/{id}");
    }

    #[test]
    fn first_success_code_change_detected() {
        let old = r#"
paths:
  /users/{id}:
    get:
      responses:
        '200':
          description: OK
        '404':
          description: Not found
"#;
        let new = r#"
paths:
  /users/{id}:
    get:
      responses:
        '201':
          description: Created
        '404':
          description: Not found
"#;
        let detector = detector(old, new);
        let changes = detector.detect_response_changes().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].category, ChangeCategory::ResponseCodeChanged);
        assert_eq!(changes[0].severity, Severity::High);
        assert_eq!(changes[0].old_value, Some("200".into()));
        assert_eq!(changes[0].new_value, Some("201".into()));
    }

    #[test]
    fn new_paths_and_methods_are_not_findings() {
        let old = r#"
paths:
  /users:
    get:
      responses:
        '200':
          description: OK
"#;
        let new = r#"
paths:
  /users:
    get:
      responses:
        '200':
          description: OK
    post:
      responses:
        '201':
          description: Created
  /teams:
    get:
      responses:
        '200':
          description: OK
"#;
        let detector = detector(old, new);
        assert!(detector.detect_all().unwrap().is_empty());
    }

    #[test]
    fn removed_field_and_relaxed_requirement_scenario() {
        let old = r#"
components:
  schemas:
    User:
      type: object
      required:
        - email
      properties:
        id:
          type: integer
        name:
          type: string
        email:
          type: string
"#;
        let new = r#"
components:
  schemas:
    User:
      type: object
      properties:
        id:
          type: integer
        name:
          type: string
"#;
        let detector = detector(old, new);
        let changes = detector.detect_all().unwrap();

        assert_eq!(changes.len(), 2);

        let field_removed = changes
            .iter()
            .find(|c| c.category == ChangeCategory::FieldRemoved)
            .unwrap();
        assert_eq!(field_removed.path, "schemas/User.email");
        assert_eq!(field_removed.severity, Severity::Critical);

        let relaxed = changes
            .iter()
            .find(|c| c.category == ChangeCategory::RequiredFieldRemoved)
            .unwrap();
        assert_eq!(relaxed.severity, Severity::Medium);
    }

    #[test]
    fn critical_findings_carry_breakage_wording() {
        let new = r#"
openapi: 3.0.3
info:
  title: Users API
  version: 2.0.0
paths:
  /users:
    get:
      responses:
        '200':
          description: OK
components:
  schemas:
    User:
      type: object
      required:
        - id
        - name
      properties:
        id:
          type: string
        name:
          type: string
"#;
        let detector = detector(USERS_V1, new);
        let changes = detector.detect_all().unwrap();
        assert!(!changes.is_empty());

        for change in changes.iter().filter(|c| c.severity == Severity::Critical) {
            assert!(!change.impact.is_empty(), "{change} has empty impact");
            let impact = change.impact.to_lowercase();
            assert!(
                ["break", "fail", "error"].iter().any(|w| impact.contains(w)),
                "{change} impact lacks breakage wording: '{}'",
                change.impact
            );
        }
    }

    #[test]
    fn config_overrides_severity_and_ignores_schemas() {
        let old = r#"
components:
  schemas:
    InternalAudit:
      type: object
      properties:
        id:
          type: integer
    User:
      type: object
      required:
        - name
      properties:
        name:
          type: string
"#;
        let new = r#"
components:
  schemas:
    User:
      type: object
      properties:
        name:
          type: string
"#;
        let mut severity = SeverityThreshold::default();
        severity.set_override(ChangeCategory::RequiredFieldRemoved, Severity::High);
        let config = Config {
            severity,
            ignore: IgnoreRules {
                schemas: vec!["Internal*".to_string()],
                paths: Vec::new(),
            },
        };

        let detector = detector(old, new).with_config(config);
        let changes = detector.detect_all().unwrap();

        assert!(changes
            .iter()
            .all(|c| c.category != ChangeCategory::SchemaRemoved));
        let relaxed = changes
            .iter()
            .find(|c| c.category == ChangeCategory::RequiredFieldRemoved)
            .unwrap();
        assert_eq!(relaxed.severity, Severity::High);
    }

    #[test]
    fn summarize_delegates_to_reducer() {
        let detector = detector(USERS_V1, USERS_V1);
        let summary = detector.summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.critical_count, 0);
    }
}
