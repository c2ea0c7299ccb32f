//! JSON-schema validation for manifest documents

use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// Validator with a compiled JSON schema
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compile a validator from JSON schema text
    pub fn from_json(schema: &str) -> Result<Self> {
        let value: JsonValue =
            serde_json::from_str(schema).map_err(|e| CoreError::InvalidSchema {
                message: e.to_string(),
            })?;

        let compiled = jsonschema::validator_for(&value).map_err(|e| CoreError::InvalidSchema {
            message: e.to_string(),
        })?;

        Ok(Self { compiled })
    }

    /// Validate a document, returning every violation in reporting order
    pub fn violations(&self, document: &JsonValue) -> Vec<String> {
        if self.compiled.is_valid(document) {
            return Vec::new();
        }

        self.compiled
            .iter_errors(document)
            .map(|e| {
                let path = e.instance_path.to_string();
                let location = if path.is_empty() {
                    "(root)".to_string()
                } else {
                    path
                };
                format!("{}: {}", location, e.to_string().replace('"', "'"))
            })
            .collect()
    }

    /// Validate a document, failing with `SchemaInvalid` on any violation
    pub fn validate(&self, document: &JsonValue) -> Result<()> {
        let errors = self.violations(document);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::SchemaInvalid { errors })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": { "type": "string" },
            "replicas": { "type": "integer" }
        }
    }"#;

    #[test]
    fn test_valid_document() {
        let validator = SchemaValidator::from_json(SCHEMA).unwrap();
        assert!(validator.validate(&json!({"name": "x", "replicas": 2})).is_ok());
    }

    #[test]
    fn test_violations_reported_with_location() {
        let validator = SchemaValidator::from_json(SCHEMA).unwrap();
        let errors = validator.violations(&json!({"replicas": "two"}));

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.starts_with("(root)") && e.contains("name")));
        assert!(errors.iter().any(|e| e.starts_with("/replicas")));
    }

    #[test]
    fn test_invalid_schema_text() {
        let err = SchemaValidator::from_json("{ not json").err().unwrap();
        assert!(matches!(err, CoreError::InvalidSchema { .. }));
    }
}
