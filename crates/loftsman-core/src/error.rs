//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The document could not be parsed as structured text, or did not fit
    /// the structure of its declared version
    #[error("{message}")]
    MalformedInput { message: String },

    #[error("the manifest apiVersion is not supported: {version}")]
    UnsupportedVersion { version: String },

    /// JSON-schema violations, in the order the validator reported them
    #[error("manifest validation errors:{}", numbered(.errors))]
    SchemaInvalid { errors: Vec<String> },

    #[error("invalid embedded schema: {message}")]
    InvalidSchema { message: String },

    #[error("Failed to serialize manifest: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Violation messages for a schema failure, empty for every other kind
    pub fn violations(&self) -> &[String] {
        match self {
            Self::SchemaInvalid { errors } => errors,
            _ => &[],
        }
    }
}

fn numbered(errors: &[String]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!(" ({}) {}", i + 1, e))
        .collect()
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_invalid_is_numbered() {
        let err = CoreError::SchemaInvalid {
            errors: vec!["first".to_string(), "second".to_string()],
        };
        insta::assert_snapshot!(err.to_string(), @"manifest validation errors: (1) first (2) second");
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_violations_empty_for_other_kinds() {
        let err = CoreError::UnsupportedVersion {
            version: "v0".to_string(),
        };
        assert!(err.violations().is_empty());
        assert_eq!(err.to_string(), "the manifest apiVersion is not supported: v0");
    }
}
