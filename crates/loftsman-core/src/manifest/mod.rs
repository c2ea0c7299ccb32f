//! Versioned manifest documents
//!
//! A manifest declares the charts to ship. Its `apiVersion` selects the
//! concrete structure and the JSON schema it is checked against; unknown
//! versions are rejected before anything else is parsed.

pub mod v1beta1;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::schema::SchemaValidator;

/// A validated manifest, one variant per supported `apiVersion`
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    V1Beta1(v1beta1::Manifest),
}

impl Manifest {
    /// Unique manifest name, used to key ship records
    pub fn name(&self) -> &str {
        match self {
            Self::V1Beta1(m) => &m.metadata.name,
        }
    }

    pub fn api_version(&self) -> &str {
        match self {
            Self::V1Beta1(_) => v1beta1::API_VERSION,
        }
    }

    /// Number of charts the manifest declares
    pub fn chart_count(&self) -> usize {
        match self {
            Self::V1Beta1(m) => m.spec.charts.len(),
        }
    }
}

/// The only field shared by every manifest version
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnlyApiVersion {
    #[serde(default)]
    api_version: String,
}

fn api_version_of(content: &str) -> Result<String> {
    let only: OnlyApiVersion = serde_yaml::from_str(content).map_err(|_| {
        CoreError::malformed("could not parse the manifest as yaml to retrieve the apiVersion")
    })?;
    Ok(only.api_version)
}

/// Parse and validate manifest text.
///
/// The document is parsed for its version, then into that version's
/// structure (with global defaults merged), and that structure is checked
/// against the version's schema. Schema violations are collected in
/// reporting order.
pub fn validate(content: &str) -> Result<Manifest> {
    let version = api_version_of(content)?;

    match version.as_str() {
        v1beta1::API_VERSION => {
            let manifest = v1beta1::Manifest::load(content)?;
            check_schema(&manifest, content, v1beta1::SCHEMA)?;
            Ok(Manifest::V1Beta1(manifest))
        }
        _ => Err(CoreError::UnsupportedVersion { version }),
    }
}

/// Schema-check a parsed manifest.
///
/// Fields the document left out are defaulted in the parsed structure; they
/// are dropped again here so that `required` still sees them as missing.
/// Fields the structure does not know are already gone.
fn check_schema<T: Serialize>(manifest: &T, content: &str, schema: &str) -> Result<()> {
    let written: JsonValue = serde_yaml::from_str(content)
        .map_err(|e| CoreError::malformed(format!("could not parse the manifest: {}", e)))?;
    let parsed = serde_json::to_value(manifest)
        .map_err(|e| CoreError::malformed(format!("could not read back the manifest: {}", e)))?;
    let document = keep_present(parsed, Some(&written)).unwrap_or(JsonValue::Null);
    SchemaValidator::from_json(schema)?.validate(&document)
}

/// Strip empty values whose key is absent from `written`, recursively.
///
/// Non-empty values are kept even when not written, which keeps merged
/// defaults visible to the schema.
fn keep_present(parsed: JsonValue, written: Option<&JsonValue>) -> Option<JsonValue> {
    match parsed {
        JsonValue::Object(fields) => {
            let kept: serde_json::Map<String, JsonValue> = fields
                .into_iter()
                .filter_map(|(key, value)| {
                    let child = written.and_then(|w| w.get(&key));
                    keep_present(value, child).map(|value| (key, value))
                })
                .collect();
            if kept.is_empty() && written.is_none() {
                None
            } else {
                Some(JsonValue::Object(kept))
            }
        }
        JsonValue::Array(items) => {
            if items.is_empty() && written.is_none() {
                return None;
            }
            let written_items = written.and_then(JsonValue::as_array);
            let kept = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    let child = written_items.and_then(|w| w.get(i));
                    keep_present(item, child).unwrap_or(JsonValue::Null)
                })
                .collect();
            Some(JsonValue::Array(kept))
        }
        JsonValue::Null => written.map(|_| JsonValue::Null),
        JsonValue::String(s) if s.is_empty() && written.is_none() => None,
        value => Some(value),
    }
}

/// Skeleton document for the newest manifest version, one blank chart per name
pub fn create(chart_names: &[String]) -> Result<String> {
    let skeleton = v1beta1::Manifest::skeleton(chart_names);
    Ok(serde_yaml::to_string(&skeleton)?)
}
