//! `manifests/v1beta1` document structure

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::values::Values;

/// The `apiVersion` value identifying this structure
pub const API_VERSION: &str = "manifests/v1beta1";

/// JSON schema every v1beta1 document is validated against
pub const SCHEMA: &str = include_str!("../../schemas/v1beta1.json");

/// A v1beta1 manifest
///
/// Every section is optional at parse time so that missing pieces surface
/// as schema violations rather than parse failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub spec: Spec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Unique name of the manifest within a records namespace
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Sources>,

    /// Defaults copied into every chart that leaves the field unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<AllCharts>,

    #[serde(default)]
    pub charts: Vec<Chart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllCharts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Named chart origins a chart may refer to through `source`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sources {
    #[serde(default)]
    pub charts: Vec<ChartSource>,

    /// Legacy repository list, accepted but not used for resolution
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<RepoSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSource {
    #[serde(rename = "type")]
    pub kind: ChartSourceType,

    #[serde(default)]
    pub name: String,

    /// Directory path or repository base URL, depending on `kind`
    #[serde(default)]
    pub location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret: Option<CredentialsSecret>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartSourceType {
    Directory,
    Repo,
    /// Any other value, kept as written; rejected by the schema
    Other(String),
}

impl From<String> for ChartSourceType {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "directory" => Self::Directory,
            "repo" => Self::Repo,
            _ => Self::Other(kind),
        }
    }
}

impl From<ChartSourceType> for String {
    fn from(kind: ChartSourceType) -> Self {
        match kind {
            ChartSourceType::Directory => "directory".to_string(),
            ChartSourceType::Repo => "repo".to_string(),
            ChartSourceType::Other(kind) => kind,
        }
    }
}

/// Reference to the secret holding repository credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsSecret {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub username_key: String,
    #[serde(default)]
    pub password_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoSource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// One releasable chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_name: Option<String>,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Values>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl Chart {
    /// Release name, falling back to the chart name
    pub fn release_name(&self) -> &str {
        match self.release_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.name,
        }
    }

    /// Value overrides, whenever a `values` map was given, even an empty one
    pub fn overrides(&self) -> Option<&Values> {
        self.values.as_ref()
    }
}

impl Manifest {
    /// Parse a document already known to declare this version
    pub fn load(content: &str) -> Result<Self> {
        let mut manifest: Manifest = serde_yaml::from_str(content).map_err(|e| {
            CoreError::malformed(format!(
                "could not parse the manifest as {} yaml: {}",
                API_VERSION, e
            ))
        })?;
        manifest.merge_defaults();
        Ok(manifest)
    }

    /// Skeleton manifest with one blank chart per name
    pub fn skeleton(chart_names: &[String]) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            metadata: Metadata::default(),
            spec: Spec {
                charts: chart_names
                    .iter()
                    .map(|name| Chart {
                        name: name.clone(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            },
        }
    }

    /// Copy `spec.all` defaults into charts that leave them unset.
    ///
    /// Charts with their own value always keep it, so this is idempotent.
    pub fn merge_defaults(&mut self) {
        let Some(timeout) = self.spec.all.as_ref().and_then(|all| all.timeout.clone()) else {
            return;
        };
        if timeout.is_empty() {
            return;
        }
        for chart in &mut self.spec.charts {
            if chart.timeout.as_deref().is_none_or(str::is_empty) {
                chart.timeout = Some(timeout.clone());
            }
        }
    }

    /// Look up a named chart source
    pub fn chart_source(&self, name: &str) -> Option<&ChartSource> {
        self.spec
            .sources
            .as_ref()
            .and_then(|sources| sources.charts.iter().find(|s| s.name == name))
    }
}
