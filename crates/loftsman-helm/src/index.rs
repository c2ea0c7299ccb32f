//! Chart repository `index.yaml`

use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

use crate::catalog::ChartArtifact;
use crate::error::{HelmError, Result};

/// The parts of a Helm repository index Loftsman reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryIndex {
    #[serde(default)]
    pub entries: HashMap<String, Vec<IndexEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexEntry {
    pub version: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

impl RepositoryIndex {
    pub fn from_yaml(yaml: &str, url: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| HelmError::IndexParse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Every indexed version of a chart, with artifact URLs made absolute
    /// against the repository base
    pub fn artifacts(&self, chart: &str, base: &Url) -> Vec<ChartArtifact> {
        let Some(entries) = self.entries.get(chart) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let first = entry.urls.first()?;
                let path = match Url::parse(first) {
                    Ok(absolute) => absolute.to_string(),
                    Err(_) => base.join(first.trim_start_matches('/')).ok()?.to_string(),
                };
                Some(ChartArtifact {
                    version: entry.version.clone(),
                    path,
                })
            })
            .collect()
    }
}

/// Parse a repository base URL so relative joins land beneath it
pub fn base_url(location: &str) -> Result<Url> {
    let with_slash = if location.ends_with('/') {
        location.to_string()
    } else {
        format!("{}/", location)
    };
    Url::parse(&with_slash).map_err(|e| HelmError::InvalidUrl {
        url: location.to_string(),
        reason: e.to_string(),
    })
}
