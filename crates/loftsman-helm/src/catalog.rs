//! Chart catalogs: where chart artifacts come from and which versions exist

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HelmError, Result};
use crate::index::{RepositoryIndex, base_url};
use crate::shim::RepoCredentials;

/// Resolved origin of chart artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartLocation {
    /// Local directory of `<chart>-<version>.tgz` files
    Directory { path: PathBuf },
    /// Remote chart repository serving `index.yaml`
    Repository {
        /// Name to register the repository under, when it has one
        name: Option<String>,
        url: String,
        credentials: Option<RepoCredentials>,
    },
}

impl ChartLocation {
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::Directory { path: path.into() }
    }

    pub fn repository(url: impl Into<String>) -> Self {
        Self::Repository {
            name: None,
            url: url.into(),
            credentials: None,
        }
    }

    /// Human readable location, never including credentials
    pub fn describe(&self) -> String {
        match self {
            Self::Directory { path } => path.display().to_string(),
            Self::Repository { url, .. } => url.clone(),
        }
    }
}

/// One available version of a chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub version: String,
    /// Local file path or absolute URL
    pub path: String,
}

/// Lists the versions of a chart available at a location
#[async_trait]
pub trait ChartCatalog: Send + Sync {
    async fn available_versions(
        &self,
        location: &ChartLocation,
        chart: &str,
    ) -> Result<Vec<ChartArtifact>>;
}

/// Catalog reading local directories and HTTP repositories
pub struct Catalog {
    client: reqwest::Client,
}

impl Catalog {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HelmError::Network {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    async fn scan_directory(&self, path: &Path, chart: &str) -> Result<Vec<ChartArtifact>> {
        let directory_error = |e: std::io::Error| HelmError::Directory {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let prefix = format!("{}-", chart);
        let mut found = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await.map_err(directory_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(directory_error)? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(version) = file_name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".tgz"))
            else {
                continue;
            };
            found.push(ChartArtifact {
                version: version.to_string(),
                path: path.join(file_name).display().to_string(),
            });
        }
        found.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(found)
    }

    async fn fetch_index(
        &self,
        url: &str,
        credentials: Option<&RepoCredentials>,
        chart: &str,
    ) -> Result<Vec<ChartArtifact>> {
        let base = base_url(url)?;
        let index_url = base.join("index.yaml").map_err(|e| HelmError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut request = self.client.get(index_url.clone());
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        tracing::debug!(url = %index_url, "fetching chart repository index");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HelmError::Http {
                status: status.as_u16(),
                url: index_url.to_string(),
            });
        }

        let body = response.text().await?;
        let index = RepositoryIndex::from_yaml(&body, index_url.as_str())?;
        Ok(index.artifacts(chart, &base))
    }
}

#[async_trait]
impl ChartCatalog for Catalog {
    async fn available_versions(
        &self,
        location: &ChartLocation,
        chart: &str,
    ) -> Result<Vec<ChartArtifact>> {
        match location {
            ChartLocation::Directory { path } => self.scan_directory(path, chart).await,
            ChartLocation::Repository {
                url, credentials, ..
            } => self.fetch_index(url, credentials.as_ref(), chart).await,
        }
    }
}
