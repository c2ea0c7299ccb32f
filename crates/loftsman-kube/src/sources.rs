//! Chart source resolution
//!
//! A chart either names one of the manifest's chart sources or falls back
//! to the default source the ship was started with. Repository credentials
//! come from a cluster Secret. Credentialed repositories are registered with
//! helm once per run and removed when the run ends.

use loftsman_core::ChartError;
use loftsman_core::manifest::v1beta1::{Chart, ChartSource, ChartSourceType, Manifest};
use loftsman_helm::{ChartLocation, Helm, RepoCredentials};
use md5::{Digest, Md5};

use crate::log::ShipLog;
use crate::store::ClusterStore;

/// Name a repository is registered under: its source name, or the md5 hex
/// digest of its URL when it has none
pub fn repository_name(name: Option<&str>, url: &str) -> String {
    match name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => hex::encode(Md5::digest(url.as_bytes())),
    }
}

/// Resolve where a chart's artifacts come from
pub async fn resolve(
    manifest: &Manifest,
    chart: &Chart,
    default: Option<&ChartLocation>,
    store: &dyn ClusterStore,
) -> Result<ChartLocation, ChartError> {
    let source_name = match chart.source.as_deref() {
        Some(name) if !name.is_empty() => name,
        _ => {
            return default.cloned().ok_or_else(|| ChartError::SourceResolutionFailed {
                message: format!(
                    "No source configured for chart {}: set spec.charts[].source or provide a default charts repo or path",
                    chart.name
                ),
            });
        }
    };

    let source = manifest
        .chart_source(source_name)
        .ok_or_else(|| ChartError::SourceNotFound {
            source_name: source_name.to_string(),
        })?;

    match &source.kind {
        ChartSourceType::Directory => Ok(ChartLocation::directory(&source.location)),
        ChartSourceType::Repo => Ok(ChartLocation::Repository {
            name: Some(source.name.clone()),
            url: source.location.clone(),
            credentials: credentials(source, store).await?,
        }),
        ChartSourceType::Other(kind) => Err(ChartError::SourceResolutionFailed {
            message: format!(
                "Unsupported type {} for spec.sources.charts[] name = {}",
                kind, source.name
            ),
        }),
    }
}

async fn credentials(
    source: &ChartSource,
    store: &dyn ClusterStore,
) -> Result<Option<RepoCredentials>, ChartError> {
    let Some(secret) = &source.credentials_secret else {
        return Ok(None);
    };

    let fetch = |key: String| async move {
        store
            .get_secret_value(&secret.name, &secret.namespace, &key)
            .await
            .map_err(|e| ChartError::SourceResolutionFailed {
                message: format!(
                    "Error getting chart source username/password from secret {} for spec.sources.charts[] name = {}: {}",
                    secret.name, source.name, e
                ),
            })
    };

    let username = fetch(secret.username_key.clone()).await?;
    let password = fetch(secret.password_key.clone()).await?;
    Ok(Some(RepoCredentials::new(username, password)))
}

/// Repositories registered with helm during one run
#[derive(Debug, Default)]
pub struct RepoRegistry {
    registered: Vec<String>,
}

impl RepoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credentialed repository location with helm unless this run
    /// already did. Returns the repository name when the chart should be
    /// installed through it.
    pub async fn ensure(
        &mut self,
        helm: &dyn Helm,
        location: &ChartLocation,
        log: &ShipLog,
    ) -> Result<Option<String>, ChartError> {
        let ChartLocation::Repository {
            name,
            url,
            credentials: Some(credentials),
        } = location
        else {
            return Ok(None);
        };

        let repo = repository_name(name.as_deref(), url);
        if self.registered.contains(&repo) {
            return Ok(Some(repo));
        }

        log.info(format!("Adding secure chart repo {} ({})", repo, url));
        helm.repo_add(&repo, url, credentials)
            .await
            .map_err(|e| ChartError::SourceResolutionFailed {
                message: format!("Error adding secure chart repo {}: {}", repo, e),
            })?;
        self.registered.push(repo.clone());
        Ok(Some(repo))
    }

    /// Names registered so far, in registration order
    pub fn registered(&self) -> &[String] {
        &self.registered
    }

    /// Remove every repository this run registered; failures are only logged
    pub async fn remove_all(&mut self, helm: &dyn Helm, log: &ShipLog) {
        for repo in self.registered.drain(..) {
            if let Err(e) = helm.repo_remove(&repo).await {
                log.warn(format!("Error removing chart repo {}: {}", repo, e));
            }
        }
    }
}
