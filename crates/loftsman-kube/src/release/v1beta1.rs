//! Release algorithm for `manifests/v1beta1`

use loftsman_core::manifest::v1beta1::{Chart, Manifest};
use loftsman_core::{ChartError, ReleaseError};
use loftsman_helm::InstallRequest;
use std::path::PathBuf;
use tracing::Instrument;

use super::ReleaseContext;
use crate::error::{KubeError, Result};
use crate::sources::{self, RepoRegistry};

pub async fn release(manifest: &Manifest, ctx: &ReleaseContext<'_>) -> Result<Vec<ReleaseError>> {
    if !ctx.temp_dir.is_dir() {
        return Err(KubeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!(
                "temporary directory {} does not exist",
                ctx.temp_dir.display()
            ),
        )));
    }

    let mut repos = RepoRegistry::new();
    let mut errors = Vec::new();

    for chart in &manifest.spec.charts {
        let span = tracing::info_span!(
            "chart",
            chart = %chart.name,
            version = %chart.version,
            namespace = %chart.namespace,
        );
        let outcome = release_chart(manifest, chart, ctx, &mut repos)
            .instrument(span)
            .await;

        if let Err(error) = outcome {
            tracing::debug!(kind = error.kind(), chart = %chart.name, "chart failed");
            ctx.log.error(error.to_string());
            errors.push(ReleaseError {
                chart: chart.name.clone(),
                version: chart.version.clone(),
                namespace: chart.namespace.clone(),
                error,
            });
        }
    }

    repos.remove_all(ctx.helm, ctx.log).await;
    Ok(errors)
}

async fn release_chart(
    manifest: &Manifest,
    chart: &Chart,
    ctx: &ReleaseContext<'_>,
    repos: &mut RepoRegistry,
) -> std::result::Result<(), ChartError> {
    let log = ctx.log;
    let release_name = chart.release_name();
    log.sub_header(&format!("Releasing {} v{}", chart.name, chart.version));

    // A missing release is the normal case for a first install
    if let Ok(status) = ctx.helm.release_status(release_name, &chart.namespace).await {
        if status.is_failed_first_install() {
            log.info(format!(
                "Attempting to remove previously-failed first release for {}",
                release_name
            ));
            ctx.helm
                .uninstall(release_name, &chart.namespace)
                .await
                .map_err(|e| ChartError::CleanupFailed {
                    release: release_name.to_string(),
                    message: e.to_string(),
                })?;
            log.info("Removed previously-failed first release successfully");
        }
    }

    let location = sources::resolve(manifest, chart, ctx.default_source, ctx.store).await?;
    let repo = repos.ensure(ctx.helm, &location, log).await?;

    let available = ctx
        .catalog
        .available_versions(&location, &chart.name)
        .await
        .map_err(|e| ChartError::ArtifactNotFound {
            message: format!(
                "Error determining available versions for the chart {}: {}",
                chart.name, e
            ),
        })?;
    let artifact = available
        .into_iter()
        .find(|artifact| artifact.version == chart.version)
        .ok_or_else(|| ChartError::ArtifactNotFound {
            message: format!(
                "Unable to find chart {} v{} in the configured charts location",
                chart.name, chart.version
            ),
        })?;

    let install_failed = |message: String| ChartError::InstallFailed {
        chart: chart.name.clone(),
        version: chart.version.clone(),
        message,
    };

    let values_file = match chart.overrides() {
        Some(values) => {
            let yaml = values.to_yaml().map_err(|e| install_failed(e.to_string()))?;
            log.info(format!("Found value overrides for chart, applying: \n{}", yaml));
            let path: PathBuf = ctx.temp_dir.join(format!("{}-values.yaml", chart.name));
            tokio::fs::write(&path, yaml)
                .await
                .map_err(|e| install_failed(format!("could not write values file {}: {}", path.display(), e)))?;
            Some(path)
        }
        None => None,
    };

    let (chart_ref, pin_version) = match repo {
        Some(repo) => (format!("{}/{}", repo, chart.name), true),
        None => (artifact.path, false),
    };

    let request = InstallRequest {
        release_name: release_name.to_string(),
        chart_ref,
        namespace: chart.namespace.clone(),
        chart_name: chart.name.clone(),
        chart_version: chart.version.clone(),
        pin_version,
        timeout: chart.timeout.clone().filter(|t| !t.is_empty()),
        values_file,
    };

    log.info(format!(
        "Running helm install/upgrade with arguments: {}",
        request.args().join(" ")
    ));
    let output = ctx
        .helm
        .upgrade_install(&request)
        .await
        .map_err(|e| install_failed(e.to_string()))?;
    log.info(output);
    Ok(())
}
