//! Ship command - release a manifest's charts to the cluster

use loftsman_helm::{Catalog, HelmCli};
use loftsman_kube::{KubeStore, ShipLog, ShipOptions, Shipper};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use super::{GlobalSettings, manifest};
use crate::display;
use crate::error::{CliError, Result};
use crate::settings::ChartsSource;

/// Install the interrupt handlers and return a future that completes on
/// the first of SIGINT, SIGTERM, SIGHUP or SIGQUIT.
///
/// Handlers are registered before this returns, not on first poll.
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => tracing::debug!("received SIGINT"),
            _ = terminate.recv() => tracing::debug!("received SIGTERM"),
            _ = hangup.recv() => tracing::debug!("received SIGHUP"),
            _ = quit.recv() => tracing::debug!("received SIGQUIT"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    })
}

pub async fn run(global: &GlobalSettings, manifest_path: &Path, source: &ChartsSource) -> Result<()> {
    let (manifest, content) = manifest::load(manifest_path)?;
    let default_source = source.default_location()?;
    let interrupt = shutdown_signal()?;

    let temp_dir = tempfile::Builder::new().prefix("loftsman-").tempdir()?;
    let options = ShipOptions {
        default_source,
        temp_dir: temp_dir.path().to_path_buf(),
    };

    let helm = HelmCli::new(&global.helm_binary)
        .with_kubeconfig(global.kubeconfig.clone())
        .with_kube_context(global.kube_context.clone());
    let store = KubeStore::connect(global.kubeconfig.as_deref(), global.kube_context.as_deref()).await?;
    let catalog = Catalog::new()?;

    let shipper = Shipper::new(Arc::new(store), Arc::new(helm), Arc::new(catalog))
        .with_namespace(&global.namespace);
    let log = ShipLog::new().with_console();

    let report = shipper
        .ship(&manifest, &content, &options, &log, interrupt)
        .await?;

    if report.is_success() {
        display::print_ship_success(&manifest);
        return Ok(());
    }

    display::print_release_errors(&report.errors);
    Err(CliError::ShipFailed {
        failed: report.errors.len(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_hangup_after_install_completes_shutdown() {
        let shutdown = shutdown_signal().unwrap();

        // Delivered before the future is first polled
        let status = std::process::Command::new("kill")
            .args(["-HUP", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .expect("shutdown future did not complete after SIGHUP");
    }
}
