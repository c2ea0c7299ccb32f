//! Ship control: lock, run, record
//!
//! A ship takes the manifest's lock by writing an `active` record, runs the
//! release, and always finishes by writing one terminal status back to the
//! same record: `success`, `failed`, `cancelled` or `crashed`.
//!
//! The lock is advisory. The check for an active record and the write that
//! takes the lock are separate API calls, so two ships of the same manifest
//! started in the same instant can both proceed.

use futures::FutureExt;
use loftsman_core::{Manifest, ReleaseError, ShipRecord, ShipStatus};
use loftsman_helm::{ChartCatalog, ChartLocation, Helm, verify_client};
use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{KubeError, Result};
use crate::log::ShipLog;
use crate::release::{self, ReleaseContext};
use crate::store::ClusterStore;

/// Namespace ship records live in unless configured otherwise
pub const DEFAULT_RECORDS_NAMESPACE: &str = "loftsman";

/// Settings of a single ship
#[derive(Debug, Clone)]
pub struct ShipOptions {
    /// Source for charts that name none
    pub default_source: Option<ChartLocation>,
    /// Existing directory for materialized values files
    pub temp_dir: PathBuf,
}

/// Outcome of a ship that ran to completion
#[derive(Debug, Clone, PartialEq)]
pub struct ShipReport {
    pub status: ShipStatus,
    /// Per-chart failures, in chart order
    pub errors: Vec<ReleaseError>,
}

impl ShipReport {
    pub fn is_success(&self) -> bool {
        self.status == ShipStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvastOutcome {
    /// The active record was marked `avasted`
    Avasted,
    /// The operator did not confirm
    Declined,
}

enum RunOutcome {
    Finished(Vec<ReleaseError>),
    Interrupted,
    Crashed(String),
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs ships and avasts against one cluster
pub struct Shipper {
    store: Arc<dyn ClusterStore>,
    helm: Arc<dyn Helm>,
    catalog: Arc<dyn ChartCatalog>,
    namespace: String,
}

impl Shipper {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        helm: Arc<dyn Helm>,
        catalog: Arc<dyn ChartCatalog>,
    ) -> Self {
        Self {
            store,
            helm,
            catalog,
            namespace: DEFAULT_RECORDS_NAMESPACE.to_string(),
        }
    }

    /// Keep ship records in another namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Ship a validated manifest.
    ///
    /// `content` is the raw manifest text stored in the record. When
    /// `interrupt` completes before the release does, the release is
    /// abandoned where it stands, the record is marked `cancelled` and
    /// [`KubeError::ShipCancelled`] is returned. A release that panics or
    /// cannot proceed is recorded as `crashed` and returned as
    /// [`KubeError::ShipCrashed`].
    pub async fn ship<I>(
        &self,
        manifest: &Manifest,
        content: &str,
        options: &ShipOptions,
        log: &ShipLog,
        interrupt: I,
    ) -> Result<ShipReport>
    where
        I: Future<Output = ()>,
    {
        let manifest_name = manifest.name().to_string();
        let record_name = ShipRecord::object_name(&manifest_name);

        log.header("Shipping your Helm workloads with Loftsman");
        let version = verify_client(self.helm.as_ref()).await?;
        tracing::debug!(helm = %version, "helm client verified");

        log.info(format!("Ensuring that the {} namespace exists", self.namespace));
        self.store
            .ensure_namespace(&self.namespace)
            .await
            .map_err(|e| KubeError::EnsureNamespace {
                namespace: self.namespace.clone(),
                message: e.to_string(),
            })?;

        let active = self
            .store
            .find_config_map(
                &record_name,
                &self.namespace,
                ShipRecord::STATUS_KEY,
                ShipStatus::Active.as_str(),
            )
            .await
            .map_err(|e| KubeError::LockCheck {
                manifest: manifest_name.clone(),
                message: e.to_string(),
            })?;
        if active.is_some() {
            return Err(KubeError::ShipInProgress {
                manifest: manifest_name,
            });
        }

        self.store
            .initialize_config_map(
                &record_name,
                &self.namespace,
                ShipRecord::new(ShipStatus::Active, content, "").to_data(),
            )
            .await
            .map_err(|e| KubeError::RecordInit {
                name: record_name.clone(),
                namespace: self.namespace.clone(),
                message: e.to_string(),
            })?;

        let ctx = ReleaseContext {
            helm: self.helm.as_ref(),
            catalog: self.catalog.as_ref(),
            store: self.store.as_ref(),
            default_source: options.default_source.as_ref(),
            temp_dir: &options.temp_dir,
            log,
        };
        let work = AssertUnwindSafe(release::release(manifest, &ctx)).catch_unwind();

        let outcome = tokio::select! {
            result = work => match result {
                Ok(Ok(errors)) => RunOutcome::Finished(errors),
                Ok(Err(e)) => RunOutcome::Crashed(e.to_string()),
                Err(payload) => RunOutcome::Crashed(panic_message(payload)),
            },
            () = interrupt => RunOutcome::Interrupted,
        };

        let (status, result) = match outcome {
            RunOutcome::Finished(errors) if errors.is_empty() => (
                ShipStatus::Success,
                Ok(ShipReport {
                    status: ShipStatus::Success,
                    errors,
                }),
            ),
            RunOutcome::Finished(errors) => {
                log.closing_header("Encountered errors during the manifest release:");
                for error in &errors {
                    log.error(error.to_string());
                }
                (
                    ShipStatus::Failed,
                    Ok(ShipReport {
                        status: ShipStatus::Failed,
                        errors,
                    }),
                )
            }
            RunOutcome::Interrupted => {
                log.warn("Received a signal to stop, cancelling the ship");
                (
                    ShipStatus::Cancelled,
                    Err(KubeError::ShipCancelled {
                        manifest: manifest_name.clone(),
                    }),
                )
            }
            RunOutcome::Crashed(message) => {
                log.error(format!("The ship crashed: {}", message));
                (
                    ShipStatus::Crashed,
                    Err(KubeError::ShipCrashed {
                        manifest: manifest_name.clone(),
                        message,
                    }),
                )
            }
        };

        log.info(format!(
            "Ship status: {}. Recording status, manifest, and log data to configmap {} in namespace {}",
            status, record_name, self.namespace
        ));
        let record = ShipRecord::new(status, content, log.record());
        let written = self
            .store
            .patch_config_map(&record_name, &self.namespace, record.to_data())
            .await;

        match (written, result) {
            (Ok(()), result) => result,
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(primary)) => {
                tracing::error!(error = %e, status = %status, "could not record final ship status");
                Err(primary)
            }
        }
    }

    /// Clear the lock of a stuck ship.
    ///
    /// Looks up the active record for `manifest_name` and, once `confirm`
    /// agrees, marks it `avasted`. Any process still shipping is left alone.
    pub async fn avast<F>(&self, manifest_name: &str, confirm: F, log: &ShipLog) -> Result<AvastOutcome>
    where
        F: FnOnce(&str) -> std::io::Result<bool>,
    {
        if manifest_name.is_empty() {
            return Err(KubeError::MissingManifestName);
        }
        let record_name = ShipRecord::object_name(manifest_name);
        log.header(&format!(
            "Clearing/halting any ship in progress for manifest: {}",
            manifest_name
        ));

        let active = self
            .store
            .find_config_map(
                &record_name,
                &self.namespace,
                ShipRecord::STATUS_KEY,
                ShipStatus::Active.as_str(),
            )
            .await
            .map_err(|e| KubeError::LockCheck {
                manifest: manifest_name.to_string(),
                message: e.to_string(),
            })?;
        if active.is_none() {
            return Err(KubeError::NoActiveShip {
                manifest: manifest_name.to_string(),
            });
        }

        if !confirm(manifest_name)? {
            log.info("User did not enter 'yes', not running avast");
            return Ok(AvastOutcome::Declined);
        }

        let status = BTreeMap::from([(
            ShipRecord::STATUS_KEY.to_string(),
            ShipStatus::Avasted.as_str().to_string(),
        )]);
        self.store
            .patch_config_map(&record_name, &self.namespace, status)
            .await?;
        log.info(format!(
            "Ship status: {}. Recorded to configmap {} in namespace {}",
            ShipStatus::Avasted,
            record_name,
            self.namespace
        ));
        Ok(AvastOutcome::Avasted)
    }
}
