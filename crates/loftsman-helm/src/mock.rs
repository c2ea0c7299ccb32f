//! In-memory helm for testing
//!
//! Records every call and answers from configured state, so release logic
//! can be exercised without a helm binary or a chart repository.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::catalog::{ChartArtifact, ChartCatalog, ChartLocation};
use crate::error::{HelmError, Result};
use crate::shim::{Helm, InstallRequest, ReleaseStatus, RepoCredentials};

/// A call made against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelmCall {
    ClientVersion,
    ReleaseStatus { release: String, namespace: String },
    Uninstall { release: String, namespace: String },
    UpgradeInstall(InstallRequest),
    RepoAdd { name: String, url: String, username: String },
    RepoRemove { name: String },
    AvailableVersions { location: ChartLocation, chart: String },
}

#[derive(Default)]
struct MockState {
    calls: Vec<HelmCall>,
    client_version: String,
    versions: HashMap<String, Vec<String>>,
    statuses: HashMap<String, ReleaseStatus>,
    failing_installs: HashSet<String>,
    failing_uninstalls: HashSet<String>,
    failing_catalogs: HashSet<String>,
    failing_repo_adds: HashSet<String>,
    held_installs: HashMap<String, Arc<Notify>>,
    panicking_installs: HashSet<String>,
}

/// Mock implementing both [`Helm`] and [`ChartCatalog`]
#[derive(Clone)]
pub struct MockHelm {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockHelm {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(command: String, stderr: &str) -> HelmError {
    HelmError::CommandFailed {
        command,
        code: Some(1),
        stderr: stderr.to_string(),
    }
}

impl MockHelm {
    pub fn new() -> Self {
        let state = MockState {
            client_version: "version.BuildInfo{Version:\"v3.14.0\"}".to_string(),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_client_version(self, output: &str) -> Self {
        self.state().client_version = output.to_string();
        self
    }

    /// Versions the catalog lists for a chart, at any location
    pub fn with_versions(self, chart: &str, versions: &[&str]) -> Self {
        self.state().versions.insert(
            chart.to_string(),
            versions.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Existing release state reported by `release_status`
    pub fn with_release(self, release: &str, status: &str, revision: u64) -> Self {
        self.state().statuses.insert(
            release.to_string(),
            ReleaseStatus {
                status: status.to_string(),
                revision,
            },
        );
        self
    }

    pub fn failing_install(self, release: &str) -> Self {
        self.state().failing_installs.insert(release.to_string());
        self
    }

    pub fn failing_uninstall(self, release: &str) -> Self {
        self.state().failing_uninstalls.insert(release.to_string());
        self
    }

    /// Version listing for the chart fails
    pub fn failing_catalog(self, chart: &str) -> Self {
        self.state().failing_catalogs.insert(chart.to_string());
        self
    }

    pub fn failing_repo_add(self, name: &str) -> Self {
        self.state().failing_repo_adds.insert(name.to_string());
        self
    }

    /// Installing the release panics
    pub fn panicking_install(self, release: &str) -> Self {
        self.state().panicking_installs.insert(release.to_string());
        self
    }

    /// Installing the release never returns; the returned handle is
    /// notified once the install has started
    pub fn hold_install(&self, release: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.state()
            .held_installs
            .insert(release.to_string(), notify.clone());
        notify
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<HelmCall> {
        self.state().calls.clone()
    }

    /// Install requests so far, in order
    pub fn installs(&self) -> Vec<InstallRequest> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                HelmCall::UpgradeInstall(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Release names installed so far, in order
    pub fn installed_releases(&self) -> Vec<String> {
        self.installs().into_iter().map(|r| r.release_name).collect()
    }

    pub fn count(&self, matches: impl Fn(&HelmCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| matches(c)).count()
    }
}

#[async_trait]
impl Helm for MockHelm {
    async fn client_version(&self) -> Result<String> {
        let mut state = self.state();
        state.calls.push(HelmCall::ClientVersion);
        Ok(state.client_version.clone())
    }

    async fn release_status(&self, release: &str, namespace: &str) -> Result<ReleaseStatus> {
        let mut state = self.state();
        state.calls.push(HelmCall::ReleaseStatus {
            release: release.to_string(),
            namespace: namespace.to_string(),
        });
        state.statuses.get(release).cloned().ok_or_else(|| {
            failed(
                format!("helm status {}", release),
                "Error: release: not found",
            )
        })
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<String> {
        let mut state = self.state();
        state.calls.push(HelmCall::Uninstall {
            release: release.to_string(),
            namespace: namespace.to_string(),
        });
        if state.failing_uninstalls.contains(release) {
            return Err(failed(
                format!("helm uninstall {}", release),
                "Error: uninstall: failed to delete release",
            ));
        }
        state.statuses.remove(release);
        Ok(format!("release \"{}\" uninstalled", release))
    }

    async fn upgrade_install(&self, request: &InstallRequest) -> Result<String> {
        let release = request.release_name.clone();
        let (held, panics, fails) = {
            let mut state = self.state();
            state.calls.push(HelmCall::UpgradeInstall(request.clone()));
            (
                state.held_installs.get(&release).cloned(),
                state.panicking_installs.contains(&release),
                state.failing_installs.contains(&release),
            )
        };

        if let Some(notify) = held {
            notify.notify_one();
            futures::future::pending::<()>().await;
        }
        if panics {
            panic!("helm mock panicked installing {}", release);
        }
        if fails {
            return Err(failed(
                format!("helm upgrade --install {}", release),
                "Error: UPGRADE FAILED: timed out waiting for the condition",
            ));
        }

        self.state().statuses.insert(
            release.clone(),
            ReleaseStatus {
                status: "deployed".to_string(),
                revision: 1,
            },
        );
        Ok(format!("Release \"{}\" has been upgraded. Happy Helming!", release))
    }

    async fn repo_add(&self, name: &str, url: &str, credentials: &RepoCredentials) -> Result<String> {
        let mut state = self.state();
        state.calls.push(HelmCall::RepoAdd {
            name: name.to_string(),
            url: url.to_string(),
            username: credentials.username.clone(),
        });
        if state.failing_repo_adds.contains(name) {
            return Err(failed(
                format!("helm repo add {}", name),
                "Error: looks like the repository is not a valid chart repository",
            ));
        }
        Ok(format!("\"{}\" has been added to your repositories", name))
    }

    async fn repo_remove(&self, name: &str) -> Result<String> {
        self.state().calls.push(HelmCall::RepoRemove {
            name: name.to_string(),
        });
        Ok(format!("\"{}\" has been removed from your repositories", name))
    }
}

#[async_trait]
impl ChartCatalog for MockHelm {
    async fn available_versions(
        &self,
        location: &ChartLocation,
        chart: &str,
    ) -> Result<Vec<ChartArtifact>> {
        let mut state = self.state();
        state.calls.push(HelmCall::AvailableVersions {
            location: location.clone(),
            chart: chart.to_string(),
        });
        if state.failing_catalogs.contains(chart) {
            return Err(HelmError::Network {
                message: format!("connection refused listing {}", chart),
            });
        }

        let base = location.describe();
        Ok(state
            .versions
            .get(chart)
            .map(|versions| {
                versions
                    .iter()
                    .map(|version| ChartArtifact {
                        version: version.clone(),
                        path: format!("{}/{}-{}.tgz", base, chart, version),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
