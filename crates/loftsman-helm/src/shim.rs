//! Helm command shim
//!
//! Every operation is one invocation of the helm binary with captured,
//! whitespace-trimmed output. Non-zero exits become `CommandFailed`
//! carrying the captured stderr.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use crate::error::{HelmError, Result};

/// Username/password for an authenticated chart repository
#[derive(Clone, PartialEq, Eq)]
pub struct RepoCredentials {
    pub username: String,
    pub password: String,
}

impl RepoCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RepoCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Minimal view of `helm status --output yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseStatus {
    pub status: String,
    pub revision: u64,
}

impl ReleaseStatus {
    /// Parse helm's YAML status output
    pub fn from_yaml(release: &str, output: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Info {
            #[serde(default)]
            status: String,
        }

        #[derive(Deserialize)]
        struct Raw {
            info: Option<Info>,
            #[serde(default)]
            version: u64,
        }

        let raw: Raw = serde_yaml::from_str(output).map_err(|e| HelmError::StatusParse {
            release: release.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            status: raw.info.map(|i| i.status).unwrap_or_default(),
            revision: raw.version,
        })
    }

    /// A first install that never completed; helm cannot upgrade it
    pub fn is_failed_first_install(&self) -> bool {
        self.status == "failed" && self.revision == 1
    }
}

/// One `upgrade --install` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub release_name: String,
    /// Artifact path, URL, or `<repo>/<chart>` reference
    pub chart_ref: String,
    pub namespace: String,
    pub chart_name: String,
    pub chart_version: String,
    /// Pass `--version`; needed when `chart_ref` names a registered repository
    pub pin_version: bool,
    pub timeout: Option<String>,
    pub values_file: Option<PathBuf>,
}

impl InstallRequest {
    /// Helm arguments for this request
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "upgrade".into(),
            "--install".into(),
            self.release_name.clone(),
            self.chart_ref.clone(),
            "--namespace".into(),
            self.namespace.clone(),
            "--create-namespace".into(),
            "--set".into(),
            format!("global.chart.name={}", self.chart_name),
            "--set".into(),
            format!("global.chart.version={}", self.chart_version),
        ];
        if let Some(timeout) = &self.timeout {
            args.push("--timeout".into());
            args.push(timeout.clone());
        }
        if self.pin_version {
            args.push("--version".into());
            args.push(self.chart_version.clone());
        }
        if let Some(values) = &self.values_file {
            args.push("-f".into());
            args.push(values.display().to_string());
        }
        args
    }
}

/// The helm operations Loftsman relies on
#[async_trait]
pub trait Helm: Send + Sync {
    /// `helm version --client`
    async fn client_version(&self) -> Result<String>;

    /// Status of an existing release
    async fn release_status(&self, release: &str, namespace: &str) -> Result<ReleaseStatus>;

    /// Remove a release without running its hooks
    async fn uninstall(&self, release: &str, namespace: &str) -> Result<String>;

    async fn upgrade_install(&self, request: &InstallRequest) -> Result<String>;

    async fn repo_add(&self, name: &str, url: &str, credentials: &RepoCredentials) -> Result<String>;

    async fn repo_remove(&self, name: &str) -> Result<String>;
}

/// Check that helm is a v3 client, returning its version output
pub async fn verify_client(helm: &dyn Helm) -> Result<String> {
    let output = helm.client_version().await?;
    if output.contains("v3") {
        Ok(output)
    } else {
        Err(HelmError::UnsupportedClient { output })
    }
}

/// Helm driven through its command-line binary
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: String,
    kubeconfig: Option<PathBuf>,
    kube_context: Option<String>,
}

impl HelmCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            kubeconfig: None,
            kube_context: None,
        }
    }

    pub fn with_kubeconfig(mut self, kubeconfig: Option<PathBuf>) -> Self {
        self.kubeconfig = kubeconfig;
        self
    }

    pub fn with_kube_context(mut self, kube_context: Option<String>) -> Self {
        self.kube_context = kube_context;
        self
    }

    fn full_args(&self, args: &[String]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 4);
        if let Some(kubeconfig) = &self.kubeconfig {
            full.push("--kubeconfig".to_string());
            full.push(kubeconfig.display().to_string());
        }
        if let Some(context) = &self.kube_context {
            full.push("--kube-context".to_string());
            full.push(context.clone());
        }
        full.extend(args.iter().cloned());
        full
    }

    /// Command line for logs and errors, with passwords masked
    pub fn command_line(&self, args: &[String]) -> String {
        let mut line = vec![self.binary.clone()];
        let mut mask_next = false;
        for arg in self.full_args(args) {
            if mask_next {
                line.push("****".to_string());
                mask_next = false;
                continue;
            }
            mask_next = arg == "--password";
            line.push(arg);
        }
        line.join(" ")
    }

    /// Run helm with the given arguments, returning trimmed stdout
    pub async fn exec(&self, args: &[String]) -> Result<String> {
        let command = self.command_line(args);
        tracing::debug!(command = %command, "running helm");

        let output = tokio::process::Command::new(&self.binary)
            .args(self.full_args(args))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| HelmError::Spawn {
                binary: self.binary.clone(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(HelmError::CommandFailed {
            command,
            code: output.status.code(),
            stderr: if stderr.is_empty() { stdout } else { stderr },
        })
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl Helm for HelmCli {
    async fn client_version(&self) -> Result<String> {
        self.exec(&owned(&["version", "--client"])).await
    }

    async fn release_status(&self, release: &str, namespace: &str) -> Result<ReleaseStatus> {
        let output = self
            .exec(&owned(&["status", release, "--namespace", namespace, "--output", "yaml"]))
            .await?;
        ReleaseStatus::from_yaml(release, &output)
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<String> {
        self.exec(&owned(&["uninstall", release, "--namespace", namespace, "--no-hooks"]))
            .await
    }

    async fn upgrade_install(&self, request: &InstallRequest) -> Result<String> {
        self.exec(&request.args()).await
    }

    async fn repo_add(&self, name: &str, url: &str, credentials: &RepoCredentials) -> Result<String> {
        self.exec(&owned(&[
            "repo",
            "add",
            name,
            url,
            "--username",
            &credentials.username,
            "--password",
            &credentials.password,
        ]))
        .await
    }

    async fn repo_remove(&self, name: &str) -> Result<String> {
        self.exec(&owned(&["repo", "rm", name])).await
    }
}
