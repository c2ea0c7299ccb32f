//! CLI command implementations

pub mod avast;
pub mod manifest;
pub mod ship;

use std::path::PathBuf;

/// Settings shared by every command that talks to the cluster
#[derive(Debug, Clone)]
pub struct GlobalSettings {
    pub kubeconfig: Option<PathBuf>,
    pub kube_context: Option<String>,
    pub helm_binary: String,
    /// Namespace ship records are kept in
    pub namespace: String,
}
