//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use loftsman_core::CoreError;
use loftsman_helm::HelmError;
use loftsman_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Manifest or settings rejected
    #[error("{message}")]
    #[diagnostic(code(loftsman::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The ship ran but some charts failed
    #[error("Some charts did not release successfully ({failed} failed), see above and/or the output log file for more info")]
    #[diagnostic(code(loftsman::cli::ship_failed))]
    ShipFailed { failed: usize },

    /// Lock protocol error
    #[error("{message}")]
    #[diagnostic(code(loftsman::cli::lock))]
    Lock {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(loftsman::cli::cancelled))]
    Cancelled { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(loftsman::cli::io))]
    Io { message: String },

    /// Cluster or helm failure
    #[error("{message}")]
    #[diagnostic(code(loftsman::cli::error))]
    Other {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::ShipFailed { .. } => exit_codes::SHIP_FAILED,
            CliError::Lock { .. } => exit_codes::LOCK_ERROR,
            CliError::Cancelled { .. } => exit_codes::CANCELLED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::UnsupportedVersion { .. } => CliError::validation_with_help(
                err.to_string(),
                format!(
                    "supported apiVersion values: {}",
                    loftsman_core::manifest::v1beta1::API_VERSION
                ),
            ),
            other => CliError::validation(other.to_string()),
        }
    }
}

impl From<HelmError> for CliError {
    fn from(err: HelmError) -> Self {
        match err {
            HelmError::UnsupportedClient { .. } => CliError::Other {
                message: err.to_string(),
                help: Some("point --helm-binary at a Helm v3 client".to_string()),
            },
            HelmError::Spawn { .. } => CliError::Other {
                message: err.to_string(),
                help: Some("is helm installed and on the PATH? see --helm-binary".to_string()),
            },
            other => CliError::other(other.to_string()),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::ShipInProgress { .. } => CliError::Lock {
                message: err.to_string(),
                help: None,
            },
            KubeError::NoActiveShip { .. } => CliError::Lock {
                message: err.to_string(),
                help: Some("nothing to avast; the last ship already finished".to_string()),
            },
            KubeError::MissingManifestName => CliError::validation(err.to_string()),
            KubeError::ShipCancelled { .. } => CliError::Cancelled {
                message: err.to_string(),
            },
            KubeError::Connection(_) | KubeError::InvalidConfig(_) => CliError::Other {
                message: err.to_string(),
                help: Some("check --kubeconfig and --kube-context".to_string()),
            },
            KubeError::Helm(e) => e.into(),
            KubeError::Manifest(e) => e.into(),
            KubeError::Io(e) => e.into(),
            other => CliError::other(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let lock: CliError = KubeError::ShipInProgress {
            manifest: "platform".to_string(),
        }
        .into();
        assert_eq!(lock.exit_code(), exit_codes::LOCK_ERROR);

        let cancelled: CliError = KubeError::ShipCancelled {
            manifest: "platform".to_string(),
        }
        .into();
        assert_eq!(cancelled.exit_code(), exit_codes::CANCELLED);

        let unsupported: CliError = CoreError::UnsupportedVersion {
            version: "manifests/v9".to_string(),
        }
        .into();
        assert_eq!(unsupported.exit_code(), exit_codes::VALIDATION_ERROR);

        assert_eq!(CliError::ShipFailed { failed: 2 }.exit_code(), exit_codes::SHIP_FAILED);
        assert_eq!(
            CliError::from(std::io::Error::other("boom")).exit_code(),
            exit_codes::IO_ERROR
        );
    }

    #[test]
    fn test_nested_errors_keep_their_class() {
        let io: CliError = KubeError::Manifest(CoreError::Io(std::io::Error::other("gone"))).into();
        assert_eq!(io.exit_code(), exit_codes::IO_ERROR);

        let helm: CliError = KubeError::Helm(HelmError::UnsupportedClient {
            output: "v2.16.1".to_string(),
        })
        .into();
        assert_eq!(helm.exit_code(), exit_codes::ERROR);
    }
}
