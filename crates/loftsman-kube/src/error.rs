//! Error types for loftsman-kube

use thiserror::Error;

/// Result type for loftsman-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while talking to the cluster or running a ship
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Cluster unreachable with the configured kubeconfig
    #[error("error attempting to list namespaces in the cluster, are you sure you have your kubeconfig connected to an active cluster? {0}")]
    Connection(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Error ensuring that the {namespace} namespace exists: {message}")]
    EnsureNamespace { namespace: String, message: String },

    #[error("Error determining if another loftsman ship is in progress for manifest {manifest}: {message}")]
    LockCheck { manifest: String, message: String },

    /// An active ship record already exists for the manifest
    #[error("There's another loftsman ship in progress for manifest {manifest} in this cluster, please wait and try again in a bit, or use `loftsman avast` to cancel it")]
    ShipInProgress { manifest: String },

    #[error("Error creating ship configmap {name} in namespace {namespace}: {message}")]
    RecordInit {
        name: String,
        namespace: String,
        message: String,
    },

    /// No active ship record to avast
    #[error("Couldn't find an active ship in progress for manifest: {manifest}")]
    NoActiveShip { manifest: String },

    #[error("Unable to determine manifest name in order to avast, one of a manifest path or name must be provided")]
    MissingManifestName,

    /// The ship was interrupted; the record says `cancelled`
    #[error("ship for manifest {manifest} was cancelled")]
    ShipCancelled { manifest: String },

    /// The release loop faulted; the record says `crashed`
    #[error("ship for manifest {manifest} crashed: {message}")]
    ShipCrashed { manifest: String, message: String },

    #[error("key {key} not found in secret {namespace}/{secret}")]
    SecretKeyMissing {
        secret: String,
        namespace: String,
        key: String,
    },

    #[error(transparent)]
    Helm(#[from] loftsman_helm::HelmError),

    #[error(transparent)]
    Manifest(#[from] loftsman_core::CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KubeError {
    fn api_response(&self) -> Option<&kube::core::ErrorResponse> {
        match self {
            KubeError::Api(kube::Error::Api(resp)) => Some(resp),
            _ => None,
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        self.api_response().is_some_and(|r| r.code == 404)
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        self.api_response().is_some_and(|r| r.code == 409)
    }

    /// Check if the object being created already exists
    pub fn is_already_exists(&self) -> bool {
        self.api_response()
            .is_some_and(|r| r.code == 409 && r.reason == "AlreadyExists")
    }

    /// Errors that should make the caller try again after a delay: rate
    /// limiting, server or gateway timeouts, unavailability, update
    /// conflicts, and not-found (eventual consistency lag)
    pub fn is_transient(&self) -> bool {
        let Some(resp) = self.api_response() else {
            return false;
        };
        match resp.code {
            429 | 503 | 504 | 404 => true,
            409 => resp.reason != "AlreadyExists",
            500 => resp.reason == "ServerTimeout",
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_store::api_error;

    #[test]
    fn test_transient_classification() {
        assert!(api_error(429, "TooManyRequests").is_transient());
        assert!(api_error(503, "ServiceUnavailable").is_transient());
        assert!(api_error(504, "Timeout").is_transient());
        assert!(api_error(500, "ServerTimeout").is_transient());
        assert!(api_error(409, "Conflict").is_transient());
        assert!(api_error(404, "NotFound").is_transient());

        assert!(!api_error(409, "AlreadyExists").is_transient());
        assert!(!api_error(500, "InternalError").is_transient());
        assert!(!api_error(403, "Forbidden").is_transient());
        assert!(!KubeError::InvalidConfig("x".into()).is_transient());
    }

    #[test]
    fn test_status_helpers() {
        assert!(api_error(404, "NotFound").is_not_found());
        assert!(api_error(409, "AlreadyExists").is_already_exists());
        assert!(api_error(409, "Conflict").is_conflict());
        assert!(!api_error(409, "Conflict").is_already_exists());
    }

    #[test]
    fn test_lock_messages() {
        let err = KubeError::ShipInProgress {
            manifest: "platform".to_string(),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"There's another loftsman ship in progress for manifest platform in this cluster, please wait and try again in a bit, or use `loftsman avast` to cancel it"
        );
        let err = KubeError::NoActiveShip {
            manifest: "platform".to_string(),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"Couldn't find an active ship in progress for manifest: platform"
        );
    }
}
