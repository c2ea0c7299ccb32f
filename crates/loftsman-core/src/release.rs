//! Ship records and per-chart release outcomes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a ship.
///
/// A ship is `Active` exactly once and always ends in one of the other
/// variants, written back to the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipStatus {
    Active,
    Success,
    Failed,
    Cancelled,
    Crashed,
    /// Lock cleared by an operator
    Avasted,
}

impl ShipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Crashed => "crashed",
            Self::Avasted => "avasted",
        }
    }
}

impl fmt::Display for ShipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "crashed" => Ok(Self::Crashed),
            "avasted" => Ok(Self::Avasted),
            other => Err(format!("unknown ship status: {}", other)),
        }
    }
}

/// The cluster-resident record of one manifest's ship.
///
/// It doubles as the lock: a record whose status is `Active` means a ship
/// is in progress for that manifest name.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipRecord {
    pub status: ShipStatus,
    /// Raw manifest text
    pub manifest: String,
    /// Accumulated log text of the run
    pub log: String,
}

impl ShipRecord {
    pub const STATUS_KEY: &'static str = "status";
    pub const MANIFEST_KEY: &'static str = "manifest.yaml";
    pub const LOG_KEY: &'static str = "loftsman.log";

    /// Name of the record object for a manifest
    pub fn object_name(manifest_name: &str) -> String {
        format!("loftsman-{}", manifest_name)
    }

    pub fn new(status: ShipStatus, manifest: impl Into<String>, log: impl Into<String>) -> Self {
        Self {
            status,
            manifest: manifest.into(),
            log: log.into(),
        }
    }

    /// Key/value data stored in the record object
    pub fn to_data(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (Self::STATUS_KEY.to_string(), self.status.as_str().to_string()),
            (Self::MANIFEST_KEY.to_string(), self.manifest.clone()),
            (Self::LOG_KEY.to_string(), self.log.clone()),
        ])
    }

    /// Rebuild a record from stored data; `None` when the status is missing
    /// or unknown
    pub fn from_data(data: &BTreeMap<String, String>) -> Option<Self> {
        let status = data.get(Self::STATUS_KEY)?.parse().ok()?;
        Some(Self {
            status,
            manifest: data.get(Self::MANIFEST_KEY).cloned().unwrap_or_default(),
            log: data.get(Self::LOG_KEY).cloned().unwrap_or_default(),
        })
    }
}

/// Why a single chart failed to release
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("Source name not found in spec.sources.charts[]: {source_name}")]
    SourceNotFound { source_name: String },

    #[error("Error attempting to remove previously-failed first release for {release}: {message}")]
    CleanupFailed { release: String, message: String },

    #[error("{message}")]
    SourceResolutionFailed { message: String },

    #[error("{message}")]
    ArtifactNotFound { message: String },

    #[error("Error releasing chart {chart} v{version}: {message}")]
    InstallFailed {
        chart: String,
        version: String,
        message: String,
    },
}

impl ChartError {
    /// Short kind label, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceNotFound { .. } => "source_not_found",
            Self::CleanupFailed { .. } => "cleanup_failed",
            Self::SourceResolutionFailed { .. } => "source_resolution_failed",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::InstallFailed { .. } => "install_failed",
        }
    }
}

/// A failed chart of a ship run
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseError {
    pub chart: String,
    pub version: String,
    pub namespace: String,
    pub error: ChartError,
}

impl fmt::Display for ReleaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} ({}): {}",
            self.chart,
            self.version,
            self.namespace,
            self.error.to_string().trim()
        )
    }
}
