//! Loftsman Helm - helm client shim and chart catalogs
//!
//! - `Helm`: the helm operations a ship needs, with a CLI-backed implementation
//! - `ChartCatalog`: available chart versions from a directory or repository
//! - `MockHelm`: in-memory implementation of both for tests

pub mod catalog;
pub mod error;
pub mod index;
pub mod mock;
pub mod shim;

pub use catalog::{Catalog, ChartArtifact, ChartCatalog, ChartLocation};
pub use error::{HelmError, Result};
pub use mock::{HelmCall, MockHelm};
pub use shim::{Helm, HelmCli, InstallRequest, ReleaseStatus, RepoCredentials, verify_client};
