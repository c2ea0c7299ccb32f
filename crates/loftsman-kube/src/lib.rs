//! Loftsman Kube - cluster side of a ship
//!
//! This crate provides:
//! - **Cluster Store**: ship records in ConfigMaps and credentials from Secrets, with retry on transient API errors
//! - **Source Resolution**: where each chart's artifacts come from, and helm repository registration
//! - **Release Orchestration**: the per-chart release algorithm of each manifest version
//! - **Ship Control**: the advisory per-manifest lock, cancellation, crash recording and avast
//! - **Ship Log**: the accumulated log text stored with every ship record

pub mod error;
pub mod log;
pub mod mock_store;
pub mod release;
pub mod retry;
pub mod ship;
pub mod sources;
pub mod store;

pub use error::{KubeError, Result};
pub use log::{HEADER_TARGET, ShipLog};
pub use mock_store::{MockStore, OperationCounts, StoreOperation};
pub use release::{ReleaseContext, release};
pub use retry::{RetryPolicy, retry_on};
pub use ship::{AvastOutcome, DEFAULT_RECORDS_NAMESPACE, ShipOptions, ShipReport, Shipper};
pub use sources::{RepoRegistry, repository_name};
pub use store::{ClusterStore, KubeStore, MANAGED_BY_LABEL};
