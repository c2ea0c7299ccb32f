//! Release orchestration
//!
//! Each manifest version owns its release algorithm; [`release`] picks the
//! one matching the validated manifest.

pub mod v1beta1;

use loftsman_core::{Manifest, ReleaseError};
use loftsman_helm::{ChartCatalog, ChartLocation, Helm};
use std::path::Path;

use crate::error::Result;
use crate::log::ShipLog;
use crate::store::ClusterStore;

/// Collaborators and settings of one release run
pub struct ReleaseContext<'a> {
    pub helm: &'a dyn Helm,
    pub catalog: &'a dyn ChartCatalog,
    pub store: &'a dyn ClusterStore,
    /// Source for charts that name none
    pub default_source: Option<&'a ChartLocation>,
    /// Directory for materialized values files; must exist
    pub temp_dir: &'a Path,
    pub log: &'a ShipLog,
}

/// Release every chart of the manifest, in order.
///
/// Per-chart failures do not stop the run; they are returned, in chart
/// order. An `Err` means the run itself could not proceed.
pub async fn release(manifest: &Manifest, ctx: &ReleaseContext<'_>) -> Result<Vec<ReleaseError>> {
    match manifest {
        Manifest::V1Beta1(m) => v1beta1::release(m, ctx).await,
    }
}
