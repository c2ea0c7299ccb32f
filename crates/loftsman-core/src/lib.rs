//! Loftsman Core - manifest model and ship records
//!
//! This crate provides the types shared by every Loftsman component:
//! - `Manifest`: versioned declarative list of charts to ship
//! - `Values`: opaque per-chart value overrides
//! - `ShipRecord`: cluster-resident state and lock of a ship
//! - `ReleaseError`: per-chart release failures
//! - `SchemaValidator`: JSON-schema validation of manifest documents

pub mod error;
pub mod manifest;
pub mod release;
pub mod schema;
pub mod values;

pub use error::{CoreError, Result};
pub use manifest::{Manifest, create, validate};
pub use release::{ChartError, ReleaseError, ShipRecord, ShipStatus};
pub use schema::SchemaValidator;
pub use values::Values;
