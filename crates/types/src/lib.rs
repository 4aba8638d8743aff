//! Accreta data model
//!
//! Halo and galaxy records, run configuration, the internal unit system
//! and the snapshot time table shared by every other crate.

pub mod aux;
pub mod galaxy;
pub mod halo;
pub mod link;
pub mod params;
pub mod props;
pub mod snapshots;
pub mod units;

pub use aux::{GroupPhase, HaloAux};
pub use galaxy::{
    GalaxyRecord, GalaxyType, MERGE_CLOCK_UNSET, MergeKind, MergerState, SfrHistory,
};
pub use halo::HaloRecord;
pub use link::HaloLink;
pub use params::{AgnMode, Cosmology, FileParams, Parameters, RecipeParams, Reionization};
pub use snapshots::SnapshotTable;
pub use units::UnitSystem;
