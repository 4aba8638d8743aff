//! Snapshot time table.
//!
//! Expansion factors come from the simulation's snapshot list; redshifts
//! and lookback ages are derived once per run. Ages carry an extra slot at
//! `snap = -1` (the epoch of z = 1000) so a galaxy seeded at a halo's first
//! snapshot has a well-defined previous time.

use crate::params::Cosmology;
use crate::units::UnitSystem;

#[derive(Debug, Clone)]
pub struct SnapshotTable {
    a: Vec<f64>,
    z: Vec<f64>,
    /// Lookback ages, offset by one: `ages[0]` belongs to snapshot -1.
    ages: Vec<f64>,
}

impl SnapshotTable {
    pub fn from_expansion_factors(a: Vec<f64>, cosmo: &Cosmology, units: &UnitSystem) -> Self {
        let z: Vec<f64> = a.iter().map(|&a| 1.0 / a - 1.0).collect();
        let mut ages = Vec::with_capacity(a.len() + 1);
        ages.push(time_to_present(1000.0, cosmo, units));
        ages.extend(z.iter().map(|&z| time_to_present(z, cosmo, units)));
        SnapshotTable { a, z, ages }
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn expansion(&self, snap: i32) -> f64 {
        self.a[snap as usize]
    }

    pub fn redshift(&self, snap: i32) -> f64 {
        self.z[snap as usize]
    }

    /// Lookback time to the present for the given snapshot; accepts -1.
    pub fn age(&self, snap: i32) -> f64 {
        debug_assert!(snap >= -1, "snapshot index below -1");
        self.ages[(snap + 1) as usize]
    }
}

/// Lookback time from redshift `z` to the present, in internal time units
/// (which carry the usual 1/h factor, like the lengths and masses).
///
/// Closed form for a flat ΛCDM (or Einstein–de Sitter) cosmology; curvature
/// is ignored.
fn time_to_present(z: f64, cosmo: &Cosmology, units: &UnitSystem) -> f64 {
    let h = units.hubble;
    let a = 1.0 / (1.0 + z);
    if cosmo.omega_lambda > 0.0 {
        let prefac = 2.0 / (3.0 * h * cosmo.omega_lambda.sqrt());
        let x = (cosmo.omega_lambda / cosmo.omega).sqrt();
        prefac * ((x).asinh() - (x * a.powf(1.5)).asinh())
    } else {
        2.0 / (3.0 * h * cosmo.omega.sqrt()) * (1.0 - a.powf(1.5))
    }
}
