//! Halo-derived physical properties.

use std::f64::consts::PI;

use crate::halo::HaloRecord;
use crate::params::Cosmology;
use crate::snapshots::SnapshotTable;
use crate::units::UnitSystem;

/// Virial mass of a halo: the spherical-overdensity estimate for FOF roots
/// that carry one, otherwise particle count times particle mass.
pub fn virial_mass(halos: &[HaloRecord], halonr: usize, cosmo: &Cosmology) -> f64 {
    let h = &halos[halonr];
    if h.is_fof_root(halonr) && h.mvir > 0.0 {
        h.mvir as f64
    } else {
        h.len as f64 * cosmo.particle_mass
    }
}

/// Radius enclosing 200 times the critical density at the halo's redshift.
pub fn virial_radius(
    halos: &[HaloRecord],
    halonr: usize,
    cosmo: &Cosmology,
    units: &UnitSystem,
    snapshots: &SnapshotTable,
) -> f64 {
    let zplus1 = 1.0 + snapshots.redshift(halos[halonr].snap_num);
    let hubble_of_z_sq = units.hubble
        * units.hubble
        * (cosmo.omega * zplus1.powi(3)
            + (1.0 - cosmo.omega - cosmo.omega_lambda) * zplus1 * zplus1
            + cosmo.omega_lambda);
    let rhocrit = 3.0 * hubble_of_z_sq / (8.0 * PI * units.g);
    let fac = 1.0 / (200.0 * 4.0 * PI / 3.0 * rhocrit);
    (virial_mass(halos, halonr, cosmo) * fac).cbrt()
}

/// Circular velocity at the virial radius.
pub fn virial_velocity(
    halos: &[HaloRecord],
    halonr: usize,
    cosmo: &Cosmology,
    units: &UnitSystem,
    snapshots: &SnapshotTable,
) -> f64 {
    let rvir = virial_radius(halos, halonr, cosmo, units, snapshots);
    if rvir > 0.0 {
        (units.g * virial_mass(halos, halonr, cosmo) / rvir).sqrt()
    } else {
        0.0
    }
}

/// Exponential disk scale radius from the halo spin (Mo, Mao & White 1998,
/// with a Bullock-style spin parameter).
pub fn disk_scale_radius(halo: &HaloRecord, vvir: f64, rvir: f64) -> f64 {
    if vvir > 0.0 && rvir > 0.0 {
        let spin_magnitude = (halo.spin[0] as f64).hypot(halo.spin[1] as f64).hypot(halo.spin[2] as f64);
        let spin_parameter = spin_magnitude / (1.414 * vvir * rvir);
        (spin_parameter / 1.414) * rvir
    } else {
        0.1 * rvir
    }
}

/// Metal mass fraction of a reservoir, clamped to [0, 1].
pub fn metallicity(gas: f64, metals: f64) -> f64 {
    if gas > 0.0 && metals > 0.0 {
        (metals / gas).min(1.0)
    } else {
        0.0
    }
}
