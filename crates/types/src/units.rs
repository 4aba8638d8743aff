//! Internal unit system.
//!
//! Lengths in Mpc/h, masses in 1e10 Msun/h, velocities in km/s by
//! convention; everything else is derived from the three base units.

use crate::params::{Cosmology, RecipeParams};

pub const GRAVITY_CGS: f64 = 6.672e-8;
pub const SOLAR_MASS_G: f64 = 1.989e33;
/// 100 h km/s/Mpc expressed in 1/s.
pub const HUBBLE_CGS: f64 = 3.2407789e-18;
pub const SPEED_OF_LIGHT_CM_S: f64 = 2.9979e10;
pub const PROTON_MASS_G: f64 = 1.6726e-24;
pub const BOLTZMANN_CGS: f64 = 1.3806e-16;
pub const SEC_PER_MEGAYEAR: f64 = 3.155e13;
pub const SEC_PER_YEAR: f64 = 3.155e7;

const MPC_CM: f64 = 3.08568025e24;
const UNIT_MASS_G: f64 = 1.989e43;
const KM_PER_S_CM: f64 = 1.0e5;

#[derive(Debug, Clone, Copy)]
pub struct UnitSystem {
    pub length_cm: f64,
    pub mass_g: f64,
    pub velocity_cm_per_s: f64,
    pub time_s: f64,
    pub time_megayears: f64,
    /// Gravitational constant in internal units.
    pub g: f64,
    pub density_cgs: f64,
    pub pressure_cgs: f64,
    pub energy_cgs: f64,
    /// Hubble constant (for h = 1) in internal units.
    pub hubble: f64,
    /// Supernova energy per event in internal energy units.
    pub energy_sn_code: f64,
    /// Supernovae per internal mass unit of stars formed.
    pub eta_sn_code: f64,
}

impl UnitSystem {
    pub fn new(
        length_cm: f64,
        mass_g: f64,
        velocity_cm_per_s: f64,
        cosmo: &Cosmology,
        recipes: &RecipeParams,
    ) -> Self {
        let time_s = length_cm / velocity_cm_per_s;
        let energy_cgs = mass_g * length_cm * length_cm / (time_s * time_s);
        UnitSystem {
            length_cm,
            mass_g,
            velocity_cm_per_s,
            time_s,
            time_megayears: time_s / SEC_PER_MEGAYEAR,
            g: GRAVITY_CGS / length_cm.powi(3) * mass_g * time_s * time_s,
            density_cgs: mass_g / length_cm.powi(3),
            pressure_cgs: mass_g / length_cm / (time_s * time_s),
            energy_cgs,
            hubble: HUBBLE_CGS * time_s,
            energy_sn_code: recipes.energy_sn / energy_cgs * cosmo.hubble_h,
            eta_sn_code: recipes.eta_sn * (mass_g / SOLAR_MASS_G) / cosmo.hubble_h,
        }
    }

    /// The conventional Mpc / 1e10 Msun / km/s system.
    pub fn standard(cosmo: &Cosmology, recipes: &RecipeParams) -> Self {
        UnitSystem::new(MPC_CM, UNIT_MASS_G, KM_PER_S_CM, cosmo, recipes)
    }

    /// Conversion factor from internal mass/time to Msun/yr.
    pub fn mass_rate_to_solar_per_year(&self) -> f64 {
        self.mass_g / self.time_s * SEC_PER_YEAR / SOLAR_MASS_G
    }
}
