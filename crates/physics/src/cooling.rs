//! Cooling flows and radio-mode AGN heating.

use std::f64::consts::PI;

use accreta_engine::GroupContext;
use accreta_types::units::{BOLTZMANN_CGS, PROTON_MASS_G, SEC_PER_YEAR, SOLAR_MASS_G};
use accreta_types::{AgnMode, GalaxyType, props};

use crate::StandardModel;

/// Hot gas cooling onto the galaxy in `dt`, assuming an isothermal hot
/// halo, after optional AGN heating for group centrals.
pub(crate) fn cooling_mass(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    p: usize,
    dt: f64,
) -> f64 {
    let (hot_gas, metals_hot, rvir, vvir, galaxy_type) = {
        let g = &ctx.galaxies[p];
        (g.hot_gas, g.metals_hot_gas, g.rvir, g.vvir, g.galaxy_type)
    };

    if hot_gas <= 1.0e-6 || rvir <= 0.0 || vvir <= 0.0 {
        return 0.0;
    }

    let tcool = rvir / vvir * 10.0;
    // virial temperature in Kelvin
    let temp = 35.9 * vvir * vvir;
    let log_z = if metals_hot > 0.0 {
        (metals_hot / hot_gas).log10()
    } else {
        -10.0
    };

    let lambda = net_cooling_rate(temp.log10(), log_z);
    // sec g/cm^3, converted to internal units
    let x = PROTON_MASS_G * BOLTZMANN_CGS * temp / lambda
        / (ctx.sim.units.density_cgs * ctx.sim.units.time_s);
    let rho_rcool = x / (0.28086 * tcool);

    // isothermal profile: rho(r) = rho0 / r^2
    let rho0 = hot_gas / (4.0 * PI * rvir);
    let rcool = (rho0 / rho_rcool).sqrt();

    let mut cooling_gas = if rcool > rvir {
        // infall dominated
        hot_gas / (rvir / vvir) * dt
    } else {
        // hot phase
        (hot_gas / rvir) * (rcool / tcool) * dt
    };
    cooling_gas = cooling_gas.clamp(0.0, hot_gas);

    if cooling_gas > 0.0 {
        ctx.galaxies[p].cooling += 0.5 * cooling_gas * vvir * vvir;
    }

    if model.params().agn.is_on() && galaxy_type == GalaxyType::Central {
        cooling_gas -= agn_heating(model, ctx, cooling_gas, p, dt, x, rcool);
    }

    cooling_gas.max(0.0)
}

/// Suppress cooling by radio-mode accretion onto the central black hole.
/// Returns the heated mass.
fn agn_heating(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    cooling_gas: f64,
    p: usize,
    dt: f64,
    x: f64,
    rcool: f64,
) -> f64 {
    let units = ctx.sim.units;
    let g = &ctx.galaxies[p];

    if g.hot_gas <= 0.0 {
        return 0.0;
    }

    let agn_rate = match model.params().agn {
        AgnMode::BondiHoyle => {
            // Bondi-Hoyle accretion at 30% efficiency
            (2.5 * PI * units.g) * (0.375 * 0.6 * x) * g.black_hole_mass * 0.3
        }
        AgnMode::ColdCloud => {
            // cold cloud accretion once the BH outweighs the sonic-region gas
            if g.black_hole_mass > 0.0001 * g.mvir * (rcool / g.rvir).powi(3) {
                0.0001 * cooling_gas / dt
            } else {
                0.0
            }
        }
        _ => {
            // empirical radio-mode scaling
            model.params().radio_mode_efficiency
                / (units.mass_g / units.time_s * SEC_PER_YEAR / SOLAR_MASS_G)
                * (g.black_hole_mass / 0.01)
                * (g.vvir / 200.0).powi(3)
                * ((g.hot_gas / g.mvir) / 0.1)
        }
    };

    // accretion is Eddington-limited
    let edd_rate = 1.3e48 * g.black_hole_mass / (units.energy_cgs / units.time_s) / 9.0e10;
    let mut accreted = agn_rate.min(edd_rate) * dt;
    accreted = accreted.min(g.hot_gas);

    // energy to heat the accreted gas back to the virial temperature;
    // 1.34e5 = sqrt(2 eta c^2) with eta = 0.1, c in km/s
    let coeff = (1.34e5 / g.vvir) * (1.34e5 / g.vvir);
    let mut heating = coeff * accreted;
    if heating > cooling_gas {
        accreted = cooling_gas / coeff;
        heating = cooling_gas;
    }

    let metallicity = props::metallicity(g.hot_gas, g.metals_hot_gas);
    let vvir = g.vvir;

    let g = &mut ctx.galaxies[p];
    g.black_hole_mass += accreted;
    g.hot_gas -= accreted;
    g.metals_hot_gas -= metallicity * accreted;
    if heating > 0.0 {
        g.heating += 0.5 * heating * vvir * vvir;
    }

    heating
}

/// Move cooled hot gas onto the cold disk, metals along with it.
pub(crate) fn cool_gas_onto_disk(g: &mut accreta_types::GalaxyRecord, cooling_gas: f64) {
    if cooling_gas <= 0.0 {
        return;
    }
    if cooling_gas < g.hot_gas {
        let metallicity = props::metallicity(g.hot_gas, g.metals_hot_gas);
        g.cold_gas += cooling_gas;
        g.metals_cold_gas += metallicity * cooling_gas;
        g.hot_gas -= cooling_gas;
        g.metals_hot_gas -= metallicity * cooling_gas;
    } else {
        g.cold_gas += g.hot_gas;
        g.metals_cold_gas += g.metals_hot_gas;
        g.hot_gas = 0.0;
        g.metals_hot_gas = 0.0;
    }
}

/// Net cooling rate Λ(T, Z) in erg cm^3/s.
///
/// Compact stand-in for the Sutherland & Dopita (1993) tables: thermal
/// bremsstrahlung above ~10^7 K plus a metal-line component peaking near
/// 10^5.3 K that scales with the metallicity relative to solar.
fn net_cooling_rate(log_temp: f64, log_z: f64) -> f64 {
    let t = 10f64.powf(log_temp);
    let z_rel = 10f64.powf(log_z) / 0.02;

    let brems = 2.4e-23 * (t / 1.0e7).sqrt();
    let peak = log_temp - 5.3;
    let lines = 8.0e-22 * z_rel * (-0.5 * peak * peak / 0.36).exp();
    // primordial recombination bump near 10^5 K
    let primordial = 1.0e-22 * (-0.5 * (log_temp - 5.1) * (log_temp - 5.1) / 0.25).exp();

    (brems + lines + primordial).max(1.0e-27)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooling_rate_shape() {
        // metal-free gas cools slower than enriched gas at 10^5.3 K
        let poor = net_cooling_rate(5.3, -10.0);
        let rich = net_cooling_rate(5.3, -1.7);
        assert!(rich > poor);
        // bremsstrahlung grows with temperature at the hot end
        assert!(net_cooling_rate(8.0, -10.0) > net_cooling_rate(7.0, -10.0));
        // never zero or negative
        assert!(net_cooling_rate(4.0, -10.0) > 0.0);
    }

    #[test]
    fn test_cool_gas_onto_disk_conserves_mass() {
        let mut g = accreta_types::GalaxyRecord::new(2);
        g.hot_gas = 1.0;
        g.metals_hot_gas = 0.02;
        cool_gas_onto_disk(&mut g, 0.25);
        assert!((g.cold_gas - 0.25).abs() < 1e-12);
        assert!((g.hot_gas - 0.75).abs() < 1e-12);
        assert!((g.metals_cold_gas + g.metals_hot_gas - 0.02).abs() < 1e-12);

        // over-draining empties the hot phase exactly
        cool_gas_onto_disk(&mut g, 10.0);
        assert_eq!(g.hot_gas, 0.0);
        assert_eq!(g.metals_hot_gas, 0.0);
        assert!((g.cold_gas - 1.0).abs() < 1e-12);
    }
}
