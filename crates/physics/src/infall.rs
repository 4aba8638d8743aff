//! Gas infall, reionization suppression and satellite stripping.

use std::f64::consts::PI;

use accreta_engine::{GroupContext, SimContext};
use accreta_types::{GalaxyRecord, Reionization, props};

use crate::StandardModel;

/// Baryonic mass newly infalling onto the group's halo this snapshot.
///
/// Adds up every reservoir attached to the group, hands satellite ejecta
/// and intracluster stars to the central on the way (satellites cannot
/// keep either once inside the group), and returns the difference between
/// the halo's baryon budget and what is already there. May be negative if
/// the halo shrank.
pub(crate) fn group_infall_mass(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    central: usize,
    z: f64,
) -> f64 {
    let mut tot_stellar = 0.0;
    let mut tot_bh = 0.0;
    let mut tot_cold = 0.0;
    let mut tot_hot = 0.0;
    let mut tot_ejected = 0.0;
    let mut tot_ejected_metals = 0.0;
    let mut tot_ics = 0.0;
    let mut tot_ics_metals = 0.0;

    for (i, g) in ctx.galaxies.iter_mut().enumerate() {
        tot_stellar += g.stellar_mass;
        tot_bh += g.black_hole_mass;
        tot_cold += g.cold_gas;
        tot_hot += g.hot_gas;
        tot_ejected += g.ejected_mass;
        tot_ejected_metals += g.metals_ejected_mass;
        tot_ics += g.ics;
        tot_ics_metals += g.metals_ics;

        if i != central {
            g.ejected_mass = 0.0;
            g.metals_ejected_mass = 0.0;
            g.ics = 0.0;
            g.metals_ics = 0.0;
        }
    }

    let central_gal = &mut ctx.galaxies[central];
    let reionization_modifier = match model.params().reionization {
        Some(r) => reionization_suppression(&r, ctx.sim, central_gal.mvir, z),
        None => 1.0,
    };

    let infalling = reionization_modifier * ctx.sim.cosmo.baryon_frac * central_gal.mvir
        - (tot_stellar + tot_cold + tot_hot + tot_ejected + tot_bh + tot_ics);

    central_gal.ejected_mass = tot_ejected;
    central_gal.metals_ejected_mass = tot_ejected_metals.min(tot_ejected);
    if central_gal.ejected_mass < 0.0 {
        central_gal.ejected_mass = 0.0;
        central_gal.metals_ejected_mass = 0.0;
    }
    central_gal.metals_ejected_mass = central_gal.metals_ejected_mass.max(0.0);

    central_gal.ics = tot_ics;
    central_gal.metals_ics = tot_ics_metals.min(tot_ics);
    if central_gal.ics < 0.0 {
        central_gal.ics = 0.0;
        central_gal.metals_ics = 0.0;
    }
    central_gal.metals_ics = central_gal.metals_ics.max(0.0);

    infalling
}

/// Deposit infalling gas in the hot halo. Negative infall drains the
/// ejected reservoir first, then hot metals, then the hot gas itself.
pub(crate) fn add_infall_to_hot(g: &mut GalaxyRecord, mut infalling: f64) {
    if infalling < 0.0 && g.ejected_mass > 0.0 {
        let metallicity = props::metallicity(g.ejected_mass, g.metals_ejected_mass);
        g.metals_ejected_mass = (g.metals_ejected_mass + infalling * metallicity).max(0.0);
        g.ejected_mass += infalling;
        if g.ejected_mass < 0.0 {
            infalling = g.ejected_mass;
            g.ejected_mass = 0.0;
            g.metals_ejected_mass = 0.0;
        } else {
            infalling = 0.0;
        }
    }

    if infalling < 0.0 && g.metals_hot_gas > 0.0 {
        let metallicity = props::metallicity(g.hot_gas, g.metals_hot_gas);
        g.metals_hot_gas = (g.metals_hot_gas + infalling * metallicity).max(0.0);
    }

    g.hot_gas += infalling;
    if g.hot_gas < 0.0 {
        g.hot_gas = 0.0;
        g.metals_hot_gas = 0.0;
    }
}

/// Strip a subhalo-hosted satellite's hot gas down to its suppressed
/// baryon budget, one sub-step's worth at a time, moving it to the central.
pub(crate) fn strip_from_satellite(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    fof_halo: usize,
    central: usize,
    sat: usize,
) {
    let z = ctx.sim.snapshots.redshift(ctx.sim.halos[fof_halo].snap_num);
    let g = &ctx.galaxies[sat];
    let reionization_modifier = match model.params().reionization {
        Some(r) => reionization_suppression(&r, ctx.sim, g.mvir, z),
        None => 1.0,
    };

    let baryons_held = g.stellar_mass
        + g.cold_gas
        + g.hot_gas
        + g.ejected_mass
        + g.black_hole_mass
        + g.ics;
    let mut stripped = -(reionization_modifier * ctx.sim.cosmo.baryon_frac * g.mvir
        - baryons_held)
        / model.steps() as f64;

    if stripped > 0.0 {
        let metallicity = props::metallicity(g.hot_gas, g.metals_hot_gas);
        let mut stripped_metals = stripped * metallicity;
        stripped = stripped.min(g.hot_gas);
        stripped_metals = stripped_metals.min(g.metals_hot_gas);

        let sat_gal = &mut ctx.galaxies[sat];
        sat_gal.hot_gas -= stripped;
        sat_gal.metals_hot_gas -= stripped_metals;

        let central_gal = &mut ctx.galaxies[central];
        central_gal.hot_gas += stripped;
        central_gal.metals_hot_gas += stripped * metallicity;
    }
}

/// Gnedin (2000) filtering-mass suppression with the Kravtsov et al.
/// (2004) Appendix B fitting formulas.
fn reionization_suppression(
    reion: &Reionization,
    sim: SimContext<'_>,
    mvir: f64,
    z: f64,
) -> f64 {
    let alpha = 6.0;
    let a = 1.0 / (1.0 + z);
    let a0 = 1.0 / (1.0 + reion.z0);
    let ar = 1.0 / (1.0 + reion.zr);
    let a_on_a0 = a / a0;
    let a_on_ar = a / ar;

    let f_of_a = if a <= a0 {
        3.0 * a / ((2.0 + alpha) * (5.0 + 2.0 * alpha)) * a_on_a0.powf(alpha)
    } else if a < ar {
        (3.0 / a) * a0 * a0
            * (1.0 / (2.0 + alpha) - 2.0 * a_on_a0.powf(-0.5) / (5.0 + 2.0 * alpha))
            + a * a / 10.0
            - (a0 * a0 / 10.0) * (5.0 - 4.0 * a_on_a0.powf(-0.5))
    } else {
        (3.0 / a)
            * (a0 * a0 * (1.0 / (2.0 + alpha) - 2.0 * a_on_a0.powf(-0.5) / (5.0 + 2.0 * alpha))
                + (ar * ar / 10.0) * (5.0 - 4.0 * a_on_ar.powf(-0.5))
                - (a0 * a0 / 10.0) * (5.0 - 4.0 * a_on_a0.powf(-0.5))
                + a * ar / 3.0
                - (ar * ar / 3.0) * (3.0 - 2.0 * a_on_ar.powf(-0.5)))
    };

    // filtering mass in 1e10 Msun/h; mu = 0.59 gives the 2.21 factor
    let omega = sim.cosmo.omega;
    let m_jeans = 25.0 * omega.powf(-0.5) * 2.21;
    let m_filtering = m_jeans * f_of_a.powf(1.5);

    // characteristic mass of a 1e4 K halo
    let v_char = (1.0e4_f64 / 36.0).sqrt();
    let omega_z = omega * (1.0 + z).powi(3) / (omega * (1.0 + z).powi(3) + sim.cosmo.omega_lambda);
    let x_z = omega_z - 1.0;
    let delta_crit_z = 18.0 * PI * PI + 82.0 * x_z - 39.0 * x_z * x_z;
    let hubble_z =
        sim.units.hubble * (omega * (1.0 + z).powi(3) + sim.cosmo.omega_lambda).sqrt();
    let m_char = v_char.powi(3) / (sim.units.g * hubble_z * (0.5 * delta_crit_z).sqrt());

    let mass_to_use = m_filtering.max(m_char);
    1.0 / (1.0 + 0.26 * (mass_to_use / mvir)).powi(3)
}
