//! Galaxy mergers, starbursts, black-hole growth and satellite disruption.

use accreta_engine::{GroupContext, SimContext};
use accreta_types::units::SPEED_OF_LIGHT_CM_S;
use accreta_types::{GalaxyRecord, MergeKind, props};
use tracing::warn;

use crate::StandardModel;
use crate::starform;

/// What triggered a starburst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BurstMode {
    Merger,
    Instability,
}

/// Dynamical-friction merging time of the galaxy living in `sat_halo`
/// onto `mother_halo` (Binney & Tremaine style). Negative means "merge
/// immediately": the satellite is too scrawny for a meaningful estimate.
pub(crate) fn merging_timescale(
    sim: SimContext<'_>,
    sat_halo: usize,
    mother_halo: usize,
    galaxy: &GalaxyRecord,
) -> f64 {
    const MIN_PART_SAT_HALO: i32 = 10;

    if sat_halo == mother_halo {
        warn!(
            sat_halo,
            snap = galaxy.snap_num,
            "satellite and central share a halo; merging immediately"
        );
        return -1.0;
    }

    let coulomb =
        (1.0 + sim.halos[mother_halo].len as f64 / sim.halos[sat_halo].len as f64).ln();
    let satellite_mass = props::virial_mass(sim.halos, sat_halo, sim.cosmo)
        + galaxy.stellar_mass
        + galaxy.cold_gas;
    let satellite_radius =
        props::virial_radius(sim.halos, mother_halo, sim.cosmo, sim.units, sim.snapshots);

    if satellite_mass > 0.0 && coulomb > 0.0 && sim.halos[sat_halo].len >= MIN_PART_SAT_HALO {
        2.0 * 1.17 * satellite_radius * satellite_radius
            * props::virial_velocity(sim.halos, mother_halo, sim.cosmo, sim.units, sim.snapshots)
            / (coulomb * sim.units.g * satellite_mass)
    } else {
        -1.0
    }
}

/// Merge satellite `sat` into `target`: transfer every reservoir, grow the
/// black hole, burst, and mark the satellite minor or major.
#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_merger(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    sat: usize,
    target: usize,
    central: usize,
    time: f64,
    dt: f64,
    step: usize,
) {
    let mass_ratio = {
        let sat_mass = ctx.galaxies[sat].stellar_mass + ctx.galaxies[sat].cold_gas;
        let target_mass = ctx.galaxies[target].stellar_mass + ctx.galaxies[target].cold_gas;
        let (mi, ma) = if sat_mass < target_mass {
            (sat_mass, target_mass)
        } else {
            (target_mass, sat_mass)
        };
        if ma > 0.0 { mi / ma } else { 1.0 }
    };

    add_galaxies_together(ctx, target, sat);

    if model.params().agn.is_on() {
        grow_black_hole(model, ctx, target, mass_ratio);
    }

    collisional_starburst(
        model, ctx, mass_ratio, target, central, time, dt, BurstMode::Merger, step,
    );

    if mass_ratio > 0.1 {
        ctx.galaxies[target].time_of_last_minor_merger = time;
    }
    if mass_ratio > model.params().major_merger_threshold {
        make_bulge_from_burst(&mut ctx.galaxies[target]);
        ctx.galaxies[target].time_of_last_major_merger = time;
        ctx.galaxies[sat].merge.kind = MergeKind::Major;
    } else {
        ctx.galaxies[sat].merge.kind = MergeKind::Minor;
    }
}

/// Kauffmann & Haehnelt (2000) quasar-mode black-hole growth from the
/// cold disk during a merger, with the resulting quasar wind.
pub(crate) fn grow_black_hole(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    p: usize,
    mass_ratio: f64,
) {
    let accreted = {
        let g = &ctx.galaxies[p];
        if g.cold_gas <= 0.0 {
            return;
        }
        let accreted = model.params().black_hole_growth_rate * mass_ratio
            / (1.0 + (280.0 / g.vvir).powi(2))
            * g.cold_gas;
        accreted.min(g.cold_gas)
    };

    let g = &mut ctx.galaxies[p];
    let metallicity = props::metallicity(g.cold_gas, g.metals_cold_gas);
    g.black_hole_mass += accreted;
    g.cold_gas -= accreted;
    g.metals_cold_gas -= metallicity * accreted;
    g.quasar_bh_accretion += accreted;

    quasar_mode_wind(model, g, accreted);
}

/// Eject cold (and possibly hot) gas when the quasar wind carries more
/// energy than the gas binding energy.
fn quasar_mode_wind(model: &StandardModel, g: &mut GalaxyRecord, accreted: f64) {
    let c_internal = SPEED_OF_LIGHT_CM_S / 1.0e5;
    let quasar_energy =
        model.params().quasar_mode_efficiency * 0.1 * accreted * c_internal * c_internal;
    let cold_gas_energy = 0.5 * g.cold_gas * g.vvir * g.vvir;
    let hot_gas_energy = 0.5 * g.hot_gas * g.vvir * g.vvir;

    if quasar_energy > cold_gas_energy {
        g.ejected_mass += g.cold_gas;
        g.metals_ejected_mass += g.metals_cold_gas;
        g.cold_gas = 0.0;
        g.metals_cold_gas = 0.0;
    }
    if quasar_energy > cold_gas_energy + hot_gas_energy {
        g.ejected_mass += g.hot_gas;
        g.metals_ejected_mass += g.metals_hot_gas;
        g.hot_gas = 0.0;
        g.metals_hot_gas = 0.0;
    }
}

/// Pour every reservoir of `sat` into `target`; the satellite's stars land
/// in the target's bulge.
fn add_galaxies_together(ctx: &mut GroupContext<'_, '_>, target: usize, sat: usize) {
    let sat_gal = ctx.galaxies[sat].clone();
    let t = &mut ctx.galaxies[target];

    t.cold_gas += sat_gal.cold_gas;
    t.metals_cold_gas += sat_gal.metals_cold_gas;
    t.stellar_mass += sat_gal.stellar_mass;
    t.metals_stellar_mass += sat_gal.metals_stellar_mass;
    t.hot_gas += sat_gal.hot_gas;
    t.metals_hot_gas += sat_gal.metals_hot_gas;
    t.ejected_mass += sat_gal.ejected_mass;
    t.metals_ejected_mass += sat_gal.metals_ejected_mass;
    t.ics += sat_gal.ics;
    t.metals_ics += sat_gal.metals_ics;
    t.black_hole_mass += sat_gal.black_hole_mass;

    t.bulge_mass += sat_gal.stellar_mass;
    t.metals_bulge_mass += sat_gal.metals_stellar_mass;

    t.sfr.absorb(&sat_gal.sfr);
}

/// After a major merger the whole disk becomes the bulge.
fn make_bulge_from_burst(g: &mut GalaxyRecord) {
    g.bulge_mass = g.stellar_mass;
    g.metals_bulge_mass = g.metals_stellar_mass;
    g.sfr.disk_to_bulge();
}

/// Somerville et al. (2001) collisional starburst: a fraction of the cold
/// gas set by the mass ratio turns into bulge stars, with the usual
/// supernova feedback on top. Coefficients follow T. J. Cox's thesis.
#[allow(clippy::too_many_arguments)]
pub(crate) fn collisional_starburst(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    mass_ratio: f64,
    p: usize,
    central: usize,
    time: f64,
    dt: f64,
    mode: BurstMode,
    step: usize,
) {
    let params = model.params();

    let eburst = match mode {
        BurstMode::Instability => mass_ratio,
        BurstMode::Merger => 0.56 * mass_ratio.powf(0.7),
    };

    let mut stars = (eburst * ctx.galaxies[p].cold_gas).max(0.0);
    let mut reheated_mass = if params.supernova_feedback {
        params.feedback_reheating_epsilon * stars
    } else {
        0.0
    };

    let cold_gas = ctx.galaxies[p].cold_gas;
    if stars + reheated_mass > cold_gas && stars + reheated_mass > 0.0 {
        let fac = cold_gas / (stars + reheated_mass);
        stars *= fac;
        reheated_mass *= fac;
    }

    let ejected_mass = if params.supernova_feedback {
        let central_vvir = ctx.galaxies[central].vvir;
        if central_vvir > 0.0 {
            let units = ctx.sim.units;
            ((params.feedback_ejection_efficiency
                * (units.eta_sn_code * units.energy_sn_code)
                / (central_vvir * central_vvir)
                - params.feedback_reheating_epsilon)
                * stars)
                .max(0.0)
        } else {
            0.0
        }
    } else {
        0.0
    };

    // starbursts build the bulge, not the disk
    {
        let g = &mut ctx.galaxies[p];
        g.sfr.bulge[step] += stars / dt;
        g.sfr.bulge_cold_gas[step] += g.cold_gas;
        g.sfr.bulge_cold_gas_metals[step] += g.metals_cold_gas;
    }

    let metallicity = {
        let g = &ctx.galaxies[p];
        props::metallicity(g.cold_gas, g.metals_cold_gas)
    };
    starform::update_from_star_formation(model, &mut ctx.galaxies[p], stars, metallicity);

    {
        let g = &mut ctx.galaxies[p];
        let locked = (1.0 - params.recycle_fraction) * stars;
        g.bulge_mass += locked;
        g.metals_bulge_mass += metallicity * locked;
    }

    let metallicity = {
        let g = &ctx.galaxies[p];
        props::metallicity(g.cold_gas, g.metals_cold_gas)
    };
    starform::update_from_feedback(model, ctx, p, central, reheated_mass, ejected_mass, metallicity);

    if params.disk_instability
        && mode == BurstMode::Merger
        && mass_ratio < params.major_merger_threshold
    {
        starform::check_disk_instability(model, ctx, p, central, time, dt, step);
    }

    // instantaneous recycling of newly produced metals
    if ctx.galaxies[p].cold_gas > 1.0e-8 && mass_ratio < params.major_merger_threshold {
        let frac_leave =
            params.frac_z_leave_disk * (-1.0 * ctx.galaxies[central].mvir / 30.0).exp();
        ctx.galaxies[p].metals_cold_gas += params.metal_yield * (1.0 - frac_leave) * stars;
        ctx.galaxies[central].metals_hot_gas += params.metal_yield * frac_leave * stars;
    } else {
        ctx.galaxies[central].metals_hot_gas += params.metal_yield * stars;
    }
}

/// A satellite stripped below the disruption threshold scatters into the
/// target's intracluster light instead of merging.
pub(crate) fn disrupt_to_ics(ctx: &mut GroupContext<'_, '_>, target: usize, sat: usize) {
    let sat_gal = ctx.galaxies[sat].clone();
    let t = &mut ctx.galaxies[target];

    t.hot_gas += sat_gal.cold_gas + sat_gal.hot_gas;
    t.metals_hot_gas += sat_gal.metals_cold_gas + sat_gal.metals_hot_gas;
    t.ejected_mass += sat_gal.ejected_mass;
    t.metals_ejected_mass += sat_gal.metals_ejected_mass;
    t.ics += sat_gal.ics + sat_gal.stellar_mass;
    t.metals_ics += sat_gal.metals_ics + sat_gal.metals_stellar_mass;
    // the disrupted satellite's black hole is simply lost

    ctx.galaxies[sat].merge.kind = MergeKind::Disrupted;
}
