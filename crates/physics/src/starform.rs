//! Star formation, supernova feedback and disk instability.

use accreta_engine::GroupContext;
use accreta_types::{GalaxyRecord, props};
use tracing::warn;

use crate::StandardModel;
use crate::mergers;

/// Kennicutt–Schmidt star formation above a critical surface density,
/// followed by supernova reheating and ejection, metal enrichment, and an
/// optional disk-instability check.
pub(crate) fn star_formation_and_feedback(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    p: usize,
    central: usize,
    time: f64,
    dt: f64,
    step: usize,
) {
    let params = model.params();

    let strdot = {
        let g = &ctx.galaxies[p];
        // star-forming region is ~3 disk scale lengths
        let reff = 3.0 * g.disk_scale_radius;
        let tdyn = if g.vvir > 0.0 { reff / g.vvir } else { 0.0 };
        // critical surface density from Kauffmann (1996) eq. 7
        let cold_crit = 0.19 * g.vvir * reff;
        if g.cold_gas > cold_crit && tdyn > 0.0 {
            params.sfr_efficiency * (g.cold_gas - cold_crit) / tdyn
        } else {
            0.0
        }
    };

    let mut stars = (strdot * dt).max(0.0);
    let mut reheated_mass = if params.supernova_feedback {
        params.feedback_reheating_epsilon * stars
    } else {
        0.0
    };

    // balance star formation and feedback against the available cold gas
    let cold_gas = ctx.galaxies[p].cold_gas;
    if stars + reheated_mass > cold_gas && stars + reheated_mass > 0.0 {
        let fac = cold_gas / (stars + reheated_mass);
        stars *= fac;
        reheated_mass *= fac;
    }

    // energy-driven ejection out of the halo
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

    {
        let g = &mut ctx.galaxies[p];
        g.sfr.disk[step] += stars / dt;
        g.sfr.disk_cold_gas[step] = g.cold_gas;
        g.sfr.disk_cold_gas_metals[step] = g.metals_cold_gas;
    }

    let metallicity = {
        let g = &ctx.galaxies[p];
        props::metallicity(g.cold_gas, g.metals_cold_gas)
    };
    update_from_star_formation(model, &mut ctx.galaxies[p], stars, metallicity);

    let metallicity = {
        let g = &ctx.galaxies[p];
        props::metallicity(g.cold_gas, g.metals_cold_gas)
    };
    update_from_feedback(model, ctx, p, central, reheated_mass, ejected_mass, metallicity);

    if params.disk_instability {
        check_disk_instability(model, ctx, p, central, time, dt, step);
    }

    // instantaneous recycling: new metals from SNII, split between the
    // cold disk and the central's hot halo (Krumholz & Dekel 2011 eq. 22)
    if ctx.galaxies[p].cold_gas > 1.0e-8 {
        let frac_leave =
            params.frac_z_leave_disk * (-1.0 * ctx.galaxies[central].mvir / 30.0).exp();
        ctx.galaxies[p].metals_cold_gas += params.metal_yield * (1.0 - frac_leave) * stars;
        ctx.galaxies[central].metals_hot_gas += params.metal_yield * frac_leave * stars;
    } else {
        ctx.galaxies[central].metals_hot_gas += params.metal_yield * stars;
    }
}

/// Move newly formed stellar mass out of the cold disk, keeping back the
/// instantaneously recycled fraction.
pub(crate) fn update_from_star_formation(
    model: &StandardModel,
    g: &mut GalaxyRecord,
    stars: f64,
    metallicity: f64,
) {
    let locked = (1.0 - model.params().recycle_fraction) * stars;
    g.cold_gas -= locked;
    g.metals_cold_gas -= metallicity * locked;
    g.stellar_mass += locked;
    g.metals_stellar_mass += metallicity * locked;
}

/// Reheat cold gas into the central's hot halo and eject hot gas beyond
/// the virial radius.
pub(crate) fn update_from_feedback(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    p: usize,
    central: usize,
    reheated_mass: f64,
    mut ejected_mass: f64,
    metallicity: f64,
) {
    if !model.params().supernova_feedback {
        return;
    }

    let cold_gas = ctx.galaxies[p].cold_gas;
    if reheated_mass > cold_gas && reheated_mass > 0.0 {
        warn!(reheated_mass, cold_gas, "feedback wants more cold gas than exists");
    }
    let reheated_mass = reheated_mass.min(cold_gas);

    {
        let g = &mut ctx.galaxies[p];
        g.cold_gas -= reheated_mass;
        g.metals_cold_gas -= metallicity * reheated_mass;
    }
    {
        let c = &mut ctx.galaxies[central];
        c.hot_gas += reheated_mass;
        c.metals_hot_gas += metallicity * reheated_mass;

        ejected_mass = ejected_mass.min(c.hot_gas);
        let metallicity_hot = props::metallicity(c.hot_gas, c.metals_hot_gas);
        c.hot_gas -= ejected_mass;
        c.metals_hot_gas -= metallicity_hot * ejected_mass;
        c.ejected_mass += ejected_mass;
        c.metals_ejected_mass += metallicity_hot * ejected_mass;
    }

    ctx.galaxies[p].outflow_rate += reheated_mass;
}

/// Mo, Mao & White (1998) disk stability: transfer whatever stellar and
/// gaseous disk mass exceeds the critical mass to the bulge, bursting the
/// unstable gas.
pub(crate) fn check_disk_instability(
    model: &StandardModel,
    ctx: &mut GroupContext<'_, '_>,
    p: usize,
    central: usize,
    time: f64,
    dt: f64,
    step: usize,
) {
    let (diskmass, mcrit) = {
        let g = &ctx.galaxies[p];
        let diskmass = g.cold_gas + (g.stellar_mass - g.bulge_mass);
        if diskmass <= 0.0 {
            return;
        }
        let mcrit =
            (g.vmax * g.vmax * (3.0 * g.disk_scale_radius) / ctx.sim.units.g).min(diskmass);
        (diskmass, mcrit)
    };

    let (unstable_gas, unstable_stars) = {
        let g = &ctx.galaxies[p];
        let gas_fraction = g.cold_gas / diskmass;
        (
            gas_fraction * (diskmass - mcrit),
            (1.0 - gas_fraction) * (diskmass - mcrit),
        )
    };

    // excess stars slide into the bulge
    if unstable_stars > 0.0 {
        let g = &mut ctx.galaxies[p];
        let metallicity = props::metallicity(
            g.stellar_mass - g.bulge_mass,
            g.metals_stellar_mass - g.metals_bulge_mass,
        );
        g.bulge_mass += unstable_stars;
        g.metals_bulge_mass += metallicity * unstable_stars;

        if g.bulge_mass / g.stellar_mass > 1.0001
            || g.metals_bulge_mass / g.metals_stellar_mass > 1.0001
        {
            warn!(
                bulge = g.bulge_mass,
                stellar = g.stellar_mass,
                "instability pushed bulge past the stellar total"
            );
        }
    }

    // excess gas bursts and feeds the black hole
    if unstable_gas > 0.0 {
        let cold_gas = ctx.galaxies[p].cold_gas;
        if unstable_gas / cold_gas > 1.0001 {
            warn!(unstable_gas, cold_gas, "unstable gas exceeds the cold disk");
        }
        let unstable_fraction = unstable_gas / cold_gas;
        if model.params().agn.is_on() {
            mergers::grow_black_hole(model, ctx, p, unstable_fraction);
        }
        mergers::collisional_starburst(
            model,
            ctx,
            unstable_fraction,
            p,
            central,
            time,
            dt,
            mergers::BurstMode::Instability,
            step,
        );
    }
}
