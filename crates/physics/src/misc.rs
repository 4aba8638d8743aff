//! Galaxy seeding and small stand-alone recipes.

use accreta_engine::SimContext;
use accreta_types::{GalaxyRecord, GalaxyType, props};

use crate::StandardModel;

/// Initialize a brand-new central galaxy from its halo's properties.
pub(crate) fn seed_galaxy(
    model: &StandardModel,
    sim: SimContext<'_>,
    halonr: usize,
    galaxy_nr: u64,
) -> GalaxyRecord {
    let halo = &sim.halos[halonr];
    assert!(
        halo.is_fof_root(halonr),
        "new galaxies are seeded at FOF roots only"
    );

    let mut g = GalaxyRecord::new(model.steps());
    g.galaxy_type = GalaxyType::Central;
    g.galaxy_nr = galaxy_nr;
    g.halo_nr = halonr;
    g.most_bound_id = halo.most_bound_id;
    // the epoch before the halo first appeared
    g.snap_num = halo.snap_num - 1;

    g.pos = halo.pos;
    g.vel = halo.vel;
    g.len = halo.len;
    g.vmax = halo.vmax as f64;
    g.vvir = props::virial_velocity(sim.halos, halonr, sim.cosmo, sim.units, sim.snapshots);
    g.mvir = props::virial_mass(sim.halos, halonr, sim.cosmo);
    g.rvir = props::virial_radius(sim.halos, halonr, sim.cosmo, sim.units, sim.snapshots);
    g.disk_scale_radius = props::disk_scale_radius(halo, g.vvir, g.rvir);
    g
}

/// Return ejected gas to the hot phase once the halo is deep enough to
/// re-capture a supernova-driven wind (escape velocity above
/// V_SN / sqrt(2) = 445.48 km/s, scaled by the configured factor).
pub(crate) fn reincorporate_gas(model: &StandardModel, g: &mut GalaxyRecord, dt: f64) {
    let v_crit = 445.48 * model.params().reincorporation_factor;
    if g.vvir > v_crit && g.rvir > 0.0 {
        let mut reincorporated =
            (g.vvir / v_crit - 1.0) * g.ejected_mass / (g.rvir / g.vvir) * dt;
        if reincorporated > g.ejected_mass {
            reincorporated = g.ejected_mass;
        }
        let metallicity = props::metallicity(g.ejected_mass, g.metals_ejected_mass);
        g.ejected_mass -= reincorporated;
        g.metals_ejected_mass -= metallicity * reincorporated;
        g.hot_gas += reincorporated;
        g.metals_hot_gas += metallicity * reincorporated;
    }
}
