//! Standard baryonic recipes
//!
//! The conventional semi-analytic process set wired into the engine's
//! [`Recipes`] contract: reionization-modulated infall, satellite
//! stripping, cooling flows with optional radio-mode AGN heating,
//! Kennicutt–Schmidt star formation with supernova feedback, ejected-gas
//! reincorporation, disk instability, dynamical-friction driven mergers
//! with starbursts and quasar-mode black-hole growth, and satellite
//! disruption into the intracluster stars.

mod cooling;
mod infall;
mod mergers;
mod misc;
mod starform;

use accreta_engine::{GroupContext, Recipes, SimContext};
use accreta_types::{GalaxyRecord, RecipeParams, props};

/// The standard recipe set, parameterized by the run configuration.
pub struct StandardModel {
    params: RecipeParams,
    steps: usize,
}

impl StandardModel {
    pub fn new(params: RecipeParams, steps: usize) -> Self {
        StandardModel { params, steps }
    }

    pub fn params(&self) -> &RecipeParams {
        &self.params
    }

    pub(crate) fn steps(&self) -> usize {
        self.steps
    }
}

impl Recipes for StandardModel {
    fn seed_galaxy(&self, sim: SimContext<'_>, halonr: usize, galaxy_nr: u64) -> GalaxyRecord {
        misc::seed_galaxy(self, sim, halonr, galaxy_nr)
    }

    fn disk_scale_radius(&self, sim: SimContext<'_>, halonr: usize, galaxy: &GalaxyRecord) -> f64 {
        props::disk_scale_radius(&sim.halos[halonr], galaxy.vvir, galaxy.rvir)
    }

    fn merging_timescale(
        &self,
        sim: SimContext<'_>,
        sat_halo: usize,
        mother_halo: usize,
        galaxy: &GalaxyRecord,
    ) -> f64 {
        mergers::merging_timescale(sim, sat_halo, mother_halo, galaxy)
    }

    fn group_infall_mass(&self, ctx: &mut GroupContext<'_, '_>, central: usize, z: f64) -> f64 {
        infall::group_infall_mass(self, ctx, central, z)
    }

    fn add_infall_to_hot(&self, galaxy: &mut GalaxyRecord, amount: f64) {
        infall::add_infall_to_hot(galaxy, amount);
    }

    fn reincorporate_gas(&self, galaxy: &mut GalaxyRecord, dt: f64) {
        misc::reincorporate_gas(self, galaxy, dt);
    }

    fn strip_from_satellite(
        &self,
        ctx: &mut GroupContext<'_, '_>,
        fof_halo: usize,
        central: usize,
        sat: usize,
    ) {
        infall::strip_from_satellite(self, ctx, fof_halo, central, sat);
    }

    fn cooling_mass(&self, ctx: &mut GroupContext<'_, '_>, p: usize, dt: f64) -> f64 {
        cooling::cooling_mass(self, ctx, p, dt)
    }

    fn cool_gas_onto_disk(&self, galaxy: &mut GalaxyRecord, cooling: f64) {
        cooling::cool_gas_onto_disk(galaxy, cooling);
    }

    fn star_formation_and_feedback(
        &self,
        ctx: &mut GroupContext<'_, '_>,
        p: usize,
        central: usize,
        time: f64,
        dt: f64,
        step: usize,
    ) {
        starform::star_formation_and_feedback(self, ctx, p, central, time, dt, step);
    }

    fn handle_merger(
        &self,
        ctx: &mut GroupContext<'_, '_>,
        sat: usize,
        target: usize,
        central: usize,
        time: f64,
        dt: f64,
        step: usize,
    ) {
        mergers::handle_merger(self, ctx, sat, target, central, time, dt, step);
    }

    fn disrupt_to_ics(&self, ctx: &mut GroupContext<'_, '_>, target: usize, sat: usize) {
        mergers::disrupt_to_ics(ctx, target, sat);
    }
}
