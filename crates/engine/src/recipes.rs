//! Physics recipe contracts.
//!
//! The engine decides WHEN each process runs; the recipes decide what it
//! does to the galaxies. Implementations are side-effect-confined to the
//! galaxy slice handed to them and may log anomalies, but never abort:
//! structural problems belong to the engine.

use accreta_types::{Cosmology, GalaxyRecord, HaloRecord, SnapshotTable, UnitSystem};

/// Read-only simulation environment shared by every recipe call.
#[derive(Clone, Copy)]
pub struct SimContext<'a> {
    pub halos: &'a [HaloRecord],
    pub cosmo: &'a Cosmology,
    pub units: &'a UnitSystem,
    pub snapshots: &'a SnapshotTable,
}

impl<'a> SimContext<'a> {
    pub fn new(
        halos: &'a [HaloRecord],
        cosmo: &'a Cosmology,
        units: &'a UnitSystem,
        snapshots: &'a SnapshotTable,
    ) -> Self {
        SimContext {
            halos,
            cosmo,
            units,
            snapshots,
        }
    }
}

/// One FOF group's galaxies during a join/evolve step.
///
/// `galaxies` is exactly the group's working set; all indices passed to
/// recipe methods are positions in this slice.
pub struct GroupContext<'a, 'g> {
    pub sim: SimContext<'a>,
    pub galaxies: &'g mut [GalaxyRecord],
}

/// The baryonic processes the engine drives per snapshot and sub-step.
pub trait Recipes {
    /// A brand-new galaxy seeded from the properties of `halonr` (always a
    /// FOF root).
    fn seed_galaxy(&self, sim: SimContext<'_>, halonr: usize, galaxy_nr: u64) -> GalaxyRecord;

    /// Scale radius of a freshly re-centred disk.
    fn disk_scale_radius(&self, sim: SimContext<'_>, halonr: usize, galaxy: &GalaxyRecord) -> f64;

    /// Dynamical-friction time before the galaxy in `sat_halo` merges into
    /// `mother_halo`'s central. May be negative ("merge immediately").
    fn merging_timescale(
        &self,
        sim: SimContext<'_>,
        sat_halo: usize,
        mother_halo: usize,
        galaxy: &GalaxyRecord,
    ) -> f64;

    /// Baryonic mass newly infalling onto the group this snapshot, with
    /// satellite ejecta/ICS consolidated onto the central as a side effect.
    fn group_infall_mass(&self, ctx: &mut GroupContext<'_, '_>, central: usize, z: f64) -> f64;

    /// Deposit (or, if negative, remove) infalling gas in the hot halo.
    fn add_infall_to_hot(&self, galaxy: &mut GalaxyRecord, amount: f64);

    /// Return previously ejected gas to the hot phase.
    fn reincorporate_gas(&self, galaxy: &mut GalaxyRecord, dt: f64);

    /// Ram-pressure strip hot gas from a subhalo-hosted satellite.
    fn strip_from_satellite(
        &self,
        ctx: &mut GroupContext<'_, '_>,
        fof_halo: usize,
        central: usize,
        sat: usize,
    );

    /// Hot gas cooling out in `dt`, after any AGN heating.
    fn cooling_mass(&self, ctx: &mut GroupContext<'_, '_>, p: usize, dt: f64) -> f64;

    /// Move cooled gas onto the cold disk.
    fn cool_gas_onto_disk(&self, galaxy: &mut GalaxyRecord, cooling: f64);

    /// Form stars and apply supernova feedback for one sub-step.
    fn star_formation_and_feedback(
        &self,
        ctx: &mut GroupContext<'_, '_>,
        p: usize,
        central: usize,
        time: f64,
        dt: f64,
        step: usize,
    );

    /// Merge satellite `sat` into `target`; must mark the satellite's
    /// merge kind minor or major.
    #[allow(clippy::too_many_arguments)]
    fn handle_merger(
        &self,
        ctx: &mut GroupContext<'_, '_>,
        sat: usize,
        target: usize,
        central: usize,
        time: f64,
        dt: f64,
        step: usize,
    );

    /// Scatter satellite `sat` into `target`'s intracluster component;
    /// must mark the satellite disrupted.
    fn disrupt_to_ics(&self, ctx: &mut GroupContext<'_, '_>, target: usize, sat: usize);
}
