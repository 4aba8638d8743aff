//! Test harness for driving the engine on synthetic forests.
//!
//! Builds small halo populations in memory, canonicalizes them and runs
//! the walker with either the standard recipe set or a scripted stand-in
//! whose behavior the test controls.

use std::cell::Cell;

use accreta_engine::{
    ForestWalker, GalaxyStore, GroupContext, MemoryLedger, Recipes, SimContext,
    canonicalize_forest,
};
use accreta_physics::StandardModel;
use accreta_types::{
    AgnMode, Cosmology, GalaxyRecord, GalaxyType, HaloAux, HaloLink, HaloRecord, MergeKind,
    RecipeParams, SnapshotTable, UnitSystem,
};

pub const STEPS: usize = 4;

/// Millennium-flavored defaults, reincorporation and instability off so
/// scripted tests stay predictable.
pub fn recipe_params() -> RecipeParams {
    RecipeParams {
        sfr_efficiency: 0.05,
        recycle_fraction: 0.43,
        metal_yield: 0.025,
        frac_z_leave_disk: 0.0,
        feedback_reheating_epsilon: 3.0,
        feedback_ejection_efficiency: 0.3,
        reincorporation_factor: 0.0,
        threshold_sat_disruption: 1.0,
        major_merger_threshold: 0.3,
        black_hole_growth_rate: 0.015,
        quasar_mode_efficiency: 0.005,
        radio_mode_efficiency: 0.08,
        energy_sn: 1.0e51,
        eta_sn: 5.0e-3,
        supernova_feedback: true,
        disk_instability: false,
        agn: AgnMode::Off,
        reionization: None,
    }
}

pub fn cosmology() -> Cosmology {
    Cosmology {
        omega: 0.25,
        omega_lambda: 0.75,
        hubble_h: 0.73,
        particle_mass: 0.086,
        baryon_frac: 0.17,
        box_size: 62.5,
    }
}

/// A FOF root with a spherical-overdensity mass.
pub fn fof_root(snap: i32, own: usize, len: i32) -> HaloRecord {
    HaloRecord {
        snap_num: snap,
        len,
        mvir: len as f32 * 0.1,
        vmax: 150.0,
        spin: [0.02, 0.01, 0.015],
        first_in_fof_group: HaloLink::from_index(own),
        most_bound_id: own as i64,
        ..HaloRecord::default()
    }
}

/// A subhalo belonging to `root`'s group.
pub fn subhalo(snap: i32, root: usize, len: i32) -> HaloRecord {
    HaloRecord {
        snap_num: snap,
        len,
        mvir: 0.0,
        vmax: 80.0,
        first_in_fof_group: HaloLink::from_index(root),
        ..HaloRecord::default()
    }
}

/// Chain `members` (the root first) via `next_in_fof_group`.
pub fn link_group(halos: &mut [HaloRecord], members: &[usize]) {
    for pair in members.windows(2) {
        halos[pair[0]].next_in_fof_group = HaloLink::from_index(pair[1]);
    }
}

/// Attach `progs` to `desc` as its progenitor chain, heaviest first.
pub fn link_progenitors(halos: &mut [HaloRecord], desc: usize, progs: &[usize]) {
    for &p in progs {
        halos[p].descendant = HaloLink::from_index(desc);
    }
    halos[desc].first_progenitor = HaloLink::from_index(progs[0]);
    for pair in progs.windows(2) {
        halos[pair[0]].next_progenitor = HaloLink::from_index(pair[1]);
    }
}

pub struct TestHarness {
    pub halos: Vec<HaloRecord>,
    pub aux: Vec<HaloAux>,
    pub orig_index: Vec<u32>,
    pub params: RecipeParams,
    pub cosmo: Cosmology,
    pub units: UnitSystem,
    pub snapshots: SnapshotTable,
    pub galaxies_created: u64,
    store: GalaxyStore,
    ledger: MemoryLedger,
}

impl TestHarness {
    /// Canonicalize `halos` and set up a run over `nsnaps` snapshots with
    /// evenly spaced expansion factors ending at the present.
    pub fn new(mut halos: Vec<HaloRecord>, nsnaps: usize) -> Self {
        let params = recipe_params();
        let cosmo = cosmology();
        let units = UnitSystem::standard(&cosmo, &params);
        let factors: Vec<f64> = (1..=nsnaps).map(|i| i as f64 / nsnaps as f64).collect();
        let snapshots = SnapshotTable::from_expansion_factors(factors, &cosmo, &units);

        let orig_index = canonicalize_forest(&mut halos).expect("valid test forest");
        let aux: Vec<HaloAux> = orig_index
            .iter()
            .map(|&orig| HaloAux {
                orig_index: orig,
                ..HaloAux::default()
            })
            .collect();

        let mut ledger = MemoryLedger::new();
        let store = GalaxyStore::new(halos.len(), &mut ledger).expect("store");

        TestHarness {
            halos,
            aux,
            orig_index,
            params,
            cosmo,
            units,
            snapshots,
            galaxies_created: 0,
            store,
            ledger,
        }
    }

    /// Run the walker with the standard recipe set.
    pub fn run(&mut self) {
        let model = StandardModel::new(self.params.clone(), STEPS);
        self.run_with(&model);
    }

    /// Run the walker with caller-provided recipes.
    pub fn run_with<R: Recipes>(&mut self, recipes: &R) {
        let sim = SimContext::new(&self.halos, &self.cosmo, &self.units, &self.snapshots);
        let mut walker = ForestWalker::new(
            sim,
            &self.params,
            STEPS,
            &mut self.aux,
            &mut self.store,
            &mut self.ledger,
            recipes,
        );
        walker.run().expect("walk");
        self.galaxies_created = walker.galaxies_created();
    }

    pub fn finalized(&self) -> &[GalaxyRecord] {
        self.store.finalized()
    }

    /// The finalized galaxies owned by one halo.
    pub fn galaxies_of(&self, halonr: usize) -> &[GalaxyRecord] {
        let a = &self.aux[halonr];
        &self.store.finalized()[a.first_galaxy..a.first_galaxy + a.n_galaxies]
    }

    /// Finalized records written at one snapshot.
    pub fn at_snapshot(&self, snap: i32) -> Vec<&GalaxyRecord> {
        self.store
            .finalized()
            .iter()
            .filter(|g| g.snap_num == snap)
            .collect()
    }
}

/// Recipes with no physics, a scripted merge clock, and call counting;
/// lets tests drive the merger machinery deterministically.
pub struct ScriptedModel {
    /// What `merging_timescale` returns.
    pub merge_clock: f64,
    /// Stellar mass given to seeded galaxies (keeps satellite baryons
    /// nonzero so the disruption-threshold test is exercised).
    pub seed_stellar_mass: f64,
    pub mergers_handled: Cell<u32>,
    pub disruptions_handled: Cell<u32>,
}

impl ScriptedModel {
    pub fn new(merge_clock: f64, seed_stellar_mass: f64) -> Self {
        ScriptedModel {
            merge_clock,
            seed_stellar_mass,
            mergers_handled: Cell::new(0),
            disruptions_handled: Cell::new(0),
        }
    }
}

impl Recipes for ScriptedModel {
    fn seed_galaxy(&self, sim: SimContext<'_>, halonr: usize, galaxy_nr: u64) -> GalaxyRecord {
        let halo = &sim.halos[halonr];
        let mut g = GalaxyRecord::new(STEPS);
        g.galaxy_type = GalaxyType::Central;
        g.galaxy_nr = galaxy_nr;
        g.halo_nr = halonr;
        g.snap_num = halo.snap_num - 1;
        g.most_bound_id = halo.most_bound_id;
        g.len = halo.len;
        g.mvir = halo.mvir as f64;
        g.vvir = 100.0;
        g.rvir = 0.1;
        g.stellar_mass = self.seed_stellar_mass;
        g
    }

    fn disk_scale_radius(&self, _: SimContext<'_>, _: usize, _: &GalaxyRecord) -> f64 {
        0.01
    }

    fn merging_timescale(
        &self,
        _: SimContext<'_>,
        _: usize,
        _: usize,
        _: &GalaxyRecord,
    ) -> f64 {
        self.merge_clock
    }

    fn group_infall_mass(&self, _: &mut GroupContext<'_, '_>, _: usize, _: f64) -> f64 {
        0.0
    }

    fn add_infall_to_hot(&self, _: &mut GalaxyRecord, _: f64) {}

    fn reincorporate_gas(&self, _: &mut GalaxyRecord, _: f64) {}

    fn strip_from_satellite(
        &self,
        _: &mut GroupContext<'_, '_>,
        _: usize,
        _: usize,
        _: usize,
    ) {
    }

    fn cooling_mass(&self, _: &mut GroupContext<'_, '_>, _: usize, _: f64) -> f64 {
        0.0
    }

    fn cool_gas_onto_disk(&self, _: &mut GalaxyRecord, _: f64) {}

    fn star_formation_and_feedback(
        &self,
        _: &mut GroupContext<'_, '_>,
        _: usize,
        _: usize,
        _: f64,
        _: f64,
        _: usize,
    ) {
    }

    fn handle_merger(
        &self,
        ctx: &mut GroupContext<'_, '_>,
        sat: usize,
        target: usize,
        _: usize,
        _: f64,
        _: f64,
        _: usize,
    ) {
        let stellar = ctx.galaxies[sat].stellar_mass;
        ctx.galaxies[target].stellar_mass += stellar;
        ctx.galaxies[sat].merge.kind = MergeKind::Minor;
        self.mergers_handled.set(self.mergers_handled.get() + 1);
    }

    fn disrupt_to_ics(&self, ctx: &mut GroupContext<'_, '_>, target: usize, sat: usize) {
        let stellar = ctx.galaxies[sat].stellar_mass;
        ctx.galaxies[target].ics += stellar;
        ctx.galaxies[sat].merge.kind = MergeKind::Disrupted;
        self.disruptions_handled.set(self.disruptions_handled.get() + 1);
    }
}
