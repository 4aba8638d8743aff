//! Synthetic galaxy records.

/// Merge clock value meaning "no valid merging-time estimate yet".
pub const MERGE_CLOCK_UNSET: f64 = 999.9;

/// Role of a galaxy within its FOF group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalaxyType {
    /// Central galaxy of a FOF group.
    Central,
    /// Central of a subhalo: a satellite whose subhalo still exists.
    Satellite,
    /// Satellite whose hosting subhalo no longer exists.
    Orphan,
    /// Transient marker for a galaxy dropped while joining progenitors.
    Removed,
}

impl GalaxyType {
    /// Roles 0 and 1: the galaxy owns its (sub)halo.
    pub fn is_central_kind(self) -> bool {
        matches!(self, GalaxyType::Central | GalaxyType::Satellite)
    }

    pub fn as_output_code(self) -> i32 {
        match self {
            GalaxyType::Central => 0,
            GalaxyType::Satellite => 1,
            GalaxyType::Orphan => 2,
            GalaxyType::Removed => 3,
        }
    }
}

/// How a galaxy left the population, if it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeKind {
    #[default]
    None,
    Minor,
    Major,
    DiskInstability,
    Disrupted,
}

impl MergeKind {
    pub fn is_none(self) -> bool {
        matches!(self, MergeKind::None)
    }

    pub fn as_output_code(self) -> i32 {
        match self {
            MergeKind::None => 0,
            MergeKind::Minor => 1,
            MergeKind::Major => 2,
            MergeKind::DiskInstability => 3,
            MergeKind::Disrupted => 4,
        }
    }
}

/// Merge bookkeeping.
///
/// `target` is the working-array index of the galaxy this one merged into,
/// recorded at merge time; `into_id` is resolved from it at finalize time
/// and indexes the forest's finalized galaxy store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergerState {
    pub kind: MergeKind,
    pub into_id: i64,
    pub into_snap_num: i32,
    pub target: Option<usize>,
}

impl Default for MergerState {
    fn default() -> Self {
        MergerState {
            kind: MergeKind::None,
            into_id: -1,
            into_snap_num: -1,
            target: None,
        }
    }
}

/// Per-sub-step star-formation history for one snapshot interval.
///
/// The cold-gas and metal snapshots alongside the rates are what the output
/// layer needs to reconstruct SFR-weighted metallicities.
#[derive(Debug, Clone, PartialEq)]
pub struct SfrHistory {
    pub disk: Vec<f64>,
    pub bulge: Vec<f64>,
    pub disk_cold_gas: Vec<f64>,
    pub disk_cold_gas_metals: Vec<f64>,
    pub bulge_cold_gas: Vec<f64>,
    pub bulge_cold_gas_metals: Vec<f64>,
}

impl SfrHistory {
    pub fn new(steps: usize) -> Self {
        SfrHistory {
            disk: vec![0.0; steps],
            bulge: vec![0.0; steps],
            disk_cold_gas: vec![0.0; steps],
            disk_cold_gas_metals: vec![0.0; steps],
            bulge_cold_gas: vec![0.0; steps],
            bulge_cold_gas_metals: vec![0.0; steps],
        }
    }

    pub fn steps(&self) -> usize {
        self.disk.len()
    }

    pub fn reset(&mut self) {
        for arr in [
            &mut self.disk,
            &mut self.bulge,
            &mut self.disk_cold_gas,
            &mut self.disk_cold_gas_metals,
            &mut self.bulge_cold_gas,
            &mut self.bulge_cold_gas_metals,
        ] {
            arr.fill(0.0);
        }
    }

    /// Fold a merging satellite's whole history into this galaxy's bulge.
    pub fn absorb(&mut self, other: &SfrHistory) {
        for step in 0..self.steps() {
            self.bulge[step] += other.disk[step] + other.bulge[step];
            self.bulge_cold_gas[step] += other.disk_cold_gas[step] + other.bulge_cold_gas[step];
            self.bulge_cold_gas_metals[step] +=
                other.disk_cold_gas_metals[step] + other.bulge_cold_gas_metals[step];
        }
    }

    /// Move the disk history onto the bulge after a burst turns the disk
    /// into a bulge.
    pub fn disk_to_bulge(&mut self) {
        for step in 0..self.steps() {
            self.bulge[step] += self.disk[step];
            self.bulge_cold_gas[step] += self.disk_cold_gas[step];
            self.bulge_cold_gas_metals[step] += self.disk_cold_gas_metals[step];
            self.disk[step] = 0.0;
            self.disk_cold_gas[step] = 0.0;
            self.disk_cold_gas_metals[step] = 0.0;
        }
    }
}

/// A galaxy tracked across snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct GalaxyRecord {
    /// Snapshot this record was last finalized at (`-1` for a galaxy seeded
    /// this snapshot, matching the epoch before its halo first appeared).
    pub snap_num: i32,
    pub galaxy_type: GalaxyType,
    /// Identity persistent across snapshots within one forest context.
    pub galaxy_nr: u64,
    /// Working-array index of the one central-kind galaxy of the owning halo.
    pub central_gal: Option<usize>,
    /// Owning halo index within the forest.
    pub halo_nr: usize,
    pub most_bound_id: i64,

    pub merge: MergerState,
    /// Full snapshot interval this galaxy is being integrated over; unset
    /// until the first sub-step touches it.
    pub dt: Option<f64>,

    pub pos: [f32; 3],
    pub vel: [f32; 3],
    pub len: i32,
    pub mvir: f64,
    pub delta_mvir: f64,
    pub rvir: f64,
    pub vvir: f64,
    pub vmax: f64,

    pub cold_gas: f64,
    pub stellar_mass: f64,
    pub bulge_mass: f64,
    pub hot_gas: f64,
    pub ejected_mass: f64,
    pub black_hole_mass: f64,
    pub ics: f64,

    pub metals_cold_gas: f64,
    pub metals_stellar_mass: f64,
    pub metals_bulge_mass: f64,
    pub metals_hot_gas: f64,
    pub metals_ejected_mass: f64,
    pub metals_ics: f64,

    pub sfr: SfrHistory,

    pub disk_scale_radius: f64,
    /// Remaining time before this satellite merges; `MERGE_CLOCK_UNSET`
    /// while no estimate exists.
    pub merg_time: f64,
    pub cooling: f64,
    pub heating: f64,
    pub quasar_bh_accretion: f64,
    pub time_of_last_major_merger: f64,
    pub time_of_last_minor_merger: f64,
    pub outflow_rate: f64,
    pub total_satellite_baryons: f64,

    pub infall_mvir: f64,
    pub infall_vvir: f64,
    pub infall_vmax: f64,
}

impl GalaxyRecord {
    /// A zeroed record with all sentinels in place; callers fill in halo
    /// properties and identity.
    pub fn new(steps: usize) -> Self {
        GalaxyRecord {
            snap_num: -1,
            galaxy_type: GalaxyType::Central,
            galaxy_nr: 0,
            central_gal: None,
            halo_nr: 0,
            most_bound_id: 0,
            merge: MergerState::default(),
            dt: None,
            pos: [0.0; 3],
            vel: [0.0; 3],
            len: 0,
            mvir: 0.0,
            delta_mvir: 0.0,
            rvir: 0.0,
            vvir: 0.0,
            vmax: 0.0,
            cold_gas: 0.0,
            stellar_mass: 0.0,
            bulge_mass: 0.0,
            hot_gas: 0.0,
            ejected_mass: 0.0,
            black_hole_mass: 0.0,
            ics: 0.0,
            metals_cold_gas: 0.0,
            metals_stellar_mass: 0.0,
            metals_bulge_mass: 0.0,
            metals_hot_gas: 0.0,
            metals_ejected_mass: 0.0,
            metals_ics: 0.0,
            sfr: SfrHistory::new(steps),
            disk_scale_radius: 0.0,
            merg_time: MERGE_CLOCK_UNSET,
            cooling: 0.0,
            heating: 0.0,
            quasar_bh_accretion: 0.0,
            time_of_last_major_merger: -1.0,
            time_of_last_minor_merger: -1.0,
            outflow_rate: 0.0,
            total_satellite_baryons: 0.0,
            infall_mvir: -1.0,
            infall_vvir: -1.0,
            infall_vmax: -1.0,
        }
    }

    /// Whether this satellite still lacks a valid merging-time estimate.
    pub fn merge_clock_unset(&self) -> bool {
        self.merg_time > 999.0
    }
}
