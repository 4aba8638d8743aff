//! Run configuration.
//!
//! The engine never parses parameter files itself; the binary deserializes
//! this struct from JSON and passes it down.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    pub files: FileParams,
    pub cosmology: Cosmology,
    pub recipes: RecipeParams,
    /// Snapshot numbers to write catalogues for.
    pub output_snapshots: Vec<i32>,
    /// Sub-steps per snapshot interval.
    #[serde(default = "default_steps")]
    pub steps: usize,
}

fn default_steps() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileParams {
    pub simulation_dir: PathBuf,
    /// Tree file base name; files are `<tree_name>.<n><tree_extension>`.
    pub tree_name: String,
    #[serde(default)]
    pub tree_extension: String,
    pub output_dir: PathBuf,
    /// Catalogue base name; files are `<galaxy_basename>_z<z>_<n>`.
    pub galaxy_basename: String,
    pub first_file: i32,
    pub last_file: i32,
    /// File listing the expansion factor of every simulation snapshot.
    pub snap_list: PathBuf,
    pub last_snapshot: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cosmology {
    pub omega: f64,
    pub omega_lambda: f64,
    pub hubble_h: f64,
    /// Simulation particle mass in internal mass units.
    pub particle_mass: f64,
    pub baryon_frac: f64,
    pub box_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgnMode {
    Off,
    /// Empirical radio-mode accretion scaling.
    Empirical,
    BondiHoyle,
    ColdCloud,
}

impl AgnMode {
    pub fn is_on(self) -> bool {
        self != AgnMode::Off
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Reionization {
    /// Redshift at which reionization is half complete.
    pub z0: f64,
    /// Redshift at which reionization ends.
    pub zr: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeParams {
    pub sfr_efficiency: f64,
    pub recycle_fraction: f64,
    pub metal_yield: f64,
    pub frac_z_leave_disk: f64,
    pub feedback_reheating_epsilon: f64,
    pub feedback_ejection_efficiency: f64,
    /// Scales the critical velocity for reincorporation; zero disables it.
    pub reincorporation_factor: f64,
    /// Halo-to-baryonic mass ratio below which satellites disrupt or merge.
    pub threshold_sat_disruption: f64,
    /// Stellar+cold mass ratio above which a merger counts as major.
    pub major_merger_threshold: f64,
    pub black_hole_growth_rate: f64,
    pub quasar_mode_efficiency: f64,
    pub radio_mode_efficiency: f64,
    /// Supernova energy in erg.
    pub energy_sn: f64,
    /// Supernovae per solar mass of stars formed.
    pub eta_sn: f64,
    pub supernova_feedback: bool,
    pub disk_instability: bool,
    pub agn: AgnMode,
    /// Gnedin-style filtering-mass suppression; `None` disables it.
    pub reionization: Option<Reionization>,
}
