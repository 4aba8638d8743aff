//! Per-file and per-forest orchestration.

use std::fs::File;
use std::path::{Path, PathBuf};

use accreta_engine::{ForestWalker, GalaxyStore, MemoryLedger, SimContext, canonicalize_forest};
use accreta_io::{CatalogWriter, ForestTable, read_snap_list};
use accreta_physics::StandardModel;
use accreta_types::{HaloAux, Parameters, SnapshotTable, UnitSystem};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("parameter file {path}: {reason}")]
    Params { path: PathBuf, reason: String },

    #[error("creating output dir {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] accreta_io::Error),

    #[error(transparent)]
    Engine(#[from] accreta_engine::Error),
}

/// Everything shared by the per-file workers. Read-only after load, so
/// files can fan out without coordination.
pub struct FileContext {
    pub params: Parameters,
    pub units: UnitSystem,
    pub snapshots: SnapshotTable,
    pub model: StandardModel,
}

impl FileContext {
    pub fn load(param_path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(param_path).map_err(|e| PipelineError::Params {
            path: param_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let params: Parameters =
            serde_json::from_reader(file).map_err(|e| PipelineError::Params {
                path: param_path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if params.steps == 0 {
            return Err(PipelineError::Params {
                path: param_path.to_path_buf(),
                reason: "steps must be positive".into(),
            });
        }

        let units = UnitSystem::standard(&params.cosmology, &params.recipes);
        let factors = read_snap_list(&params.files.snap_list)?;
        let snapshots =
            SnapshotTable::from_expansion_factors(factors, &params.cosmology, &units);

        for &snap in &params.output_snapshots {
            if snap < 0 || snap as usize >= snapshots.len() {
                return Err(PipelineError::Params {
                    path: param_path.to_path_buf(),
                    reason: format!("output snapshot {snap} outside the snapshot list"),
                });
            }
        }

        std::fs::create_dir_all(&params.files.output_dir).map_err(|e| {
            PipelineError::OutputDir {
                path: params.files.output_dir.clone(),
                source: e,
            }
        })?;

        let model = StandardModel::new(params.recipes.clone(), params.steps);
        Ok(FileContext {
            params,
            units,
            snapshots,
            model,
        })
    }

    fn tree_path(&self, file_nr: i32) -> PathBuf {
        let f = &self.params.files;
        f.simulation_dir
            .join(format!("{}.{}{}", f.tree_name, file_nr, f.tree_extension))
    }
}

/// Run the whole model over one tree file.
pub fn process_file(ctx: &FileContext, file_nr: i32) -> Result<(), PipelineError> {
    let tree_path = ctx.tree_path(file_nr);
    if !tree_path.exists() {
        info!(file = file_nr, path = %tree_path.display(), "missing tree file, skipping");
        return Ok(());
    }

    // idempotent re-runs: never overwrite an existing catalogue
    let first_output = CatalogWriter::catalog_path(
        &ctx.params.files,
        &ctx.snapshots,
        ctx.params.output_snapshots[0],
        file_nr,
    );
    if first_output.exists() {
        info!(file = file_nr, path = %first_output.display(), "output exists, skipping");
        return Ok(());
    }

    let mut table = ForestTable::open(&tree_path)?;
    let nforests = table.nforests();
    let mut writer = CatalogWriter::create(
        &ctx.params.files,
        &ctx.params.output_snapshots,
        &ctx.snapshots,
        nforests,
        file_nr,
    )?;

    let mut total_galaxies = 0usize;
    for forest in 0..nforests {
        total_galaxies += process_forest(ctx, &mut table, &mut writer, forest)?;
    }

    writer.finalize()?;
    info!(file = file_nr, forests = nforests, galaxies = total_galaxies, "file done");
    Ok(())
}

/// Load, canonicalize and walk one forest, then hand its galaxies to the
/// writer. Returns the number of finalized galaxy records.
fn process_forest(
    ctx: &FileContext,
    table: &mut ForestTable,
    writer: &mut CatalogWriter,
    forest: usize,
) -> Result<usize, PipelineError> {
    let mut halos = table.load_forest(forest)?;
    let orig_index = canonicalize_forest(&mut halos)?;

    let mut ledger = MemoryLedger::new();
    let halo_block =
        ledger.register((halos.len() * std::mem::size_of::<accreta_types::HaloRecord>()) as u64)?;

    let mut aux: Vec<HaloAux> = orig_index
        .iter()
        .map(|&orig| HaloAux {
            orig_index: orig,
            ..HaloAux::default()
        })
        .collect();
    let aux_block =
        ledger.register((aux.len() * std::mem::size_of::<HaloAux>()) as u64)?;

    let mut store = GalaxyStore::new(halos.len(), &mut ledger)?;
    let sim = SimContext::new(&halos, &ctx.params.cosmology, &ctx.units, &ctx.snapshots);
    let mut walker = ForestWalker::new(
        sim,
        &ctx.params.recipes,
        ctx.params.steps,
        &mut aux,
        &mut store,
        &mut ledger,
        &ctx.model,
    );
    walker.run()?;

    let finalized = store.finalized().len();
    writer.write_forest(
        forest,
        &halos,
        &aux,
        store.finalized(),
        &ctx.params.cosmology,
        &ctx.units,
        &ctx.snapshots,
    )?;

    debug!(
        forest,
        halos = halos.len(),
        galaxies = finalized,
        peak_bytes = ledger.high_mark(),
        "forest done"
    );

    store.release(&mut ledger)?;
    ledger.release(aux_block)?;
    ledger.release(halo_block)?;
    Ok(finalized)
}
