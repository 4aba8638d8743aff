//! Galaxy catalogue writing.
//!
//! One file per output snapshot. Each file carries a header of
//! `2 + nforests` i32 slots (forest count, total galaxies, galaxies per
//! forest) reserved at creation and filled in at finalize, followed by
//! packed galaxy records appended forest by forest.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use accreta_types::units::SEC_PER_MEGAYEAR;
use accreta_types::{
    Cosmology, FileParams, GalaxyRecord, HaloAux, HaloRecord, SnapshotTable, UnitSystem, props,
};
use bincode::Encode;
use tracing::debug;

use crate::error::{Error, Result};

fn config() -> impl bincode::config::Config {
    bincode::config::legacy()
}

/// On-disk galaxy record.
#[derive(Debug, Clone, Encode)]
pub struct GalaxyOutput {
    pub snap_num: i32,
    pub galaxy_type: i32,
    /// Process-wide unique identity composed from the per-forest number,
    /// the forest and the file.
    pub galaxy_index: i64,
    pub central_gal: i32,
    pub halo_index: i32,
    pub fof_halo_index: i32,
    pub forest_index: i32,
    /// Position of the owning halo in the original file order.
    pub orig_halo_index: i32,

    pub merge_type: i32,
    pub merge_into_id: i32,
    pub merge_into_snap_num: i32,
    pub dt_myr: f32,

    pub pos: [f32; 3],
    pub vel: [f32; 3],
    pub spin: [f32; 3],
    pub len: i32,
    pub mvir: f32,
    pub central_mvir: f32,
    pub rvir: f32,
    pub vvir: f32,
    pub vmax: f32,
    pub vel_disp: f32,

    pub cold_gas: f32,
    pub stellar_mass: f32,
    pub bulge_mass: f32,
    pub hot_gas: f32,
    pub ejected_mass: f32,
    pub black_hole_mass: f32,
    pub ics: f32,

    pub metals_cold_gas: f32,
    pub metals_stellar_mass: f32,
    pub metals_bulge_mass: f32,
    pub metals_hot_gas: f32,
    pub metals_ejected_mass: f32,
    pub metals_ics: f32,

    /// Msun/yr, averaged over the sub-steps.
    pub sfr_disk: f32,
    pub sfr_bulge: f32,
    pub sfr_disk_z: f32,
    pub sfr_bulge_z: f32,

    pub disk_scale_radius: f32,
    /// log10 erg/s, zero when nothing cooled.
    pub cooling: f32,
    pub heating: f32,
    pub quasar_bh_accretion: f32,
    pub time_of_last_major_merger_myr: f32,
    pub time_of_last_minor_merger_myr: f32,
    pub outflow_rate: f32,

    pub infall_mvir: f32,
    pub infall_vvir: f32,
    pub infall_vmax: f32,
}

struct SnapFile {
    snap: i32,
    path: PathBuf,
    writer: BufWriter<File>,
    tot_galaxies: i32,
    forest_counts: Vec<i32>,
}

/// Writes the catalogues of one tree file.
pub struct CatalogWriter {
    files: Vec<SnapFile>,
    nforests: usize,
    file_nr: i32,
}

impl CatalogWriter {
    /// Catalogue path for one output snapshot.
    pub fn catalog_path(
        files: &FileParams,
        snapshots: &SnapshotTable,
        snap: i32,
        file_nr: i32,
    ) -> PathBuf {
        files.output_dir.join(format!(
            "{}_z{:.3}_{}",
            files.galaxy_basename,
            snapshots.redshift(snap),
            file_nr
        ))
    }

    /// Create all per-snapshot files with zeroed header slots.
    pub fn create(
        files: &FileParams,
        output_snapshots: &[i32],
        snapshots: &SnapshotTable,
        nforests: usize,
        file_nr: i32,
    ) -> Result<Self> {
        let mut snap_files = Vec::with_capacity(output_snapshots.len());
        for &snap in output_snapshots {
            let path = Self::catalog_path(files, snapshots, snap, file_nr);
            let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
            let mut writer = BufWriter::new(file);
            for _ in 0..2 + nforests {
                bincode::encode_into_std_write(0i32, &mut writer, config())?;
            }
            snap_files.push(SnapFile {
                snap,
                path,
                writer,
                tot_galaxies: 0,
                forest_counts: vec![0; nforests],
            });
        }
        Ok(CatalogWriter {
            files: snap_files,
            nforests,
            file_nr,
        })
    }

    /// Append one forest's finalized galaxies to every output snapshot they
    /// are alive at. Merge references are remapped from finalized-store
    /// indices to per-snapshot output order before writing.
    #[allow(clippy::too_many_arguments)]
    pub fn write_forest(
        &mut self,
        forest: usize,
        halos: &[HaloRecord],
        aux: &[HaloAux],
        finalized: &[GalaxyRecord],
        cosmo: &Cosmology,
        units: &UnitSystem,
        snapshots: &SnapshotTable,
    ) -> Result<()> {
        let order = output_order(finalized, &self.files);

        for snap_file in &mut self.files {
            for g in finalized {
                if g.snap_num != snap_file.snap {
                    continue;
                }
                let merge_into_id = if g.merge.into_id >= 0 {
                    order[g.merge.into_id as usize]
                } else {
                    -1
                };
                let record = prepare_output(
                    g,
                    merge_into_id,
                    forest,
                    self.file_nr,
                    halos,
                    aux,
                    cosmo,
                    units,
                    snapshots,
                );
                bincode::encode_into_std_write(record, &mut snap_file.writer, config())?;
                snap_file.tot_galaxies += 1;
                snap_file.forest_counts[forest] += 1;
            }
        }
        debug!(forest, galaxies = finalized.len(), "forest written");
        Ok(())
    }

    /// Fill the header slots and flush everything.
    pub fn finalize(self) -> Result<()> {
        let nforests = self.nforests as i32;
        for snap_file in self.files {
            let SnapFile {
                path,
                writer,
                tot_galaxies,
                forest_counts,
                ..
            } = snap_file;
            let mut file = writer
                .into_inner()
                .map_err(|e| Error::io(&path, e.into_error()))?;
            file.seek(SeekFrom::Start(0)).map_err(|e| Error::io(&path, e))?;
            let mut writer = BufWriter::new(&mut file);
            bincode::encode_into_std_write(nforests, &mut writer, config())?;
            bincode::encode_into_std_write(tot_galaxies, &mut writer, config())?;
            for count in forest_counts {
                bincode::encode_into_std_write(count, &mut writer, config())?;
            }
            writer.flush().map_err(|e| Error::io(&path, e))?;
        }
        Ok(())
    }
}

/// For every finalized record, its position within its snapshot's output
/// (or -1 if that snapshot is not written).
fn output_order(finalized: &[GalaxyRecord], files: &[SnapFile]) -> Vec<i32> {
    let mut order = vec![-1i32; finalized.len()];
    for snap_file in files {
        let mut count = 0;
        for (i, g) in finalized.iter().enumerate() {
            if g.snap_num == snap_file.snap {
                order[i] = count;
                count += 1;
            }
        }
    }
    order
}

#[allow(clippy::too_many_arguments)]
fn prepare_output(
    g: &GalaxyRecord,
    merge_into_id: i32,
    forest: usize,
    file_nr: i32,
    halos: &[HaloRecord],
    aux: &[HaloAux],
    cosmo: &Cosmology,
    units: &UnitSystem,
    snapshots: &SnapshotTable,
) -> GalaxyOutput {
    let halo = &halos[g.halo_nr];
    let fof_root = halo
        .first_in_fof_group
        .index()
        .expect("finalized galaxies live in validated forests");

    let steps = g.sfr.steps() as f64;
    let rate = units.mass_rate_to_solar_per_year();
    let mut sfr_disk = 0.0;
    let mut sfr_bulge = 0.0;
    let mut sfr_disk_z = 0.0;
    let mut sfr_bulge_z = 0.0;
    for step in 0..g.sfr.steps() {
        sfr_disk += g.sfr.disk[step] * rate / steps;
        sfr_bulge += g.sfr.bulge[step] * rate / steps;
        if g.sfr.disk_cold_gas[step] > 0.0 {
            sfr_disk_z += g.sfr.disk_cold_gas_metals[step] / g.sfr.disk_cold_gas[step] / steps;
        }
        if g.sfr.bulge_cold_gas[step] > 0.0 {
            sfr_bulge_z +=
                g.sfr.bulge_cold_gas_metals[step] / g.sfr.bulge_cold_gas[step] / steps;
        }
    }

    let log_rate = |v: f64| {
        if v > 0.0 {
            (v * units.energy_cgs / units.time_s).log10() as f32
        } else {
            0.0
        }
    };

    GalaxyOutput {
        snap_num: g.snap_num,
        galaxy_type: g.galaxy_type.as_output_code(),
        galaxy_index: g.galaxy_nr as i64
            + 1_000_000 * forest as i64
            + 1_000_000_000_000 * i64::from(file_nr),
        central_gal: g.central_gal.map_or(-1, |c| c as i32),
        halo_index: g.halo_nr as i32,
        fof_halo_index: fof_root as i32,
        forest_index: forest as i32,
        orig_halo_index: aux[g.halo_nr].orig_index as i32,

        merge_type: g.merge.kind.as_output_code(),
        merge_into_id,
        merge_into_snap_num: g.merge.into_snap_num,
        dt_myr: g
            .dt
            .map_or(-1.0, |dt| (dt * units.time_s / SEC_PER_MEGAYEAR) as f32),

        pos: g.pos,
        vel: g.vel,
        spin: halo.spin,
        len: g.len,
        mvir: g.mvir as f32,
        central_mvir: props::virial_mass(halos, fof_root, cosmo) as f32,
        // the actual values at this snapshot, not the running maxima
        rvir: props::virial_radius(halos, g.halo_nr, cosmo, units, snapshots) as f32,
        vvir: props::virial_velocity(halos, g.halo_nr, cosmo, units, snapshots) as f32,
        vmax: g.vmax as f32,
        vel_disp: halo.vel_disp,

        cold_gas: g.cold_gas as f32,
        stellar_mass: g.stellar_mass as f32,
        bulge_mass: g.bulge_mass as f32,
        hot_gas: g.hot_gas as f32,
        ejected_mass: g.ejected_mass as f32,
        black_hole_mass: g.black_hole_mass as f32,
        ics: g.ics as f32,

        metals_cold_gas: g.metals_cold_gas as f32,
        metals_stellar_mass: g.metals_stellar_mass as f32,
        metals_bulge_mass: g.metals_bulge_mass as f32,
        metals_hot_gas: g.metals_hot_gas as f32,
        metals_ejected_mass: g.metals_ejected_mass as f32,
        metals_ics: g.metals_ics as f32,

        sfr_disk: sfr_disk as f32,
        sfr_bulge: sfr_bulge as f32,
        sfr_disk_z: sfr_disk_z as f32,
        sfr_bulge_z: sfr_bulge_z as f32,

        disk_scale_radius: g.disk_scale_radius as f32,
        cooling: log_rate(g.cooling),
        heating: log_rate(g.heating),
        quasar_bh_accretion: g.quasar_bh_accretion as f32,
        time_of_last_major_merger_myr: (g.time_of_last_major_merger * units.time_megayears)
            as f32,
        time_of_last_minor_merger_myr: (g.time_of_last_minor_merger * units.time_megayears)
            as f32,
        outflow_rate: g.outflow_rate as f32,

        infall_mvir: if g.galaxy_type.as_output_code() != 0 {
            g.infall_mvir as f32
        } else {
            0.0
        },
        infall_vvir: if g.galaxy_type.as_output_code() != 0 {
            g.infall_vvir as f32
        } else {
            0.0
        },
        infall_vmax: if g.galaxy_type.as_output_code() != 0 {
            g.infall_vmax as f32
        } else {
            0.0
        },
    }
}
