//! Tree-file reading.
//!
//! A tree file packs one or more forests: a header of `i32` counts
//! (`nforests`, `totnhalos`, then halos per forest) followed by packed
//! little-endian halo records in forest order. Forests are loaded
//! individually via precomputed byte offsets.

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use accreta_types::{HaloLink, HaloRecord};
use bincode::{Decode, Encode};
use tracing::debug;

use crate::error::{Error, Result};

/// On-disk halo record: field order and widths match the packed layout.
#[derive(Debug, Clone, Encode, Decode)]
struct RawHalo {
    descendant: i32,
    first_progenitor: i32,
    next_progenitor: i32,
    first_in_fof_group: i32,
    next_in_fof_group: i32,
    len: i32,
    m_mean200: f32,
    mvir: f32,
    m_tophat: f32,
    pos: [f32; 3],
    vel: [f32; 3],
    vel_disp: f32,
    vmax: f32,
    spin: [f32; 3],
    most_bound_id: i64,
    snap_num: i32,
    file_nr: i32,
    subhalo_index: i32,
    sub_half_mass: f32,
}

const RAW_HALO_BYTES: u64 = 104;

fn config() -> impl bincode::config::Config {
    bincode::config::legacy()
}

impl From<RawHalo> for HaloRecord {
    fn from(raw: RawHalo) -> Self {
        HaloRecord {
            descendant: HaloLink::from_raw(raw.descendant),
            first_progenitor: HaloLink::from_raw(raw.first_progenitor),
            next_progenitor: HaloLink::from_raw(raw.next_progenitor),
            first_in_fof_group: HaloLink::from_raw(raw.first_in_fof_group),
            next_in_fof_group: HaloLink::from_raw(raw.next_in_fof_group),
            len: raw.len,
            m_mean200: raw.m_mean200,
            mvir: raw.mvir,
            m_tophat: raw.m_tophat,
            pos: raw.pos,
            vel: raw.vel,
            vel_disp: raw.vel_disp,
            vmax: raw.vmax,
            spin: raw.spin,
            most_bound_id: raw.most_bound_id,
            snap_num: raw.snap_num,
            file_nr: raw.file_nr,
            subhalo_index: raw.subhalo_index,
            sub_half_mass: raw.sub_half_mass,
        }
    }
}

impl From<&HaloRecord> for RawHalo {
    fn from(h: &HaloRecord) -> Self {
        RawHalo {
            descendant: h.descendant.raw(),
            first_progenitor: h.first_progenitor.raw(),
            next_progenitor: h.next_progenitor.raw(),
            first_in_fof_group: h.first_in_fof_group.raw(),
            next_in_fof_group: h.next_in_fof_group.raw(),
            len: h.len,
            m_mean200: h.m_mean200,
            mvir: h.mvir,
            m_tophat: h.m_tophat,
            pos: h.pos,
            vel: h.vel,
            vel_disp: h.vel_disp,
            vmax: h.vmax,
            spin: h.spin,
            most_bound_id: h.most_bound_id,
            snap_num: h.snap_num,
            file_nr: h.file_nr,
            subhalo_index: h.subhalo_index,
            sub_half_mass: h.sub_half_mass,
        }
    }
}

/// Per-file forest metadata plus a reader positioned for direct access.
pub struct ForestTable {
    path: PathBuf,
    reader: BufReader<File>,
    nhalos_per_forest: Vec<i32>,
    /// Byte offset of each forest's first record.
    offsets: Vec<u64>,
}

impl ForestTable {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = BufReader::new(file);

        let nforests: i32 = bincode::decode_from_std_read(&mut reader, config())?;
        let totnhalos: i32 = bincode::decode_from_std_read(&mut reader, config())?;
        if nforests < 0 || totnhalos < 0 {
            return Err(Error::MalformedTable {
                path: path.to_path_buf(),
                reason: format!("negative counts ({nforests} forests, {totnhalos} halos)"),
            });
        }

        let mut nhalos_per_forest = Vec::with_capacity(nforests as usize);
        for _ in 0..nforests {
            let n: i32 = bincode::decode_from_std_read(&mut reader, config())?;
            if n < 0 {
                return Err(Error::MalformedTable {
                    path: path.to_path_buf(),
                    reason: format!("negative forest size {n}"),
                });
            }
            nhalos_per_forest.push(n);
        }

        let sum: i64 = nhalos_per_forest.iter().map(|&n| i64::from(n)).sum();
        if sum != i64::from(totnhalos) {
            return Err(Error::MalformedTable {
                path: path.to_path_buf(),
                reason: format!("forest sizes sum to {sum}, header claims {totnhalos}"),
            });
        }

        let header_bytes = 8 + 4 * nforests as u64;
        let mut offsets = Vec::with_capacity(nforests as usize);
        let mut offset = header_bytes;
        for &n in &nhalos_per_forest {
            offsets.push(offset);
            offset += n as u64 * RAW_HALO_BYTES;
        }

        debug!(path = %path.display(), nforests, totnhalos, "tree table loaded");
        Ok(ForestTable {
            path: path.to_path_buf(),
            reader,
            nhalos_per_forest,
            offsets,
        })
    }

    pub fn nforests(&self) -> usize {
        self.nhalos_per_forest.len()
    }

    pub fn nhalos(&self, forest: usize) -> usize {
        self.nhalos_per_forest[forest] as usize
    }

    /// Read one forest's halos in file order.
    pub fn load_forest(&mut self, forest: usize) -> Result<Vec<HaloRecord>> {
        let nhalos = self.nhalos(forest);
        self.reader
            .seek(SeekFrom::Start(self.offsets[forest]))
            .map_err(|e| Error::io(&self.path, e))?;

        let mut halos = Vec::with_capacity(nhalos);
        for _ in 0..nhalos {
            let raw: RawHalo = bincode::decode_from_std_read(&mut self.reader, config())?;
            halos.push(HaloRecord::from(raw));
        }
        Ok(halos)
    }
}

/// Write forests to a tree file in the packed layout. Used by fixtures and
/// tests; production tree files come from the structure-finder pipeline.
pub fn write_forest_file(path: &Path, forests: &[Vec<HaloRecord>]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);

    let nforests = forests.len() as i32;
    let totnhalos: i32 = forests.iter().map(|f| f.len() as i32).sum();
    bincode::encode_into_std_write(nforests, &mut writer, config())?;
    bincode::encode_into_std_write(totnhalos, &mut writer, config())?;
    for f in forests {
        bincode::encode_into_std_write(f.len() as i32, &mut writer, config())?;
    }
    for f in forests {
        for h in f {
            bincode::encode_into_std_write(RawHalo::from(h), &mut writer, config())?;
        }
    }
    writer.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}
