//! Bottom-up galaxy construction over one forest.
//!
//! Depth-first recursion along progenitor links, synchronized per FOF
//! group: a group is joined and evolved only after the progenitors of
//! every one of its members have been constructed. The recursion depth is
//! bounded by the forest's snapshot depth.

use accreta_types::{GroupPhase, HaloAux, RecipeParams};
use tracing::trace;

use crate::error::{Error, Result};
use crate::memory::MemoryLedger;
use crate::recipes::{Recipes, SimContext};
use crate::store::GalaxyStore;

pub struct ForestWalker<'a, R: Recipes> {
    pub(crate) sim: SimContext<'a>,
    pub(crate) params: &'a RecipeParams,
    pub(crate) steps: usize,
    pub(crate) aux: &'a mut [HaloAux],
    pub(crate) store: &'a mut GalaxyStore,
    pub(crate) ledger: &'a mut MemoryLedger,
    pub(crate) recipes: &'a R,
    pub(crate) galaxy_counter: u64,
}

impl<'a, R: Recipes> ForestWalker<'a, R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sim: SimContext<'a>,
        params: &'a RecipeParams,
        steps: usize,
        aux: &'a mut [HaloAux],
        store: &'a mut GalaxyStore,
        ledger: &'a mut MemoryLedger,
        recipes: &'a R,
    ) -> Self {
        assert_eq!(sim.halos.len(), aux.len(), "aux array must mirror the halo array");
        ForestWalker {
            sim,
            params,
            steps,
            aux,
            store,
            ledger,
            recipes,
            galaxy_counter: 0,
        }
    }

    /// Identities handed out to galaxies seeded so far.
    pub fn galaxies_created(&self) -> u64 {
        self.galaxy_counter
    }

    /// Construct the whole forest: the main tree from halo 0 first, then
    /// any sub-trees the recursion could not reach (tree files pack
    /// multiple root-level structures together).
    pub fn run(&mut self) -> Result<()> {
        self.check_snapshots()?;
        if self.sim.halos.is_empty() {
            return Ok(());
        }
        self.construct(0)?;
        for halonr in 0..self.sim.halos.len() {
            if !self.aux[halonr].done {
                self.construct(halonr)?;
            }
        }
        Ok(())
    }

    /// Every snapshot referenced by the forest must exist in the table
    /// before ages or redshifts are looked up.
    fn check_snapshots(&self) -> Result<()> {
        let nsnaps = self.sim.snapshots.len();
        for (halonr, halo) in self.sim.halos.iter().enumerate() {
            if halo.snap_num < 0 || halo.snap_num as usize >= nsnaps {
                return Err(Error::SnapshotOutOfRange {
                    halo: halonr,
                    snap: halo.snap_num,
                    nsnaps,
                });
            }
        }
        Ok(())
    }

    fn construct(&mut self, halonr: usize) -> Result<()> {
        if self.aux[halonr].done {
            return Ok(());
        }
        self.aux[halonr].done = true;
        self.construct_progenitors(halonr)?;

        let root = self.sim.halos[halonr]
            .first_in_fof_group
            .index()
            .expect("validated by canonicalize_forest");

        // First member to arrive opens the group: construct the progenitors
        // of every sibling before anyone in the group is evolved.
        if self.aux[root].group_phase == GroupPhase::Unvisited {
            self.aux[root].group_phase = GroupPhase::ProgenitorsPending;
            let mut member = Some(root);
            while let Some(m) = member {
                self.construct_progenitors(m)?;
                member = self.sim.halos[m].next_in_fof_group.index();
            }
        }

        // The whole group's history now exists: join and evolve it, exactly
        // once.
        if self.aux[root].group_phase == GroupPhase::ProgenitorsPending {
            self.aux[root].group_phase = GroupPhase::Evolved;
            trace!(root, "evolving FOF group");
            self.store.clear_working();
            let mut ngal = 0;
            let mut member = Some(root);
            while let Some(m) = member {
                ngal = self.join_progenitor_galaxies(m, ngal)?;
                member = self.sim.halos[m].next_in_fof_group.index();
            }
            self.evolve_group(root, ngal)?;
        }

        Ok(())
    }

    pub(crate) fn construct_progenitors(&mut self, halonr: usize) -> Result<()> {
        let mut prog = self.sim.halos[halonr].first_progenitor.index();
        while let Some(p) = prog {
            if !self.aux[p].done {
                self.construct(p)?;
            }
            prog = self.sim.halos[p].next_progenitor.index();
        }
        Ok(())
    }
}
