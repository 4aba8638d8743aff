//! Galaxy stores.
//!
//! Two growable collections per forest: the working array is scratch for
//! the FOF group currently being joined and evolved, the finalized array
//! accumulates galaxies as they complete a snapshot. Both may reallocate on
//! growth, so cross-references into them are integer indices, never
//! addresses.

use accreta_types::GalaxyRecord;

use crate::error::{Error, Result};
use crate::memory::{BlockId, MemoryLedger};

/// Capacity added whenever an insertion would overflow a store.
pub const GROWTH_CHUNK: usize = 10_000;

/// Initial capacity per halo of the forest.
const GALAXIES_PER_HALO: usize = 2;

fn record_bytes(capacity: usize) -> u64 {
    (capacity * std::mem::size_of::<GalaxyRecord>()) as u64
}

#[derive(Debug)]
pub struct GalaxyStore {
    working: Vec<GalaxyRecord>,
    finalized: Vec<GalaxyRecord>,
    working_block: BlockId,
    finalized_block: BlockId,
}

impl GalaxyStore {
    pub fn initial_capacity(nhalos: usize) -> usize {
        (GALAXIES_PER_HALO * nhalos).max(GROWTH_CHUNK)
    }

    pub fn new(nhalos: usize, ledger: &mut MemoryLedger) -> Result<Self> {
        let capacity = Self::initial_capacity(nhalos);
        let working = reserve_new(capacity)?;
        let finalized = reserve_new(capacity)?;
        let working_block = ledger.register(record_bytes(working.capacity()))?;
        let finalized_block = ledger.register(record_bytes(finalized.capacity()))?;
        Ok(GalaxyStore {
            working,
            finalized,
            working_block,
            finalized_block,
        })
    }

    pub fn working(&self) -> &[GalaxyRecord] {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut [GalaxyRecord] {
        &mut self.working
    }

    pub fn finalized(&self) -> &[GalaxyRecord] {
        &self.finalized
    }

    pub fn finalized_mut(&mut self) -> &mut [GalaxyRecord] {
        &mut self.finalized
    }

    /// Drop the previous group's scratch; capacity is retained.
    pub fn clear_working(&mut self) {
        self.working.clear();
    }

    /// Append to the working array, growing it by a chunk if full.
    /// Returns the new galaxy's index.
    pub fn push_working(
        &mut self,
        galaxy: GalaxyRecord,
        ledger: &mut MemoryLedger,
    ) -> Result<usize> {
        grow_if_full(&mut self.working, self.working_block, ledger)?;
        self.working.push(galaxy);
        Ok(self.working.len() - 1)
    }

    /// Append to the finalized array, growing it by a chunk if full.
    /// Returns the appended record's index.
    pub fn push_finalized(
        &mut self,
        galaxy: GalaxyRecord,
        ledger: &mut MemoryLedger,
    ) -> Result<usize> {
        grow_if_full(&mut self.finalized, self.finalized_block, ledger)?;
        self.finalized.push(galaxy);
        Ok(self.finalized.len() - 1)
    }

    /// Release the ledger blocks at forest end.
    pub fn release(self, ledger: &mut MemoryLedger) -> Result<()> {
        ledger.release(self.working_block)?;
        ledger.release(self.finalized_block)?;
        Ok(())
    }
}

fn reserve_new(capacity: usize) -> Result<Vec<GalaxyRecord>> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity).map_err(|_| Error::AllocationFailed {
        bytes: record_bytes(capacity) as usize,
    })?;
    Ok(v)
}

fn grow_if_full(
    v: &mut Vec<GalaxyRecord>,
    block: BlockId,
    ledger: &mut MemoryLedger,
) -> Result<()> {
    if v.len() == v.capacity() {
        v.try_reserve_exact(GROWTH_CHUNK).map_err(|_| Error::AllocationFailed {
            bytes: record_bytes(GROWTH_CHUNK) as usize,
        })?;
        ledger.resize(block, record_bytes(v.capacity()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_capacity_floor() {
        assert_eq!(GalaxyStore::initial_capacity(3), GROWTH_CHUNK);
        assert_eq!(GalaxyStore::initial_capacity(50_000), 100_000);
    }

    #[test]
    fn test_push_past_capacity_grows_by_chunk() {
        let mut ledger = MemoryLedger::new();
        let mut store = GalaxyStore::new(1, &mut ledger).unwrap();
        let before = ledger.total();
        for _ in 0..(GROWTH_CHUNK + 1) {
            store.push_working(GalaxyRecord::new(2), &mut ledger).unwrap();
        }
        assert_eq!(store.working().len(), GROWTH_CHUNK + 1);
        assert!(store.working.capacity() >= GROWTH_CHUNK + 1);
        assert!(ledger.total() > before);
    }

    #[test]
    fn test_indices_stay_valid_across_growth() {
        let mut ledger = MemoryLedger::new();
        let mut store = GalaxyStore::new(1, &mut ledger).unwrap();
        let mut g = GalaxyRecord::new(2);
        g.galaxy_nr = 42;
        let idx = store.push_working(g, &mut ledger).unwrap();
        for _ in 0..(2 * GROWTH_CHUNK) {
            store.push_working(GalaxyRecord::new(2), &mut ledger).unwrap();
        }
        assert_eq!(store.working()[idx].galaxy_nr, 42);
    }

    #[test]
    fn test_absurd_allocation_fails_cleanly() {
        let mut ledger = MemoryLedger::new();
        // a petabyte-scale request must surface as an error, not a crash
        // or a garbage allocation
        let nhalos = 1usize << 50;
        assert!(matches!(
            GalaxyStore::new(nhalos, &mut ledger),
            Err(Error::AllocationFailed { .. })
        ));
        assert_eq!(ledger.live_blocks(), 0);
    }

    #[test]
    fn test_release_returns_both_blocks() {
        let mut ledger = MemoryLedger::new();
        let store = GalaxyStore::new(1, &mut ledger).unwrap();
        assert_eq!(ledger.live_blocks(), 2);
        store.release(&mut ledger).unwrap();
        assert_eq!(ledger.live_blocks(), 0);
    }
}
