//! Tracked memory accounting.
//!
//! Every growable structure of a forest context registers its backing
//! allocation here by handle. The ledger keeps a bounded block table, the
//! running total and the high-water mark; handles replace raw addresses
//! because the backing stores reallocate as they grow.

use tracing::info;

use crate::error::{Error, Result};

/// Maximum number of simultaneously tracked blocks.
pub const MAX_TRACKED_BLOCKS: usize = 2048;

/// Report a new high-water mark only every this many bytes.
const HIGH_MARK_REPORT_STEP: u64 = 10 * 1024 * 1024;

/// Handle of a tracked allocation. Stable for the lifetime of the block
/// even when the underlying storage moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u64);

#[derive(Debug)]
pub struct MemoryLedger {
    /// Live blocks as (handle, charged bytes) pairs.
    blocks: Vec<(BlockId, u64)>,
    next_id: u64,
    total: u64,
    high_mark: u64,
    reported_high_mark: u64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger {
            blocks: Vec::with_capacity(64),
            next_id: 0,
            total: 0,
            high_mark: 0,
            reported_high_mark: 0,
        }
    }

    /// Bytes actually charged: rounded up to an 8-byte boundary, zero-size
    /// requests count as 8.
    fn charge(bytes: u64) -> u64 {
        bytes.div_ceil(8).max(1) * 8
    }

    /// Track a new block of `bytes` bytes.
    pub fn register(&mut self, bytes: u64) -> Result<BlockId> {
        if self.blocks.len() >= MAX_TRACKED_BLOCKS {
            return Err(Error::LedgerFull {
                capacity: MAX_TRACKED_BLOCKS,
            });
        }
        let id = BlockId(self.next_id);
        self.next_id += 1;
        let charged = Self::charge(bytes);
        self.blocks.push((id, charged));
        self.total += charged;
        self.bump_high_mark();
        Ok(id)
    }

    /// Re-charge an existing block at a new size. The handle stays valid.
    pub fn resize(&mut self, id: BlockId, bytes: u64) -> Result<()> {
        let slot = self.lookup(id)?;
        let charged = Self::charge(bytes);
        self.total -= self.blocks[slot].1;
        self.total += charged;
        self.blocks[slot].1 = charged;
        self.bump_high_mark();
        Ok(())
    }

    /// Stop tracking a block, returning the bytes it was charged. The
    /// vacated table slot is filled by the last entry.
    pub fn release(&mut self, id: BlockId) -> Result<u64> {
        let slot = self.lookup(id)?;
        let (_, charged) = self.blocks.swap_remove(slot);
        self.total -= charged;
        Ok(charged)
    }

    /// Reverse scan: frees and resizes overwhelmingly hit recent blocks.
    fn lookup(&self, id: BlockId) -> Result<usize> {
        self.blocks
            .iter()
            .rposition(|&(bid, _)| bid == id)
            .ok_or(Error::UnknownBlock(id))
    }

    pub fn live_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn high_mark(&self) -> u64 {
        self.high_mark
    }

    fn bump_high_mark(&mut self) {
        if self.total > self.high_mark {
            self.high_mark = self.total;
            if self.high_mark > self.reported_high_mark + HIGH_MARK_REPORT_STEP {
                info!(
                    mb = self.high_mark as f64 / (1024.0 * 1024.0),
                    "new memory high-water mark"
                );
                self.reported_high_mark = self.high_mark;
            }
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        MemoryLedger::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_release_restores_live_count() {
        let mut ledger = MemoryLedger::new();
        let before = ledger.live_blocks();
        let id = ledger.register(100).unwrap();
        assert_eq!(ledger.live_blocks(), before + 1);
        ledger.release(id).unwrap();
        assert_eq!(ledger.live_blocks(), before);
        assert_eq!(ledger.total(), 0);
    }

    #[test]
    fn test_charge_rounds_to_eight_bytes() {
        let mut ledger = MemoryLedger::new();
        ledger.register(0).unwrap();
        assert_eq!(ledger.total(), 8);
        ledger.register(9).unwrap();
        assert_eq!(ledger.total(), 8 + 16);
    }

    #[test]
    fn test_resize_preserves_identity() {
        let mut ledger = MemoryLedger::new();
        let a = ledger.register(64).unwrap();
        let b = ledger.register(64).unwrap();
        ledger.resize(a, 1024).unwrap();
        assert_eq!(ledger.total(), 1024 + 64);
        // releasing out of registration order compacts the table
        ledger.release(a).unwrap();
        assert_eq!(ledger.total(), 64);
        ledger.release(b).unwrap();
        assert_eq!(ledger.live_blocks(), 0);
    }

    #[test]
    fn test_unknown_block_is_fatal() {
        let mut ledger = MemoryLedger::new();
        let id = ledger.register(8).unwrap();
        ledger.release(id).unwrap();
        assert!(matches!(
            ledger.release(id),
            Err(Error::UnknownBlock(_))
        ));
        assert!(matches!(
            ledger.resize(id, 16),
            Err(Error::UnknownBlock(_))
        ));
    }

    #[test]
    fn test_table_exhaustion() {
        let mut ledger = MemoryLedger::new();
        for _ in 0..MAX_TRACKED_BLOCKS {
            ledger.register(8).unwrap();
        }
        assert!(matches!(
            ledger.register(8),
            Err(Error::LedgerFull { .. })
        ));
    }

    #[test]
    fn test_high_mark_survives_release() {
        let mut ledger = MemoryLedger::new();
        let id = ledger.register(1 << 20).unwrap();
        ledger.release(id).unwrap();
        assert_eq!(ledger.total(), 0);
        assert_eq!(ledger.high_mark(), 1 << 20);
    }
}
