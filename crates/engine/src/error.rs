//! Engine errors.
//!
//! Corrupt input and resource exhaustion surface as `Err`; invariant
//! violations inside the traversal are programming errors and panic
//! instead.

use thiserror::Error;

use crate::memory::BlockId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "corrupt forest: halo {halo} field {field} references {value} but the forest has {nhalos} halos"
    )]
    LinkOutOfRange {
        halo: usize,
        field: &'static str,
        value: i32,
        nhalos: usize,
    },

    #[error("corrupt forest: halo {halo} has no FOF group root")]
    MissingFofRoot { halo: usize },

    #[error("corrupt forest: halo {halo} names {root} as FOF root, but that halo is not self-referential")]
    BadFofRoot { halo: usize, root: usize },

    #[error("corrupt forest: halo {halo} at snapshot {snap} outside the {nsnaps}-entry snapshot table")]
    SnapshotOutOfRange { halo: usize, snap: i32, nsnaps: usize },

    #[error("memory ledger full: all {capacity} block slots in use")]
    LedgerFull { capacity: usize },

    #[error("unknown memory block {0:?}")]
    UnknownBlock(BlockId),

    #[error("allocation of {bytes} bytes failed")]
    AllocationFailed { bytes: usize },
}
