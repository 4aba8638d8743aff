//! Halo link fields.

use serde::{Deserialize, Serialize};

/// Index of a halo within one forest, or the "none" sentinel.
///
/// Kept as the raw `i32` convention of the tree files (`-1` means none) so
/// link fields can be rewritten in place during normalization and round-trip
/// to storage untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HaloLink(i32);

impl HaloLink {
    pub const NONE: HaloLink = HaloLink(-1);

    pub fn from_index(index: usize) -> Self {
        HaloLink(index as i32)
    }

    pub fn from_raw(raw: i32) -> Self {
        HaloLink(raw)
    }

    /// The linked halo's index, or `None` for the sentinel.
    pub fn index(self) -> Option<usize> {
        (self.0 >= 0).then_some(self.0 as usize)
    }

    pub fn is_none(self) -> bool {
        self.0 < 0
    }

    pub fn raw(self) -> i32 {
        self.0
    }

    /// Whether the raw value is the sentinel or a valid index for a forest
    /// of `nhalos` halos.
    pub fn in_range(self, nhalos: usize) -> bool {
        self.0 == -1 || (self.0 >= 0 && (self.0 as usize) < nhalos)
    }
}

impl Default for HaloLink {
    fn default() -> Self {
        HaloLink::NONE
    }
}
