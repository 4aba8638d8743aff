//! Snapshot list reading.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

/// Read the whitespace-separated expansion factors of every simulation
/// snapshot.
pub fn read_snap_list(path: &Path) -> Result<Vec<f64>> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let mut factors = Vec::new();
    for token in text.split_whitespace() {
        let a: f64 = token.parse().map_err(|_| Error::MalformedSnapList {
            path: path.to_path_buf(),
            reason: format!("not a number: {token:?}"),
        })?;
        if !(a > 0.0 && a <= 1.0) {
            return Err(Error::MalformedSnapList {
                path: path.to_path_buf(),
                reason: format!("expansion factor {a} outside (0, 1]"),
            });
        }
        factors.push(a);
    }
    if factors.is_empty() {
        return Err(Error::MalformedSnapList {
            path: path.to_path_buf(),
            reason: "no entries".into(),
        });
    }
    info!(snapshots = factors.len(), "snapshot list loaded");
    Ok(factors)
}
