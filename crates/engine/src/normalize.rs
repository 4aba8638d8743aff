//! Forest canonicalization.
//!
//! Sorts a forest's halos into snapshot-major order with every FOF group
//! contiguous and rooted first, then rewrites all link fields for the new
//! labelling. The walker relies on this ordering to drive its group
//! synchronization, and it makes output order reproducible regardless of
//! how the tree file was packed.

use accreta_types::{HaloLink, HaloRecord};

use crate::error::{Error, Result};

/// Reorder `halos` in place into canonical order.
///
/// Returns `orig_index`: for each new position, the position that halo had
/// in the original file order (needed later to correlate with per-halo
/// metadata kept by the storage layer).
pub fn canonicalize_forest(halos: &mut Vec<HaloRecord>) -> Result<Vec<u32>> {
    validate_links(halos)?;

    let n = halos.len();
    let mut order: Vec<u32> = (0..n as u32).collect();

    // Stable sort: snapshot, then FOF group identity under the old
    // labelling, group root first, then heavier members first. Stability
    // keeps file order for full ties.
    order.sort_by(|&a, &b| {
        let (ha, hb) = (&halos[a as usize], &halos[b as usize]);
        ha.snap_num
            .cmp(&hb.snap_num)
            .then_with(|| ha.first_in_fof_group.raw().cmp(&hb.first_in_fof_group.raw()))
            .then_with(|| hb.is_fof_root(b as usize).cmp(&ha.is_fof_root(a as usize)))
            .then_with(|| hb.len.cmp(&ha.len))
    });

    let mut reordered = Vec::with_capacity(n);
    for &old in &order {
        reordered.push(halos[old as usize].clone());
    }

    // inverse[old] = new position of the halo that was at `old`
    let mut inverse = vec![0u32; n];
    for (new, &old) in order.iter().enumerate() {
        inverse[old as usize] = new as u32;
    }

    for halo in &mut reordered {
        for link in halo.links_mut() {
            if let Some(old) = link.index() {
                *link = HaloLink::from_index(inverse[old] as usize);
            }
        }
    }

    *halos = reordered;
    Ok(order)
}

/// Reject forests with out-of-range links or inconsistent FOF rooting
/// before any of it is dereferenced.
fn validate_links(halos: &[HaloRecord]) -> Result<()> {
    let nhalos = halos.len();
    for (halonr, halo) in halos.iter().enumerate() {
        for (field, link) in accreta_types::halo::LINK_FIELDS.into_iter().zip(halo.links()) {
            if !link.in_range(nhalos) {
                return Err(Error::LinkOutOfRange {
                    halo: halonr,
                    field,
                    value: link.raw(),
                    nhalos,
                });
            }
        }
        match halo.first_in_fof_group.index() {
            None => return Err(Error::MissingFofRoot { halo: halonr }),
            Some(root) => {
                if halos[root].first_in_fof_group.index() != Some(root) {
                    return Err(Error::BadFofRoot { halo: halonr, root });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A halo with the given snapshot, mass and FOF root (old labelling).
    fn halo(snap: i32, len: i32, fof: usize) -> HaloRecord {
        HaloRecord {
            snap_num: snap,
            len,
            mvir: len as f32,
            first_in_fof_group: HaloLink::from_index(fof),
            ..HaloRecord::default()
        }
    }

    /// A scrambled two-snapshot forest: group roots 2 (snap 0) and 5
    /// (snap 1), with halo 4 the snap-0 progenitor chain head of halo 5.
    fn scrambled_forest() -> Vec<HaloRecord> {
        let mut h = vec![
            halo(1, 40, 5),  // 0: satellite of 5
            halo(0, 10, 2),  // 1: light satellite of 2
            halo(0, 100, 2), // 2: root at snap 0
            halo(0, 30, 2),  // 3: heavier satellite of 2
            halo(0, 60, 4),  // 4: root of a second snap-0 group
            halo(1, 90, 5),  // 5: root at snap 1
        ];
        h[2].descendant = HaloLink::from_index(5);
        h[2].first_progenitor = HaloLink::NONE;
        h[5].first_progenitor = HaloLink::from_index(2);
        h[2].next_progenitor = HaloLink::from_index(4);
        h[4].descendant = HaloLink::from_index(5);
        h[2].next_in_fof_group = HaloLink::from_index(1);
        h[1].next_in_fof_group = HaloLink::from_index(3);
        h[5].next_in_fof_group = HaloLink::from_index(0);
        h
    }

    #[test]
    fn test_canonical_order_is_grouped_and_root_first() {
        let mut halos = scrambled_forest();
        canonicalize_forest(&mut halos).unwrap();

        // snapshots ascend
        for pair in halos.windows(2) {
            assert!(pair[0].snap_num <= pair[1].snap_num);
        }
        // every FOF group is contiguous with its root first
        let mut seen_roots = Vec::new();
        let mut current = None;
        for (i, h) in halos.iter().enumerate() {
            let root = h.first_in_fof_group.index().unwrap();
            if current != Some(root) {
                assert_eq!(root, i, "group must open with its own root");
                assert!(!seen_roots.contains(&root), "group split apart");
                seen_roots.push(root);
                current = Some(root);
            }
        }
        // halo 0 is a self-referential root
        assert!(halos[0].is_fof_root(0));
        // within the snap-0 big group, members follow the root heaviest first
        assert_eq!(halos[0].len, 100);
        assert_eq!(halos[1].len, 30);
        assert_eq!(halos[2].len, 10);
    }

    #[test]
    fn test_orig_index_round_trip() {
        let original = scrambled_forest();
        let mut halos = original.clone();
        let orig_index = canonicalize_forest(&mut halos).unwrap();

        let mut restored = vec![HaloRecord::default(); halos.len()];
        for (new, &old) in orig_index.iter().enumerate() {
            restored[old as usize] = halos[new].clone();
        }
        // restored halos sit at their original positions (links were
        // rewritten, so compare on invariant fields)
        for (a, b) in restored.iter().zip(original.iter()) {
            assert_eq!(a.snap_num, b.snap_num);
            assert_eq!(a.len, b.len);
        }
    }

    #[test]
    fn test_links_track_masses_across_relabelling() {
        let original = scrambled_forest();
        let mut halos = original.clone();
        let orig_index = canonicalize_forest(&mut halos).unwrap();

        for (new, h) in halos.iter().enumerate() {
            let old = orig_index[new] as usize;
            for (link_new, link_old) in h.links().iter().zip(original[old].links()) {
                match (link_new.index(), link_old.index()) {
                    (Some(a), Some(b)) => {
                        assert_eq!(halos[a].len, original[b].len, "link mass changed");
                    }
                    (None, None) => {}
                    _ => panic!("sentinel changed during relabelling"),
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_link_is_corrupt() {
        let mut halos = vec![halo(0, 10, 0)];
        halos[0].descendant = HaloLink::from_index(9);
        assert!(matches!(
            canonicalize_forest(&mut halos),
            Err(Error::LinkOutOfRange { field: "descendant", .. })
        ));
    }

    #[test]
    fn test_non_self_referential_root_is_corrupt() {
        let mut halos = vec![halo(0, 10, 1), halo(0, 5, 0)];
        // halo 1 claims 0 as root, but 0 claims 1: neither is self-referential
        assert!(matches!(
            canonicalize_forest(&mut halos),
            Err(Error::BadFofRoot { .. })
        ));
    }

    #[test]
    fn test_missing_fof_root_is_corrupt() {
        let mut h = halo(0, 10, 0);
        h.first_in_fof_group = HaloLink::NONE;
        assert!(matches!(
            canonicalize_forest(&mut vec![h]),
            Err(Error::MissingFofRoot { halo: 0 })
        ));
    }
}
