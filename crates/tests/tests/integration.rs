//! End-to-end scenarios over synthetic forests.

use accreta_io::{ForestTable, write_forest_file};
use accreta_tests::{
    ScriptedModel, TestHarness, fof_root, link_group, link_progenitors, subhalo,
};
use accreta_types::{GalaxyType, GroupPhase, MergeKind};

/// One FOF group at a single snapshot: root plus two subhalos, no
/// progenitors anywhere. Exactly one central is seeded; the subhalos own
/// nothing and nothing merges.
#[test]
fn test_bare_group_seeds_exactly_one_central() {
    let mut halos = vec![
        fof_root(0, 0, 1000),
        subhalo(0, 0, 100),
        subhalo(0, 0, 50),
    ];
    link_group(&mut halos, &[0, 1, 2]);

    let mut h = TestHarness::new(halos, 1);
    h.run();

    assert_eq!(h.galaxies_created, 1);
    assert_eq!(h.finalized().len(), 1);

    let centrals: Vec<_> = h
        .finalized()
        .iter()
        .filter(|g| g.galaxy_type == GalaxyType::Central)
        .collect();
    let satellites: Vec<_> = h
        .finalized()
        .iter()
        .filter(|g| g.galaxy_type == GalaxyType::Satellite)
        .collect();
    assert_eq!(centrals.len(), 1);
    assert!(satellites.len() <= 2);
    assert!(h.finalized().iter().all(|g| g.merge.kind.is_none()));

    assert_eq!(h.galaxies_of(0).len(), 1);
    assert_eq!(h.galaxies_of(1).len(), 0);
    assert_eq!(h.galaxies_of(2).len(), 0);

    // the traversal visited everything, and the group evolved exactly once
    assert!(h.aux.iter().all(|a| a.done));
    assert_eq!(h.aux[0].group_phase, GroupPhase::Evolved);
}

/// A satellite whose merge clock runs out while its target is still alive
/// triggers exactly one merger; the satellite is absent from the current
/// snapshot's output and its previous record gains the merge outcome.
#[test]
fn test_expired_merge_clock_merges_once_and_patches_history() {
    let mut halos = vec![
        fof_root(0, 0, 1000),
        fof_root(0, 1, 20),
        fof_root(1, 2, 1100),
    ];
    link_progenitors(&mut halos, 2, &[0, 1]);

    let mut h = TestHarness::new(halos, 2);
    let model = ScriptedModel::new(10.0, 1.0);
    h.run_with(&model);

    // halo 1's subhalo vanished: its galaxy became an orphan with a zero
    // merge clock and merged into the surviving central
    assert_eq!(model.mergers_handled.get(), 1);
    assert_eq!(model.disruptions_handled.get(), 0);

    // snapshot 1 holds only the central; the merged satellite was skipped
    let final_snap = h.at_snapshot(1);
    assert_eq!(final_snap.len(), 1);
    assert_eq!(final_snap[0].galaxy_type, GalaxyType::Central);
    // the merger delivered the satellite's stars
    assert!((final_snap[0].stellar_mass - 2.0).abs() < 1e-12);

    // the satellite's snapshot-0 record was patched in place
    let orphan_nr = h.galaxies_of(1)[0].galaxy_nr;
    let patched = h
        .finalized()
        .iter()
        .find(|g| g.galaxy_nr == orphan_nr)
        .unwrap();
    assert_eq!(patched.merge.kind, MergeKind::Minor);
    assert_eq!(patched.merge.into_snap_num, 1);
    let target = &h.finalized()[patched.merge.into_id as usize];
    assert_eq!(target.galaxy_type, GalaxyType::Central);
    assert_eq!(target.snap_num, 1);
}

/// A satellite whose halo support collapses while the clock is still
/// running is disrupted into the central's intracluster stars instead.
#[test]
fn test_satellite_with_running_clock_disrupts() {
    let mut halos = vec![
        fof_root(0, 0, 1000),
        fof_root(0, 1, 200),
        fof_root(1, 2, 1100),
        subhalo(1, 2, 5),
    ];
    link_group(&mut halos, &[2, 3]);
    link_progenitors(&mut halos, 2, &[0]);
    link_progenitors(&mut halos, 3, &[1]);

    let mut h = TestHarness::new(halos, 2);
    // clock far longer than the interval, satellite mass ratio far below
    // the disruption threshold (tiny subhalo, heavy stars)
    let model = ScriptedModel::new(900.0, 1.0);
    h.run_with(&model);

    assert_eq!(model.disruptions_handled.get(), 1);
    assert_eq!(model.mergers_handled.get(), 0);

    let final_snap = h.at_snapshot(1);
    assert_eq!(final_snap.len(), 1);
    // the disrupted satellite's stars ended up in the intracluster light
    assert!((final_snap[0].ics - 1.0).abs() < 1e-12);

    let sat_nr = h.galaxies_of(1)[0].galaxy_nr;
    let patched = h.finalized().iter().find(|g| g.galaxy_nr == sat_nr).unwrap();
    assert_eq!(patched.merge.kind, MergeKind::Disrupted);
}

/// Two satellites merging into the same central in one snapshot both
/// resolve their references to the central's single output slot.
#[test]
fn test_simultaneous_mergers_share_target_slot() {
    let mut halos = vec![
        fof_root(0, 0, 1000),
        fof_root(0, 1, 40),
        fof_root(0, 2, 20),
        fof_root(1, 3, 1200),
    ];
    link_progenitors(&mut halos, 3, &[0, 1, 2]);

    let mut h = TestHarness::new(halos, 2);
    let model = ScriptedModel::new(10.0, 1.0);
    h.run_with(&model);

    assert_eq!(model.mergers_handled.get(), 2);
    let final_snap = h.at_snapshot(1);
    assert_eq!(final_snap.len(), 1);
    let central_slot = h.aux[3].first_galaxy as i64;

    for victim in [1usize, 2] {
        let nr = h.galaxies_of(victim)[0].galaxy_nr;
        let patched = h.finalized().iter().find(|g| g.galaxy_nr == nr).unwrap();
        assert_eq!(patched.merge.kind, MergeKind::Minor);
        assert_eq!(patched.merge.into_id, central_slot);
        assert_eq!(patched.merge.into_snap_num, 1);
    }
}

/// The finalized store holds one record per surviving galaxy per
/// snapshot: survivors accumulate, merged galaxies stop appearing.
#[test]
fn test_finalized_counts_match_survivors_per_snapshot() {
    let mut halos = vec![
        fof_root(0, 0, 1000),
        fof_root(0, 1, 20),
        fof_root(1, 2, 1100),
    ];
    link_progenitors(&mut halos, 2, &[0, 1]);

    let mut h = TestHarness::new(halos, 2);
    let model = ScriptedModel::new(10.0, 1.0);
    h.run_with(&model);

    // snapshot 0: both galaxies alive; snapshot 1: only the central
    assert_eq!(h.at_snapshot(0).len(), 2);
    assert_eq!(h.at_snapshot(1).len(), 1);
    assert_eq!(h.finalized().len(), 3);
}

/// A central tracked with the standard recipe set across several
/// snapshots accretes gas, cools and forms stars without producing
/// anything unphysical.
#[test]
fn test_standard_model_growth_stays_physical() {
    let mut halos = vec![
        fof_root(0, 0, 800),
        fof_root(1, 1, 1000),
        fof_root(2, 2, 1300),
    ];
    link_progenitors(&mut halos, 1, &[0]);
    link_progenitors(&mut halos, 2, &[1]);

    let mut h = TestHarness::new(halos, 3);
    h.run();

    assert_eq!(h.galaxies_created, 1);
    assert_eq!(h.finalized().len(), 3);

    // one galaxy, followed through three snapshots
    let nr = h.finalized()[0].galaxy_nr;
    assert!(h.finalized().iter().all(|g| g.galaxy_nr == nr));

    let last = h.galaxies_of(2)[0].clone();
    assert_eq!(last.galaxy_type, GalaxyType::Central);
    // infall filled the hot halo
    assert!(last.hot_gas > 0.0, "hot gas = {}", last.hot_gas);
    // every reservoir stays finite and non-negative
    for v in [
        last.hot_gas,
        last.cold_gas,
        last.stellar_mass,
        last.bulge_mass,
        last.ejected_mass,
        last.black_hole_mass,
        last.ics,
        last.metals_cold_gas,
        last.metals_hot_gas,
    ] {
        assert!(v.is_finite() && v >= 0.0, "unphysical reservoir {v}");
    }
    // the baryon budget never exceeds the cosmic fraction of the halo
    let baryons = last.stellar_mass
        + last.cold_gas
        + last.hot_gas
        + last.ejected_mass
        + last.black_hole_mass
        + last.ics;
    assert!(baryons <= h.cosmo.baryon_frac * last.mvir * 1.0001);
}

/// The whole path from a packed tree file to a galaxy catalogue: halos
/// written to disk, read back, walked, and the result matches an
/// in-memory run of the same forest.
#[test]
fn test_forest_from_disk_matches_in_memory_run() {
    let mut halos = vec![
        fof_root(0, 0, 1000),
        fof_root(0, 1, 20),
        fof_root(1, 2, 1100),
    ];
    link_progenitors(&mut halos, 2, &[0, 1]);

    let mut path = std::env::temp_dir();
    path.push(format!("accreta-e2e-{}.dat", std::process::id()));
    write_forest_file(&path, &[halos.clone()]).unwrap();

    let mut table = ForestTable::open(&path).unwrap();
    assert_eq!(table.nforests(), 1);
    let loaded = table.load_forest(0).unwrap();
    assert_eq!(loaded, halos);

    let model = ScriptedModel::new(10.0, 1.0);
    let mut from_disk = TestHarness::new(loaded, 2);
    from_disk.run_with(&model);

    let model = ScriptedModel::new(10.0, 1.0);
    let mut in_memory = TestHarness::new(halos, 2);
    in_memory.run_with(&model);

    assert_eq!(from_disk.finalized().len(), in_memory.finalized().len());
    for (a, b) in from_disk.finalized().iter().zip(in_memory.finalized()) {
        assert_eq!(a, b);
    }

    std::fs::remove_file(&path).unwrap();
}

/// A subhalo that survives across snapshots keeps its galaxy as a
/// type-1 satellite with infall properties recorded at entry.
#[test]
fn test_surviving_subhalo_becomes_satellite() {
    let mut halos = vec![
        fof_root(0, 0, 1000),
        fof_root(0, 1, 300),
        fof_root(1, 2, 1200),
        subhalo(1, 2, 280),
    ];
    link_group(&mut halos, &[2, 3]);
    link_progenitors(&mut halos, 2, &[0]);
    link_progenitors(&mut halos, 3, &[1]);

    let mut h = TestHarness::new(halos, 2);
    // long clock and heavy subhalo: the satellite survives the snapshot
    let model = ScriptedModel::new(900.0, 1.0e-6);
    h.run_with(&model);

    assert_eq!(model.mergers_handled.get(), 0);
    assert_eq!(model.disruptions_handled.get(), 0);

    let sats = h.galaxies_of(3);
    assert_eq!(sats.len(), 1);
    assert_eq!(sats[0].galaxy_type, GalaxyType::Satellite);
    // pre-infall virial properties were snapshot at the transition
    assert!(sats[0].infall_mvir > 0.0);
    // the satellite now carries a live merge clock
    assert!(!sats[0].merge_clock_unset());
    assert!(sats[0].merg_time > 0.0);
}
