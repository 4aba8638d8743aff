//! Time integration of one FOF group and finalization of its galaxies.

use accreta_types::GalaxyType;
use tracing::trace;

use crate::error::Result;
use crate::recipes::{GroupContext, Recipes};
use crate::walker::ForestWalker;

impl<'a, R: Recipes> ForestWalker<'a, R> {
    /// Integrate the group's `ngal` working galaxies forward from the
    /// previous snapshot to `fof_root`'s snapshot over `self.steps` equal
    /// sub-intervals, resolving mergers and disruptions, then append the
    /// survivors to the finalized store.
    pub(crate) fn evolve_group(&mut self, fof_root: usize, ngal: usize) -> Result<()> {
        debug_assert!(ngal > 0, "a joined group always has at least one galaxy");
        debug_assert_eq!(ngal, self.store.working().len());

        let snapshots = self.sim.snapshots;
        let recipes = self.recipes;
        let params = self.params;
        let steps = self.steps;
        let steps_f = steps as f64;
        let snap = self.sim.halos[fof_root].snap_num;
        let age_now = snapshots.age(snap);

        let central = self.store.working()[0]
            .central_gal
            .expect("group central assigned while joining");
        {
            let c = &self.store.working()[central];
            assert!(
                c.galaxy_type == GalaxyType::Central && c.halo_nr == fof_root,
                "group central must be the FOF root's type-0 galaxy"
            );
        }

        // Total infall is computed once per snapshot and fed in per sub-step.
        let infalling = {
            let mut ctx = GroupContext {
                sim: self.sim,
                galaxies: self.store.working_mut(),
            };
            recipes.group_infall_mass(&mut ctx, central, snapshots.redshift(snap))
        };
        trace!(fof_root, ngal, infalling, "group evolution start");

        for step in 0..steps {
            for p in 0..ngal {
                if !self.store.working()[p].merge.kind.is_none() {
                    continue;
                }
                // galaxies may arrive from different previous snapshots, so
                // the interval is per galaxy
                let delta_t = snapshots.age(self.store.working()[p].snap_num) - age_now;
                let dt = delta_t / steps_f;
                let time =
                    snapshots.age(self.store.working()[p].snap_num) - (step as f64 + 0.5) * dt;

                {
                    let g = &mut self.store.working_mut()[p];
                    if g.dt.is_none() {
                        g.dt = Some(delta_t);
                    }
                }

                if p == central {
                    recipes
                        .add_infall_to_hot(&mut self.store.working_mut()[central], infalling / steps_f);
                    if params.reincorporation_factor > 0.0 {
                        recipes.reincorporate_gas(&mut self.store.working_mut()[central], dt);
                    }
                } else {
                    let (galaxy_type, hot_gas) = {
                        let g = &self.store.working()[p];
                        (g.galaxy_type, g.hot_gas)
                    };
                    if galaxy_type == GalaxyType::Satellite && hot_gas > 0.0 {
                        let mut ctx = GroupContext {
                            sim: self.sim,
                            galaxies: self.store.working_mut(),
                        };
                        recipes.strip_from_satellite(&mut ctx, fof_root, central, p);
                    }
                }

                let cooling = {
                    let mut ctx = GroupContext {
                        sim: self.sim,
                        galaxies: self.store.working_mut(),
                    };
                    recipes.cooling_mass(&mut ctx, p, dt)
                };
                recipes.cool_gas_onto_disk(&mut self.store.working_mut()[p], cooling);

                let mut ctx = GroupContext {
                    sim: self.sim,
                    galaxies: self.store.working_mut(),
                };
                recipes.star_formation_and_feedback(&mut ctx, p, central, time, dt, step);
            }

            // satellite disruption and merger events
            for p in 0..ngal {
                let (galaxy_type, merged, clock_unset, sat_snap, central_ref) = {
                    let g = &self.store.working()[p];
                    (
                        g.galaxy_type,
                        !g.merge.kind.is_none(),
                        g.merge_clock_unset(),
                        g.snap_num,
                        g.central_gal,
                    )
                };
                let is_satellite =
                    matches!(galaxy_type, GalaxyType::Satellite | GalaxyType::Orphan);
                if !is_satellite || merged {
                    continue;
                }
                assert!(!clock_unset, "live satellite without a merge clock");

                let delta_t = snapshots.age(sat_snap) - age_now;
                let dt = delta_t / steps_f;
                let (merg_time, current_mvir, baryons) = {
                    let g = &mut self.store.working_mut()[p];
                    g.merg_time -= dt;
                    // interpolate the halo mass across the interval; orphans
                    // decay towards zero
                    let current_mvir =
                        g.mvir - g.delta_mvir * (1.0 - (step as f64 + 1.0) / steps_f);
                    (g.merg_time, current_mvir, g.stellar_mass + g.cold_gas)
                };

                let below_threshold = baryons <= 0.0
                    || current_mvir / baryons <= params.threshold_sat_disruption;
                if !below_threshold {
                    continue;
                }

                // resolve a live merge target, walking past anything that
                // merged earlier this snapshot
                let mut target = if galaxy_type == GalaxyType::Satellite {
                    central
                } else {
                    central_ref.expect("joined galaxies carry a central reference")
                };
                let mut hops = 0;
                while !self.store.working()[target].merge.kind.is_none() {
                    target = self.store.working()[target]
                        .merge
                        .target
                        .expect("merged galaxy records its target");
                    hops += 1;
                    assert!(hops <= ngal, "merge target chain does not terminate");
                }

                self.store.working_mut()[p].merge.target = Some(target);

                if merg_time > 0.0 {
                    // the subhalo fell apart before the merge clock ran out
                    let mut ctx = GroupContext {
                        sim: self.sim,
                        galaxies: self.store.working_mut(),
                    };
                    recipes.disrupt_to_ics(&mut ctx, target, p);
                } else {
                    let time = snapshots.age(sat_snap) - (step as f64 + 0.5) * dt;
                    let mut ctx = GroupContext {
                        sim: self.sim,
                        galaxies: self.store.working_mut(),
                    };
                    recipes.handle_merger(&mut ctx, p, target, central, time, dt, step);
                }
                debug_assert!(
                    !self.store.working()[p].merge.kind.is_none(),
                    "recipe must mark the satellite merged or disrupted"
                );
            }
        }

        // normalize the accumulated diagnostics over the full interval and
        // collect satellite baryons onto the central
        let delta_t_group = snapshots.age(self.store.working()[0].snap_num) - age_now;
        self.store.working_mut()[central].total_satellite_baryons = 0.0;
        for p in 0..ngal {
            if !self.store.working()[p].merge.kind.is_none() {
                continue;
            }
            {
                let g = &mut self.store.working_mut()[p];
                g.cooling /= delta_t_group;
                g.heating /= delta_t_group;
                g.outflow_rate /= delta_t_group;
            }
            if p != central {
                let g = &self.store.working()[p];
                let baryons = g.stellar_mass + g.black_hole_mass + g.cold_gas + g.hot_gas;
                self.store.working_mut()[central].total_satellite_baryons += baryons;
            }
        }

        self.finalize_group(fof_root, ngal)
    }

    /// Append the group's surviving galaxies to the finalized store and
    /// resolve every deferred merge reference.
    ///
    /// Output slots are assigned to survivors in one forward pass; each
    /// merged galaxy's `into_id` is then resolved through its recorded
    /// target handle, and its most recent finalized appearance is patched
    /// with the merge outcome.
    fn finalize_group(&mut self, fof_root: usize, ngal: usize) -> Result<()> {
        let snap = self.sim.halos[fof_root].snap_num;
        let base = self.store.finalized().len();

        let mut slots: Vec<Option<usize>> = vec![None; ngal];
        let mut next = base;
        for p in 0..ngal {
            if self.store.working()[p].merge.kind.is_none() {
                slots[p] = Some(next);
                next += 1;
            }
        }

        let mut current_halo: Option<usize> = None;
        for p in 0..ngal {
            let owner = self.store.working()[p].halo_nr;
            if current_halo != Some(owner) {
                current_halo = Some(owner);
                self.aux[owner].first_galaxy = self.store.finalized().len();
                self.aux[owner].n_galaxies = 0;
            }

            if self.store.working()[p].merge.kind.is_none() {
                let mut g = self.store.working()[p].clone();
                g.snap_num = snap;
                let slot = self.store.push_finalized(g, self.ledger)?;
                debug_assert_eq!(Some(slot), slots[p]);
                self.aux[owner].n_galaxies += 1;
            } else {
                // the galaxy merged this snapshot: resolve its target to an
                // output slot and patch its previous finalized record
                let mut target = self.store.working()[p]
                    .merge
                    .target
                    .expect("merged galaxy records its target");
                let mut hops = 0;
                while slots[target].is_none() {
                    target = self.store.working()[target]
                        .merge
                        .target
                        .expect("merged galaxy records its target");
                    hops += 1;
                    assert!(hops <= ngal, "merge target chain does not terminate");
                }
                let into_id = slots[target].unwrap() as i64;

                let (galaxy_nr, kind) = {
                    let g = &mut self.store.working_mut()[p];
                    g.merge.into_id = into_id;
                    g.merge.into_snap_num = snap;
                    (g.galaxy_nr, g.merge.kind)
                };

                let prev = self
                    .store
                    .finalized_mut()
                    .iter_mut()
                    .rev()
                    .find(|r| r.galaxy_nr == galaxy_nr)
                    .expect("merged galaxy must have a finalized record to patch");
                prev.merge.kind = kind;
                prev.merge.into_id = into_id;
                prev.merge.into_snap_num = snap;
            }
        }

        Ok(())
    }
}
