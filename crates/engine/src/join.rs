//! Joining progenitor galaxies into the current snapshot.

use accreta_types::{GalaxyType, MergerState, props};

use crate::error::Result;
use crate::recipes::Recipes;
use crate::walker::ForestWalker;

impl<'a, R: Recipes> ForestWalker<'a, R> {
    /// Copy every galaxy owned by `halonr`'s progenitors into the working
    /// array starting at `ngal_start`, classifying roles and refreshing the
    /// surviving central from the current halo. Seeds a new galaxy if the
    /// whole group is still empty. Returns the updated running count.
    pub(crate) fn join_progenitor_galaxies(
        &mut self,
        halonr: usize,
        ngal_start: usize,
    ) -> Result<usize> {
        let halos = self.sim.halos;
        let fof_root = halos[halonr]
            .first_in_fof_group
            .index()
            .expect("validated by canonicalize_forest");

        // The most massive progenitor that actually owns a galaxy. The
        // first progenitor may never have been a FOF root and so may own
        // nothing.
        let mut first_occupied: Option<usize> = None;
        let mut len_occupied_max = -1i64;
        let mut prog = halos[halonr].first_progenitor.index();
        while let Some(p) = prog {
            if self.aux[p].n_galaxies > 0 && i64::from(halos[p].len) > len_occupied_max {
                len_occupied_max = i64::from(halos[p].len);
                first_occupied = Some(p);
            }
            prog = halos[p].next_progenitor.index();
        }

        let mut ngal = ngal_start;
        let mut prog = halos[halonr].first_progenitor.index();
        while let Some(p) = prog {
            let first = self.aux[p].first_galaxy;
            for i in first..first + self.aux[p].n_galaxies {
                let mut g = self.store.finalized()[i].clone();
                g.halo_nr = halonr;
                g.dt = None;

                if g.galaxy_type.is_central_kind() {
                    // a galaxy that already merged must not seed this
                    // snapshot: transient removal marker, then dropped
                    if !g.merge.kind.is_none() {
                        g.galaxy_type = GalaxyType::Removed;
                        continue;
                    }

                    let previous_mvir = g.mvir;
                    let previous_vvir = g.vvir;
                    let previous_vmax = g.vmax;

                    if Some(p) == first_occupied {
                        // the subhalo survived: re-centre the galaxy on it
                        let halo = &halos[halonr];
                        g.most_bound_id = halo.most_bound_id;
                        g.pos = halo.pos;
                        g.vel = halo.vel;
                        g.len = halo.len;
                        g.vmax = halo.vmax as f64;

                        let mvir = props::virial_mass(halos, halonr, self.sim.cosmo);
                        g.delta_mvir = mvir - g.mvir;
                        if mvir > g.mvir {
                            // virial radius and velocity only ever grow
                            g.rvir = props::virial_radius(
                                halos,
                                halonr,
                                self.sim.cosmo,
                                self.sim.units,
                                self.sim.snapshots,
                            );
                            g.vvir = props::virial_velocity(
                                halos,
                                halonr,
                                self.sim.cosmo,
                                self.sim.units,
                                self.sim.snapshots,
                            );
                        }
                        g.mvir = mvir;

                        g.cooling = 0.0;
                        g.heating = 0.0;
                        g.quasar_bh_accretion = 0.0;
                        g.outflow_rate = 0.0;
                        g.sfr.reset();

                        if halonr == fof_root {
                            g.merge = MergerState::default();
                            g.merg_time = accreta_types::MERGE_CLOCK_UNSET;
                            g.disk_scale_radius =
                                self.recipes.disk_scale_radius(self.sim, halonr, &g);
                            g.galaxy_type = GalaxyType::Central;
                        } else {
                            g.merge = MergerState::default();
                            if g.galaxy_type == GalaxyType::Central {
                                // falling into a bigger halo: remember the
                                // pre-infall virial properties
                                g.infall_mvir = previous_mvir;
                                g.infall_vvir = previous_vvir;
                                g.infall_vmax = previous_vmax;
                            }
                            if g.galaxy_type == GalaxyType::Central || g.merge_clock_unset() {
                                g.merg_time = self.recipes.merging_timescale(
                                    self.sim, halonr, fof_root, &g,
                                );
                            }
                            g.galaxy_type = GalaxyType::Satellite;
                        }
                    } else {
                        // the subhalo this galaxy lived in did not survive
                        g.delta_mvir = -g.mvir;
                        g.mvir = 0.0;
                        if g.merge_clock_unset() || g.galaxy_type == GalaxyType::Central {
                            // no valid merge clock: merge within this snapshot
                            g.merg_time = 0.0;
                            g.infall_mvir = previous_mvir;
                            g.infall_vvir = previous_vvir;
                            g.infall_vmax = previous_vmax;
                        }
                        g.galaxy_type = GalaxyType::Orphan;
                    }
                }

                self.store.push_working(g, self.ledger)?;
                ngal += 1;
            }
            prog = halos[p].next_progenitor.index();
        }

        // No galaxy anywhere in the group yet: seed one from this halo.
        // Only the group's first processed member (its root) can get here.
        if ngal == 0 {
            debug_assert_eq!(halonr, fof_root, "only a FOF root seeds a galaxy");
            let g = self.recipes.seed_galaxy(self.sim, halonr, self.galaxy_counter);
            self.galaxy_counter += 1;
            self.store.push_working(g, self.ledger)?;
            ngal = 1;
        }

        // Per halo there is exactly one galaxy that owns the (sub)halo;
        // everything else is an orphan.
        if ngal > ngal_start {
            let mut central: Option<usize> = None;
            for (offset, g) in self.store.working()[ngal_start..ngal].iter().enumerate() {
                if g.galaxy_type.is_central_kind() {
                    assert!(
                        central.is_none(),
                        "halo {halonr} produced more than one central galaxy"
                    );
                    central = Some(ngal_start + offset);
                }
            }
            let central = central
                .unwrap_or_else(|| panic!("halo {halonr} has galaxies but no central"));
            for g in &mut self.store.working_mut()[ngal_start..ngal] {
                g.central_gal = Some(central);
            }
        }

        Ok(ngal)
    }
}
