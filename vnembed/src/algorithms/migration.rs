// VNEmbed: Virtual Network Embedding Engine
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Migration fallback: free resources by releasing already embedded networks.

use super::{EmbeddingReport, MigrationConfig, Orchestrator, RejectReason};
use crate::applier::apply_solution;
use crate::ilp::SolverAdapter;
use crate::model::{printer, Model, NetworkId};
use crate::Error;

use log::*;
use std::collections::{BTreeMap, BTreeSet};

impl<S, F> Orchestrator<S, F>
where
    S: SolverAdapter,
    F: FnMut() -> S,
{
    /// Make room for the rejected networks by releasing other guests of the substrate.
    ///
    /// The victims are the guests with the smallest footprint that are not part of the request
    /// (`protected`), at most `max_retries` of them. All victims are released at once, and the
    /// last stage is solved for the rejected networks together with the victims. If this embeds
    /// everything, the victims are pinned back to their previous placement one after the other,
    /// largest first, as long as everything still fits. All these solver calls share a single
    /// solver, which only receives the new rows. Pinned victims stay where they were and are not
    /// reported as migrated.
    ///
    /// Returns the networks that are still rejected afterwards.
    pub(super) fn migrate(
        &mut self,
        model: &mut Model,
        substrate: NetworkId,
        protected: &BTreeSet<NetworkId>,
        rejected: BTreeMap<NetworkId, RejectReason>,
        config: &MigrationConfig,
        report: &mut EmbeddingReport,
    ) -> Result<BTreeMap<NetworkId, RejectReason>, Error> {
        let stage = match self.config.stages.last() {
            Some(s) => *s,
            None => return Ok(rejected),
        };
        let victims = self.select_victims(model, substrate, protected, config.max_retries)?;
        if victims.is_empty() {
            info!("No network left to migrate");
            return Ok(rejected);
        }
        let mut placements = Vec::with_capacity(victims.len());
        for v in victims.iter() {
            info!("Releasing {} for migration", printer::network(model, *v)?);
            placements.push(model.hosts_of(*v)?);
            model.unembed_network(*v)?;
        }

        let retry: Vec<NetworkId> = rejected.keys().chain(victims.iter()).cloned().collect();
        let mut builder = self.build_program(model, substrate, &retry, stage)?;
        let mut solver = (self.solver_factory)();
        self.solver_calls += 1;
        let mut best = builder.apply(model, &mut solver)?;

        // put back as many victims as possible
        let mut released = victims.len();
        if best.embeds_all() {
            while released > 0 {
                let victim = victims[released - 1];
                if !builder.pin(victim, &placements[released - 1]) {
                    debug!("Cannot pin {} to its placement", printer::network(model, victim)?);
                    break;
                }
                self.solver_calls += 1;
                let solution = builder.apply(model, &mut solver)?;
                if !solution.embeds_all() {
                    break;
                }
                best = solution;
                released -= 1;
            }
        }

        let outcome = apply_solution(model, substrate, &best)?;
        let (migrated, kept) = victims.split_at(released);
        report.embedded.extend(outcome.embedded.iter().filter(|n| !kept.contains(*n)).cloned());
        report.migrated = migrated.to_vec();
        let still_rejected: BTreeMap<NetworkId, RejectReason> = outcome
            .rejected
            .into_iter()
            .map(|(n, r)| match r {
                RejectReason::Infeasible => (n, RejectReason::MigrationExhausted),
                r => (n, r),
            })
            .collect();
        if still_rejected.is_empty() {
            info!("Migration succeeded, moving {} networks", migrated.len());
        } else {
            warn!("Migration could not embed {} networks", still_rejected.len());
        }
        Ok(still_rejected)
    }

    /// Guests of the substrate that are not part of the request, smallest footprint first, with
    /// ties broken by the network id.
    fn select_victims(
        &self,
        model: &Model,
        substrate: NetworkId,
        protected: &BTreeSet<NetworkId>,
        max: usize,
    ) -> Result<Vec<NetworkId>, Error> {
        let mut guests: Vec<(u64, NetworkId)> = Vec::new();
        for g in model.substrate(substrate)?.guests() {
            if !protected.contains(g) {
                guests.push((model.network_footprint(*g)?, *g));
            }
        }
        guests.sort();
        Ok(guests.into_iter().take(max).map(|(_, n)| n).collect())
    }
}
