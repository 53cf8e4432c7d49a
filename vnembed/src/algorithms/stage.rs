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

//! Stages of the embedding pipeline

use super::Orchestrator;
use crate::applier::{apply_solution, ApplyOutcome};
use crate::ilp::{IlpDeltaBuilder, SolverAdapter};
use crate::matcher::{new_matcher, CandidateScope};
use crate::model::{Model, NetworkId};
use crate::Error;

use log::*;

/// Stage of the embedding pipeline, defining which candidates are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Every network is placed on a single substrate server.
    SingleServer,
    /// Every network is placed within a single rack: on the servers and the top-of-rack switch
    /// below one switch, using paths with at most two hops.
    Rack,
    /// All candidates are considered.
    Incremental,
}

impl Stage {
    /// Candidate scope of the stage
    pub fn scope(&self) -> CandidateScope {
        match self {
            Self::SingleServer => CandidateScope::SingleServer,
            Self::Rack => CandidateScope::Rack,
            Self::Incremental => CandidateScope::Full,
        }
    }
}

impl<S, F> Orchestrator<S, F>
where
    S: SolverAdapter,
    F: FnMut() -> S,
{
    /// Run a single stage: match candidates, build and solve the linear program, and commit the
    /// result.
    pub(super) fn run_stage(
        &mut self,
        model: &mut Model,
        substrate: NetworkId,
        pending: &[NetworkId],
        stage: Stage,
    ) -> Result<ApplyOutcome, Error> {
        debug!("Running stage {:?} for {} networks", stage, pending.len());
        let mut builder = self.build_program(model, substrate, pending, stage)?;
        let mut solver = (self.solver_factory)();
        self.solver_calls += 1;
        let solution = builder.apply(model, &mut solver)?;
        apply_solution(model, substrate, &solution)
    }

    /// Match the candidates of the pending networks, and collect them in a new builder.
    pub(super) fn build_program(
        &self,
        model: &Model,
        substrate: NetworkId,
        pending: &[NetworkId],
        stage: Stage,
    ) -> Result<IlpDeltaBuilder, Error> {
        let mut matcher = new_matcher(self.config.matcher, substrate, pending, stage.scope());
        let delta = matcher.run(model)?;

        let mut builder = IlpDeltaBuilder::new(
            substrate,
            stage.scope(),
            self.config.objective,
            self.config.rejection_cost,
            self.config.sos1,
        );
        builder.add_networks(pending);
        builder.add_candidates(model, &delta)?;
        if builder.num_dropped() > 0 {
            debug!("Dropped {} candidates that can never be chosen", builder.num_dropped());
        }
        Ok(builder)
    }
}
