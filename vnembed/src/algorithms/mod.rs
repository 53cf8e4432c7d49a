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

//! # Algorithm Orchestrator
//!
//! The orchestrator embeds a set of pending virtual networks onto a substrate network. It runs the
//! following pipeline:
//!
//! 1. Validate the configuration and the request.
//! 2. [Repair](crate::repair) the substrate. Networks released by the repair are added to the
//!    pending set. Afterwards, the path catalog is generated if the substrate has none yet, or if
//!    its topology changed since the catalog was generated.
//! 3. Reject every network whose total demand exceeds the total residual capacity of the substrate,
//!    without calling the solver.
//! 4. Run the configured [stages](Stage) one after the other. Every stage matches candidates,
//!    builds and solves a linear program, and commits the solution. The pipeline stops at the first
//!    stage that embeds every pending network. If a stage fails to do so, its partial embeddings
//!    are released before the next stage runs. The partial result of the last stage is kept.
//! 5. If networks remain rejected and migration is enabled, the smallest other guests of the
//!    substrate (up to the retry budget) are released, and the last stage is solved again for the
//!    rejected and the released networks. Released networks are then put back into their previous
//!    placement, as long as everything still fits.
//!
//! The model is validated before and after the run. Every pending network ends the run either
//! embedded, or listed in the [report](EmbeddingReport) together with the reason of its rejection.

mod migration;
mod stage;

pub use stage::Stage;

use crate::cost::{Objective, RejectionCost};
use crate::ilp::SolverAdapter;
use crate::matcher::MatcherKind;
use crate::model::{printer, Model, NetworkId};
use crate::paths::{generate_paths, PathConfig, PathError};
use crate::repair::repair;
use crate::Error;

use log::*;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Configuration of the migration fallback
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationConfig {
    /// Maximum number of networks to release
    pub max_retries: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Configuration of an embedding run
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmConfig {
    /// Stages to try, in order
    pub stages: Vec<Stage>,
    /// Objective of the linear programs
    pub objective: Objective,
    /// Cost of rejecting a network
    pub rejection_cost: RejectionCost,
    /// Matcher implementation
    pub matcher: MatcherKind,
    /// Whether to add SOS1 constraints for every virtual element
    pub sos1: bool,
    /// Migration fallback. Disabled if `None`.
    pub migration: Option<MigrationConfig>,
    /// Path generation, used if the substrate has no paths yet
    pub path: PathConfig,
    /// Time budget of every solver call
    pub solver_time_budget: Option<Duration>,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            stages: vec![Stage::SingleServer, Stage::Rack, Stage::Incremental],
            objective: Objective::default(),
            rejection_cost: RejectionCost::default(),
            matcher: MatcherKind::Incremental,
            sos1: false,
            migration: None,
            path: PathConfig::default(),
            solver_time_budget: None,
        }
    }
}

impl AlgorithmConfig {
    /// Check the configuration for invalid combinations.
    pub fn validate(&self) -> Result<(), Error> {
        if self.stages.is_empty() {
            return Err(Error::Config("no stage is configured".to_string()));
        }
        if self.stages.contains(&Stage::Rack) && self.path.min_hops > 1 {
            return Err(Error::Config(format!(
                "the rack stage requires direct links, but min_hops is {}",
                self.path.min_hops
            )));
        }
        if let Some(m) = self.migration.as_ref() {
            if m.max_retries == 0 {
                return Err(Error::Config("migration is enabled with a budget of 0".to_string()));
            }
        }
        if let RejectionCost::Dynamic { factor } = self.rejection_cost {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(Error::Config(format!("invalid rejection cost factor {}", factor)));
            }
        }
        Ok(())
    }
}

/// Reason why a virtual network was not embedded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectReason {
    /// The demand exceeds the total residual capacity of the substrate
    InsufficientResources,
    /// The solver found no feasible placement
    Infeasible,
    /// Migration did not free enough resources
    MigrationExhausted,
    /// Committing the chosen placement into the model failed
    CommitFailed,
}

/// Result of an embedding run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingReport {
    /// Networks embedded during this run
    pub embedded: BTreeSet<NetworkId>,
    /// Networks that are not embedded after the run
    pub rejected: BTreeMap<NetworkId, RejectReason>,
    /// Networks released by the repair and added to the pending set
    pub repaired: Vec<NetworkId>,
    /// Networks released to make room for rejected ones
    pub migrated: Vec<NetworkId>,
    /// Number of solver calls
    pub solver_calls: usize,
    /// Stage that embedded every pending network, if any
    pub stage: Option<Stage>,
}

impl EmbeddingReport {
    /// Returns true if no network was rejected.
    pub fn is_success(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// # Orchestrator
///
/// Runs the embedding pipeline. Every stage and the migration fallback use a fresh solver
/// created by the factory.
#[derive(Debug)]
pub struct Orchestrator<S, F>
where
    S: SolverAdapter,
    F: FnMut() -> S,
{
    config: AlgorithmConfig,
    solver_factory: F,
    solver_calls: usize,
}

impl<S, F> Orchestrator<S, F>
where
    S: SolverAdapter,
    F: FnMut() -> S,
{
    /// Create a new orchestrator. Fails if the configuration is invalid.
    pub fn new(config: AlgorithmConfig, solver_factory: F) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config, solver_factory, solver_calls: 0 })
    }

    /// Configuration of the orchestrator
    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    /// Embed the pending virtual networks onto the substrate network.
    pub fn run(
        &mut self,
        model: &mut Model,
        substrate: NetworkId,
        pending: &[NetworkId],
    ) -> Result<EmbeddingReport, Error> {
        self.solver_calls = 0;
        let mut report = EmbeddingReport::default();

        // check the request before touching the model
        model.substrate(substrate).map_err(|e| Error::Config(e.to_string()))?;
        let mut queue: Vec<NetworkId> = Vec::with_capacity(pending.len());
        for n in pending {
            model.virtual_network(*n).map_err(|e| Error::Config(e.to_string()))?;
            if model.is_embedded(*n)? {
                let name = printer::network(model, *n)?;
                return Err(Error::Config(format!("{} is already embedded", name)));
            }
            if !queue.contains(n) {
                queue.push(*n);
            }
        }

        // repair
        report.repaired = repair(model, substrate)?;
        for n in report.repaired.iter() {
            if !queue.contains(n) {
                queue.push(*n);
            }
        }

        // path catalog
        let sub = model.substrate(substrate)?;
        if !sub.links().is_empty() && (sub.paths().is_empty() || model.paths_outdated(substrate)?)
        {
            match generate_paths(model, substrate, &self.config.path) {
                Ok(_) => {}
                Err(PathError::PathsInUse(_)) => warn!(
                    "The topology of {} changed, but its paths are in use and are kept",
                    printer::network(model, substrate)?
                ),
                Err(e) => return Err(e.into()),
            }
        }
        model.validate()?;

        // resource pre-check
        let residual = model.total_residual(substrate)?;
        let mut accepted = Vec::with_capacity(queue.len());
        for n in queue {
            if model.network_demand(n)?.fits_into(&residual) {
                accepted.push(n);
            } else {
                info!(
                    "{} exceeds the residual capacity of the substrate",
                    printer::network(model, n)?
                );
                report.rejected.insert(n, RejectReason::InsufficientResources);
            }
        }
        info!("Embedding {} networks onto {}", accepted.len(), printer::network(model, substrate)?);

        // stages
        let mut leftover: BTreeMap<NetworkId, RejectReason> = BTreeMap::new();
        if !accepted.is_empty() {
            let num_stages = self.config.stages.len();
            for (i, stage) in self.config.stages.clone().into_iter().enumerate() {
                let outcome = self.run_stage(model, substrate, &accepted, stage)?;
                if outcome.rejected.is_empty() {
                    info!("Stage {:?} embedded all networks", stage);
                    report.embedded.extend(outcome.embedded);
                    report.stage = Some(stage);
                    break;
                }
                if i + 1 < num_stages {
                    debug!(
                        "Stage {:?} rejected {} networks, reverting",
                        stage,
                        outcome.rejected.len()
                    );
                    for n in outcome.embedded {
                        model.unembed_network(n)?;
                    }
                } else {
                    report.embedded.extend(outcome.embedded);
                    leftover = outcome.rejected;
                }
            }
        }

        // migration
        if !leftover.is_empty() {
            if let Some(m) = self.config.migration.clone() {
                let protected: BTreeSet<NetworkId> = accepted.iter().cloned().collect();
                leftover = self.migrate(model, substrate, &protected, leftover, &m, &mut report)?;
            }
        }
        report.rejected.extend(leftover);

        report.solver_calls = self.solver_calls;
        model.validate()?;
        info!(
            "Embedded {} networks, rejected {} networks, using {} solver calls",
            report.embedded.len(),
            report.rejected.len(),
            report.solver_calls
        );
        Ok(report)
    }
}
