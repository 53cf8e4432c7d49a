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

#![deny(missing_docs)]

//! # VNEmbed: Virtual Network Embedding Engine
//!
//! This is a library for embedding virtual networks onto a substrate network. Given a substrate
//! network (servers, switches and links with finite cpu, memory, storage and bandwidth) and a set
//! of virtual network requests (topologies with resource demands), it computes a feasible,
//! cost-minimal placement of every virtual node onto a substrate node, and of every virtual link
//! onto a substrate server or path. The placement is committed into the resource graph, which
//! keeps track of the residual capacities.
//!
//! ## Structure
//!
//! - **[`Model`](model)**: The resource graph, owning all networks and the embedding
//!   cross-references. See the main structure [`Model`](model::Model).
//!
//! - **[`Paths`](paths)**: Generation of the substrate path catalog, either exhaustively or using
//!   the `k` shortest paths of every pair of nodes.
//!
//! - **[`Matcher`](matcher)**: Computation of all structurally feasible placements (candidates) of
//!   virtual elements onto substrate elements.
//!
//! - **[`Cost`](cost)**: Cost of a candidate under different objectives.
//!
//! - **[`ILP`](ilp)**: The linear program, consisting of a
//!   [builder](ilp::IlpDeltaBuilder), the [solver interface](ilp::SolverAdapter), and an
//!   [exact solver](ilp::BranchAndBoundSolver).
//!
//! - **[`Applier`](applier)** and **[`Repair`](repair)**: Committing a solution into the model, and
//!   releasing networks which lost some of their hosts.
//!
//! - **[`Algorithms`](algorithms)**: The [orchestrator](algorithms::Orchestrator) running the
//!   embedding pipeline, with multiple stages and the migration fallback.
//!
//! ## Usage
//!
//! ```
//! use vnembed::algorithms::AlgorithmConfig;
//! use vnembed::model::{Model, ModelConfig, Resources};
//! use vnembed::{embed, Error};
//!
//! fn main() -> Result<(), Error> {
//!     let mut model = Model::new(ModelConfig::default());
//!
//!     // prepare the substrate
//!     let sub = model.add_substrate_network("sub")?;
//!     let sw = model.add_switch(sub, "sw", 0)?;
//!     let s1 = model.add_server(sub, "s1", Resources::new(4, 8, 8), 1)?;
//!     let s2 = model.add_server(sub, "s2", Resources::new(4, 8, 8), 1)?;
//!     model.add_link_pair(sub, s1, sw, 100)?;
//!     model.add_link_pair(sub, s2, sw, 100)?;
//!
//!     // prepare the request
//!     let virt = model.add_virtual_network("virt")?;
//!     let v1 = model.add_server(virt, "v1", Resources::new(2, 2, 2), 0)?;
//!     let v2 = model.add_server(virt, "v2", Resources::new(2, 2, 2), 0)?;
//!     model.add_link_pair(virt, v1, v2, 10)?;
//!
//!     // embed the request
//!     let report = embed(&mut model, sub, &[virt], AlgorithmConfig::default())?;
//!     assert!(report.is_success());
//!     assert_eq!(model.network(virt)?.host(), Some(sub));
//!
//!     Ok(())
//! }
//! ```

// test modules
mod test;

pub mod algorithms;
pub mod applier;
pub mod cost;
mod error;
pub mod ilp;
pub mod matcher;
pub mod model;
pub mod paths;
pub mod repair;

pub use error::Error;

use algorithms::{AlgorithmConfig, EmbeddingReport, Orchestrator};
use ilp::BranchAndBoundSolver;
use model::{Model, NetworkId};

/// # Embed virtual networks
///
/// Embed the pending virtual networks onto the substrate network, using the
/// [`BranchAndBoundSolver`]. See [`Orchestrator`] for a description of the pipeline.
pub fn embed(
    model: &mut Model,
    substrate: NetworkId,
    pending: &[NetworkId],
    config: AlgorithmConfig,
) -> Result<EmbeddingReport, Error> {
    let budget = config.solver_time_budget;
    let mut orchestrator = Orchestrator::new(config, || BranchAndBoundSolver::new(budget))?;
    orchestrator.run(model, substrate, pending)
}
