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

//! # Embedding Applier
//!
//! Commits the solution of the linear program into the resource graph. Every network is committed
//! on its own: first all nodes, then all links, and finally the network itself. If any step fails,
//! the partial embedding of that network is released again, and the network is rejected.

use crate::algorithms::RejectReason;
use crate::ilp::{IlpSolution, Variable};
use crate::matcher::Candidate;
use crate::model::{printer, Model, ModelError, NetworkId, SubstrateElement, VirtualElement};
use crate::Error;

use log::*;
use std::collections::{BTreeMap, BTreeSet};

/// Result of applying a solution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOutcome {
    /// Networks that are now embedded
    pub embedded: Vec<NetworkId>,
    /// Networks that were not embedded, together with the reason
    pub rejected: BTreeMap<NetworkId, RejectReason>,
}

/// Commit the solution into the model.
pub fn apply_solution(
    model: &mut Model,
    substrate: NetworkId,
    solution: &IlpSolution,
) -> Result<ApplyOutcome, Error> {
    let mut outcome = ApplyOutcome::default();
    let networks: BTreeSet<NetworkId> = solution
        .variables
        .values()
        .filter_map(|v| match v {
            Variable::Reject(n) => Some(*n),
            _ => None,
        })
        .collect();

    if !solution.solution.feasible {
        warn!("The solver found no feasible solution, rejecting {} networks", networks.len());
        for n in networks {
            outcome.rejected.insert(n, RejectReason::Infeasible);
        }
        return Ok(outcome);
    }

    let mut chosen: BTreeMap<NetworkId, Vec<Candidate>> = BTreeMap::new();
    for v in solution.chosen() {
        match v {
            Variable::Reject(n) => {
                outcome.rejected.insert(n, RejectReason::Infeasible);
            }
            Variable::Candidate(c) => {
                chosen.entry(model.network_of(c.virtual_element)?).or_default().push(c)
            }
            Variable::Rack(_, _) => {}
        }
    }

    let accepted: Vec<NetworkId> =
        networks.into_iter().filter(|n| !outcome.rejected.contains_key(n)).collect();
    for n in accepted {
        let candidates = chosen.remove(&n).unwrap_or_default();
        match commit(model, n, substrate, &candidates) {
            Ok(()) => outcome.embedded.push(n),
            Err(e) => {
                warn!("Could not commit {}: {}", printer::network(model, n)?, e);
                model.unembed_network(n)?;
                outcome.rejected.insert(n, RejectReason::CommitFailed);
            }
        }
    }

    for n in outcome.rejected.keys() {
        info!("Rejected {}", printer::network(model, *n)?);
    }
    Ok(outcome)
}

/// Commit all candidates of a single network, nodes first.
fn commit(
    model: &mut Model,
    network: NetworkId,
    substrate: NetworkId,
    candidates: &[Candidate],
) -> Result<(), ModelError> {
    let (nodes, others): (Vec<&Candidate>, Vec<&Candidate>) =
        candidates.iter().partition(|c| !c.is_link());
    for c in nodes.into_iter().chain(others.into_iter()) {
        trace!(
            "Commit {}",
            printer::placement(model, c.virtual_element, c.substrate_element)?
        );
        match (c.virtual_element, c.substrate_element) {
            (VirtualElement::Network(v), SubstrateElement::Node(s)) => {
                let net = model.network(v)?;
                let (nodes, links) = (net.nodes().clone(), net.links().clone());
                for n in nodes {
                    model.embed_node(n, s)?;
                }
                for l in links {
                    model.embed_link_on_node(l, s)?;
                }
            }
            (VirtualElement::Node(v), SubstrateElement::Node(s)) => model.embed_node(v, s)?,
            (VirtualElement::Link(v), SubstrateElement::Node(s)) => model.embed_link_on_node(v, s)?,
            (VirtualElement::Link(v), SubstrateElement::Link(s)) => model.embed_link_on_link(v, s)?,
            (VirtualElement::Link(v), SubstrateElement::Path(p)) => model.embed_link_on_path(v, p)?,
            (v, s) => {
                return Err(ModelError::ConsistencyViolation(format!(
                    "invalid placement {:?} on {:?}",
                    v, s
                )))
            }
        }
    }
    model.embed_network(network, substrate)
}
