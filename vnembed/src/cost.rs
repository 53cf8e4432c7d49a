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

//! # Cost Model
//!
//! Costs are pure functions of a candidate and the current state of the model. The smaller the
//! cost, the better the placement. Node candidates always cost nothing; the objectives only differ
//! in how they charge for virtual links:
//!
//! | Objective                 | on a server | on a path with `h` hops, demand `b`, residual `r` |
//! |---------------------------|-------------|---------------------------------------------------|
//! | `TotalPathCost`           | 1           | `h`                                               |
//! | `TotalCommunicationCostA` | 0           | `b * h`                                           |
//! | `TotalCommunicationCostB` | 0           | `b`                                               |
//! | `TotalCommunicationCostC` | 0           | `h * b / r` (infinite if `r = 0`)                 |
//! | `TotalCommunicationCostD` | 0           | `b / (r - b)` (infinite if `r - b <= 0`)          |
//!
//! The residual `r` of a path is its [headroom](Model::path_headroom): if virtual links consume
//! bandwidth on every link of their path, a saturated link saturates every path crossing it.

use crate::matcher::Candidate;
use crate::model::{
    Bandwidth, LinkHost, Model, ModelError, NetworkId, SubstrateElement, VirtualElement,
};

/// Objective of the optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Minimize the total number of substrate hops used by virtual links
    TotalPathCost,
    /// Minimize bandwidth times hops
    TotalCommunicationCostA,
    /// Minimize the bandwidth of links that are split across hosts
    TotalCommunicationCostB,
    /// Bandwidth times hops, relative to the residual bandwidth of the path
    TotalCommunicationCostC,
    /// Inverse residual bandwidth after the placement, favoring load balancing
    TotalCommunicationCostD,
}

impl Default for Objective {
    fn default() -> Self {
        Self::TotalCommunicationCostA
    }
}

/// Cost of not embedding a virtual network at all
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectionCost {
    /// Same cost for every network
    Fixed(f64),
    /// Cost proportional to the resource footprint of the network (see
    /// [`Model::network_footprint`])
    Dynamic {
        /// Cost per unit of footprint
        factor: f64,
    },
}

impl Default for RejectionCost {
    fn default() -> Self {
        Self::Fixed(1_000_000.0)
    }
}

impl RejectionCost {
    /// Configured rejection cost of a virtual network.
    pub fn of(&self, model: &Model, network: NetworkId) -> Result<f64, ModelError> {
        Ok(match self {
            Self::Fixed(c) => *c,
            Self::Dynamic { factor } => factor * model.network_footprint(network)? as f64,
        })
    }
}

/// Cost of a candidate under the given objective. The result may be infinite, in which case the
/// candidate must not be chosen.
pub fn cost(model: &Model, candidate: &Candidate, objective: Objective) -> Result<f64, ModelError> {
    match (candidate.virtual_element, candidate.substrate_element) {
        (VirtualElement::Node(_), _) => Ok(0.0),
        (VirtualElement::Network(n), _) => {
            // all links of the network are co-located on the same server
            let links = model.network(n)?.links().len() as f64;
            Ok(links * colocated_cost(objective))
        }
        (VirtualElement::Link(_), SubstrateElement::Node(_)) => Ok(colocated_cost(objective)),
        (VirtualElement::Link(l), SubstrateElement::Link(s)) => {
            let demand = model.link(l)?.bandwidth();
            Ok(link_cost(objective, 1, demand, model.link(s)?.residual_bandwidth()))
        }
        (VirtualElement::Link(l), SubstrateElement::Path(p)) => {
            let demand = model.link(l)?.bandwidth();
            let hops = model.path(p)?.hops();
            Ok(link_cost(objective, hops, demand, model.path_headroom(p)?))
        }
    }
}

/// Cost of the current embedding of a virtual network. The residual bandwidth used in the
/// computation is the one before the link was placed.
pub fn embedded_cost(
    model: &Model,
    network: NetworkId,
    objective: Objective,
) -> Result<f64, ModelError> {
    let mut total = 0.0;
    for l in model.virtual_network(network)?.links() {
        let link = model.link(*l)?;
        let b = link.bandwidth();
        total += match link.host() {
            None => 0.0,
            Some(LinkHost::Node(_)) => colocated_cost(objective),
            Some(LinkHost::Link(s)) => {
                link_cost(objective, 1, b, model.link(s)?.residual_bandwidth() + b)
            }
            Some(LinkHost::Path(p)) => {
                let hops = model.path(p)?.hops();
                link_cost(objective, hops, b, model.path_headroom(p)? + b)
            }
        };
    }
    Ok(total)
}

/// Sum of [`embedded_cost`] over all guests of a substrate network.
pub fn total_cost(
    model: &Model,
    substrate: NetworkId,
    objective: Objective,
) -> Result<f64, ModelError> {
    let mut total = 0.0;
    for g in model.substrate(substrate)?.guests() {
        total += embedded_cost(model, *g, objective)?;
    }
    Ok(total)
}

fn colocated_cost(objective: Objective) -> f64 {
    match objective {
        Objective::TotalPathCost => 1.0,
        _ => 0.0,
    }
}

fn link_cost(objective: Objective, hops: usize, demand: Bandwidth, residual: Bandwidth) -> f64 {
    let h = hops as f64;
    let b = demand as f64;
    match objective {
        Objective::TotalPathCost => h,
        Objective::TotalCommunicationCostA => b * h,
        Objective::TotalCommunicationCostB => b,
        Objective::TotalCommunicationCostC => {
            if residual == 0 {
                f64::INFINITY
            } else {
                h * b / residual as f64
            }
        }
        Objective::TotalCommunicationCostD => {
            let after = residual as f64 - b;
            if after <= 0.0 {
                f64::INFINITY
            } else {
                b / after
            }
        }
    }
}
