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

//! # Candidate Matcher
//!
//! The matcher computes the set of *candidates*, which are the structurally feasible placements of
//! the elements of pending virtual networks onto the elements of a substrate network. Resource
//! sufficiency is not checked here; this is left to the capacity constraints of the
//! [ILP builder](crate::ilp::IlpDeltaBuilder).
//!
//! The following rules define a candidate:
//! - A virtual server can be placed on a substrate server.
//! - A virtual switch can be placed on a substrate server or a substrate switch.
//! - A virtual link can be placed on a substrate server, if both of its endpoints have that server
//!   as candidate.
//! - A virtual link can be placed on a substrate path, if the source of the path is a candidate of
//!   the source of the link, and the target of the path is a candidate of the target of the link.
//!
//! Two implementations of the [`CandidateMatcher`] trait exist: the [`FullMatcher`] recomputes all
//! candidates on every run, and the [`IncrementalMatcher`] only recomputes the candidates of
//! networks touched by a change of the model. Both return the same candidates for the same state.

mod full;
mod incremental;

pub use full::FullMatcher;
pub use incremental::IncrementalMatcher;

use crate::model::{
    LinkId, Model, ModelError, NetworkId, NodeId, PathId, SubstrateElement, VirtualElement,
};

use itertools::iproduct;
use std::collections::{BTreeMap, BTreeSet};

/// Kind of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CandidateKind {
    /// An entire virtual network on a single substrate server
    NetworkToServer,
    /// A virtual server on a substrate server
    ServerToServer,
    /// A virtual switch on a substrate server
    SwitchToServer,
    /// A virtual switch on a substrate switch
    SwitchToSwitch,
    /// A virtual link co-located on a substrate server
    LinkToServer,
    /// A virtual link on a substrate path
    LinkToPath,
}

/// Structurally feasible placement of a virtual element onto a substrate element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Candidate {
    /// The element to place
    pub virtual_element: VirtualElement,
    /// The host
    pub substrate_element: SubstrateElement,
    /// Kind of placement
    pub kind: CandidateKind,
}

impl Candidate {
    /// Returns true if the candidate places a virtual node.
    pub fn is_node(&self) -> bool {
        matches!(self.virtual_element, VirtualElement::Node(_))
    }

    /// Returns true if the candidate places a virtual link.
    pub fn is_link(&self) -> bool {
        matches!(self.virtual_element, VirtualElement::Link(_))
    }
}

/// Which placements the matcher considers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateScope {
    /// Every node and link candidate
    Full,
    /// Only entire networks on single substrate servers
    SingleServer,
    /// Node and link candidates, but only paths with at most the given number of hops
    MaxPathHops(usize),
    /// Node and link candidates within racks (see [`Model::racks`]). Nodes are only placed on
    /// servers and top-of-rack switches, and links only on paths with at most two hops that
    /// connect two nodes of the same rack. The [builder](crate::ilp::IlpDeltaBuilder) in addition
    /// keeps all nodes of a network within a single rack.
    Rack,
}

/// Result of one matcher run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateDelta {
    /// Candidates that became available since the last run, sorted.
    pub added: Vec<Candidate>,
}

impl CandidateDelta {
    /// Returns true if no new candidate was found.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }
}

/// Which matcher implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// [`FullMatcher`]
    Full,
    /// [`IncrementalMatcher`]
    Incremental,
}

/// Trait of a candidate matcher. A matcher is created for one substrate network and a set of
/// pending virtual networks. Candidates never disappear from a matcher: after a mutation that
/// invalidates candidates (like removing a substrate node), the matcher must be
/// [reset](Self::reset).
pub trait CandidateMatcher {
    /// Returns all candidates that became available since the last call.
    fn run(&mut self, model: &Model) -> Result<CandidateDelta, ModelError>;

    /// Forget everything, such that the next run returns all candidates again.
    fn reset(&mut self);
}

/// Create a boxed matcher of the given kind.
pub fn new_matcher(
    kind: MatcherKind,
    substrate: NetworkId,
    pending: &[NetworkId],
    scope: CandidateScope,
) -> Box<dyn CandidateMatcher> {
    match kind {
        MatcherKind::Full => Box::new(FullMatcher::new(substrate, pending, scope)),
        MatcherKind::Incremental => Box::new(IncrementalMatcher::new(substrate, pending, scope)),
    }
}

/// Substrate view used to compute candidates: servers, switches, and paths indexed by their
/// endpoints.
pub(crate) struct SubstrateIndex {
    servers: Vec<NodeId>,
    switches: Vec<NodeId>,
    paths: BTreeMap<(NodeId, NodeId), Vec<PathId>>,
}

impl SubstrateIndex {
    pub(crate) fn new(
        model: &Model,
        substrate: NetworkId,
        scope: CandidateScope,
    ) -> Result<Self, ModelError> {
        let net = model.substrate(substrate)?;
        let max_hops = match scope {
            CandidateScope::MaxPathHops(h) => h,
            CandidateScope::Rack => 2,
            _ => usize::MAX,
        };
        let racks = match scope {
            CandidateScope::Rack => Some(model.racks(substrate)?),
            _ => None,
        };
        let same_rack = |a: NodeId, b: NodeId| match racks.as_ref() {
            Some(r) => r.contains_key(&a) && r.get(&a) == r.get(&b),
            None => true,
        };
        let mut paths: BTreeMap<(NodeId, NodeId), Vec<PathId>> = BTreeMap::new();
        for p in net.paths() {
            let path = model.path(*p)?;
            if path.hops() <= max_hops && same_rack(path.source(), path.target()) {
                paths.entry((path.source(), path.target())).or_default().push(*p);
            }
        }
        let mut switches = model.switches(substrate)?;
        if let Some(r) = racks.as_ref() {
            switches.retain(|s| r.contains_key(s));
        }
        Ok(Self { servers: model.servers(substrate)?, switches, paths })
    }
}

/// Compute all candidates of one virtual network.
pub(crate) fn network_candidates(
    model: &Model,
    index: &SubstrateIndex,
    network: NetworkId,
    scope: CandidateScope,
) -> Result<BTreeSet<Candidate>, ModelError> {
    let net = model.virtual_network(network)?;
    let mut result = BTreeSet::new();

    if scope == CandidateScope::SingleServer {
        for s in index.servers.iter() {
            result.insert(Candidate {
                virtual_element: VirtualElement::Network(network),
                substrate_element: SubstrateElement::Node(*s),
                kind: CandidateKind::NetworkToServer,
            });
        }
        return Ok(result);
    }

    let mut hosts: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for v in net.nodes() {
        let node = model.node(*v)?;
        let mut h = BTreeSet::new();
        if node.kind().is_server() {
            for s in index.servers.iter() {
                h.insert(*s);
                result.insert(node_candidate(*v, *s, CandidateKind::ServerToServer));
            }
        } else {
            for s in index.servers.iter() {
                h.insert(*s);
                result.insert(node_candidate(*v, *s, CandidateKind::SwitchToServer));
            }
            for s in index.switches.iter() {
                h.insert(*s);
                result.insert(node_candidate(*v, *s, CandidateKind::SwitchToSwitch));
            }
        }
        hosts.insert(*v, h);
    }

    for l in net.links() {
        let link = model.link(*l)?;
        let (src, tgt) = (&hosts[&link.source()], &hosts[&link.target()]);
        for s in index.servers.iter() {
            if src.contains(s) && tgt.contains(s) {
                let host = SubstrateElement::Node(*s);
                result.insert(link_candidate(*l, host, CandidateKind::LinkToServer));
            }
        }
        for (a, b) in iproduct!(src.iter(), tgt.iter()).filter(|(a, b)| a != b) {
            for p in index.paths.get(&(*a, *b)).into_iter().flatten() {
                let host = SubstrateElement::Path(*p);
                result.insert(link_candidate(*l, host, CandidateKind::LinkToPath));
            }
        }
    }

    Ok(result)
}

fn node_candidate(v: NodeId, s: NodeId, kind: CandidateKind) -> Candidate {
    Candidate {
        virtual_element: VirtualElement::Node(v),
        substrate_element: SubstrateElement::Node(s),
        kind,
    }
}

fn link_candidate(v: LinkId, s: SubstrateElement, kind: CandidateKind) -> Candidate {
    Candidate { virtual_element: VirtualElement::Link(v), substrate_element: s, kind }
}
