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

//! # Resource Graph
//!
//! This module contains the [`Model`], which owns all substrate and virtual networks, their nodes,
//! links and paths, as well as the embedding cross-references between them.

use crate::model::event::EventLog;
use crate::model::{
    Bandwidth, LinkHost, LinkId, ModelError, ModelEvent, NetworkId, NetworkKind, NodeId,
    NodeKind, PathId, Resources, SubstrateElement, VirtualElement,
};

use log::*;
use std::collections::{BTreeMap, BTreeSet};

/// Configuration of the resource graph
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// If set, embedding a virtual link onto a substrate path also consumes the bandwidth of every
    /// substrate link of that path, and registers the virtual link as a guest of those links.
    pub link_host_embeds_sublinks: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { link_host_embeds_sublinks: true }
    }
}

/// Substrate or virtual network
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub(crate) id: NetworkId,
    pub(crate) name: String,
    pub(crate) kind: NetworkKind,
    pub(crate) nodes: BTreeSet<NodeId>,
    pub(crate) links: BTreeSet<LinkId>,
    pub(crate) paths: BTreeSet<PathId>,
    pub(crate) host: Option<NetworkId>,
    pub(crate) guests: BTreeSet<NetworkId>,
}

impl Network {
    /// Id of the network
    pub fn id(&self) -> NetworkId {
        self.id
    }

    /// Name of the network
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the network
    pub fn kind(&self) -> NetworkKind {
        self.kind
    }

    /// Returns true if the network is a substrate network.
    pub fn is_substrate(&self) -> bool {
        self.kind == NetworkKind::Substrate
    }

    /// All nodes of the network
    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    /// All links of the network
    pub fn links(&self) -> &BTreeSet<LinkId> {
        &self.links
    }

    /// The path catalog (always empty for virtual networks)
    pub fn paths(&self) -> &BTreeSet<PathId> {
        &self.paths
    }

    /// Substrate network on which this virtual network is embedded.
    pub fn host(&self) -> Option<NetworkId> {
        self.host
    }

    /// Virtual networks embedded on this substrate network.
    pub fn guests(&self) -> &BTreeSet<NetworkId> {
        &self.guests
    }
}

/// Server or switch, either in a substrate or in a virtual network.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) network: NetworkId,
    pub(crate) kind: NodeKind,
    pub(crate) depth: u32,
    pub(crate) residual: Resources,
    pub(crate) host: Option<NodeId>,
    pub(crate) guests: BTreeSet<NodeId>,
    pub(crate) guest_links: BTreeSet<LinkId>,
    pub(crate) outgoing: BTreeSet<LinkId>,
    pub(crate) incoming: BTreeSet<LinkId>,
}

impl Node {
    /// Id of the node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name of the node
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Network of the node
    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Kind of the node, including the resources of servers.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Tier of the node in the topology (0 is the top-most tier).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Capacity (substrate) or demand (virtual). Zero for switches.
    pub fn resources(&self) -> Resources {
        self.kind.resources()
    }

    /// Residual capacity. Only meaningful for substrate servers, where it is the capacity minus
    /// the demand of all guest servers.
    pub fn residual(&self) -> Resources {
        self.residual
    }

    /// Substrate node hosting this virtual node.
    pub fn host(&self) -> Option<NodeId> {
        self.host
    }

    /// Virtual servers and switches embedded on this substrate node.
    pub fn guests(&self) -> &BTreeSet<NodeId> {
        &self.guests
    }

    /// Virtual links co-located on this substrate node.
    pub fn guest_links(&self) -> &BTreeSet<LinkId> {
        &self.guest_links
    }

    /// Links starting at this node
    pub fn outgoing(&self) -> &BTreeSet<LinkId> {
        &self.outgoing
    }

    /// Links ending at this node
    pub fn incoming(&self) -> &BTreeSet<LinkId> {
        &self.incoming
    }
}

/// Directed link between two nodes of the same network.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub(crate) id: LinkId,
    pub(crate) name: String,
    pub(crate) network: NetworkId,
    pub(crate) source: NodeId,
    pub(crate) target: NodeId,
    pub(crate) bandwidth: Bandwidth,
    pub(crate) residual_bandwidth: Bandwidth,
    pub(crate) host: Option<LinkHost>,
    pub(crate) guests: BTreeSet<LinkId>,
}

impl Link {
    /// Id of the link
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Name of the link
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Network of the link
    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Source node
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Target node
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Capacity (substrate) or demand (virtual)
    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    /// Residual bandwidth (substrate only)
    pub fn residual_bandwidth(&self) -> Bandwidth {
        self.residual_bandwidth
    }

    /// Host of this virtual link
    pub fn host(&self) -> Option<LinkHost> {
        self.host
    }

    /// Virtual links using this substrate link
    pub fn guests(&self) -> &BTreeSet<LinkId> {
        &self.guests
    }
}

/// Precomputed sequence of substrate links between two substrate nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub(crate) id: PathId,
    pub(crate) source: NodeId,
    pub(crate) target: NodeId,
    pub(crate) nodes: Vec<NodeId>,
    pub(crate) links: Vec<LinkId>,
    pub(crate) bandwidth: Bandwidth,
    pub(crate) residual_bandwidth: Bandwidth,
    pub(crate) guests: BTreeSet<LinkId>,
}

impl Path {
    /// Id of the path
    pub fn id(&self) -> PathId {
        self.id
    }

    /// First node of the path
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Last node of the path
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Ordered nodes, including source and target
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Ordered links
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// Number of links
    pub fn hops(&self) -> usize {
        self.links.len()
    }

    /// Minimum bandwidth of all links
    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    /// Bandwidth minus the demand of all guest links
    pub fn residual_bandwidth(&self) -> Bandwidth {
        self.residual_bandwidth
    }

    /// Virtual links embedded on this path
    pub fn guests(&self) -> &BTreeSet<LinkId> {
        &self.guests
    }
}

/// # Resource Graph
///
/// The model owns every network, node, link and path, and keeps the embedding cross-references
/// between virtual and substrate elements consistent. All elements are stored in arenas keyed by
/// their ids. References between elements are ids, and each relation is stored on both sides (a
/// virtual node knows its host, and the substrate node knows all its guests).
///
/// The model is the only place where residual capacities change: embedding an element reduces the
/// residual capacity of its host, and releasing it restores the capacity.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub(crate) config: ModelConfig,
    pub(crate) networks: BTreeMap<NetworkId, Network>,
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) links: BTreeMap<LinkId, Link>,
    pub(crate) paths: BTreeMap<PathId, Path>,
    pub(crate) orphans: BTreeSet<NetworkId>,
    pub(crate) events: EventLog,
    next_network: u32,
    next_node: u32,
    next_link: u32,
}

impl Model {
    /// Generate an empty model
    pub fn new(config: ModelConfig) -> Self {
        Self { config, ..Default::default() }
    }

    /// Configuration of the model
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Create a new, empty substrate network.
    pub fn add_substrate_network<S: Into<String>>(
        &mut self,
        name: S,
    ) -> Result<NetworkId, ModelError> {
        self.add_network(name.into(), NetworkKind::Substrate)
    }

    /// Create a new, empty virtual network.
    pub fn add_virtual_network<S: Into<String>>(
        &mut self,
        name: S,
    ) -> Result<NetworkId, ModelError> {
        self.add_network(name.into(), NetworkKind::Virtual)
    }

    fn add_network(&mut self, name: String, kind: NetworkKind) -> Result<NetworkId, ModelError> {
        if self.networks.values().any(|n| n.name == name) {
            return Err(ModelError::DuplicateName(name));
        }
        let id = NetworkId(self.next_network);
        self.next_network += 1;
        self.networks.insert(
            id,
            Network {
                id,
                name,
                kind,
                nodes: BTreeSet::new(),
                links: BTreeSet::new(),
                paths: BTreeSet::new(),
                host: None,
                guests: BTreeSet::new(),
            },
        );
        self.events.push(ModelEvent::NetworkAdded(id));
        Ok(id)
    }

    /// Add a server to the network. For substrate networks, `resources` is the capacity of the
    /// server, for virtual networks the demand.
    pub fn add_server<S: Into<String>>(
        &mut self,
        network: NetworkId,
        name: S,
        resources: Resources,
        depth: u32,
    ) -> Result<NodeId, ModelError> {
        self.add_node(network, name.into(), NodeKind::Server(resources), depth)
    }

    /// Add a switch to the network.
    pub fn add_switch<S: Into<String>>(
        &mut self,
        network: NetworkId,
        name: S,
        depth: u32,
    ) -> Result<NodeId, ModelError> {
        self.add_node(network, name.into(), NodeKind::Switch, depth)
    }

    fn add_node(
        &mut self,
        network: NetworkId,
        name: String,
        kind: NodeKind,
        depth: u32,
    ) -> Result<NodeId, ModelError> {
        let net = self.network(network)?;
        if net.nodes.iter().any(|n| self.nodes[n].name == name) {
            return Err(ModelError::DuplicateName(name));
        }
        let residual = match net.kind {
            NetworkKind::Substrate => kind.resources(),
            NetworkKind::Virtual => Resources::zero(),
        };
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                name,
                network,
                kind,
                depth,
                residual,
                host: None,
                guests: BTreeSet::new(),
                guest_links: BTreeSet::new(),
                outgoing: BTreeSet::new(),
                incoming: BTreeSet::new(),
            },
        );
        self.network_mut(network)?.nodes.insert(id);
        self.events.push(ModelEvent::NodeAdded(network, id));
        Ok(id)
    }

    /// Add a directed link between two nodes of the same network. For substrate networks,
    /// `bandwidth` is the capacity, for virtual networks the demand.
    pub fn add_link(
        &mut self,
        network: NetworkId,
        source: NodeId,
        target: NodeId,
        bandwidth: Bandwidth,
    ) -> Result<LinkId, ModelError> {
        for n in [source, target].iter() {
            if self.node(*n)?.network != network {
                return Err(ModelError::WrongNetwork(VirtualElement::Node(*n), network));
            }
        }
        let name = format!("{}->{}", self.nodes[&source].name, self.nodes[&target].name);
        let net = self.network(network)?;
        if net.links.iter().any(|l| self.links[l].name == name) {
            return Err(ModelError::DuplicateName(name));
        }
        let residual_bandwidth = match net.kind {
            NetworkKind::Substrate => bandwidth,
            NetworkKind::Virtual => 0,
        };
        let id = LinkId(self.next_link);
        self.next_link += 1;
        self.links.insert(
            id,
            Link {
                id,
                name,
                network,
                source,
                target,
                bandwidth,
                residual_bandwidth,
                host: None,
                guests: BTreeSet::new(),
            },
        );
        self.network_mut(network)?.links.insert(id);
        if let Some(n) = self.nodes.get_mut(&source) {
            n.outgoing.insert(id);
        }
        if let Some(n) = self.nodes.get_mut(&target) {
            n.incoming.insert(id);
        }
        self.events.push(ModelEvent::LinkAdded(network, id));
        Ok(id)
    }

    /// Add two links, one in each direction, with the same bandwidth.
    pub fn add_link_pair(
        &mut self,
        network: NetworkId,
        a: NodeId,
        b: NodeId,
        bandwidth: Bandwidth,
    ) -> Result<(LinkId, LinkId), ModelError> {
        Ok((self.add_link(network, a, b, bandwidth)?, self.add_link(network, b, a, bandwidth)?))
    }

    /// Replace the path catalog of a substrate network. Each entry is the ordered list of nodes
    /// and links of one path. The ids are assigned in the order of the given vector. Paths of the
    /// old catalog must not host any virtual link.
    pub(crate) fn replace_paths(
        &mut self,
        network: NetworkId,
        paths: Vec<(Vec<NodeId>, Vec<LinkId>)>,
    ) -> Result<Vec<PathId>, ModelError> {
        let net = self.substrate(network)?;
        if let Some(p) = net.paths.iter().find(|p| !self.paths[p].guests.is_empty()) {
            return Err(ModelError::ConsistencyViolation(format!(
                "path {:?} still hosts virtual links",
                p
            )));
        }

        // check every path before touching the catalog
        let mut new_paths = Vec::with_capacity(paths.len());
        for (index, (nodes, links)) in paths.into_iter().enumerate() {
            let id = PathId { network, index: index as u32 };
            let bandwidth = self.check_path(network, &nodes, &links)?;
            new_paths.push(Path {
                id,
                source: nodes[0],
                target: nodes[nodes.len() - 1],
                nodes,
                links,
                bandwidth,
                residual_bandwidth: bandwidth,
                guests: BTreeSet::new(),
            });
        }

        let old = std::mem::take(&mut self.network_mut(network)?.paths);
        for p in old {
            self.paths.remove(&p);
        }
        let ids: Vec<PathId> = new_paths.iter().map(|p| p.id).collect();
        self.network_mut(network)?.paths = ids.iter().cloned().collect();
        for p in new_paths {
            self.paths.insert(p.id, p);
        }
        debug!("Replaced the path catalog of {:?} with {} paths", network, ids.len());
        self.events.push(ModelEvent::PathsReplaced(network));
        Ok(ids)
    }

    /// Checks that the nodes and links form a connected sequence inside the network, and returns
    /// the bandwidth of the path.
    pub(crate) fn check_path(
        &self,
        network: NetworkId,
        nodes: &[NodeId],
        links: &[LinkId],
    ) -> Result<Bandwidth, ModelError> {
        if links.is_empty() || nodes.len() != links.len() + 1 {
            return Err(ModelError::InvalidPath(format!(
                "{} nodes and {} links",
                nodes.len(),
                links.len()
            )));
        }
        let mut bandwidth = Bandwidth::MAX;
        for (i, l) in links.iter().enumerate() {
            let link = self.link(*l)?;
            if link.network != network {
                return Err(ModelError::InvalidPath(format!("{:?} is in another network", l)));
            }
            if link.source != nodes[i] || link.target != nodes[i + 1] {
                return Err(ModelError::InvalidPath(format!("{:?} does not connect the nodes", l)));
            }
            bandwidth = bandwidth.min(link.bandwidth);
        }
        Ok(bandwidth)
    }

    /// Get a reference to a network
    pub fn network(&self, id: NetworkId) -> Result<&Network, ModelError> {
        self.networks.get(&id).ok_or(ModelError::NetworkNotFound(id))
    }

    pub(crate) fn network_mut(&mut self, id: NetworkId) -> Result<&mut Network, ModelError> {
        self.networks.get_mut(&id).ok_or(ModelError::NetworkNotFound(id))
    }

    /// Get a reference to a network, and make sure it is a substrate network.
    pub fn substrate(&self, id: NetworkId) -> Result<&Network, ModelError> {
        let net = self.network(id)?;
        if net.kind == NetworkKind::Substrate {
            Ok(net)
        } else {
            Err(ModelError::WrongNetworkKind(id, NetworkKind::Substrate))
        }
    }

    /// Get a reference to a network, and make sure it is a virtual network.
    pub fn virtual_network(&self, id: NetworkId) -> Result<&Network, ModelError> {
        let net = self.network(id)?;
        if net.kind == NetworkKind::Virtual {
            Ok(net)
        } else {
            Err(ModelError::WrongNetworkKind(id, NetworkKind::Virtual))
        }
    }

    /// Get a reference to a node
    pub fn node(&self, id: NodeId) -> Result<&Node, ModelError> {
        self.nodes.get(&id).ok_or(ModelError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, ModelError> {
        self.nodes.get_mut(&id).ok_or(ModelError::NodeNotFound(id))
    }

    /// Get a reference to a link
    pub fn link(&self, id: LinkId) -> Result<&Link, ModelError> {
        self.links.get(&id).ok_or(ModelError::LinkNotFound(id))
    }

    pub(crate) fn link_mut(&mut self, id: LinkId) -> Result<&mut Link, ModelError> {
        self.links.get_mut(&id).ok_or(ModelError::LinkNotFound(id))
    }

    /// Get a reference to a path
    pub fn path(&self, id: PathId) -> Result<&Path, ModelError> {
        self.paths.get(&id).ok_or(ModelError::PathNotFound(id))
    }

    pub(crate) fn path_mut(&mut self, id: PathId) -> Result<&mut Path, ModelError> {
        self.paths.get_mut(&id).ok_or(ModelError::PathNotFound(id))
    }

    /// Iterate over all networks, ordered by id.
    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    /// Returns the id of the network with the given name.
    pub fn network_by_name(&self, name: &str) -> Result<NetworkId, ModelError> {
        self.networks
            .values()
            .find(|n| n.name == name)
            .map(|n| n.id)
            .ok_or_else(|| ModelError::NameNotFound(name.to_string()))
    }

    /// Returns the id of the node with the given name inside the network.
    pub fn node_by_name(&self, network: NetworkId, name: &str) -> Result<NodeId, ModelError> {
        self.network(network)?
            .nodes
            .iter()
            .find(|n| self.nodes[n].name == name)
            .cloned()
            .ok_or_else(|| ModelError::NameNotFound(name.to_string()))
    }

    /// All servers of the network, ordered by id.
    pub fn servers(&self, network: NetworkId) -> Result<Vec<NodeId>, ModelError> {
        Ok(self
            .network(network)?
            .nodes
            .iter()
            .filter(|n| self.nodes[n].kind.is_server())
            .cloned()
            .collect())
    }

    /// All switches of the network, ordered by id.
    pub fn switches(&self, network: NetworkId) -> Result<Vec<NodeId>, ModelError> {
        Ok(self
            .network(network)?
            .nodes
            .iter()
            .filter(|n| self.nodes[n].kind.is_switch())
            .cloned()
            .collect())
    }

    /// Virtual servers embedded on a substrate node
    pub fn guest_servers(&self, node: NodeId) -> Result<Vec<NodeId>, ModelError> {
        Ok(self
            .node(node)?
            .guests
            .iter()
            .filter(|g| self.nodes.get(g).map(|n| n.kind.is_server()).unwrap_or(false))
            .cloned()
            .collect())
    }

    /// Virtual switches embedded on a substrate node
    pub fn guest_switches(&self, node: NodeId) -> Result<Vec<NodeId>, ModelError> {
        Ok(self
            .node(node)?
            .guests
            .iter()
            .filter(|g| self.nodes.get(g).map(|n| n.kind.is_switch()).unwrap_or(false))
            .cloned()
            .collect())
    }

    /// Sum of the server resources of a network. For virtual networks, this is the total demand,
    /// for substrate networks the total capacity.
    pub fn network_demand(&self, network: NetworkId) -> Result<Resources, ModelError> {
        Ok(self.network(network)?.nodes.iter().map(|n| self.nodes[n].resources()).sum())
    }

    /// Sum of the link bandwidths of a network.
    pub fn network_bandwidth(&self, network: NetworkId) -> Result<Bandwidth, ModelError> {
        Ok(self.network(network)?.links.iter().map(|l| self.links[l].bandwidth).sum())
    }

    /// Aggregate resource footprint of a network: all server resources plus all link bandwidths.
    pub fn network_footprint(&self, network: NetworkId) -> Result<u64, ModelError> {
        Ok(self.network_demand(network)?.total() + self.network_bandwidth(network)?)
    }

    /// Sum of the residual server resources of a substrate network.
    pub fn total_residual(&self, network: NetworkId) -> Result<Resources, ModelError> {
        Ok(self.substrate(network)?.nodes.iter().map(|n| self.nodes[n].residual).sum())
    }

    /// Bandwidth that can still be placed on a path. If the model embeds virtual links on every
    /// link of a path, this is the smallest residual of the path and of its links.
    pub fn path_headroom(&self, path: PathId) -> Result<Bandwidth, ModelError> {
        let p = self.path(path)?;
        let mut headroom = p.residual_bandwidth;
        if self.config.link_host_embeds_sublinks {
            for l in p.links.iter() {
                headroom = headroom.min(self.link(*l)?.residual_bandwidth);
            }
        }
        Ok(headroom)
    }

    /// Rack of every node of a substrate network, given by its top-of-rack switch.
    ///
    /// The rack of a server is the neighboring switch one tier above it (the one with the smallest
    /// id, if there are multiple). A server without such a switch forms a rack on its own. A switch
    /// belongs to a rack only if it is the top-of-rack switch of some server; switches in the
    /// upper tiers are missing from the result.
    pub fn racks(&self, network: NetworkId) -> Result<BTreeMap<NodeId, NodeId>, ModelError> {
        let mut racks = BTreeMap::new();
        for s in self.servers(network)? {
            let server = self.node(s)?;
            let mut tor: Option<NodeId> = None;
            for l in server.outgoing.iter() {
                let neighbor = self.node(self.link(*l)?.target)?;
                if neighbor.kind.is_switch()
                    && neighbor.depth + 1 == server.depth
                    && tor.map(|t| neighbor.id < t).unwrap_or(true)
                {
                    tor = Some(neighbor.id);
                }
            }
            let rack = tor.unwrap_or(s);
            racks.insert(s, rack);
            racks.insert(rack, rack);
        }
        Ok(racks)
    }

    /// Returns true if the virtual network is embedded at the network level.
    pub fn is_embedded(&self, network: NetworkId) -> Result<bool, ModelError> {
        Ok(self.virtual_network(network)?.host.is_some())
    }

    /// Returns all elements of a virtual network, nodes first, then links.
    pub fn elements(&self, network: NetworkId) -> Result<Vec<VirtualElement>, ModelError> {
        let net = self.network(network)?;
        Ok(net
            .nodes
            .iter()
            .map(|n| VirtualElement::Node(*n))
            .chain(net.links.iter().map(|l| VirtualElement::Link(*l)))
            .collect())
    }

    /// Returns the network that owns a virtual element.
    pub fn network_of(&self, element: VirtualElement) -> Result<NetworkId, ModelError> {
        match element {
            VirtualElement::Network(n) => self.network(n).map(|n| n.id),
            VirtualElement::Node(n) => self.node(n).map(|n| n.network),
            VirtualElement::Link(l) => self.link(l).map(|l| l.network),
        }
    }

    /// Returns true if the virtual element currently has a host.
    pub fn is_hosted(&self, element: VirtualElement) -> Result<bool, ModelError> {
        Ok(match element {
            VirtualElement::Network(n) => self.network(n)?.host.is_some(),
            VirtualElement::Node(n) => self.node(n)?.host.is_some(),
            VirtualElement::Link(l) => self.link(l)?.host.is_some(),
        })
    }

    /// Current placement of every hosted element of a virtual network, nodes first, then links.
    pub fn hosts_of(
        &self,
        network: NetworkId,
    ) -> Result<Vec<(VirtualElement, SubstrateElement)>, ModelError> {
        let mut result = Vec::new();
        for e in self.elements(network)? {
            let host = match e {
                VirtualElement::Node(n) => self.node(n)?.host.map(SubstrateElement::Node),
                VirtualElement::Link(l) => self.link(l)?.host.map(SubstrateElement::from),
                VirtualElement::Network(_) => None,
            };
            if let Some(h) = host {
                result.push((e, h));
            }
        }
        Ok(result)
    }

    /// Current position of the event log. Pass it to [`Model::events_since`] to get all changes
    /// that happen afterwards.
    pub fn event_cursor(&self) -> usize {
        self.events.cursor()
    }

    /// All events that happened after the given cursor.
    pub fn events_since(&self, cursor: usize) -> &[ModelEvent] {
        self.events.since(cursor)
    }

    /// Returns true if the topology of the substrate network changed after its path catalog was
    /// last replaced, or if the catalog was never generated.
    pub fn paths_outdated(&self, network: NetworkId) -> Result<bool, ModelError> {
        self.substrate(network)?;
        let events = self.events.since(0);
        let start = match events.iter().rposition(|e| *e == ModelEvent::PathsReplaced(network)) {
            Some(pos) => pos + 1,
            None => return Ok(true),
        };
        Ok(events[start..].iter().any(|e| match e {
            ModelEvent::NodeAdded(n, _)
            | ModelEvent::NodeRemoved(n, _)
            | ModelEvent::LinkAdded(n, _)
            | ModelEvent::LinkRemoved(n, _) => *n == network,
            _ => false,
        }))
    }

    /// Returns and clears the set of virtual networks that were force-detached because their
    /// substrate network was removed.
    pub fn take_orphans(&mut self) -> BTreeSet<NetworkId> {
        std::mem::take(&mut self.orphans)
    }
}
