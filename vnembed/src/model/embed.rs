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

//! Embedding, releasing and removing elements of the resource graph.
//!
//! Every operation in this module either succeeds completely, or returns an error without changing
//! the model. Residual capacities of substrate elements are only ever changed here.

use crate::model::model::Model;
use crate::model::{
    Bandwidth, LinkHost, LinkId, ModelError, ModelEvent, NetworkId, NetworkKind, NodeId, NodeKind,
    PathId, SubstrateElement, VirtualElement,
};

use log::*;

impl Model {
    /// Embed a virtual server or switch onto a substrate node. Servers can only be placed on
    /// servers, switches can be placed on both servers and switches. The demand of a virtual
    /// server is subtracted from the residual capacity of its host.
    pub fn embed_node(
        &mut self,
        virtual_node: NodeId,
        substrate_node: NodeId,
    ) -> Result<(), ModelError> {
        let v = self.node(virtual_node)?;
        let vnet = v.network;
        self.virtual_network(vnet)?;
        let s = self.node(substrate_node)?;
        let snet = self.substrate(s.network)?;
        self.check_network_host(vnet, snet.id, VirtualElement::Node(virtual_node))?;
        if v.host.is_some() {
            return Err(ModelError::AlreadyEmbedded(VirtualElement::Node(virtual_node)));
        }
        match (v.kind, s.kind) {
            (NodeKind::Server(_), NodeKind::Server(_)) | (NodeKind::Switch, _) => {}
            _ => return Err(ModelError::NodeKindMismatch(virtual_node, substrate_node)),
        }
        let residual = s
            .residual
            .checked_sub(&v.resources())
            .ok_or(ModelError::InsufficientCapacity(SubstrateElement::Node(substrate_node)))?;

        let s = self.node_mut(substrate_node)?;
        s.residual = residual;
        s.guests.insert(virtual_node);
        self.node_mut(virtual_node)?.host = Some(substrate_node);
        self.events.push(ModelEvent::Embedded(vnet, VirtualElement::Node(virtual_node)));
        Ok(())
    }

    /// Embed a virtual link onto a single substrate node. Both endpoints of the link must already
    /// be hosted on that node. No bandwidth is consumed.
    pub fn embed_link_on_node(
        &mut self,
        virtual_link: LinkId,
        substrate_node: NodeId,
    ) -> Result<(), ModelError> {
        let vnet = self.check_link_endpoints(virtual_link, substrate_node, substrate_node)?;
        self.substrate(self.node(substrate_node)?.network)?;

        self.node_mut(substrate_node)?.guest_links.insert(virtual_link);
        self.link_mut(virtual_link)?.host = Some(LinkHost::Node(substrate_node));
        self.events.push(ModelEvent::Embedded(vnet, VirtualElement::Link(virtual_link)));
        Ok(())
    }

    /// Embed a virtual link onto a single substrate link, connecting the hosts of its endpoints.
    ///
    /// The orchestrator never produces such placements, as it routes every virtual link over a
    /// path of the catalog (which covers single links as one-hop paths). This operation is meant
    /// for callers that restore or construct an embedding by hand, independent of the catalog.
    /// Such placements are understood by the rest of the crate: they are validated, released,
    /// repaired when the link disappears, committed by the [applier](crate::applier), and priced
    /// by the [cost model](crate::cost).
    pub fn embed_link_on_link(
        &mut self,
        virtual_link: LinkId,
        substrate_link: LinkId,
    ) -> Result<(), ModelError> {
        let s = self.link(substrate_link)?;
        let (source, target) = (s.source, s.target);
        self.substrate(s.network)?;
        let vnet = self.check_link_endpoints(virtual_link, source, target)?;
        let demand = self.links[&virtual_link].bandwidth;
        let residual = self.links[&substrate_link]
            .residual_bandwidth
            .checked_sub(demand)
            .ok_or(ModelError::InsufficientCapacity(SubstrateElement::Link(substrate_link)))?;

        let s = self.link_mut(substrate_link)?;
        s.residual_bandwidth = residual;
        s.guests.insert(virtual_link);
        self.link_mut(virtual_link)?.host = Some(LinkHost::Link(substrate_link));
        self.events.push(ModelEvent::Embedded(vnet, VirtualElement::Link(virtual_link)));
        Ok(())
    }

    /// Embed a virtual link onto a substrate path, connecting the hosts of its endpoints. If the
    /// model is configured with `link_host_embeds_sublinks`, the bandwidth is also consumed on
    /// every link of the path.
    pub fn embed_link_on_path(
        &mut self,
        virtual_link: LinkId,
        path: PathId,
    ) -> Result<(), ModelError> {
        let p = self.path(path)?;
        let (source, target) = (p.source, p.target);
        let vnet = self.check_link_endpoints(virtual_link, source, target)?;
        let demand = self.links[&virtual_link].bandwidth;
        let p = &self.paths[&path];
        let residual = p
            .residual_bandwidth
            .checked_sub(demand)
            .ok_or(ModelError::InsufficientCapacity(SubstrateElement::Path(path)))?;
        let sublinks = if self.config.link_host_embeds_sublinks {
            let mut sublinks = Vec::with_capacity(p.links.len());
            for l in p.links.iter() {
                let r = self
                    .link(*l)?
                    .residual_bandwidth
                    .checked_sub(demand)
                    .ok_or(ModelError::InsufficientCapacity(SubstrateElement::Link(*l)))?;
                sublinks.push((*l, r));
            }
            sublinks
        } else {
            Vec::new()
        };

        let p = self.path_mut(path)?;
        p.residual_bandwidth = residual;
        p.guests.insert(virtual_link);
        for (l, r) in sublinks {
            let link = self.link_mut(l)?;
            link.residual_bandwidth = r;
            link.guests.insert(virtual_link);
        }
        self.link_mut(virtual_link)?.host = Some(LinkHost::Path(path));
        self.events.push(ModelEvent::Embedded(vnet, VirtualElement::Link(virtual_link)));
        Ok(())
    }

    /// Mark a virtual network as embedded on the substrate network. This only succeeds if every
    /// node and link of the virtual network is already hosted by an element of that substrate.
    pub fn embed_network(
        &mut self,
        network: NetworkId,
        substrate: NetworkId,
    ) -> Result<(), ModelError> {
        let net = self.virtual_network(network)?;
        if net.host.is_some() {
            return Err(ModelError::AlreadyEmbedded(VirtualElement::Network(network)));
        }
        self.substrate(substrate)?;
        for e in self.elements(network)? {
            match self.host_network(e)? {
                None => return Err(ModelError::ElementsNotHosted(network)),
                Some(h) if h != substrate => return Err(ModelError::WrongNetwork(e, substrate)),
                Some(_) => {}
            }
        }

        self.network_mut(network)?.host = Some(substrate);
        self.network_mut(substrate)?.guests.insert(network);
        self.events.push(ModelEvent::Embedded(network, VirtualElement::Network(network)));
        info!(
            "Embedded {} on {}",
            self.networks[&network].name, self.networks[&substrate].name
        );
        Ok(())
    }

    /// Release every element of the virtual network that still has a host, restoring the residual
    /// capacities it consumed, and finally clear the network-level host. Calling this function on
    /// a network that is not embedded releases whatever elements are still hosted, and is a no-op
    /// otherwise.
    pub fn unembed_network(&mut self, network: NetworkId) -> Result<(), ModelError> {
        let net = self.virtual_network(network)?;
        let links: Vec<LinkId> = net.links.iter().cloned().collect();
        let nodes: Vec<NodeId> = net.nodes.iter().cloned().collect();
        let host = net.host;

        for l in links {
            self.release_link(l)?;
        }
        for n in nodes {
            self.release_node(n)?;
        }
        if let Some(h) = host {
            if let Some(s) = self.networks.get_mut(&h) {
                s.guests.remove(&network);
            }
            self.network_mut(network)?.host = None;
            self.events.push(ModelEvent::Released(network, VirtualElement::Network(network)));
            info!("Unembedded {}", self.networks[&network].name);
        }
        Ok(())
    }

    /// Release a virtual node from its host, restoring the residual capacity.
    pub(crate) fn release_node(&mut self, virtual_node: NodeId) -> Result<(), ModelError> {
        let v = self.node(virtual_node)?;
        let (host, demand, vnet) = match v.host {
            Some(h) => (h, v.resources(), v.network),
            None => return Ok(()),
        };
        if let Some(s) = self.nodes.get_mut(&host) {
            s.guests.remove(&virtual_node);
            s.residual += demand;
            if !s.residual.fits_into(&s.kind.resources()) {
                return Err(ModelError::ConsistencyViolation(format!(
                    "residual of {:?} exceeds its capacity",
                    host
                )));
            }
        }
        self.node_mut(virtual_node)?.host = None;
        self.events.push(ModelEvent::Released(vnet, VirtualElement::Node(virtual_node)));
        Ok(())
    }

    /// Release a virtual link from its host, restoring the bandwidth.
    pub(crate) fn release_link(&mut self, virtual_link: LinkId) -> Result<(), ModelError> {
        let v = self.link(virtual_link)?;
        let (host, demand, vnet) = match v.host {
            Some(h) => (h, v.bandwidth, v.network),
            None => return Ok(()),
        };
        match host {
            LinkHost::Node(n) => {
                if let Some(s) = self.nodes.get_mut(&n) {
                    s.guest_links.remove(&virtual_link);
                }
            }
            LinkHost::Link(l) => {
                if let Some(s) = self.links.get_mut(&l) {
                    s.guests.remove(&virtual_link);
                    let element = SubstrateElement::Link(l);
                    restore(&mut s.residual_bandwidth, s.bandwidth, demand, element)?;
                }
            }
            LinkHost::Path(p) => {
                let sublinks = match self.paths.get_mut(&p) {
                    Some(path) => {
                        path.guests.remove(&virtual_link);
                        restore(
                            &mut path.residual_bandwidth,
                            path.bandwidth,
                            demand,
                            SubstrateElement::Path(p),
                        )?;
                        path.links.clone()
                    }
                    None => Vec::new(),
                };
                if self.config.link_host_embeds_sublinks {
                    for l in sublinks {
                        if let Some(s) = self.links.get_mut(&l) {
                            if s.guests.remove(&virtual_link) {
                                restore(
                                    &mut s.residual_bandwidth,
                                    s.bandwidth,
                                    demand,
                                    SubstrateElement::Link(l),
                                )?;
                            }
                        }
                    }
                }
            }
        }
        self.link_mut(virtual_link)?.host = None;
        self.events.push(ModelEvent::Released(vnet, VirtualElement::Link(virtual_link)));
        Ok(())
    }

    /// Remove a node out-of-band. All links of the node are removed as well. For substrate nodes,
    /// every virtual element hosted on the node (or on a removed link or path) is released, which
    /// leaves the guest networks *floating* until they are repaired.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), ModelError> {
        let n = self.node(node)?;
        let network = n.network;
        let guests: Vec<NodeId> = n.guests.iter().cloned().collect();
        let guest_links: Vec<LinkId> = n.guest_links.iter().cloned().collect();
        let incident: Vec<LinkId> = n.outgoing.union(&n.incoming).cloned().collect();

        for l in guest_links {
            self.release_link(l)?;
        }
        for g in guests {
            self.release_node(g)?;
        }
        for l in incident {
            if self.links.contains_key(&l) {
                self.remove_link(l)?;
            }
        }
        self.release_node(node)?;

        self.nodes.remove(&node);
        self.network_mut(network)?.nodes.remove(&node);
        self.events.push(ModelEvent::NodeRemoved(network, node));
        debug!("Removed node {:?} from {:?}", node, network);
        Ok(())
    }

    /// Remove a link out-of-band. Removing a substrate link releases all virtual links using it,
    /// and removes every path traversing it.
    pub fn remove_link(&mut self, link: LinkId) -> Result<(), ModelError> {
        let l = self.link(link)?;
        let (network, source, target) = (l.network, l.source, l.target);
        let guests: Vec<LinkId> = l.guests.iter().cloned().collect();

        for g in guests {
            self.release_link(g)?;
        }
        let paths: Vec<PathId> = self
            .network(network)?
            .paths
            .iter()
            .filter(|p| self.paths[p].links.contains(&link))
            .cloned()
            .collect();
        for p in paths {
            self.remove_path(p)?;
        }
        self.release_link(link)?;

        if let Some(n) = self.nodes.get_mut(&source) {
            n.outgoing.remove(&link);
        }
        if let Some(n) = self.nodes.get_mut(&target) {
            n.incoming.remove(&link);
        }
        self.links.remove(&link);
        self.network_mut(network)?.links.remove(&link);
        self.events.push(ModelEvent::LinkRemoved(network, link));
        debug!("Removed link {:?} from {:?}", link, network);
        Ok(())
    }

    fn remove_path(&mut self, path: PathId) -> Result<(), ModelError> {
        let guests: Vec<LinkId> = self.path(path)?.guests.iter().cloned().collect();
        for g in guests {
            self.release_link(g)?;
        }
        self.paths.remove(&path);
        self.network_mut(path.network)?.paths.remove(&path);
        Ok(())
    }

    /// Remove an entire network. Removing a virtual network first unembeds it. Removing a
    /// substrate network force-detaches all its guests; they are recorded as orphans (see
    /// [`Model::take_orphans`]).
    pub fn remove_network(&mut self, network: NetworkId) -> Result<(), ModelError> {
        let net = self.network(network)?;
        let kind = net.kind;
        let guests: Vec<NetworkId> = net.guests.iter().cloned().collect();
        let nodes: Vec<NodeId> = net.nodes.iter().cloned().collect();

        match kind {
            NetworkKind::Substrate => {
                for g in guests {
                    self.unembed_network(g)?;
                    warn!("{} lost its substrate network", self.networks[&g].name);
                    self.orphans.insert(g);
                }
            }
            NetworkKind::Virtual => self.unembed_network(network)?,
        }
        for n in nodes {
            self.remove_node(n)?;
        }

        let net = self.networks.remove(&network).ok_or(ModelError::NetworkNotFound(network))?;
        self.orphans.remove(&network);
        self.events.push(ModelEvent::NetworkRemoved(network));
        info!("Removed network {}", net.name);
        Ok(())
    }

    /// Returns the substrate network hosting the element, if it has a host.
    pub fn host_network(&self, element: VirtualElement) -> Result<Option<NetworkId>, ModelError> {
        Ok(match element {
            VirtualElement::Network(n) => self.network(n)?.host,
            VirtualElement::Node(n) => match self.node(n)?.host {
                Some(h) => Some(self.node(h)?.network),
                None => None,
            },
            VirtualElement::Link(l) => match self.link(l)?.host {
                Some(LinkHost::Node(h)) => Some(self.node(h)?.network),
                Some(LinkHost::Link(h)) => Some(self.link(h)?.network),
                Some(LinkHost::Path(p)) => Some(p.network),
                None => None,
            },
        })
    }

    /// Make sure that the virtual link is unhosted and that its endpoints are placed on `source`
    /// and `target`. Returns the virtual network of the link.
    fn check_link_endpoints(
        &self,
        virtual_link: LinkId,
        source: NodeId,
        target: NodeId,
    ) -> Result<NetworkId, ModelError> {
        let v = self.link(virtual_link)?;
        self.virtual_network(v.network)?;
        if v.host.is_some() {
            return Err(ModelError::AlreadyEmbedded(VirtualElement::Link(virtual_link)));
        }
        if self.node(v.source)?.host != Some(source) || self.node(v.target)?.host != Some(target) {
            return Err(ModelError::HostMismatch(virtual_link));
        }
        Ok(v.network)
    }

    /// A virtual network that is already embedded may only receive hosts from its own substrate.
    fn check_network_host(
        &self,
        network: NetworkId,
        substrate: NetworkId,
        element: VirtualElement,
    ) -> Result<(), ModelError> {
        match self.network(network)?.host {
            Some(h) if h != substrate => Err(ModelError::WrongNetwork(element, h)),
            _ => Ok(()),
        }
    }
}

fn restore(
    residual: &mut Bandwidth,
    capacity: Bandwidth,
    amount: Bandwidth,
    element: SubstrateElement,
) -> Result<(), ModelError> {
    let new = *residual + amount;
    if new > capacity {
        return Err(ModelError::ConsistencyViolation(format!(
            "residual bandwidth of {:?} exceeds its capacity",
            element
        )));
    }
    *residual = new;
    Ok(())
}
