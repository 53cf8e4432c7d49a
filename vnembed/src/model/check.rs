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

//! Validation of the resource graph invariants.

use crate::model::model::Model;
use crate::model::{Bandwidth, LinkHost, LinkId, ModelError, NetworkKind, Resources};

impl Model {
    /// Check all invariants of the resource graph, and return the first violation found:
    ///
    /// 1. The residual capacity of every substrate server equals its capacity minus the demand of
    ///    its guest servers.
    /// 2. The residual bandwidth of every substrate link and path equals its bandwidth minus the
    ///    demand of its guest links.
    /// 3. Every host relation is stored on both sides.
    /// 4. A virtual network without a host has no hosted element, and every hosted element of an
    ///    embedded network lives on the host of its network. An embedded network may have lost
    ///    some hosts to the out-of-band removal of substrate elements. Such a *floating* network
    ///    is valid until the next [repair](crate::repair::repair) releases it.
    /// 5. Every path is a connected sequence of links.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.validate_nodes()?;
        self.validate_links()?;
        self.validate_paths()?;
        self.validate_networks()
    }

    fn validate_nodes(&self) -> Result<(), ModelError> {
        for node in self.nodes.values() {
            match self.network(node.network)?.kind {
                NetworkKind::Substrate => {
                    let used: Resources = node
                        .guests
                        .iter()
                        .map(|g| self.node(*g).map(|g| g.resources()))
                        .collect::<Result<Vec<_>, _>>()?
                        .into_iter()
                        .sum();
                    if node.residual + used != node.resources() {
                        return Err(violation(format!(
                            "residual of substrate node {} is {:?}, but {:?} of {:?} is used",
                            node.name,
                            node.residual,
                            used,
                            node.resources()
                        )));
                    }
                    for g in node.guests.iter() {
                        if self.node(*g)?.host != Some(node.id) {
                            return Err(violation(format!(
                                "guest {:?} of {} does not reference its host",
                                g, node.name
                            )));
                        }
                    }
                    for g in node.guest_links.iter() {
                        if self.link(*g)?.host != Some(LinkHost::Node(node.id)) {
                            return Err(violation(format!(
                                "guest link {:?} of {} does not reference its host",
                                g, node.name
                            )));
                        }
                    }
                }
                NetworkKind::Virtual => {
                    if let Some(h) = node.host {
                        if !self.node(h)?.guests.contains(&node.id) {
                            return Err(violation(format!(
                                "host of virtual node {} does not list it as guest",
                                node.name
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_links(&self) -> Result<(), ModelError> {
        let sublinks = self.config.link_host_embeds_sublinks;
        for link in self.links.values() {
            match self.network(link.network)?.kind {
                NetworkKind::Substrate => {
                    let used = self.guest_bandwidth(link.guests.iter())?;
                    if link.residual_bandwidth + used != link.bandwidth {
                        return Err(violation(format!(
                            "residual bandwidth of substrate link {} is {}, but {} of {} is used",
                            link.name, link.residual_bandwidth, used, link.bandwidth
                        )));
                    }
                    for g in link.guests.iter() {
                        let ok = match self.link(*g)?.host {
                            Some(LinkHost::Link(l)) => l == link.id,
                            Some(LinkHost::Path(p)) => {
                                sublinks && self.path(p)?.links.contains(&link.id)
                            }
                            _ => false,
                        };
                        if !ok {
                            return Err(violation(format!(
                                "guest {:?} of substrate link {} does not reference it",
                                g, link.name
                            )));
                        }
                    }
                }
                NetworkKind::Virtual => match link.host {
                    None => {}
                    Some(LinkHost::Node(n)) => {
                        if !self.node(n)?.guest_links.contains(&link.id) {
                            return Err(violation(format!(
                                "host of virtual link {} does not list it as guest",
                                link.name
                            )));
                        }
                    }
                    Some(LinkHost::Link(l)) => {
                        if !self.link(l)?.guests.contains(&link.id) {
                            return Err(violation(format!(
                                "host of virtual link {} does not list it as guest",
                                link.name
                            )));
                        }
                    }
                    Some(LinkHost::Path(p)) => {
                        let path = self.path(p)?;
                        let mut ok = path.guests.contains(&link.id);
                        if sublinks {
                            for l in path.links.iter() {
                                ok &= self.link(*l)?.guests.contains(&link.id);
                            }
                        }
                        if !ok {
                            return Err(violation(format!(
                                "host path of virtual link {} does not list it as guest",
                                link.name
                            )));
                        }
                    }
                },
            }
        }
        Ok(())
    }

    fn validate_paths(&self) -> Result<(), ModelError> {
        for path in self.paths.values() {
            let bandwidth = self
                .check_path(path.id.network, &path.nodes, &path.links)
                .map_err(|e| violation(format!("path {:?} is inconsistent: {}", path.id, e)))?;
            if bandwidth != path.bandwidth
                || path.source != path.nodes[0]
                || path.target != path.nodes[path.nodes.len() - 1]
            {
                return Err(violation(format!("path {:?} has stale attributes", path.id)));
            }
            let used = self.guest_bandwidth(path.guests.iter())?;
            if path.residual_bandwidth + used != path.bandwidth {
                return Err(violation(format!(
                    "residual bandwidth of path {:?} is {}, but {} of {} is used",
                    path.id, path.residual_bandwidth, used, path.bandwidth
                )));
            }
            for g in path.guests.iter() {
                if self.link(*g)?.host != Some(LinkHost::Path(path.id)) {
                    return Err(violation(format!(
                        "guest {:?} of path {:?} does not reference it",
                        g, path.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_networks(&self) -> Result<(), ModelError> {
        for net in self.networks.values() {
            match net.kind {
                NetworkKind::Substrate => {
                    for g in net.guests.iter() {
                        if self.network(*g)?.host != Some(net.id) {
                            return Err(violation(format!(
                                "guest {:?} of {} does not reference its host",
                                g, net.name
                            )));
                        }
                    }
                }
                NetworkKind::Virtual => {
                    if let Some(h) = net.host {
                        if !self.network(h)?.guests.contains(&net.id) {
                            return Err(violation(format!(
                                "host of {} does not list it as guest",
                                net.name
                            )));
                        }
                    }
                    for e in self.elements(net.id)? {
                        let host = self.host_network(e)?;
                        if host.is_some() && host != net.host {
                            return Err(violation(format!(
                                "element {:?} of {} is hosted on {:?}, but the network on {:?}",
                                e, net.name, host, net.host
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn guest_bandwidth<'a, I>(&self, guests: I) -> Result<Bandwidth, ModelError>
    where
        I: Iterator<Item = &'a LinkId>,
    {
        let mut total = 0;
        for g in guests {
            total += self.link(*g)?.bandwidth;
        }
        Ok(total)
    }
}

fn violation(msg: String) -> ModelError {
    ModelError::ConsistencyViolation(msg)
}
