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

//! # Helper (printer) functions for the Resource Graph
//! Module containing helper functions to get formatted strings of model elements, used mainly for
//! logging.

use crate::model::{LinkHost, LinkId, Model, ModelError, NetworkId, NodeId, PathId};
use crate::model::{SubstrateElement, VirtualElement};

/// Returns the name of a network.
pub fn network(model: &Model, id: NetworkId) -> Result<String, ModelError> {
    Ok(model.network(id)?.name().to_string())
}

/// Returns the qualified name of a node, formatted as `network/node`.
pub fn node(model: &Model, id: NodeId) -> Result<String, ModelError> {
    let n = model.node(id)?;
    Ok(format!("{}/{}", model.network(n.network())?.name(), n.name()))
}

/// Returns the qualified name of a link, formatted as `network/source->target`.
pub fn link(model: &Model, id: LinkId) -> Result<String, ModelError> {
    let l = model.link(id)?;
    Ok(format!("{}/{}", model.network(l.network())?.name(), l.name()))
}

/// Returns a formatted string for a path, including all its nodes.
pub fn path(model: &Model, id: PathId) -> Result<String, ModelError> {
    let p = model.path(id)?;
    let nodes = p
        .nodes()
        .iter()
        .map(|n| model.node(*n).map(|n| n.name().to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("{}/path#{} [{}]", model.network(id.network)?.name(), id.index, nodes.join(" > ")))
}

/// Returns a formatted string for any virtual element.
pub fn virtual_element(model: &Model, element: VirtualElement) -> Result<String, ModelError> {
    match element {
        VirtualElement::Network(n) => network(model, n),
        VirtualElement::Node(n) => node(model, n),
        VirtualElement::Link(l) => link(model, l),
    }
}

/// Returns a formatted string for any substrate element.
pub fn substrate_element(model: &Model, element: SubstrateElement) -> Result<String, ModelError> {
    match element {
        SubstrateElement::Node(n) => node(model, n),
        SubstrateElement::Link(l) => link(model, l),
        SubstrateElement::Path(p) => path(model, p),
    }
}

/// Returns a formatted string for the host of a virtual link.
pub fn link_host(model: &Model, host: LinkHost) -> Result<String, ModelError> {
    substrate_element(model, host.into())
}

/// Returns a formatted string of a placement `virtual -> substrate`.
pub fn placement(
    model: &Model,
    element: VirtualElement,
    host: SubstrateElement,
) -> Result<String, ModelError> {
    Ok(format!("{} -> {}", virtual_element(model, element)?, substrate_element(model, host)?))
}

/// Returns a multi-line summary of a substrate network, listing the residual capacities of every
/// server and the guests of every node.
pub fn substrate_summary(model: &Model, id: NetworkId) -> Result<String, ModelError> {
    let net = model.substrate(id)?;
    let mut lines = vec![format!("{} ({} guests)", net.name(), net.guests().len())];
    for n in net.nodes().iter() {
        let n = model.node(*n)?;
        let r = n.residual();
        lines.push(format!(
            "  {}: residual cpu {} mem {} sto {}, {} guest nodes, {} guest links",
            n.name(),
            r.cpu,
            r.memory,
            r.storage,
            n.guests().len(),
            n.guest_links().len()
        ));
    }
    Ok(lines.join("\n"))
}
