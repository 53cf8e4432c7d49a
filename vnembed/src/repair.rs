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

//! # Consistency Repairer
//!
//! Virtual networks embedded on a substrate can lose hosts of their elements when the substrate is
//! changed out-of-band (for instance, when a substrate server is removed). Such networks are
//! *floating*. The repairer finds floating networks and releases them completely, such that they
//! can be embedded again.

use crate::model::{printer, Model, ModelError, NetworkId};

use log::*;
use std::collections::BTreeMap;

/// State of a virtual network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestState {
    /// The network has a host, and all its elements are hosted.
    Embedded,
    /// The network has a host, but at least one element lost its host.
    Floating,
    /// The network has no host.
    Detached,
}

/// Determine the state of a virtual network.
pub fn guest_state(model: &Model, network: NetworkId) -> Result<GuestState, ModelError> {
    if model.virtual_network(network)?.host().is_none() {
        return Ok(GuestState::Detached);
    }
    for e in model.elements(network)? {
        if !model.is_hosted(e)? {
            return Ok(GuestState::Floating);
        }
    }
    Ok(GuestState::Embedded)
}

/// Determine the state of every guest of the substrate network.
pub fn scan(
    model: &Model,
    substrate: NetworkId,
) -> Result<BTreeMap<NetworkId, GuestState>, ModelError> {
    model
        .substrate(substrate)?
        .guests()
        .iter()
        .map(|g| guest_state(model, *g).map(|s| (*g, s)))
        .collect()
}

/// Release every floating guest of the substrate network. Returns all networks that are now
/// detached and need to be embedded again: the released floating networks, and all networks that
/// lost their substrate network since the last repair.
pub fn repair(model: &mut Model, substrate: NetworkId) -> Result<Vec<NetworkId>, ModelError> {
    let mut detached = Vec::new();
    for (n, state) in scan(model, substrate)? {
        if state == GuestState::Floating {
            warn!("{} is floating, releasing it", printer::network(model, n)?);
            model.unembed_network(n)?;
            detached.push(n);
        }
    }
    for n in model.take_orphans() {
        if model.network(n).is_ok() && guest_state(model, n)? == GuestState::Detached {
            info!("{} lost its substrate network", printer::network(model, n)?);
            detached.push(n);
        }
    }
    if !detached.is_empty() {
        info!("Repaired {} networks", detached.len());
    }
    Ok(detached)
}
