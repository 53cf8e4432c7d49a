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

//! Module for defining model change events

use crate::model::{LinkId, NetworkId, NodeId, VirtualElement};

/// Change of the resource graph. Every mutation of the [`Model`](crate::model::Model) appends one
/// or more events to its log, such that incremental consumers only need to look at what changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A network was created
    NetworkAdded(NetworkId),
    /// A network was removed
    NetworkRemoved(NetworkId),
    /// A node was added to network `#0`
    NodeAdded(NetworkId, NodeId),
    /// A node was removed from network `#0`
    NodeRemoved(NetworkId, NodeId),
    /// A link was added to network `#0`
    LinkAdded(NetworkId, LinkId),
    /// A link was removed from network `#0`
    LinkRemoved(NetworkId, LinkId),
    /// The path catalog of substrate network `#0` was replaced
    PathsReplaced(NetworkId),
    /// An element of virtual network `#0` was embedded
    Embedded(NetworkId, VirtualElement),
    /// An element of virtual network `#0` was released from its host
    Released(NetworkId, VirtualElement),
}

impl ModelEvent {
    /// Returns the network this event talks about.
    pub fn network(&self) -> NetworkId {
        match self {
            Self::NetworkAdded(n)
            | Self::NetworkRemoved(n)
            | Self::NodeAdded(n, _)
            | Self::NodeRemoved(n, _)
            | Self::LinkAdded(n, _)
            | Self::LinkRemoved(n, _)
            | Self::PathsReplaced(n)
            | Self::Embedded(n, _)
            | Self::Released(n, _) => *n,
        }
    }

    /// Returns true if the event changes the topology (and not only the embedding).
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Embedded(_, _) | Self::Released(_, _))
    }
}

/// Append-only log of model events. Consumers remember a cursor (the number of events they have
/// already seen) and ask for everything after it.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventLog {
    events: Vec<ModelEvent>,
}

impl EventLog {
    pub(crate) fn push(&mut self, event: ModelEvent) {
        self.events.push(event);
    }

    pub(crate) fn cursor(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn since(&self, cursor: usize) -> &[ModelEvent] {
        self.events.get(cursor..).unwrap_or(&[])
    }
}
