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

//! Module containing all type definitions of the resource graph

use std::iter::Sum;
use std::ops::{Add, AddAssign};
use thiserror::Error;

/// Network identification
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct NetworkId(pub u32);

/// Node identification (key into the node arena of the [`Model`](crate::model::Model))
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct NodeId(pub u32);

/// Link identification (key into the link arena of the [`Model`](crate::model::Model))
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct LinkId(pub u32);

/// Path identification. Paths are numbered per substrate network, such that regenerating the
/// catalog of an unmodified network yields the same ids again.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct PathId {
    /// Substrate network owning the path
    pub network: NetworkId,
    /// Position of the path in the sorted catalog
    pub index: u32,
}

/// Bandwidth of a link or path
pub type Bandwidth = u64;

/// Server resources. For virtual servers, this is the demand, for substrate servers, this is either
/// the capacity or the residual capacity.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Default)]
pub struct Resources {
    /// Number of CPU cores
    pub cpu: u64,
    /// Memory
    pub memory: u64,
    /// Storage
    pub storage: u64,
}

impl Resources {
    /// Create a new resource vector
    pub fn new(cpu: u64, memory: u64, storage: u64) -> Self {
        Self { cpu, memory, storage }
    }

    /// Resource vector with all entries set to zero.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns true if every entry of `self` is smaller or equal than the one of `other`.
    pub fn fits_into(&self, other: &Self) -> bool {
        self.cpu <= other.cpu && self.memory <= other.memory && self.storage <= other.storage
    }

    /// Subtract `other` from `self`, returning `None` if any entry would become negative.
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        Some(Self {
            cpu: self.cpu.checked_sub(other.cpu)?,
            memory: self.memory.checked_sub(other.memory)?,
            storage: self.storage.checked_sub(other.storage)?,
        })
    }

    /// Sum of all entries
    pub fn total(&self) -> u64 {
        self.cpu + self.memory + self.storage
    }

    /// Returns true if all entries are zero
    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

impl Add for Resources {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            cpu: self.cpu + other.cpu,
            memory: self.memory + other.memory,
            storage: self.storage + other.storage,
        }
    }
}

impl AddAssign for Resources {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for Resources {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

/// Kind of a network
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum NetworkKind {
    /// Physical network with finite capacities
    Substrate,
    /// Requested network with resource demands
    Virtual,
}

/// Kind of a node. Servers carry resources (capacity for substrate servers, demand for virtual
/// ones), switches only forward traffic.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum NodeKind {
    /// Server with resources
    Server(Resources),
    /// Switch without any resources
    Switch,
}

impl NodeKind {
    /// Returns the resources of the node, which are zero for switches.
    pub fn resources(&self) -> Resources {
        match self {
            Self::Server(r) => *r,
            Self::Switch => Resources::zero(),
        }
    }

    /// Returns true if and only if the node is a server.
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    /// Returns true if and only if the node is a switch.
    pub fn is_switch(&self) -> bool {
        matches!(self, Self::Switch)
    }
}

/// Host of a virtual link. A link is either co-located on a single substrate node, mapped onto a
/// single substrate link, or mapped onto a substrate path.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum LinkHost {
    /// Both endpoints are placed on the same substrate node
    Node(NodeId),
    /// The link is mapped onto a single substrate link
    Link(LinkId),
    /// The link is mapped onto a substrate path
    Path(PathId),
}

/// Element of a virtual network that can be placed onto the substrate.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum VirtualElement {
    /// The entire network as one unit
    Network(NetworkId),
    /// A virtual server or switch
    Node(NodeId),
    /// A virtual link
    Link(LinkId),
}

/// Element of a substrate network that can host virtual elements.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub enum SubstrateElement {
    /// A substrate server or switch
    Node(NodeId),
    /// A substrate link
    Link(LinkId),
    /// A substrate path
    Path(PathId),
}

impl From<LinkHost> for SubstrateElement {
    fn from(host: LinkHost) -> Self {
        match host {
            LinkHost::Node(n) => Self::Node(n),
            LinkHost::Link(l) => Self::Link(l),
            LinkHost::Path(p) => Self::Path(p),
        }
    }
}

/// Resource graph errors
#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    /// Network is not present in the model
    #[error("Network was not found: {0:?}")]
    NetworkNotFound(NetworkId),
    /// Node is not present in the model
    #[error("Node was not found: {0:?}")]
    NodeNotFound(NodeId),
    /// Link is not present in the model
    #[error("Link was not found: {0:?}")]
    LinkNotFound(LinkId),
    /// Path is not present in the model
    #[error("Path was not found: {0:?}")]
    PathNotFound(PathId),
    /// Name is not present in the model
    #[error("Name was not found: {0}")]
    NameNotFound(String),
    /// The name is already used by a different element
    #[error("Name is already taken: {0}")]
    DuplicateName(String),
    /// The network has the wrong kind for the requested operation
    #[error("Network {0:?} must be of kind {1:?}")]
    WrongNetworkKind(NetworkId, NetworkKind),
    /// An element does not belong to the expected network
    #[error("Element {0:?} does not belong to network {1:?}")]
    WrongNetwork(VirtualElement, NetworkId),
    /// A virtual node cannot be placed on a substrate node of that kind
    #[error("Virtual node {0:?} cannot be placed on substrate node {1:?}")]
    NodeKindMismatch(NodeId, NodeId),
    /// The virtual element already has a host
    #[error("Virtual element is already embedded: {0:?}")]
    AlreadyEmbedded(VirtualElement),
    /// The network cannot be embedded, since some of its elements have no host
    #[error("Network {0:?} has elements without a host")]
    ElementsNotHosted(NetworkId),
    /// The host of a virtual link does not connect the hosts of its endpoints
    #[error("Host of link {0:?} does not match the hosts of its endpoints")]
    HostMismatch(LinkId),
    /// Not enough residual capacity on the substrate element
    #[error("Insufficient residual capacity on {0:?}")]
    InsufficientCapacity(SubstrateElement),
    /// Links and nodes of a path are inconsistent
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    /// A model invariant is violated
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),
}
