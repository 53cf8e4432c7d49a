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

#![deny(missing_docs, missing_debug_implementations)]

//! # Resource Graph
//!
//! This module contains the in-memory model of substrate and virtual networks. The main structure
//! is the [`Model`], which owns all [networks](Network), [nodes](Node), [links](Link) and
//! [paths](Path), and keeps the residual capacities and embedding cross-references consistent.
//!
//! ## Example usage
//!
//! The following example builds a substrate with two servers connected through a switch, and a
//! virtual network with a single server, which is then embedded and released again.
//!
//! ```rust
//! use vnembed::model::{Model, ModelConfig, Resources};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut model = Model::new(ModelConfig::default());
//!
//!     let sub = model.add_substrate_network("sub")?;
//!     let sw = model.add_switch(sub, "sw", 0)?;
//!     let s1 = model.add_server(sub, "s1", Resources::new(4, 4, 4), 1)?;
//!     let s2 = model.add_server(sub, "s2", Resources::new(4, 4, 4), 1)?;
//!     model.add_link_pair(sub, s1, sw, 100)?;
//!     model.add_link_pair(sub, s2, sw, 100)?;
//!
//!     let virt = model.add_virtual_network("virt")?;
//!     let v1 = model.add_server(virt, "v1", Resources::new(2, 1, 1), 0)?;
//!
//!     model.embed_node(v1, s1)?;
//!     model.embed_network(virt, sub)?;
//!     assert_eq!(model.node(s1)?.residual(), Resources::new(2, 3, 3));
//!
//!     model.unembed_network(virt)?;
//!     assert_eq!(model.node(s1)?.residual(), Resources::new(4, 4, 4));
//!     model.validate()?;
//!
//!     Ok(())
//! }
//! ```

mod check;
mod embed;
pub(crate) mod event;
#[allow(clippy::module_inception)]
pub(crate) mod model;
pub mod printer;
pub(crate) mod types;

pub use event::ModelEvent;
pub use model::{Link, Model, ModelConfig, Network, Node, Path};
pub use types::{
    Bandwidth, LinkHost, LinkId, ModelError, NetworkId, NetworkKind, NodeId, NodeKind, PathId,
    Resources, SubstrateElement, VirtualElement,
};
