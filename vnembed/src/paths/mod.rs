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

//! # Path Catalog Generator
//!
//! This module enumerates the substrate paths onto which virtual links can be embedded. Paths are
//! generated between all pairs of substrate nodes, either exhaustively (every simple path within
//! the hop bounds), or by keeping only the `k` shortest paths of every pair. The enumeration runs
//! on multiple threads, but the resulting catalog is always sorted before the path ids are
//! assigned, such that generating the catalog twice on the same graph yields identical paths with
//! identical ids.

mod search;

use crate::model::{LinkId, Model, ModelError, NetworkId, NetworkKind, NodeId, PathId};
use search::{RawPath, Topology};

use log::*;
use std::sync::Arc;
use std::thread;
use thiserror::Error;

/// How paths are selected between every pair of nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// Every simple path within the hop bounds
    Exhaustive,
    /// Only the `k` shortest paths (by hops) of each source and target pair. Ties are broken by the
    /// sequence of link ids.
    KShortest(usize),
}

/// Configuration of the path generation
#[derive(Debug, Clone, PartialEq)]
pub struct PathConfig {
    /// Minimum number of hops. A value of 0 is treated as 1.
    pub min_hops: usize,
    /// Maximum number of hops. Values below 1 are clamped to 1.
    pub max_hops: usize,
    /// Selection mode
    pub mode: PathMode,
    /// If set, `max_hops` is reduced to the diameter of the substrate graph.
    pub auto_max_hops: bool,
    /// Number of worker threads. If `None`, the number of CPUs is used.
    pub threads: Option<usize>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            min_hops: 1,
            max_hops: 4,
            mode: PathMode::Exhaustive,
            auto_max_hops: true,
            threads: None,
        }
    }
}

/// Errors of the path generation
#[derive(Debug, Error, PartialEq)]
pub enum PathError {
    /// Paths can only be generated on substrate networks
    #[error("Paths can only be generated on substrate networks: {0:?}")]
    NotSubstrate(NetworkId),
    /// Two nodes from incompatible tiers are connected directly.
    #[error("Link {0:?} connects the incompatible tiers {1} and {2}")]
    TierMismatch(LinkId, u32, u32),
    /// The old catalog still contains paths hosting virtual links.
    #[error("The path catalog of {0:?} is still in use")]
    PathsInUse(NetworkId),
    /// Error propagated from the resource graph
    #[error("Model Error: {0}")]
    ModelError(#[from] ModelError),
    /// A worker thread panicked.
    #[error("A path generation worker panicked")]
    WorkerPanic,
}

/// Generate the path catalog of the substrate network, replacing the previous one. Returns the ids
/// of the new paths, in the order of the catalog.
pub fn generate_paths(
    model: &mut Model,
    network: NetworkId,
    config: &PathConfig,
) -> Result<Vec<PathId>, PathError> {
    let net = model.network(network)?;
    if net.kind() != NetworkKind::Substrate {
        return Err(PathError::NotSubstrate(network));
    }
    for p in net.paths() {
        if !model.path(*p)?.guests().is_empty() {
            return Err(PathError::PathsInUse(network));
        }
    }

    let nodes: Vec<NodeId> = net.nodes().iter().cloned().collect();
    let mut links: Vec<(LinkId, NodeId, NodeId)> = Vec::with_capacity(net.links().len());
    for l in net.links() {
        let link = model.link(*l)?;
        let (a, b) = (model.node(link.source())?.depth(), model.node(link.target())?.depth());
        if (a as i64 - b as i64).abs() > 1 {
            return Err(PathError::TierMismatch(*l, a, b));
        }
        links.push((*l, link.source(), link.target()));
    }

    let topo = Arc::new(Topology::new(&nodes, &links));
    let min_hops = config.min_hops.max(1);
    let mut max_hops = config.max_hops.max(1);
    if config.auto_max_hops {
        max_hops = max_hops.min(topo.diameter().max(1));
    }

    let raw = if min_hops > max_hops {
        debug!("min_hops {} exceeds max_hops {}, the catalog is empty", min_hops, max_hops);
        Vec::new()
    } else {
        enumerate(topo, min_hops, max_hops, config.mode, config.threads)?
    };

    let catalog: Vec<(Vec<NodeId>, Vec<LinkId>)> =
        raw.into_iter().map(|p| (p.nodes, p.links)).collect();
    let ids = model.replace_paths(network, catalog)?;
    info!(
        "Generated {} paths for {} (hops {}..={}, {:?})",
        ids.len(),
        model.network(network)?.name(),
        min_hops,
        max_hops,
        config.mode
    );
    Ok(ids)
}

/// Run the search on multiple threads, each one responsible for a subset of the source nodes, and
/// return the sorted result.
fn enumerate(
    topo: Arc<Topology>,
    min_hops: usize,
    max_hops: usize,
    mode: PathMode,
    threads: Option<usize>,
) -> Result<Vec<RawPath>, PathError> {
    let sources = topo.nodes();
    let n_threads = threads.unwrap_or_else(num_cpus::get).max(1).min(sources.len().max(1));
    debug!("Spawning {} threads for path generation", n_threads);

    let handles = (0..n_threads)
        .map(|i| {
            let t = topo.clone();
            let s: Vec<NodeId> = sources.iter().skip(i).step_by(n_threads).cloned().collect();
            let targets = sources.clone();
            thread::spawn(move || {
                let mut result = Vec::new();
                for source in s {
                    match mode {
                        PathMode::Exhaustive => {
                            result.extend(t.all_paths_from(source, min_hops, max_hops))
                        }
                        PathMode::KShortest(k) => {
                            for target in targets.iter().filter(|x| **x != source) {
                                result.extend(t.k_shortest(source, *target, k, min_hops, max_hops))
                            }
                        }
                    }
                }
                result
            })
        })
        .collect::<Vec<_>>();

    let mut paths = Vec::new();
    for handle in handles {
        match handle.join() {
            Ok(result) => paths.extend(result),
            Err(_) => {
                error!("Path generation worker panicked");
                return Err(PathError::WorkerPanic);
            }
        }
    }
    paths.sort();
    Ok(paths)
}
