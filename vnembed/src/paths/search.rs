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

//! Path search on the substrate topology: exhaustive enumeration of simple paths, and Yen's
//! k-shortest paths (by hop count).

use crate::model::{LinkId, NodeId};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Substrate topology used for the search. Nodes are stored in a petgraph graph, with the model
/// ids as weights. The adjacency of every node is sorted by link id, which makes every search
/// deterministic.
#[derive(Debug, Clone)]
pub(crate) struct Topology {
    graph: DiGraph<NodeId, LinkId>,
    index: HashMap<NodeId, NodeIndex>,
    adjacency: Vec<Vec<(LinkId, NodeIndex)>>,
}

/// Path found by the search. The derived ordering sorts by source, target, number of hops, and
/// finally the sequence of link ids, which is the order in which the catalog is numbered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct RawPath {
    pub source: NodeId,
    pub target: NodeId,
    pub hops: usize,
    pub links: Vec<LinkId>,
    pub nodes: Vec<NodeId>,
}

impl Topology {
    /// Build the topology from the nodes and the links `(id, source, target)`.
    pub(crate) fn new(nodes: &[NodeId], links: &[(LinkId, NodeId, NodeId)]) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), links.len());
        let mut index = HashMap::with_capacity(nodes.len());
        for n in nodes {
            index.insert(*n, graph.add_node(*n));
        }
        for (l, s, t) in links {
            graph.add_edge(index[s], index[t], *l);
        }
        let adjacency = graph
            .node_indices()
            .map(|n| {
                let mut adj: Vec<(LinkId, NodeIndex)> = graph
                    .edges(n)
                    .map(|e| (*e.weight(), e.target()))
                    .collect();
                adj.sort();
                adj
            })
            .collect();
        Self { graph, index, adjacency }
    }

    /// All nodes, in the order in which they were added.
    pub(crate) fn nodes(&self) -> Vec<NodeId> {
        self.graph.node_indices().map(|n| self.graph[n]).collect()
    }

    /// Largest finite hop distance between any two nodes.
    pub(crate) fn diameter(&self) -> usize {
        self.graph
            .node_indices()
            .flat_map(|n| {
                petgraph::algo::dijkstra(&self.graph, n, None, |_| 1usize).into_iter().map(|x| x.1)
            })
            .max()
            .unwrap_or(0)
    }

    fn to_raw(&self, nodes: &[NodeIndex], links: &[LinkId]) -> RawPath {
        RawPath {
            source: self.graph[nodes[0]],
            target: self.graph[nodes[nodes.len() - 1]],
            hops: links.len(),
            links: links.to_vec(),
            nodes: nodes.iter().map(|n| self.graph[*n]).collect(),
        }
    }

    /// Enumerate every simple path starting at `source` with a length between `min_hops` and
    /// `max_hops`.
    pub(crate) fn all_paths_from(
        &self,
        source: NodeId,
        min_hops: usize,
        max_hops: usize,
    ) -> Vec<RawPath> {
        let mut result = Vec::new();
        let start = match self.index.get(&source) {
            Some(s) => *s,
            None => return result,
        };
        let mut nodes = vec![start];
        let mut links = Vec::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        visited.insert(start);
        self.dfs(&mut nodes, &mut links, &mut visited, min_hops, max_hops, &mut result);
        result
    }

    fn dfs(
        &self,
        nodes: &mut Vec<NodeIndex>,
        links: &mut Vec<LinkId>,
        visited: &mut HashSet<NodeIndex>,
        min_hops: usize,
        max_hops: usize,
        result: &mut Vec<RawPath>,
    ) {
        if links.len() >= min_hops && !links.is_empty() {
            result.push(self.to_raw(nodes, links));
        }
        if links.len() >= max_hops {
            return;
        }
        let current = nodes[nodes.len() - 1];
        for (l, next) in self.adjacency[current.index()].iter() {
            if visited.insert(*next) {
                nodes.push(*next);
                links.push(*l);
                self.dfs(nodes, links, visited, min_hops, max_hops, result);
                links.pop();
                nodes.pop();
                visited.remove(next);
            }
        }
    }

    /// Breadth-first search for a shortest path, not using any of the banned nodes or links, and
    /// with at most `limit` hops. Neighbors are visited in the order of their link ids.
    fn shortest(
        &self,
        source: NodeIndex,
        target: NodeIndex,
        banned_nodes: &HashSet<NodeIndex>,
        banned_links: &HashSet<LinkId>,
        limit: usize,
    ) -> Option<(Vec<NodeIndex>, Vec<LinkId>)> {
        let mut parent: HashMap<NodeIndex, (NodeIndex, LinkId)> = HashMap::new();
        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        let mut queue = VecDeque::new();
        depth.insert(source, 0);
        queue.push_back(source);
        while let Some(current) = queue.pop_front() {
            if current == target {
                break;
            }
            let d = depth[&current];
            if d >= limit {
                continue;
            }
            for (l, next) in self.adjacency[current.index()].iter() {
                if banned_links.contains(l) || banned_nodes.contains(next) {
                    continue;
                }
                if !depth.contains_key(next) {
                    depth.insert(*next, d + 1);
                    parent.insert(*next, (current, *l));
                    queue.push_back(*next);
                }
            }
        }
        if !depth.contains_key(&target) || source == target {
            return None;
        }
        let mut nodes = vec![target];
        let mut links = Vec::new();
        let mut current = target;
        while let Some((prev, l)) = parent.get(&current) {
            nodes.push(*prev);
            links.push(*l);
            current = *prev;
        }
        nodes.reverse();
        links.reverse();
        Some((nodes, links))
    }

    /// Yen's algorithm: the `k` shortest loop-free paths from `source` to `target` whose length
    /// lies between `min_hops` and `max_hops`. Among paths of equal length, the one with the
    /// lexicographically smaller sequence of link ids is chosen first.
    pub(crate) fn k_shortest(
        &self,
        source: NodeId,
        target: NodeId,
        k: usize,
        min_hops: usize,
        max_hops: usize,
    ) -> Vec<RawPath> {
        let (s, t) = match (self.index.get(&source), self.index.get(&target)) {
            (Some(s), Some(t)) => (*s, *t),
            _ => return Vec::new(),
        };
        if k == 0 {
            return Vec::new();
        }

        let mut accepted: Vec<(Vec<NodeIndex>, Vec<LinkId>)> = Vec::new();
        let mut candidates: BTreeSet<(usize, Vec<LinkId>, Vec<NodeIndex>)> = BTreeSet::new();
        match self.shortest(s, t, &HashSet::new(), &HashSet::new(), max_hops) {
            Some((nodes, links)) => candidates.insert((links.len(), links, nodes)),
            None => return Vec::new(),
        };

        let mut result = Vec::new();
        while let Some(best) = candidates.iter().next().cloned() {
            candidates.remove(&best);
            let (hops, links, nodes) = best;
            if hops >= min_hops {
                result.push(self.to_raw(&nodes, &links));
                if result.len() >= k {
                    break;
                }
            }

            // spur paths deviating from the newly accepted path at every node
            for i in 0..hops {
                let spur = nodes[i];
                let root_nodes = &nodes[..=i];
                let root_links = &links[..i];
                let mut banned_links: HashSet<LinkId> = HashSet::new();
                banned_links.insert(links[i]);
                for (n, l) in accepted.iter() {
                    if l.len() > i && &n[..=i] == root_nodes {
                        banned_links.insert(l[i]);
                    }
                }
                let banned_nodes: HashSet<NodeIndex> = root_nodes[..i].iter().cloned().collect();
                if let Some((spur_nodes, spur_links)) =
                    self.shortest(spur, t, &banned_nodes, &banned_links, max_hops - i)
                {
                    let mut total_nodes = root_nodes[..i].to_vec();
                    total_nodes.extend(spur_nodes);
                    let mut total_links = root_links.to_vec();
                    total_links.extend(spur_links);
                    let entry = (total_links.len(), total_links, total_nodes);
                    if !accepted.iter().any(|(_, l)| *l == entry.1) && entry.1 != links {
                        candidates.insert(entry);
                    }
                }
            }
            accepted.push((nodes, links));
        }
        result
    }
}
