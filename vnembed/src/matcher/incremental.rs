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

//! Matcher keeping an index of candidates per network, updated from the model event log

use super::{
    network_candidates, Candidate, CandidateDelta, CandidateMatcher, CandidateScope, SubstrateIndex,
};
use crate::model::{Model, ModelError, NetworkId};

use log::*;
use std::collections::{BTreeMap, BTreeSet};

/// # Incremental Matcher
///
/// Keeps the candidates of every pending network, and the position in the event log of the model
/// up to which all changes are reflected. On each run, only the events after that position are
/// inspected:
///
/// - Any change of the topology or the path catalog of the substrate invalidates every network.
/// - A change of the topology of a pending network invalidates only that network.
/// - Embedding and releasing elements does not change the structural candidates, and is ignored.
///
/// Only the candidates of invalidated networks are recomputed.
#[derive(Debug, Clone)]
pub struct IncrementalMatcher {
    substrate: NetworkId,
    pending: Vec<NetworkId>,
    scope: CandidateScope,
    cursor: Option<usize>,
    cache: BTreeMap<NetworkId, BTreeSet<Candidate>>,
    emitted: BTreeSet<Candidate>,
}

impl IncrementalMatcher {
    /// Create a new matcher for the given substrate and pending virtual networks.
    pub fn new(substrate: NetworkId, pending: &[NetworkId], scope: CandidateScope) -> Self {
        Self {
            substrate,
            pending: pending.to_vec(),
            scope,
            cursor: None,
            cache: BTreeMap::new(),
            emitted: BTreeSet::new(),
        }
    }

    /// All candidates currently known for a pending network.
    pub fn candidates(&self, network: NetworkId) -> Option<&BTreeSet<Candidate>> {
        self.cache.get(&network)
    }

    /// Networks whose candidates must be recomputed
    fn dirty(&self, model: &Model) -> BTreeSet<NetworkId> {
        let cursor = match self.cursor {
            Some(c) => c,
            None => return self.pending.iter().cloned().collect(),
        };
        let mut dirty = BTreeSet::new();
        for event in model.events_since(cursor).iter().filter(|e| e.is_structural()) {
            let net = event.network();
            if net == self.substrate {
                trace!("Substrate changed: {:?}", event);
                return self.pending.iter().cloned().collect();
            }
            if self.pending.contains(&net) {
                dirty.insert(net);
            }
        }
        dirty
    }
}

impl CandidateMatcher for IncrementalMatcher {
    fn run(&mut self, model: &Model) -> Result<CandidateDelta, ModelError> {
        let dirty = self.dirty(model);
        let mut added = Vec::new();
        if !dirty.is_empty() {
            let index = SubstrateIndex::new(model, self.substrate, self.scope)?;
            for n in dirty.iter() {
                let candidates = network_candidates(model, &index, *n, self.scope)?;
                for c in candidates.iter() {
                    if self.emitted.insert(*c) {
                        added.push(*c);
                    }
                }
                self.cache.insert(*n, candidates);
            }
        }
        self.cursor = Some(model.event_cursor());
        added.sort();
        debug!(
            "Incremental matcher recomputed {} networks, found {} new candidates",
            dirty.len(),
            added.len()
        );
        Ok(CandidateDelta { added })
    }

    fn reset(&mut self) {
        self.cursor = None;
        self.cache.clear();
        self.emitted.clear();
    }
}
