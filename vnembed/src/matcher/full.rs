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

//! Matcher recomputing every candidate on each run

use super::{
    network_candidates, Candidate, CandidateDelta, CandidateMatcher, CandidateScope, SubstrateIndex,
};
use crate::model::{Model, ModelError, NetworkId};

use log::*;
use std::collections::BTreeSet;

/// # Full Matcher
///
/// Recomputes the candidates of all pending networks on every run, and returns those that were not
/// returned before.
#[derive(Debug, Clone)]
pub struct FullMatcher {
    substrate: NetworkId,
    pending: Vec<NetworkId>,
    scope: CandidateScope,
    emitted: BTreeSet<Candidate>,
}

impl FullMatcher {
    /// Create a new matcher for the given substrate and pending virtual networks.
    pub fn new(substrate: NetworkId, pending: &[NetworkId], scope: CandidateScope) -> Self {
        Self { substrate, pending: pending.to_vec(), scope, emitted: BTreeSet::new() }
    }
}

impl CandidateMatcher for FullMatcher {
    fn run(&mut self, model: &Model) -> Result<CandidateDelta, ModelError> {
        let index = SubstrateIndex::new(model, self.substrate, self.scope)?;
        let mut added = Vec::new();
        for n in self.pending.iter() {
            for c in network_candidates(model, &index, *n, self.scope)? {
                if self.emitted.insert(c) {
                    added.push(c);
                }
            }
        }
        added.sort();
        debug!("Full matcher found {} new candidates", added.len());
        Ok(CandidateDelta { added })
    }

    fn reset(&mut self) {
        self.emitted.clear();
    }
}
