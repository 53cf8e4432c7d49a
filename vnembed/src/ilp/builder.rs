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

//! # ILP Delta Builder
//!
//! The builder collects the pending virtual networks and the candidates found by the
//! [matcher](crate::matcher), and translates them into a binary linear program:
//!
//! - One variable per candidate, with the [cost](crate::cost::cost) of the candidate as objective
//!   coefficient. Candidates that can never be chosen are dropped: those with infinite cost, and
//!   those co-locating a link whose endpoints do not fit onto the server together.
//! - One *reject* variable per pending network, with the rejection cost as objective coefficient.
//! - Every virtual element (or, when whole networks are placed on single servers, every virtual
//!   network) is placed exactly once, or its network is rejected:
//!   `sum(candidates of e) + reject(network of e) == 1`.
//! - A link candidate is only chosen if the node candidates of both endpoints are chosen:
//!   `2 * link - source - target <= 0`.
//! - The chosen candidates do not exceed the residual cpu, memory and storage of any substrate
//!   server, the residual bandwidth of any path, and (if the model embeds links on all links of a
//!   path) the residual bandwidth of any substrate link.
//! - With the [rack scope](CandidateScope::Rack), one *rack* variable per network and rack. A node
//!   candidate is only chosen if the rack of its host is chosen, and every network chooses at most
//!   one rack.
//!
//! The builder remembers what it has sent to the solver. Every call of [`IlpDeltaBuilder::apply`]
//! only sends the difference: variables and rows of networks added since the last call, pinned
//! placements, and new capacity rows for the substrate elements that gained candidates. Older
//! capacity rows constrain a subset of the same variables with the same residual, and stay valid.
//! Rows are never removed, so the residual capacities must not grow between two calls. Candidates
//! of elements that are already part of the program are ignored.

use super::solver::{Relation, Solution, SolverAdapter};
use crate::cost::{cost, Objective, RejectionCost};
use crate::matcher::{Candidate, CandidateDelta, CandidateScope};
use crate::model::{Model, NetworkId, NodeId, Resources, SubstrateElement, VirtualElement};
use crate::Error;

use log::*;
use std::collections::{BTreeMap, BTreeSet};

/// Meaning of a variable of the linear program
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Variable {
    /// The network is not embedded
    Reject(NetworkId),
    /// The candidate is committed
    Candidate(Candidate),
    /// The network is placed within the rack of the given top-of-rack switch
    Rack(NetworkId, NodeId),
}

/// Solution of the linear program, together with the meaning of every variable
#[derive(Debug, Clone)]
pub struct IlpSolution {
    /// Raw solution of the solver
    pub solution: Solution,
    /// Meaning of every variable, keyed by the variable name
    pub variables: BTreeMap<String, Variable>,
}

impl IlpSolution {
    /// All variables set to 1, ordered by name.
    pub fn chosen(&self) -> Vec<Variable> {
        self.variables
            .iter()
            .filter(|(name, _)| self.solution.value(name))
            .map(|(_, v)| *v)
            .collect()
    }

    /// Returns true if the program is feasible and no network is rejected.
    pub fn embeds_all(&self) -> bool {
        self.solution.feasible && !self.chosen().iter().any(|v| matches!(v, Variable::Reject(_)))
    }
}

/// Incremental builder of the linear program
#[derive(Debug, Clone)]
pub struct IlpDeltaBuilder {
    substrate: NetworkId,
    scope: CandidateScope,
    objective: Objective,
    rejection_cost: RejectionCost,
    sos1: bool,
    networks: BTreeSet<NetworkId>,
    candidates: BTreeMap<Candidate, f64>,
    dropped: usize,
    /// everything sent to the solver so far
    variables: BTreeMap<String, Variable>,
    names: BTreeMap<Candidate, String>,
    sent_networks: BTreeSet<NetworkId>,
    /// number of terms of the last row sent for every capacity
    sent_terms: BTreeMap<String, usize>,
    pins: Vec<(String, Vec<(f64, String)>)>,
    num_constraints: usize,
    generation: usize,
}

impl IlpDeltaBuilder {
    /// Create an empty builder.
    pub fn new(
        substrate: NetworkId,
        scope: CandidateScope,
        objective: Objective,
        rejection_cost: RejectionCost,
        sos1: bool,
    ) -> Self {
        Self {
            substrate,
            scope,
            objective,
            rejection_cost,
            sos1,
            networks: BTreeSet::new(),
            candidates: BTreeMap::new(),
            dropped: 0,
            variables: BTreeMap::new(),
            names: BTreeMap::new(),
            sent_networks: BTreeSet::new(),
            sent_terms: BTreeMap::new(),
            pins: Vec::new(),
            num_constraints: 0,
            generation: 0,
        }
    }

    /// Add virtual networks that should be embedded.
    pub fn add_networks(&mut self, networks: &[NetworkId]) {
        self.networks.extend(networks.iter().cloned());
    }

    /// Add the candidates of a matcher run, computing their cost.
    pub fn add_candidates(&mut self, model: &Model, delta: &CandidateDelta) -> Result<(), Error> {
        for c in delta.added.iter() {
            let c_cost = cost(model, c, self.objective)?;
            if !c_cost.is_finite() {
                trace!("Dropping candidate {:?} with infinite cost", c);
                self.dropped += 1;
            } else if !colocation_fits(model, c)? {
                trace!("Dropping candidate {:?}, as the endpoints do not fit together", c);
                self.dropped += 1;
            } else {
                self.candidates.insert(*c, c_cost);
            }
        }
        Ok(())
    }

    /// Number of candidate variables collected so far
    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Number of candidates dropped because they can never be chosen
    pub fn num_dropped(&self) -> usize {
        self.dropped
    }

    /// Force a network to keep the given placement (as returned by [`Model::hosts_of`]) in every
    /// following solution. The row is sent by the next call of [`apply`](Self::apply). Returns
    /// false without changing anything if the placement cannot be expressed by the candidates
    /// already sent to the solver.
    pub fn pin(
        &mut self,
        network: NetworkId,
        placement: &[(VirtualElement, SubstrateElement)],
    ) -> bool {
        let wanted: Vec<(VirtualElement, SubstrateElement)> =
            if self.scope == CandidateScope::SingleServer {
                match placement.first() {
                    Some((_, h @ SubstrateElement::Node(_)))
                        if placement.iter().all(|(_, x)| x == h) =>
                    {
                        vec![(VirtualElement::Network(network), *h)]
                    }
                    _ => return false,
                }
            } else {
                placement.to_vec()
            };
        if wanted.is_empty() {
            return false;
        }
        let mut terms = Vec::with_capacity(wanted.len());
        for (e, h) in wanted {
            let found = self.names.iter().find(|(c, _)| {
                c.virtual_element == e && c.substrate_element == h
            });
            match found {
                Some((_, name)) => terms.push((1.0, name.clone())),
                None => return false,
            }
        }
        self.pins.push((format!("pin_n{}", network.0), terms));
        true
    }

    /// Send everything that is new since the last call to the solver, and solve the program.
    pub fn apply<S: SolverAdapter>(
        &mut self,
        model: &Model,
        solver: &mut S,
    ) -> Result<IlpSolution, Error> {
        let (old_variables, old_constraints) = (self.variables.len(), self.num_constraints);
        let new_networks: Vec<NetworkId> =
            self.networks.difference(&self.sent_networks).cloned().collect();

        // groups of candidates which must be chosen exactly once
        let mut groups: BTreeMap<VirtualElement, Vec<Candidate>> = BTreeMap::new();
        for n in new_networks.iter() {
            if self.scope == CandidateScope::SingleServer {
                groups.insert(VirtualElement::Network(*n), Vec::new());
            } else {
                for e in model.elements(*n)? {
                    groups.insert(e, Vec::new());
                }
            }
        }
        for c in self.candidates.keys() {
            if let Some(g) = groups.get_mut(&c.virtual_element) {
                g.push(*c);
            }
        }
        let new_candidates: Vec<(Candidate, f64)> =
            groups.values().flatten().map(|c| (*c, self.candidates[c])).collect();

        // reject variables
        for n in new_networks.iter() {
            let mut floor = 1.0;
            for (e, g) in groups.iter() {
                if model.network_of(*e)? == *n {
                    floor += g.iter().map(|c| self.candidates[c]).fold(0.0, f64::max);
                }
            }
            let reject_cost = self.rejection_cost.of(model, *n)?.max(floor);
            self.add_variable(solver, reject_name(*n), reject_cost, Variable::Reject(*n))?;
            self.sent_networks.insert(*n);
        }

        // candidate variables
        for (c, c_cost) in new_candidates.iter() {
            let name = candidate_name(c);
            self.add_variable(solver, name.clone(), *c_cost, Variable::Candidate(*c))?;
            self.names.insert(*c, name);
        }

        // exactly one placement per group
        for (e, g) in groups.iter() {
            let mut terms: Vec<(f64, String)> =
                g.iter().map(|c| (1.0, self.names[c].clone())).collect();
            terms.push((1.0, reject_name(model.network_of(*e)?)));
            let name = format!("place_{}", element_name(e));
            self.add_constraint(solver, &name, Relation::Equal, 1.0, &terms)?;
            if self.sos1 && g.len() > 1 {
                let vars: Vec<String> = g.iter().map(|c| self.names[c].clone()).collect();
                solver.add_sos1(&format!("sos1_{}", element_name(e)), &vars)?;
                self.num_constraints += 1;
            }
        }

        // activation of link candidates
        let node_vars: BTreeMap<(NodeId, NodeId), String> = self
            .names
            .iter()
            .filter_map(|(c, name)| match (c.virtual_element, c.substrate_element) {
                (VirtualElement::Node(v), SubstrateElement::Node(s)) => {
                    Some(((v, s), name.clone()))
                }
                _ => None,
            })
            .collect();
        for (c, _) in new_candidates.iter().filter(|(c, _)| c.is_link()) {
            let link = match c.virtual_element {
                VirtualElement::Link(l) => model.link(l)?,
                _ => continue,
            };
            let (s, t) = match c.substrate_element {
                SubstrateElement::Node(n) => (n, n),
                SubstrateElement::Path(p) => (model.path(p)?.source(), model.path(p)?.target()),
                SubstrateElement::Link(l) => (model.link(l)?.source(), model.link(l)?.target()),
            };
            let name = self.names[c].clone();
            let mut terms = vec![(2.0, name.clone())];
            if let Some(x) = node_vars.get(&(link.source(), s)) {
                terms.push((-1.0, x.clone()));
            }
            if let Some(x) = node_vars.get(&(link.target(), t)) {
                terms.push((-1.0, x.clone()));
            }
            let row = format!("act_{}", name);
            self.add_constraint(solver, &row, Relation::LessEqual, 0.0, &terms)?;
        }

        if self.scope == CandidateScope::Rack {
            self.add_racks(model, solver, &new_candidates)?;
        }
        self.add_capacities(model, solver)?;

        for (name, terms) in std::mem::take(&mut self.pins) {
            let rhs = terms.len() as f64;
            self.add_constraint(solver, &name, Relation::Equal, rhs, &terms)?;
        }
        self.generation += 1;

        info!(
            "ILP on {:?}: {} networks, {} variables ({} new), {} constraints ({} new)",
            self.substrate,
            self.networks.len(),
            self.variables.len(),
            self.variables.len() - old_variables,
            self.num_constraints,
            self.num_constraints - old_constraints
        );
        let solution = solver.solve()?;
        debug!(
            "Solver verdict: feasible = {}, objective = {}",
            solution.feasible, solution.objective
        );
        Ok(IlpSolution { solution, variables: self.variables.clone() })
    }

    /// Rack variables of the networks of the new candidates, and the rows tying the node
    /// candidates to them.
    fn add_racks<S: SolverAdapter>(
        &mut self,
        model: &Model,
        solver: &mut S,
        new_candidates: &[(Candidate, f64)],
    ) -> Result<(), Error> {
        let racks = model.racks(self.substrate)?;
        let mut rack_vars: BTreeMap<NetworkId, BTreeMap<NodeId, String>> = BTreeMap::new();
        for (c, _) in new_candidates.iter() {
            let (v, s) = match (c.virtual_element, c.substrate_element) {
                (VirtualElement::Node(v), SubstrateElement::Node(s)) => (v, s),
                _ => continue,
            };
            let x = self.names[c].clone();
            let mut terms = vec![(1.0, x.clone())];
            if let Some(rack) = racks.get(&s) {
                let net = model.node(v)?.network();
                let vars = rack_vars.entry(net).or_default();
                if !vars.contains_key(rack) {
                    let name = format!("rack_n{}_s{}", net.0, rack.0);
                    solver.add_variable(&name, 0.0)?;
                    self.variables.insert(name.clone(), Variable::Rack(net, *rack));
                    vars.insert(*rack, name);
                }
                terms.push((-1.0, vars[rack].clone()));
            }
            self.add_constraint(solver, &format!("in_{}", x), Relation::LessEqual, 0.0, &terms)?;
        }
        for (net, vars) in rack_vars {
            if vars.len() > 1 {
                let terms: Vec<(f64, String)> = vars.into_iter().map(|(_, x)| (1.0, x)).collect();
                let name = format!("racks_n{}", net.0);
                self.add_constraint(solver, &name, Relation::LessEqual, 1.0, &terms)?;
            }
        }
        Ok(())
    }

    /// Capacity rows of every substrate element that gained candidates since the last call.
    fn add_capacities<S: SolverAdapter>(
        &mut self,
        model: &Model,
        solver: &mut S,
    ) -> Result<(), Error> {
        let mut server_use: BTreeMap<NodeId, Vec<(Resources, String)>> = BTreeMap::new();
        let mut bandwidth_use: BTreeMap<SubstrateElement, Vec<(f64, String)>> = BTreeMap::new();
        let sublinks = model.config().link_host_embeds_sublinks;
        for (c, name) in self.names.iter() {
            match (c.virtual_element, c.substrate_element) {
                (VirtualElement::Network(n), SubstrateElement::Node(s)) => {
                    server_use.entry(s).or_default().push((model.network_demand(n)?, name.clone()))
                }
                (VirtualElement::Node(v), SubstrateElement::Node(s)) => {
                    let demand = model.node(v)?.resources();
                    if !demand.is_zero() {
                        server_use.entry(s).or_default().push((demand, name.clone()));
                    }
                }
                (VirtualElement::Link(l), SubstrateElement::Path(p)) => {
                    let b = model.link(l)?.bandwidth() as f64;
                    let host = SubstrateElement::Path(p);
                    bandwidth_use.entry(host).or_default().push((b, name.clone()));
                    if sublinks {
                        for sl in model.path(p)?.links() {
                            bandwidth_use
                                .entry(SubstrateElement::Link(*sl))
                                .or_default()
                                .push((b, name.clone()));
                        }
                    }
                }
                (VirtualElement::Link(l), SubstrateElement::Link(sl)) => {
                    let b = model.link(l)?.bandwidth() as f64;
                    let host = SubstrateElement::Link(sl);
                    bandwidth_use.entry(host).or_default().push((b, name.clone()));
                }
                _ => {}
            }
        }
        for (s, uses) in server_use.iter() {
            let residual = model.node(*s)?.residual();
            let dims: [(&str, fn(&Resources) -> u64); 3] =
                [("cpu", |r| r.cpu), ("mem", |r| r.memory), ("sto", |r| r.storage)];
            for (dim, get) in dims.iter() {
                let terms: Vec<(f64, String)> = uses
                    .iter()
                    .filter(|(d, _)| get(d) > 0)
                    .map(|(d, x)| (get(d) as f64, x.clone()))
                    .collect();
                let rhs = get(&residual) as f64;
                self.add_capacity(solver, format!("{}_s{}", dim, s.0), rhs, terms)?;
            }
        }
        for (e, terms) in bandwidth_use.into_iter() {
            let (name, rhs) = match e {
                SubstrateElement::Path(p) => {
                    let residual = model.path(p)?.residual_bandwidth();
                    (format!("bw_p{}_{}", p.network.0, p.index), residual)
                }
                SubstrateElement::Link(l) => {
                    (format!("bw_e{}", l.0), model.link(l)?.residual_bandwidth())
                }
                SubstrateElement::Node(_) => continue,
            };
            self.add_capacity(solver, name, rhs as f64, terms)?;
        }
        Ok(())
    }

    /// Send a capacity row, unless a row with the same terms was already sent.
    fn add_capacity<S: SolverAdapter>(
        &mut self,
        solver: &mut S,
        base: String,
        rhs: f64,
        terms: Vec<(f64, String)>,
    ) -> Result<(), Error> {
        let sent = self.sent_terms.get(&base).cloned().unwrap_or(0);
        if terms.len() <= sent {
            return Ok(());
        }
        let name = if sent == 0 { base.clone() } else { format!("{}_g{}", base, self.generation) };
        self.add_constraint(solver, &name, Relation::LessEqual, rhs, &terms)?;
        self.sent_terms.insert(base, terms.len());
        Ok(())
    }

    fn add_variable<S: SolverAdapter>(
        &mut self,
        solver: &mut S,
        name: String,
        objective: f64,
        variable: Variable,
    ) -> Result<(), Error> {
        solver.add_variable(&name, objective)?;
        self.variables.insert(name, variable);
        Ok(())
    }

    fn add_constraint<S: SolverAdapter>(
        &mut self,
        solver: &mut S,
        name: &str,
        relation: Relation,
        rhs: f64,
        terms: &[(f64, String)],
    ) -> Result<(), Error> {
        solver.add_constraint(name, relation, rhs, terms)?;
        self.num_constraints += 1;
        Ok(())
    }
}

/// A link co-located on a server needs both of its endpoints on that server.
fn colocation_fits(model: &Model, candidate: &Candidate) -> Result<bool, Error> {
    let (l, s) = match (candidate.virtual_element, candidate.substrate_element) {
        (VirtualElement::Link(l), SubstrateElement::Node(s)) => (l, s),
        _ => return Ok(true),
    };
    let link = model.link(l)?;
    if link.source() == link.target() {
        return Ok(true);
    }
    let demand = model.node(link.source())?.resources() + model.node(link.target())?.resources();
    Ok(demand.fits_into(&model.node(s)?.residual()))
}

fn reject_name(network: NetworkId) -> String {
    format!("reject_n{}", network.0)
}

fn element_name(element: &VirtualElement) -> String {
    match element {
        VirtualElement::Network(n) => format!("n{}", n.0),
        VirtualElement::Node(n) => format!("v{}", n.0),
        VirtualElement::Link(l) => format!("l{}", l.0),
    }
}

fn candidate_name(candidate: &Candidate) -> String {
    let host = match candidate.substrate_element {
        SubstrateElement::Node(n) => format!("s{}", n.0),
        SubstrateElement::Link(l) => format!("e{}", l.0),
        SubstrateElement::Path(p) => format!("p{}_{}", p.network.0, p.index),
    };
    format!("x_{}_{}", element_name(&candidate.virtual_element), host)
}
