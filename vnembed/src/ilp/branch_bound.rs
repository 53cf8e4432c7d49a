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

//! # Branch and Bound Solver
//!
//! Exact solver for binary linear programs. The search enumerates assignments in depth-first
//! order, and prunes the search tree with constraint propagation (a variable is fixed as soon as
//! one of its values violates a constraint, given the bounds of all other free variables) and with
//! a lower bound of the objective.
//!
//! Rows of the form `x_1 + ... + x_n == 1` (*choice rows*, like the placement rows of the
//! [builder](super::IlpDeltaBuilder)) drive the search: the solver branches on the open choice row
//! with the fewest free variables, trying its cheapest variable first. Every open choice row also
//! adds its cheapest free variable to the lower bound. A variable that appears in `k` choice rows
//! only counts with `1 / k` of its cost in each of them, which keeps the bound valid.

use super::solver::{Relation, Solution, SolverAdapter, SolverError};

use log::*;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

const EPS: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Variable {
    name: String,
    objective: f64,
    /// constraints of the variable, together with its coefficient
    constraints: Vec<(usize, f64)>,
}

#[derive(Debug, Clone)]
struct Constraint {
    name: String,
    relation: Relation,
    rhs: f64,
    terms: Vec<(f64, usize)>,
}

/// # Branch and Bound Solver
///
/// Exact implementation of the [`SolverAdapter`]. SOS1 sets are enforced as `sum <= 1`
/// constraints. If a time budget is set and the search does not finish in time, `solve` returns
/// [`SolverError::Timeout`].
#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundSolver {
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    constraints: Vec<Constraint>,
    time_budget: Option<Duration>,
}

impl BranchAndBoundSolver {
    /// Create an empty solver
    pub fn new(time_budget: Option<Duration>) -> Self {
        Self { time_budget, ..Default::default() }
    }

    /// Number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints, including SOS1 sets
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    fn var(&self, name: &str) -> Result<usize, SolverError> {
        self.index.get(name).cloned().ok_or_else(|| SolverError::UnknownVariable(name.to_string()))
    }

    fn push_constraint(
        &mut self,
        name: &str,
        relation: Relation,
        rhs: f64,
        terms: &[(f64, String)],
    ) -> Result<(), SolverError> {
        let mut merged: Vec<(f64, usize)> = Vec::with_capacity(terms.len());
        for (coeff, var) in terms {
            let v = self.var(var)?;
            match merged.iter_mut().find(|(_, x)| *x == v) {
                Some(t) => t.0 += coeff,
                None => merged.push((*coeff, v)),
            }
        }
        let id = self.constraints.len();
        for (a, v) in merged.iter() {
            self.variables[*v].constraints.push((id, *a));
        }
        self.constraints.push(Constraint { name: name.to_string(), relation, rhs, terms: merged });
        Ok(())
    }
}

impl SolverAdapter for BranchAndBoundSolver {
    fn add_variable(&mut self, name: &str, objective: f64) -> Result<(), SolverError> {
        if self.index.contains_key(name) {
            return Err(SolverError::DuplicateVariable(name.to_string()));
        }
        if !objective.is_finite() {
            return Err(SolverError::Internal(format!("objective of {} is not finite", name)));
        }
        self.index.insert(name.to_string(), self.variables.len());
        let name = name.to_string();
        self.variables.push(Variable { name, objective, constraints: Vec::new() });
        Ok(())
    }

    fn add_constraint(
        &mut self,
        name: &str,
        relation: Relation,
        rhs: f64,
        terms: &[(f64, String)],
    ) -> Result<(), SolverError> {
        self.push_constraint(name, relation, rhs, terms)
    }

    fn add_sos1(&mut self, name: &str, variables: &[String]) -> Result<(), SolverError> {
        let terms: Vec<(f64, String)> = variables.iter().map(|v| (1.0, v.clone())).collect();
        self.push_constraint(name, Relation::LessEqual, 1.0, &terms)
    }

    fn solve(&mut self) -> Result<Solution, SolverError> {
        debug!(
            "Solving {} variables and {} constraints",
            self.variables.len(),
            self.constraints.len()
        );
        let stop_time = self.time_budget.map(|dur| SystemTime::now() + dur);
        let mut search = Search::new(&*self, stop_time);
        search.run()?;
        let solution = match search.best {
            Some((values, objective)) => Solution {
                feasible: true,
                assignment: self
                    .variables
                    .iter()
                    .zip(values.into_iter())
                    .map(|(v, x)| (v.name.clone(), x))
                    .collect(),
                objective,
            },
            None => Solution::infeasible(),
        };
        debug!(
            "Solver finished after {} nodes: feasible = {}, objective = {}",
            search.explored, solution.feasible, solution.objective
        );
        Ok(solution)
    }
}

/// State of the depth-first search
struct Search<'a> {
    problem: &'a BranchAndBoundSolver,
    stop_time: Option<SystemTime>,
    /// choice rows: `sum(x) == 1` with all coefficients 1
    choice: Vec<usize>,
    /// per variable: share of its (non-negative) cost in each choice row it appears in
    share: Vec<f64>,
    /// per constraint: whether it waits in the propagation queue
    queued: Vec<bool>,
    values: Vec<Option<bool>>,
    /// per constraint: sum of the coefficients of variables set to 1
    fixed: Vec<f64>,
    /// per constraint: sum of the negative coefficients of free variables
    free_min: Vec<f64>,
    /// per constraint: sum of the positive coefficients of free variables
    free_max: Vec<f64>,
    trail: Vec<usize>,
    cost: f64,
    /// sum of the negative objective coefficients of free variables
    free_negative: f64,
    best: Option<(Vec<bool>, f64)>,
    explored: usize,
}

impl<'a> Search<'a> {
    fn new(problem: &'a BranchAndBoundSolver, stop_time: Option<SystemTime>) -> Self {
        let n = problem.constraints.len();
        let mut free_min = vec![0.0; n];
        let mut free_max = vec![0.0; n];
        for (i, c) in problem.constraints.iter().enumerate() {
            for (a, _) in c.terms.iter() {
                free_min[i] += a.min(0.0);
                free_max[i] += a.max(0.0);
            }
        }
        let choice: Vec<usize> = (0..n)
            .filter(|i| {
                let c = &problem.constraints[*i];
                c.relation == Relation::Equal
                    && (c.rhs - 1.0).abs() < EPS
                    && !c.terms.is_empty()
                    && c.terms.iter().all(|(a, _)| (a - 1.0).abs() < EPS)
            })
            .collect();
        let mut rows = vec![0usize; problem.variables.len()];
        for c in choice.iter() {
            for (_, v) in problem.constraints[*c].terms.iter() {
                rows[*v] += 1;
            }
        }
        let share = problem
            .variables
            .iter()
            .zip(rows.into_iter())
            .map(|(v, k)| if k == 0 { 0.0 } else { v.objective.max(0.0) / k as f64 })
            .collect();
        Self {
            problem,
            stop_time,
            choice,
            share,
            queued: vec![false; n],
            values: vec![None; problem.variables.len()],
            fixed: vec![0.0; n],
            free_min,
            free_max,
            trail: Vec::new(),
            cost: 0.0,
            free_negative: problem.variables.iter().map(|v| v.objective.min(0.0)).sum(),
            best: None,
            explored: 0,
        }
    }

    fn run(&mut self) -> Result<(), SolverError> {
        let all: Vec<usize> = (0..self.problem.constraints.len()).collect();
        if self.propagate(all) {
            self.branch()?;
        }
        Ok(())
    }

    fn timed_out(&self) -> bool {
        self.stop_time.as_ref().map(|time| time.elapsed().is_ok()).unwrap_or(false)
    }

    /// Returns true if the subtree below the current node cannot improve the best solution.
    fn pruned(&self) -> bool {
        match self.best.as_ref() {
            Some((_, best)) => self.bound() >= best - EPS,
            None => false,
        }
    }

    /// Lower bound of the objective of every completion of the current assignment
    fn bound(&self) -> f64 {
        let mut total = self.cost + self.free_negative;
        for c in self.choice.iter() {
            if self.fixed[*c] > EPS {
                continue;
            }
            let cheapest = self.problem.constraints[*c]
                .terms
                .iter()
                .filter(|(_, v)| self.values[*v].is_none())
                .map(|(_, v)| self.share[*v])
                .fold(f64::INFINITY, f64::min);
            if cheapest.is_finite() {
                total += cheapest;
            }
        }
        total
    }

    /// Free variables of the open choice row with the fewest free variables, cheapest first.
    fn choice_branch(&self) -> Option<Vec<usize>> {
        let mut result: Option<Vec<usize>> = None;
        for c in self.choice.iter() {
            if self.fixed[*c] > EPS {
                continue;
            }
            let free: Vec<usize> = self.problem.constraints[*c]
                .terms
                .iter()
                .map(|(_, v)| *v)
                .filter(|v| self.values[*v].is_none())
                .collect();
            if !free.is_empty() && result.as_ref().map(|r| free.len() < r.len()).unwrap_or(true) {
                result = Some(free);
            }
        }
        let variables = &self.problem.variables;
        if let Some(free) = result.as_mut() {
            free.sort_by(|a, b| {
                variables[*a]
                    .objective
                    .partial_cmp(&variables[*b].objective)
                    .unwrap_or(Ordering::Equal)
                    .then(a.cmp(b))
            });
        }
        result
    }

    fn branch(&mut self) -> Result<(), SolverError> {
        self.explored += 1;
        if self.timed_out() {
            warn!("Time budget is used up after exploring {} nodes", self.explored);
            return Err(SolverError::Timeout);
        }
        if self.pruned() {
            return Ok(());
        }

        // exactly one variable of a choice row is set
        if let Some(free) = self.choice_branch() {
            for var in free {
                if self.pruned() {
                    break;
                }
                self.try_assign(var, true)?;
            }
            return Ok(());
        }

        let var = match self.values.iter().position(|v| v.is_none()) {
            Some(v) => v,
            None => {
                trace!("New best solution with cost {}", self.cost);
                let values = self.values.iter().map(|v| v.unwrap_or(false)).collect();
                self.best = Some((values, self.cost));
                return Ok(());
            }
        };
        let order = if self.problem.variables[var].objective > 0.0 {
            [false, true]
        } else {
            [true, false]
        };
        for value in order.iter() {
            self.try_assign(var, *value)?;
        }
        Ok(())
    }

    /// Assign the variable, propagate, explore the subtree, and undo everything again.
    fn try_assign(&mut self, var: usize, value: bool) -> Result<(), SolverError> {
        let mark = self.trail.len();
        self.assign(var, value);
        let touched = self.problem.variables[var].constraints.iter().map(|(c, _)| *c).collect();
        let result = if self.propagate(touched) { self.branch() } else { Ok(()) };
        self.undo(mark);
        result
    }

    fn assign(&mut self, var: usize, value: bool) {
        let problem = self.problem;
        let v = &problem.variables[var];
        self.values[var] = Some(value);
        self.free_negative -= v.objective.min(0.0);
        if value {
            self.cost += v.objective;
        }
        for (c, a) in v.constraints.iter() {
            self.free_min[*c] -= a.min(0.0);
            self.free_max[*c] -= a.max(0.0);
            if value {
                self.fixed[*c] += a;
            }
        }
        self.trail.push(var);
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let var = match self.trail.pop() {
                Some(v) => v,
                None => break,
            };
            let problem = self.problem;
            let v = &problem.variables[var];
            let value = self.values[var].unwrap_or(false);
            self.values[var] = None;
            self.free_negative += v.objective.min(0.0);
            if value {
                self.cost -= v.objective;
            }
            for (c, a) in v.constraints.iter() {
                self.free_min[*c] += a.min(0.0);
                self.free_max[*c] += a.max(0.0);
                if value {
                    self.fixed[*c] -= a;
                }
            }
        }
    }

    /// Returns true if the constraint can still be satisfied, assuming the free variable with
    /// coefficient `a` (currently counted in the free bounds) takes the value `value`.
    fn satisfiable(&self, c: usize, a: f64, value: bool) -> bool {
        let constraint = &self.problem.constraints[c];
        let x = if value { a } else { 0.0 };
        let min = self.fixed[c] + self.free_min[c] - a.min(0.0) + x;
        let max = self.fixed[c] + self.free_max[c] - a.max(0.0) + x;
        match constraint.relation {
            Relation::LessEqual => min <= constraint.rhs + EPS,
            Relation::Equal => min <= constraint.rhs + EPS && max >= constraint.rhs - EPS,
        }
    }

    /// Propagate the given constraints until a fixpoint is reached. Returns false on a conflict.
    fn propagate(&mut self, constraints: Vec<usize>) -> bool {
        let mut queue: VecDeque<usize> = VecDeque::with_capacity(constraints.len());
        for c in constraints {
            self.enqueue(&mut queue, c);
        }
        let consistent = self.propagate_queue(&mut queue);
        for c in queue {
            self.queued[c] = false;
        }
        consistent
    }

    fn enqueue(&mut self, queue: &mut VecDeque<usize>, c: usize) {
        if !self.queued[c] {
            self.queued[c] = true;
            queue.push_back(c);
        }
    }

    fn propagate_queue(&mut self, queue: &mut VecDeque<usize>) -> bool {
        let problem = self.problem;
        while let Some(c) = queue.pop_front() {
            self.queued[c] = false;
            let constraint = &problem.constraints[c];
            // check the constraint itself, using the neutral term
            if !self.satisfiable(c, 0.0, false) {
                trace!("Conflict in constraint {}", constraint.name);
                return false;
            }
            let mut forced = Vec::new();
            for (a, var) in constraint.terms.iter() {
                if self.values[*var].is_some() {
                    continue;
                }
                match (self.satisfiable(c, *a, false), self.satisfiable(c, *a, true)) {
                    (true, true) => {}
                    (true, false) => forced.push((*var, false)),
                    (false, true) => forced.push((*var, true)),
                    (false, false) => return false,
                }
            }
            for (var, value) in forced {
                if let Some(old) = self.values[var] {
                    if old != value {
                        return false;
                    }
                    continue;
                }
                self.assign(var, value);
                for (c, _) in problem.variables[var].constraints.iter() {
                    self.enqueue(queue, *c);
                }
            }
        }
        true
    }
}
