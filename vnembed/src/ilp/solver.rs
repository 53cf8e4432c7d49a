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

//! Interface of the solver used to decide which candidates are committed.

use std::collections::HashMap;
use thiserror::Error;

/// Relation of a linear constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `lhs <= rhs`
    LessEqual,
    /// `lhs == rhs`
    Equal,
}

/// Result of a solver call
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Whether a feasible assignment exists
    pub feasible: bool,
    /// Value of every variable. Empty if the problem is infeasible.
    pub assignment: HashMap<String, bool>,
    /// Objective value of the assignment (infinite if the problem is infeasible)
    pub objective: f64,
}

impl Solution {
    /// Solution of an infeasible problem
    pub fn infeasible() -> Self {
        Self { feasible: false, assignment: HashMap::new(), objective: f64::INFINITY }
    }

    /// Returns the value of the variable, or `false` if it is not part of the assignment.
    pub fn value(&self, name: &str) -> bool {
        self.assignment.get(name).cloned().unwrap_or(false)
    }
}

/// Errors of a solver
#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    /// A constraint references a variable that was never added
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    /// A variable with the same name already exists
    #[error("Variable already exists: {0}")]
    DuplicateVariable(String),
    /// The time budget was used up before the problem was solved
    #[error("The time budget of the solver was used up")]
    Timeout,
    /// Any other error of the solver
    #[error("Solver error: {0}")]
    Internal(String),
}

/// # Solver Adapter
///
/// A solver for binary linear programs, which is built incrementally: variables and constraints
/// are only ever added. `solve` may be called multiple times, and every call considers everything
/// that was added so far. The objective is always minimized.
pub trait SolverAdapter {
    /// Add a binary variable with its coefficient in the objective.
    fn add_variable(&mut self, name: &str, objective: f64) -> Result<(), SolverError>;

    /// Add the linear constraint `sum(coeff * var) <relation> rhs`.
    fn add_constraint(
        &mut self,
        name: &str,
        relation: Relation,
        rhs: f64,
        terms: &[(f64, String)],
    ) -> Result<(), SolverError>;

    /// Add a special ordered set of type 1: at most one of the variables may be set.
    fn add_sos1(&mut self, name: &str, variables: &[String]) -> Result<(), SolverError>;

    /// Solve the problem built so far.
    fn solve(&mut self) -> Result<Solution, SolverError>;
}
