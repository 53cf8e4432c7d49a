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

//! Module containing the main error type

use crate::ilp::SolverError;
use crate::model::ModelError;
use crate::paths::PathError;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Error propagated from the resource graph
    #[error("Model Error: {0}")]
    ModelError(#[from] ModelError),
    /// Error propagated from the path generation
    #[error("Path Error: {0}")]
    PathError(#[from] PathError),
    /// Error propagated from the solver
    #[error("Solver Error: {0}")]
    SolverError(#[from] SolverError),
    /// Invalid configuration or request, detected before the model is changed
    #[error("Invalid configuration: {0}")]
    Config(String),
}
