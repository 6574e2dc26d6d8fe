// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! SPECFEM2D solver back end for a full-waveform-inversion pipeline.
//!
//! Each seismic source (task) gets its own workspace directory, in which the
//! external mesher and wave-propagation solver are run for forward and
//! adjoint simulations. The crate reads and writes the solver's
//! whitespace-delimited model and kernel tables, post-processes kernels by
//! Gaussian smoothing and clipping, and moves artifacts between workspaces
//! and the shared output root.

#![warn(missing_docs)]

pub mod backend;
pub mod config;
/// Field names and the in-memory model/kernel record.
pub mod core;
/// Error types for the library.
pub mod error;
/// Filesystem helpers shared by the workspace and transfer code.
pub mod fsutil;
/// Kernel smoothing, clipping and summation.
pub mod gradient;
pub mod inputs;
/// Execution of the mesher and solver.
pub mod invoker;
/// Reading and writing model and kernel tables.
pub mod io;
pub mod params;
pub mod smoothing;
/// Artifact import and export.
pub mod transfer;
/// Per-task workspace layout.
pub mod workspace;

pub use crate::backend::{from_config, SolverBackend, Specfem2d};
pub use crate::config::SolverConfig;
pub use crate::core::{Field, ModelRecord, RecordKind};
pub use crate::error::{Result, SolverError};
pub use crate::workspace::{Task, WorkerId, Workspace};
