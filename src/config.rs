// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Solver configuration loaded from TOML.
//!
//! The file is read into [`RawConfig`], whose keys are all optional, and then
//! validated in a single pass into a [`SolverConfig`]. Validation reports
//! every absent key at once so a broken setup fails before any task starts.
//!
//! ```toml
//! [solver]
//! backend = "specfem2d"
//! parameters = ["vs"]
//!
//! [parameters]
//! nt = 4800
//! dt = 0.06
//! f0 = 0.084
//!
//! [paths]
//! scratch = "scratch/solver"
//! output = "output"
//! solver_binaries = "specfem2d/bin"
//! solver_files = "specfem2d/DATA"
//! model_init = "models/model_init"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::Field;
use crate::error::{Result, SolverError};

/// Configuration as written on disk; every key may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Back-end selection and tracked fields.
    pub solver: RawSolverSection,
    /// Time stepping and source parameters.
    pub parameters: RawParameters,
    /// Filesystem locations.
    pub paths: RawPaths,
    /// Executable names inside each workspace's `bin/`.
    pub executables: Executables,
}

/// `[solver]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSolverSection {
    /// Back-end name, `specfem2d` if omitted.
    pub backend: Option<String>,
    /// Material fields that smoothing and clipping operate on.
    pub parameters: Option<Vec<Field>>,
}

/// `[parameters]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParameters {
    /// Number of time steps.
    pub nt: Option<usize>,
    /// Time step length.
    pub dt: Option<f64>,
    /// Source center frequency.
    pub f0: Option<f64>,
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPaths {
    /// Root under which per-task workspaces are created.
    pub scratch: Option<PathBuf>,
    /// Shared output root.
    pub output: Option<PathBuf>,
    /// Directory of solver executables copied into each workspace.
    pub solver_binaries: Option<PathBuf>,
    /// Directory of solver input templates copied into each workspace.
    pub solver_files: Option<PathBuf>,
    /// Reference initial model used to backfill absent fields.
    pub model_init: Option<PathBuf>,
}

/// Names of the external executables, relative to a workspace's `bin/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Executables {
    /// Mesh and database generator.
    pub mesher: String,
    /// Wave-propagation solver.
    pub solver: String,
    /// Kernel summation tool.
    pub sum_kernels: String,
}

impl Default for Executables {
    fn default() -> Self {
        Executables {
            mesher: "xmeshfem2D".to_string(),
            solver: "xspecfem2D".to_string(),
            sum_kernels: "xsmooth_sem".to_string(),
        }
    }
}

/// Time stepping and source parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStepping {
    /// Number of time steps.
    pub nt: usize,
    /// Time step length.
    pub dt: f64,
    /// Source center frequency.
    pub f0: f64,
}

/// Validated filesystem locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverPaths {
    /// Root under which per-task workspaces are created.
    pub scratch: PathBuf,
    /// Shared output root.
    pub output: PathBuf,
    /// Directory of solver executables.
    pub solver_binaries: PathBuf,
    /// Directory of solver input templates.
    pub solver_files: PathBuf,
    /// Reference initial model.
    pub model_init: PathBuf,
}

/// Fully validated solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Back-end name.
    pub backend: String,
    /// Material fields that smoothing and clipping operate on.
    pub parameters: Vec<Field>,
    /// Time stepping and source parameters.
    pub timing: TimeStepping,
    /// Filesystem locations.
    pub paths: SolverPaths,
    /// Executable names.
    pub executables: Executables,
}

impl SolverConfig {
    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(contents).map_err(|e| SolverError::ConfigParse(e.to_string()))?;
        Self::validate(raw)
    }

    /// Validate a raw configuration.
    ///
    /// # Errors
    /// Returns [`SolverError::MissingConfig`] naming every absent key, or
    /// [`SolverError::InvalidConfig`] for the first unusable value.
    pub fn validate(raw: RawConfig) -> Result<Self> {
        let mut missing = Vec::new();
        fn take<T>(value: Option<T>, key: &str, missing: &mut Vec<String>) -> Option<T> {
            if value.is_none() {
                missing.push(key.to_string());
            }
            value
        }

        let nt = take(raw.parameters.nt, "parameters.nt", &mut missing);
        let dt = take(raw.parameters.dt, "parameters.dt", &mut missing);
        let f0 = take(raw.parameters.f0, "parameters.f0", &mut missing);
        let scratch = take(raw.paths.scratch, "paths.scratch", &mut missing);
        let output = take(raw.paths.output, "paths.output", &mut missing);
        let solver_binaries = take(
            raw.paths.solver_binaries,
            "paths.solver_binaries",
            &mut missing,
        );
        let solver_files = take(raw.paths.solver_files, "paths.solver_files", &mut missing);
        let model_init = take(raw.paths.model_init, "paths.model_init", &mut missing);

        let (
            Some(nt),
            Some(dt),
            Some(f0),
            Some(scratch),
            Some(output),
            Some(solver_binaries),
            Some(solver_files),
            Some(model_init),
        ) = (
            nt,
            dt,
            f0,
            scratch,
            output,
            solver_binaries,
            solver_files,
            model_init,
        )
        else {
            return Err(SolverError::MissingConfig { keys: missing });
        };

        if nt == 0 {
            return Err(invalid("parameters.nt", "must be at least 1"));
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(invalid("parameters.dt", "must be positive and finite"));
        }
        if !f0.is_finite() || f0 <= 0.0 {
            return Err(invalid("parameters.f0", "must be positive and finite"));
        }

        let parameters = raw.solver.parameters.unwrap_or_else(|| vec![Field::Vs]);
        if parameters.is_empty() {
            return Err(invalid("solver.parameters", "must name at least one field"));
        }
        if let Some(f) = parameters.iter().find(|f| !Field::MATERIAL.contains(*f)) {
            return Err(invalid(
                "solver.parameters",
                &format!("'{}' is a coordinate, not a material field", f),
            ));
        }

        Ok(SolverConfig {
            backend: raw
                .solver
                .backend
                .unwrap_or_else(|| "specfem2d".to_string()),
            parameters,
            timing: TimeStepping { nt, dt, f0 },
            paths: SolverPaths {
                scratch,
                output,
                solver_binaries,
                solver_files,
                model_init,
            },
            executables: raw.executables,
        })
    }
}

fn invalid(key: &str, reason: &str) -> SolverError {
    SolverError::InvalidConfig {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
