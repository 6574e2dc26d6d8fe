// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Solver back ends behind a common capability set.
//!
//! The pipeline drives a [`SolverBackend`] chosen by `solver.backend` in the
//! configuration. [`Specfem2d`] is the only implementation.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::SolverConfig;
use crate::core::ModelRecord;
use crate::error::{Result, SolverError};
use crate::fsutil;
use crate::gradient::GradientProcessor;
use crate::inputs::{self, TraceGeometry};
use crate::invoker::SolverInvoker;
use crate::io;
use crate::transfer::TransferAdapter;
use crate::workspace::{Task, Workspace};

/// Name under which [`Specfem2d`] is selected.
pub const SPECFEM2D: &str = "specfem2d";

/// Operations every solver back end provides to the inversion pipeline.
pub trait SolverBackend {
    /// Back-end name, as written in the configuration.
    fn name(&self) -> &'static str;

    /// Verify that configured inputs exist before any task runs.
    fn check(&self) -> Result<()>;

    /// Create and stage the task's workspace.
    fn initialize(&self, task: &Task) -> Result<()>;

    /// Write time stepping, receivers and source position into the workspace inputs.
    fn write_inputs(&self, task: &Task, geometry: &dyn TraceGeometry) -> Result<()>;

    /// Mesh `model_path` and run a forward simulation to produce observed traces.
    fn generate_data(&self, task: &Task, model_path: &Path, model_name: &str) -> Result<()>;

    /// Set up the workspace around `model_path` and publish it as `model_name`.
    fn generate_mesh(&self, task: &Task, model_path: &Path, model_name: &str) -> Result<()>;

    /// Run a forward simulation in the task's workspace.
    fn forward(&self, task: &Task) -> Result<()>;

    /// Run an adjoint simulation in the task's workspace.
    fn adjoint(&self, task: &Task) -> Result<()>;

    /// Read a model or kernel file.
    fn load(&self, path: &Path) -> Result<ModelRecord>;

    /// Write a record as `kind` (`model` or `kernel`).
    fn save(&self, path: &Path, record: &ModelRecord, kind: &str) -> Result<()>;

    /// Sum the per-worker kernels under `path`.
    fn combine(&self, task: &Task, path: &Path) -> Result<()>;

    /// Smooth the tracked fields of `path/tag`.
    fn smooth(&self, path: &Path, tag: &str, span: f64) -> Result<ModelRecord>;

    /// Clip the tracked fields of `path/tag`.
    fn clip(&self, path: &Path, tag: &str, thresh: f64) -> Result<ModelRecord>;

    /// Tracked fields of the model or kernel at `path` as one flat vector.
    fn merge(&self, path: &Path) -> Result<Vec<f64>>;

    /// The record at `like` with its tracked fields taken from `vector`.
    fn split(&self, vector: &[f64], like: &Path) -> Result<ModelRecord>;

    /// Stage `path/model` as the workspace's input model.
    fn import_model(&self, task: &Task, path: &Path) -> Result<()>;

    /// Stage observed traces from `path/traces/<task>`.
    fn import_traces(&self, task: &Task, path: &Path) -> Result<()>;

    /// Publish the workspace model to `dst`; only the coordinator writes.
    fn export_model(&self, task: &Task, dst: &Path) -> Result<bool>;

    /// Publish the task's kernel under `path/kernels`.
    fn export_kernels(&self, task: &Task, path: &Path) -> Result<PathBuf>;

    /// Hand the task's residuals over to `path/residuals`.
    fn export_residuals(&self, task: &Task, path: &Path) -> Result<PathBuf>;

    /// Publish the workspace directory `prefix` under `path/traces`.
    fn export_traces(&self, task: &Task, path: &Path, prefix: &str) -> Result<PathBuf>;
}

/// Build the back end named in the configuration.
///
/// # Errors
/// Returns [`SolverError::UnknownBackend`] for an unrecognized name.
pub fn from_config(config: SolverConfig) -> Result<Box<dyn SolverBackend>> {
    match config.backend.as_str() {
        SPECFEM2D => Ok(Box::new(Specfem2d::new(config))),
        other => Err(SolverError::UnknownBackend(other.to_string())),
    }
}

/// SPECFEM2D, run as the `xmeshfem2D` and `xspecfem2D` executables.
#[derive(Debug, Clone)]
pub struct Specfem2d {
    config: SolverConfig,
}

impl Specfem2d {
    /// Create the back end from a validated configuration.
    pub fn new(config: SolverConfig) -> Self {
        Specfem2d { config }
    }

    /// Workspace of `task` under the scratch root.
    pub fn workspace(&self, task: &Task) -> Workspace {
        Workspace::new(&self.config.paths.scratch, &task.name)
    }

    /// Create and stage the workspace of `task`.
    pub fn stage_workspace(&self, task: &Task) -> Result<Workspace> {
        let workspace = self.workspace(task);
        workspace.initialize(&self.config.paths, &self.config.timing)?;
        Ok(workspace)
    }

    fn gradient(&self) -> GradientProcessor<'_> {
        GradientProcessor::new(&self.config.parameters, &self.config.paths.model_init)
    }

    /// Forward run, then collect `U?_file_single.su` into `traces/obs` and publish them.
    fn generate_synthetic_data(&self, task: &Task) -> Result<()> {
        self.forward(task)?;

        let workspace = self.workspace(task);
        let obs = workspace.traces_dir("obs");
        fs::create_dir_all(&obs)?;
        let mut moved = 0usize;
        for entry in fsutil::list_visible(&workspace.output_files())? {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if is_seismogram(name) {
                fsutil::move_path(&entry, &obs.join(name))?;
                moved += 1;
            }
        }
        tracing::info!(task = %task.name, traces = moved, "collected synthetic traces");

        TransferAdapter::new(&workspace).export_traces(
            &self.config.paths.output,
            "traces/obs",
        )?;
        Ok(())
    }
}

/// Whether `name` is a single-precision SU seismogram, `U?_file_single.su`.
fn is_seismogram(name: &str) -> bool {
    name.strip_prefix('U').and_then(|rest| rest.get(1..)) == Some("_file_single.su")
}

impl SolverBackend for Specfem2d {
    fn name(&self) -> &'static str {
        SPECFEM2D
    }

    fn check(&self) -> Result<()> {
        let paths = &self.config.paths;
        let required = [
            ("paths.solver_binaries", &paths.solver_binaries, true),
            ("paths.solver_files", &paths.solver_files, true),
            ("paths.model_init", &paths.model_init, false),
        ];
        for (key, path, is_dir) in required {
            let ok = if is_dir { path.is_dir() } else { path.is_file() };
            if !ok {
                return Err(SolverError::InvalidConfig {
                    key: key.to_string(),
                    reason: format!("{} does not exist", path.display()),
                });
            }
        }
        tracing::debug!(backend = SPECFEM2D, "configuration checked");
        Ok(())
    }

    fn initialize(&self, task: &Task) -> Result<()> {
        self.stage_workspace(task).map(|_| ())
    }

    fn write_inputs(&self, task: &Task, geometry: &dyn TraceGeometry) -> Result<()> {
        let workspace = self.workspace(task);
        inputs::write_parameters(&workspace, &self.config.timing)?;
        inputs::write_receivers(&workspace, geometry)?;
        inputs::write_sources(&workspace, &self.config.timing, geometry)
    }

    fn generate_data(&self, task: &Task, model_path: &Path, model_name: &str) -> Result<()> {
        self.generate_mesh(task, model_path, model_name)?;
        self.generate_synthetic_data(task)
    }

    fn generate_mesh(&self, task: &Task, model_path: &Path, model_name: &str) -> Result<()> {
        let workspace = self.stage_workspace(task)?;
        fsutil::copy_path(model_path, &workspace.model_file())?;
        self.export_model(task, &self.config.paths.output.join(model_name))?;
        Ok(())
    }

    fn forward(&self, task: &Task) -> Result<()> {
        let workspace = self.workspace(task);
        tracing::info!(task = %task.name, worker = %task.worker, "forward simulation");
        SolverInvoker::new(&workspace, &self.config.executables).forward()
    }

    fn adjoint(&self, task: &Task) -> Result<()> {
        let workspace = self.workspace(task);
        tracing::info!(task = %task.name, worker = %task.worker, "adjoint simulation");
        SolverInvoker::new(&workspace, &self.config.executables).adjoint()
    }

    fn load(&self, path: &Path) -> Result<ModelRecord> {
        io::load(path)
    }

    fn save(&self, path: &Path, record: &ModelRecord, kind: &str) -> Result<()> {
        io::save_named(path, record, kind, Some(&self.config.paths.model_init))
    }

    fn combine(&self, task: &Task, path: &Path) -> Result<()> {
        let workspace = self.workspace(task);
        let program = workspace.executable(&self.config.executables.sum_kernels);
        self.gradient().combine(&program, path, workspace.root())
    }

    fn smooth(&self, path: &Path, tag: &str, span: f64) -> Result<ModelRecord> {
        self.gradient().smooth(path, tag, span)
    }

    fn clip(&self, path: &Path, tag: &str, thresh: f64) -> Result<ModelRecord> {
        self.gradient().clip(path, tag, thresh)
    }

    fn merge(&self, path: &Path) -> Result<Vec<f64>> {
        io::load(path)?.merge(&self.config.parameters)
    }

    fn split(&self, vector: &[f64], like: &Path) -> Result<ModelRecord> {
        io::load(like)?.split(vector, &self.config.parameters)
    }

    fn import_model(&self, task: &Task, path: &Path) -> Result<()> {
        TransferAdapter::new(&self.workspace(task)).import_model(path)
    }

    fn import_traces(&self, task: &Task, path: &Path) -> Result<()> {
        TransferAdapter::new(&self.workspace(task)).import_traces(path)
    }

    fn export_model(&self, task: &Task, dst: &Path) -> Result<bool> {
        TransferAdapter::new(&self.workspace(task)).export_model(dst, task.worker)
    }

    fn export_kernels(&self, task: &Task, path: &Path) -> Result<PathBuf> {
        TransferAdapter::new(&self.workspace(task)).export_kernels(path, task.worker)
    }

    fn export_residuals(&self, task: &Task, path: &Path) -> Result<PathBuf> {
        TransferAdapter::new(&self.workspace(task)).export_residuals(path)
    }

    fn export_traces(&self, task: &Task, path: &Path, prefix: &str) -> Result<PathBuf> {
        TransferAdapter::new(&self.workspace(task)).export_traces(path, prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Executables, SolverPaths, TimeStepping};
    use crate::core::Field;

    fn config(root: &Path, backend: &str) -> SolverConfig {
        SolverConfig {
            backend: backend.to_string(),
            parameters: vec![Field::Vs],
            timing: TimeStepping {
                nt: 100,
                dt: 0.01,
                f0: 2.5,
            },
            paths: SolverPaths {
                scratch: root.join("scratch"),
                output: root.join("output"),
                solver_binaries: root.join("bin"),
                solver_files: root.join("files"),
                model_init: root.join("model_init"),
            },
            executables: Executables::default(),
        }
    }

    #[test]
    fn seismogram_names() {
        assert!(is_seismogram("Ux_file_single.su"));
        assert!(is_seismogram("Uz_file_single.su"));
        assert!(!is_seismogram("Ux_file_double.su"));
        assert!(!is_seismogram("Uxx_file_single.su"));
        assert!(!is_seismogram("Px_file_single.su"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = from_config(config(dir.path(), "specfem3d"));
        assert!(matches!(result, Err(SolverError::UnknownBackend(name)) if name == "specfem3d"));

        let backend = from_config(config(dir.path(), SPECFEM2D)).unwrap();
        assert_eq!(backend.name(), "specfem2d");
    }

    #[test]
    fn check_reports_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Specfem2d::new(config(dir.path(), SPECFEM2D));
        match backend.check() {
            Err(SolverError::InvalidConfig { key, .. }) => assert_eq!(key, "paths.solver_binaries"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }

        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::create_dir_all(dir.path().join("files")).unwrap();
        fs::write(dir.path().join("model_init"), "").unwrap();
        backend.check().unwrap();
    }

    #[test]
    fn write_inputs_patches_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Specfem2d::new(config(dir.path(), SPECFEM2D));
        let task = Task::new("EQ001", crate::workspace::WorkerId(0));
        let ws = backend.workspace(&task);
        fs::create_dir_all(ws.data_dir()).unwrap();
        fs::write(
            ws.par_file(),
            "NSTEP = 1\nDELTAT = 1.0\nuse_existing_STATIONS = .false.\n",
        )
        .unwrap();
        fs::write(ws.source_file(), "xs = 0\nzs = 0\nf0 = 1\n").unwrap();

        let geometry = crate::inputs::StaticGeometry {
            source: (50.0, 75.0),
            receivers: vec![(1.0, 2.0)],
        };
        backend.write_inputs(&task, &geometry).unwrap();

        assert_eq!(crate::params::getpar(&ws.par_file(), "NSTEP").unwrap(), "100");
        assert_eq!(crate::params::getpar(&ws.source_file(), "zs").unwrap(), "75");
        assert_eq!(crate::params::getpar(&ws.source_file(), "f0").unwrap(), "2.5");
        assert!(ws.data_dir().join("STATIONS").exists());
    }

    #[test]
    fn merge_and_split_use_tracked_fields() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Specfem2d::new(config(dir.path(), SPECFEM2D));
        let path = dir.path().join("model");
        fs::write(&path, "0 0 0 1 2 3\n0 1 1 1 2 4\n").unwrap();

        assert_eq!(backend.merge(&path).unwrap(), vec![3.0, 4.0]);
        let record = backend.split(&[9.0, 8.0], &path).unwrap();
        assert_eq!(record.get(Field::Vs).unwrap(), &[9.0, 8.0]);
        assert_eq!(record.get(Field::Vp).unwrap(), &[2.0, 2.0]);
        assert!(matches!(
            backend.split(&[1.0], &path),
            Err(SolverError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn workspace_is_under_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Specfem2d::new(config(dir.path(), SPECFEM2D));
        let ws = backend.workspace(&Task::new("EQ007", crate::workspace::WorkerId(2)));
        assert_eq!(ws.root(), dir.path().join("scratch/EQ007"));
    }
}
