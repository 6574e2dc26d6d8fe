// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{SolverPaths, TimeStepping};
use crate::error::Result;
use crate::fsutil;
use crate::params;

/// Identity of a parallel worker, assigned by the external coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub usize);

impl WorkerId {
    /// The worker that owns shared, non-namespaced exports.
    pub const COORDINATOR: WorkerId = WorkerId(0);

    /// Whether this worker performs the shared exports.
    pub fn is_coordinator(self) -> bool {
        self == Self::COORDINATOR
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// A unit of work: one seismic source handled by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Task name, e.g. the source identifier `EQ001`.
    pub name: String,
    /// Worker running the task.
    pub worker: WorkerId,
}

impl Task {
    /// Create a task.
    pub fn new(name: impl Into<String>, worker: WorkerId) -> Self {
        Task {
            name: name.into(),
            worker,
        }
    }
}

/// Per-task solver directory.
///
/// The relative layout is read and written by the solver executables
/// themselves and must not change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    task: String,
}

impl Workspace {
    /// Directories created by [`initialize`](Self::initialize), relative to the root.
    pub const LAYOUT: [&'static str; 6] = [
        "bin",
        "DATA",
        "traces/obs",
        "traces/syn",
        "traces/adj",
        "OUTPUT_FILES/DATABASES_MPI",
    ];

    /// Workspace of `task` under the scratch root.
    pub fn new(scratch: &Path, task: &str) -> Self {
        Workspace {
            root: scratch.join(task),
            task: task.to_string(),
        }
    }

    /// Root directory of the workspace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Task name.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Staged executables.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Solver input files.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("DATA")
    }

    /// Trace directory of the given kind (`obs`, `syn`, or `adj`).
    pub fn traces_dir(&self, kind: &str) -> PathBuf {
        self.root.join("traces").join(kind)
    }

    /// Raw solver output.
    pub fn output_files(&self) -> PathBuf {
        self.root.join("OUTPUT_FILES")
    }

    /// Mesh databases written by the mesher.
    pub fn databases_dir(&self) -> PathBuf {
        self.output_files().join("DATABASES_MPI")
    }

    /// Residuals written by preprocessing.
    pub fn residuals_dir(&self) -> PathBuf {
        self.root.join("residuals")
    }

    /// Solver parameter file toggled before each run.
    pub fn par_file(&self) -> PathBuf {
        self.data_dir().join("Par_file")
    }

    /// Canonical source descriptor.
    pub fn source_file(&self) -> PathBuf {
        self.data_dir().join("SOURCE")
    }

    /// Per-task source descriptor template.
    pub fn task_source_file(&self) -> PathBuf {
        self.data_dir().join(format!("SOURCE_{}", self.task))
    }

    /// Model read by the mesher.
    pub fn model_file(&self) -> PathBuf {
        self.data_dir().join("model_velocity.dat_input")
    }

    /// Kernel written by an adjoint run.
    pub fn kernel_file(&self) -> PathBuf {
        self.output_files()
            .join("proc000000_rhop_alpha_beta_kernel.dat")
    }

    /// Link the solver follows to find adjoint sources.
    pub fn adjoint_link(&self) -> PathBuf {
        self.root.join("SEM")
    }

    /// Path of a staged executable.
    pub fn executable(&self, name: &str) -> PathBuf {
        self.bin_dir().join(name)
    }

    /// Create the directory tree and stage executables and input files.
    ///
    /// Copies `solver_binaries/*` into `bin/` and `solver_files/*` into
    /// `DATA/`, copies `DATA/SOURCE_<task>` to `DATA/SOURCE`, and patches
    /// its `f0` to the configured center frequency. Calling this on an
    /// existing workspace is not supported.
    pub fn initialize(&self, paths: &SolverPaths, timing: &TimeStepping) -> Result<()> {
        tracing::info!(task = %self.task, root = %self.root.display(), "initializing workspace");

        for dir in Self::LAYOUT {
            fs::create_dir_all(self.root.join(dir))?;
        }

        fsutil::copy_dir_contents(&paths.solver_binaries, &self.bin_dir())?;
        fsutil::copy_dir_contents(&paths.solver_files, &self.data_dir())?;

        fs::copy(self.task_source_file(), self.source_file())?;
        params::setpar(&self.source_file(), "f0", &timing.f0.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_display_is_zero_padded() {
        assert_eq!(WorkerId(3).to_string(), "000003");
        assert!(WorkerId(0).is_coordinator());
        assert!(!WorkerId(3).is_coordinator());
    }

    #[test]
    fn layout_paths() {
        let ws = Workspace::new(Path::new("/scratch"), "EQ001");
        assert_eq!(ws.root(), Path::new("/scratch/EQ001"));
        assert_eq!(ws.traces_dir("adj"), Path::new("/scratch/EQ001/traces/adj"));
        assert_eq!(
            ws.databases_dir(),
            Path::new("/scratch/EQ001/OUTPUT_FILES/DATABASES_MPI")
        );
        assert_eq!(
            ws.task_source_file(),
            Path::new("/scratch/EQ001/DATA/SOURCE_EQ001")
        );
        assert_eq!(ws.executable("xspecfem2D"), Path::new("/scratch/EQ001/bin/xspecfem2D"));
    }

    #[test]
    fn initialize_fails_without_task_source() {
        let dir = tempfile::tempdir().unwrap();
        let bins = dir.path().join("bins");
        let files = dir.path().join("files");
        fs::create_dir_all(&bins).unwrap();
        fs::create_dir_all(&files).unwrap();
        let paths = SolverPaths {
            scratch: dir.path().join("scratch"),
            output: dir.path().join("output"),
            solver_binaries: bins,
            solver_files: files,
            model_init: dir.path().join("model_init"),
        };
        let timing = TimeStepping {
            nt: 10,
            dt: 0.1,
            f0: 1.0,
        };
        let ws = Workspace::new(&paths.scratch, "EQ404");
        assert!(ws.initialize(&paths, &timing).is_err());
    }
}
