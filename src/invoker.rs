// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;

use crate::config::Executables;
use crate::error::{Result, SolverError};
use crate::fsutil;
use crate::params;
use crate::workspace::Workspace;

/// Lifecycle of one solver run inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    /// No run has been configured yet.
    Idle,
    /// Parameter file set up for a forward simulation.
    ForwardConfigured,
    /// Parameter file and adjoint-source link set up for an adjoint simulation.
    AdjointConfigured,
    /// Executables are running.
    Running,
    /// Mesher and solver both exited successfully.
    Complete,
    /// An executable failed; the workspace is left as is.
    Failed,
}

impl fmt::Display for SolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolverState::Idle => "idle",
            SolverState::ForwardConfigured => "configured for forward",
            SolverState::AdjointConfigured => "configured for adjoint",
            SolverState::Running => "running",
            SolverState::Complete => "complete",
            SolverState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Simulation mode written to the parameter file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Simulation {
    /// Forward run that saves the last wavefield frame.
    Forward,
    /// Adjoint run that reads the saved forward wavefield.
    Adjoint,
}

impl Simulation {
    /// Values of `SIMULATION_TYPE` and `SAVE_FORWARD` for this mode.
    pub fn flags(self) -> (&'static str, &'static str) {
        match self {
            Simulation::Forward => ("1", ".true."),
            Simulation::Adjoint => ("3", ".false."),
        }
    }
}

/// Runs the mesher and solver of one workspace.
///
/// A run is configured then executed; the mesher always finishes before the
/// solver starts. Failures are reported without retry and leave the invoker
/// in [`SolverState::Failed`].
pub struct SolverInvoker<'a> {
    workspace: &'a Workspace,
    executables: &'a Executables,
    state: SolverState,
}

impl<'a> SolverInvoker<'a> {
    /// Create an idle invoker for a workspace.
    pub fn new(workspace: &'a Workspace, executables: &'a Executables) -> Self {
        SolverInvoker {
            workspace,
            executables,
            state: SolverState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Write the simulation flags, and for adjoint runs relink `SEM` to `traces/adj`.
    ///
    /// # Errors
    /// Returns [`SolverError::InvalidState`] after a failure.
    pub fn configure(&mut self, simulation: Simulation) -> Result<()> {
        if matches!(self.state, SolverState::Failed | SolverState::Running) {
            return Err(SolverError::InvalidState {
                operation: "configure",
                state: self.state.to_string(),
            });
        }

        let (simulation_type, save_forward) = simulation.flags();
        let par_file = self.workspace.par_file();
        params::setpar(&par_file, "SIMULATION_TYPE", simulation_type)?;
        params::setpar(&par_file, "SAVE_FORWARD", save_forward)?;

        self.state = match simulation {
            Simulation::Forward => SolverState::ForwardConfigured,
            Simulation::Adjoint => {
                let link = self.workspace.adjoint_link();
                fsutil::remove_any(&link)?;
                fsutil::symlink_dir(Path::new("traces/adj"), &link)?;
                SolverState::AdjointConfigured
            }
        };
        Ok(())
    }

    /// Run the mesher and then the solver.
    ///
    /// # Errors
    /// Returns [`SolverError::InvalidState`] if no run is configured, or the
    /// first launch failure.
    pub fn run(&mut self) -> Result<()> {
        if !matches!(
            self.state,
            SolverState::ForwardConfigured | SolverState::AdjointConfigured
        ) {
            return Err(SolverError::InvalidState {
                operation: "run",
                state: self.state.to_string(),
            });
        }

        self.state = SolverState::Running;
        let root = self.workspace.root();
        for name in [&self.executables.mesher, &self.executables.solver] {
            let program = self.workspace.executable(name);
            if let Err(e) = launch(&program, &[], root) {
                tracing::error!(task = %self.workspace.task(), error = %e, "solver run failed");
                self.state = SolverState::Failed;
                return Err(e);
            }
        }
        self.state = SolverState::Complete;
        Ok(())
    }

    /// Configure and run a forward simulation.
    pub fn forward(&mut self) -> Result<()> {
        self.configure(Simulation::Forward)?;
        self.run()
    }

    /// Configure and run an adjoint simulation.
    pub fn adjoint(&mut self) -> Result<()> {
        self.configure(Simulation::Adjoint)?;
        self.run()
    }
}

/// Run an external executable to completion with standard output discarded.
///
/// Blocks until the process exits; there is no timeout.
pub fn launch(program: &Path, args: &[String], cwd: &Path) -> Result<()> {
    let program = fsutil::absolute(program)?;
    tracing::debug!(program = %program.display(), ?args, "launching");
    let start = Instant::now();

    let status = Command::new(&program)
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::null())
        .status()?;

    tracing::info!(
        program = %program.display(),
        code = ?status.code(),
        elapsed_s = start.elapsed().as_secs_f64(),
        "process exited"
    );
    if !status.success() {
        return Err(SolverError::ProcessFailed {
            program,
            code: status.code(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_per_mode() {
        assert_eq!(Simulation::Forward.flags(), ("1", ".true."));
        assert_eq!(Simulation::Adjoint.flags(), ("3", ".false."));
    }

    #[test]
    fn run_requires_configuration() {
        let ws = Workspace::new(Path::new("/nonexistent"), "EQ001");
        let exe = Executables::default();
        let mut invoker = SolverInvoker::new(&ws, &exe);
        assert_eq!(invoker.state(), SolverState::Idle);
        let result = invoker.run();
        assert!(matches!(
            result,
            Err(SolverError::InvalidState { operation: "run", .. })
        ));
        assert_eq!(invoker.state(), SolverState::Idle);
    }

    #[test]
    fn state_display() {
        assert_eq!(SolverState::Failed.to_string(), "failed");
        assert_eq!(
            SolverState::AdjointConfigured.to_string(),
            "configured for adjoint"
        );
    }

    #[cfg(unix)]
    #[test]
    fn launch_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let result = launch(Path::new("/bin/sh"), &["-c".into(), "exit 4".into()], dir.path());
        assert!(matches!(
            result,
            Err(SolverError::ProcessFailed { code: Some(4), .. })
        ));
        launch(Path::new("/bin/sh"), &["-c".into(), "echo ok".into()], dir.path()).unwrap();
    }
}
