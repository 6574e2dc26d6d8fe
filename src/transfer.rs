// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fsutil;
use crate::workspace::{WorkerId, Workspace};

/// Moves artifacts between a workspace and the shared output root.
///
/// Artifacts still needed in the workspace are copied; residuals, which are
/// consumed once downstream, are moved. Destination parents are always
/// created. Exports are namespaced by task or worker, except the initial
/// model, which only the coordinator writes.
pub struct TransferAdapter<'a> {
    workspace: &'a Workspace,
}

impl<'a> TransferAdapter<'a> {
    /// Create an adapter for one workspace.
    pub fn new(workspace: &'a Workspace) -> Self {
        TransferAdapter { workspace }
    }

    /// Copy `path/model` into the workspace as the mesher's input model.
    pub fn import_model(&self, path: &Path) -> Result<()> {
        fsutil::copy_path(&path.join("model"), &self.workspace.model_file())
    }

    /// Copy `path/traces/<task>/*` into `traces/obs`.
    pub fn import_traces(&self, path: &Path) -> Result<()> {
        let src = path.join("traces").join(self.workspace.task());
        fsutil::copy_dir_contents(&src, &self.workspace.traces_dir("obs"))
    }

    /// Copy the workspace model to `dst` if `worker` is the coordinator.
    ///
    /// Returns whether a file was written.
    pub fn export_model(&self, dst: &Path, worker: WorkerId) -> Result<bool> {
        if !worker.is_coordinator() {
            tracing::debug!(%worker, "skipping model export on non-coordinator worker");
            return Ok(false);
        }
        fsutil::copy_path(&self.workspace.model_file(), dst)?;
        tracing::info!(dst = %dst.display(), "exported model");
        Ok(true)
    }

    /// Copy the adjoint kernel to `path/kernels/<worker>`.
    pub fn export_kernels(&self, path: &Path, worker: WorkerId) -> Result<PathBuf> {
        let dst = path.join("kernels").join(worker.to_string());
        fsutil::copy_path(&self.workspace.kernel_file(), &dst)?;
        Ok(dst)
    }

    /// Move `residuals` to `path/residuals/<task>`.
    pub fn export_residuals(&self, path: &Path) -> Result<PathBuf> {
        let dst = path.join("residuals").join(self.workspace.task());
        fsutil::move_path(&self.workspace.residuals_dir(), &dst)?;
        Ok(dst)
    }

    /// Copy the workspace directory `prefix` to `path/traces/<task>`.
    pub fn export_traces(&self, path: &Path, prefix: &str) -> Result<PathBuf> {
        let dst = path.join("traces").join(self.workspace.task());
        fsutil::copy_path(&self.workspace.root().join(prefix), &dst)?;
        Ok(dst)
    }
}
