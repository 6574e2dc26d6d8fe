// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Writers for solver input files derived from configuration and trace geometry.

use std::io::Write;

use crate::config::TimeStepping;
use crate::error::Result;
use crate::params;
use crate::workspace::Workspace;

/// Source and receiver positions, supplied by the trace reader.
pub trait TraceGeometry {
    /// Receiver coordinates `(x, z)`.
    fn receivers(&self) -> Vec<(f64, f64)>;

    /// Source coordinates `(x, z)`.
    fn source(&self) -> (f64, f64);
}

/// Fixed geometry, for callers that already hold the coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticGeometry {
    /// Source coordinates.
    pub source: (f64, f64),
    /// Receiver coordinates.
    pub receivers: Vec<(f64, f64)>,
}

impl TraceGeometry for StaticGeometry {
    fn receivers(&self) -> Vec<(f64, f64)> {
        self.receivers.clone()
    }

    fn source(&self) -> (f64, f64) {
        self.source
    }
}

/// Patch the time stepping into `DATA/Par_file`.
pub fn write_parameters(workspace: &Workspace, timing: &TimeStepping) -> Result<()> {
    let par_file = workspace.par_file();
    params::setpar(&par_file, "NSTEP", &timing.nt.to_string())?;
    params::setpar(&par_file, "DELTAT", &timing.dt.to_string())?;
    Ok(())
}

/// Write `DATA/STATIONS` and tell the mesher to use it.
pub fn write_receivers(workspace: &Workspace, geometry: &dyn TraceGeometry) -> Result<()> {
    params::setpar(&workspace.par_file(), "use_existing_STATIONS", ".true.")?;

    let file = std::fs::File::create(workspace.data_dir().join("STATIONS"))?;
    let mut w = std::io::BufWriter::new(file);
    for (i, (x, z)) in geometry.receivers().into_iter().enumerate() {
        writeln!(w, "S{:04}    AA {:20.7} {:20.7} {:8.1} {:8.1}", i + 1, x, z, 0.0, 0.0)?;
    }
    w.flush()?;
    Ok(())
}

/// Patch source position and center frequency into `DATA/SOURCE`.
pub fn write_sources(
    workspace: &Workspace,
    timing: &TimeStepping,
    geometry: &dyn TraceGeometry,
) -> Result<()> {
    let source = workspace.source_file();
    let (xs, zs) = geometry.source();
    params::setpar(&source, "xs", &xs.to_string())?;
    params::setpar(&source, "zs", &zs.to_string())?;
    params::setpar(&source, "f0", &timing.f0.to_string())?;
    Ok(())
}
