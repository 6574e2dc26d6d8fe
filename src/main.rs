// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use fwi_solver::backend::{self, SolverBackend};
use fwi_solver::config::SolverConfig;
use fwi_solver::inputs::StaticGeometry;
use fwi_solver::io;
use fwi_solver::workspace::{Task, WorkerId};

#[derive(Parser)]
#[command(name = "fwi-solver", about = "SPECFEM2D solver back end for waveform inversion")]
struct Cli {
    /// Solver configuration file
    #[arg(short = 'c', long, default_value = "solver.toml", global = true)]
    config: PathBuf,

    /// Task (source) name, e.g. EQ001
    #[arg(short = 't', long, global = true)]
    task: Option<String>,

    /// Worker identity assigned by the coordinator
    #[arg(short = 'w', long, default_value = "0", global = true)]
    worker: usize,

    /// Number of Rayon worker threads
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and check that inputs exist
    Check,
    /// Create and stage the task's workspace
    Init,
    /// Patch time stepping, receivers and source into the workspace inputs
    WriteInputs {
        /// Source position as X,Z
        #[arg(long, value_parser = parse_point)]
        source: (f64, f64),
        /// Receiver position as X,Z; repeat for each receiver
        #[arg(long = "receiver", value_parser = parse_point)]
        receivers: Vec<(f64, f64)>,
    },
    /// Run a forward simulation
    Forward,
    /// Run an adjoint simulation
    Adjoint,
    /// Stage a model in a fresh workspace and publish it
    GenerateMesh {
        /// Model file to mesh
        #[arg(long)]
        model: PathBuf,
        /// Name under the output root
        #[arg(long, default_value = "model_init")]
        model_name: String,
    },
    /// Mesh a model and run a forward simulation to produce observed traces
    GenerateData {
        /// Model file to mesh
        #[arg(long)]
        model: PathBuf,
        /// Name under the output root
        #[arg(long, default_value = "model_true")]
        model_name: String,
    },
    /// Gaussian-smooth the tracked fields of a kernel file
    Smooth {
        /// Directory holding the kernel
        #[arg(long)]
        path: PathBuf,
        /// Kernel file name inside the directory
        #[arg(long, default_value = "gradient")]
        tag: String,
        /// Gaussian width in grid cells; 0 disables smoothing
        #[arg(long)]
        span: f64,
    },
    /// Clip the tracked fields of a kernel file to a fraction of their range
    Clip {
        /// Directory holding the kernel
        #[arg(long)]
        path: PathBuf,
        /// Kernel file name inside the directory
        #[arg(long, default_value = "gradient")]
        tag: String,
        /// Fraction of each field's extrema to keep; 1 or more disables clipping
        #[arg(long)]
        thresh: f64,
    },
    /// Write the tracked fields of a model or kernel as one .npy vector
    Merge {
        /// Model or kernel file
        #[arg(long)]
        path: PathBuf,
        /// Destination .npy file
        #[arg(long)]
        output: PathBuf,
    },
    /// Write a model or kernel whose tracked fields come from a .npy vector
    Split {
        /// Source .npy file
        #[arg(long)]
        vector: PathBuf,
        /// File supplying coordinates and untracked fields
        #[arg(long)]
        like: PathBuf,
        /// Destination file
        #[arg(long)]
        output: PathBuf,
        /// Layout to write, `model` or `kernel`
        #[arg(long, default_value = "model")]
        kind: String,
    },
    /// Sum the per-worker kernels under a directory
    Combine {
        /// Directory of per-worker kernels
        #[arg(long)]
        path: PathBuf,
    },
    /// Copy the task's kernel to <path>/kernels/<worker>
    ExportKernels {
        /// Output root
        #[arg(long)]
        path: PathBuf,
    },
    /// Move the task's residuals to <path>/residuals/<task>
    ExportResiduals {
        /// Output root
        #[arg(long)]
        path: PathBuf,
    },
    /// Copy a workspace directory to <path>/traces/<task>
    ExportTraces {
        /// Output root
        #[arg(long)]
        path: PathBuf,
        /// Workspace-relative directory to export
        #[arg(long, default_value = "traces/obs")]
        prefix: String,
    },
    /// Copy the workspace model to a destination (worker 0 only)
    ExportModel {
        /// Destination file
        #[arg(long)]
        dst: PathBuf,
    },
    /// Stage <path>/model as the workspace's input model
    ImportModel {
        /// Directory holding `model`
        #[arg(long)]
        path: PathBuf,
    },
    /// Stage observed traces from <path>/traces/<task>
    ImportTraces {
        /// Output root holding `traces/<task>`
        #[arg(long)]
        path: PathBuf,
    },
}

fn task(cli: &Cli) -> Result<Task> {
    match &cli.task {
        Some(name) if !name.is_empty() => Ok(Task::new(name.clone(), WorkerId(cli.worker))),
        _ => bail!("--task is required for this command"),
    }
}

fn parse_point(s: &str) -> std::result::Result<(f64, f64), String> {
    let (x, z) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Z, got '{}'", s))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("bad coordinate '{}': {}", v, e))
    };
    Ok((coord(x)?, coord(z)?))
}

fn run(cli: &Cli, backend: &dyn SolverBackend) -> Result<()> {
    match &cli.command {
        Command::Check => println!("{}: configuration ok", backend.name()),
        Command::Init => backend.initialize(&task(cli)?)?,
        Command::WriteInputs { source, receivers } => {
            let geometry = StaticGeometry {
                source: *source,
                receivers: receivers.clone(),
            };
            backend.write_inputs(&task(cli)?, &geometry)?
        }
        Command::Forward => backend.forward(&task(cli)?)?,
        Command::Adjoint => backend.adjoint(&task(cli)?)?,
        Command::GenerateMesh { model, model_name } => {
            backend.generate_mesh(&task(cli)?, model, model_name)?
        }
        Command::GenerateData { model, model_name } => {
            backend.generate_data(&task(cli)?, model, model_name)?
        }
        Command::Smooth { path, tag, span } => {
            backend.smooth(path, tag, *span)?;
        }
        Command::Clip { path, tag, thresh } => {
            backend.clip(path, tag, *thresh)?;
        }
        Command::Merge { path, output } => {
            let vector = backend.merge(path)?;
            io::save_npy_vector(output, &vector)?;
            println!("{}", output.display());
        }
        Command::Split {
            vector,
            like,
            output,
            kind,
        } => {
            let vector = io::load_npy_vector(vector)?;
            let record = backend.split(&vector, like)?;
            backend.save(output, &record, kind)?;
            println!("{}", output.display());
        }
        Command::Combine { path } => backend.combine(&task(cli)?, path)?,
        Command::ExportKernels { path } => {
            let dst = backend.export_kernels(&task(cli)?, path)?;
            println!("{}", dst.display());
        }
        Command::ExportResiduals { path } => {
            let dst = backend.export_residuals(&task(cli)?, path)?;
            println!("{}", dst.display());
        }
        Command::ExportTraces { path, prefix } => {
            let dst = backend.export_traces(&task(cli)?, path, prefix)?;
            println!("{}", dst.display());
        }
        Command::ExportModel { dst } => {
            if backend.export_model(&task(cli)?, dst)? {
                println!("{}", dst.display());
            }
        }
        Command::ImportModel { path } => backend.import_model(&task(cli)?, path)?,
        Command::ImportTraces { path } => backend.import_traces(&task(cli)?, path)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    if let Some(threads) = cli.threads {
        if threads == 0 {
            bail!("--threads must be at least 1");
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure the Rayon thread pool")?;
    }

    let config = SolverConfig::from_file(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;
    let backend = backend::from_config(config)?;
    backend.check().context("configuration check failed")?;

    run(&cli, &*backend)
}
