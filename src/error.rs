// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while configuring, running, or post-processing a solver task.
#[derive(Debug)]
pub enum SolverError {
    /// One or more required configuration keys are absent.
    MissingConfig {
        /// Every missing key, in `section.key` form.
        keys: Vec<String>,
    },
    /// A configuration value is present but unusable.
    InvalidConfig {
        /// The offending key.
        key: String,
        /// Explanation of why it's invalid.
        reason: String,
    },
    /// The configuration file could not be parsed.
    ConfigParse(String),
    /// A model or kernel table is malformed.
    Format {
        /// The file being read.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
    /// Record kind is neither `model` nor `kernel`.
    InvalidKind(String),
    /// A field needed by the operation is absent from a record.
    MissingField {
        /// The field name.
        field: String,
    },
    /// A field's length does not match the record's node count.
    ShapeMismatch {
        /// The field name.
        field: String,
        /// The expected node count.
        expected: usize,
        /// The length encountered.
        got: usize,
    },
    /// A `KEY = value` entry was not found in a parameter file.
    ParameterNotFound {
        /// The key that was requested.
        key: String,
        /// The file that was searched.
        path: PathBuf,
    },
    /// An external executable exited unsuccessfully.
    ProcessFailed {
        /// The executable that was launched.
        program: PathBuf,
        /// The exit code, or `None` if terminated by a signal.
        code: Option<i32>,
    },
    /// Operation not permitted from the invoker's current state.
    InvalidState {
        /// The operation that was requested.
        operation: &'static str,
        /// The state the invoker was in.
        state: String,
    },
    /// Smoothing span is negative or not finite.
    InvalidSpan(f64),
    /// Mesh nodes have no extent along an axis, so no grid can cover them.
    DegenerateMesh {
        /// The collapsed axis.
        axis: &'static str,
    },
    /// The configured solver back end is not known.
    UnknownBackend(String),
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::MissingConfig { keys } => {
                write!(f, "missing required configuration keys: {}", keys.join(", "))
            }
            SolverError::InvalidConfig { key, reason } => {
                write!(f, "invalid configuration value for {}: {}", key, reason)
            }
            SolverError::ConfigParse(msg) => write!(f, "configuration parse error: {}", msg),
            SolverError::Format { path, reason } => {
                write!(
                    f,
                    "bad SPECFEM2D model or kernel {}: {}",
                    path.display(),
                    reason
                )
            }
            SolverError::InvalidKind(kind) => {
                write!(
                    f,
                    "invalid record kind '{}' (expected 'model' or 'kernel')",
                    kind
                )
            }
            SolverError::MissingField { field } => {
                write!(f, "record is missing required field '{}'", field)
            }
            SolverError::ShapeMismatch {
                field,
                expected,
                got,
            } => {
                write!(
                    f,
                    "field '{}' has {} values, expected {}",
                    field, got, expected
                )
            }
            SolverError::ParameterNotFound { key, path } => {
                write!(f, "parameter '{}' not found in {}", key, path.display())
            }
            SolverError::ProcessFailed { program, code } => match code {
                Some(code) => write!(f, "{} exited with status {}", program.display(), code),
                None => write!(f, "{} terminated by signal", program.display()),
            },
            SolverError::InvalidState { operation, state } => {
                write!(f, "cannot {} while solver is {}", operation, state)
            }
            SolverError::InvalidSpan(span) => {
                write!(
                    f,
                    "invalid smoothing span: {} (must be non-negative and finite)",
                    span
                )
            }
            SolverError::DegenerateMesh { axis } => {
                write!(f, "mesh has zero extent along {}", axis)
            }
            SolverError::UnknownBackend(name) => write!(f, "unknown solver back end: {}", name),
            SolverError::IoError(e) => write!(f, "I/O error: {}", e),
            SolverError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolverError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SolverError {
    fn from(e: std::io::Error) -> Self {
        SolverError::IoError(e)
    }
}

/// Convenience type alias for Results with SolverError.
pub type Result<T> = std::result::Result<T, SolverError>;
