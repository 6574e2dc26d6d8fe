// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};

/// A named column of a SPECFEM2D model or kernel table.
///
/// The declaration order is the on-disk column order after the optional
/// identifier column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Horizontal node coordinate.
    X,
    /// Vertical node coordinate.
    Z,
    /// Density.
    Rho,
    /// Compressional wave speed.
    Vp,
    /// Shear wave speed.
    Vs,
}

impl Field {
    /// Every field, in column order.
    pub const ALL: [Field; 5] = [Field::X, Field::Z, Field::Rho, Field::Vp, Field::Vs];

    /// The material parameters, which may be backfilled from a reference model.
    pub const MATERIAL: [Field; 3] = [Field::Rho, Field::Vp, Field::Vs];

    /// Column index of this field, not counting the identifier column.
    pub fn column(self) -> usize {
        match self {
            Field::X => 0,
            Field::Z => 1,
            Field::Rho => 2,
            Field::Vp => 3,
            Field::Vs => 4,
        }
    }

    /// Lowercase name used in configuration files and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Field::X => "x",
            Field::Z => "z",
            Field::Rho => "rho",
            Field::Vp => "vp",
            Field::Vs => "vs",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| SolverError::Other(format!("unknown field '{}'", s)))
    }
}

/// On-disk layout of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Six columns: identifier followed by the five fields.
    Model,
    /// Five columns, no identifier.
    Kernel,
}

impl RecordKind {
    /// Total number of columns written for this kind.
    pub fn columns(self) -> usize {
        match self {
            RecordKind::Model => 6,
            RecordKind::Kernel => 5,
        }
    }

    /// Column offset of the first field.
    pub fn offset(self) -> usize {
        match self {
            RecordKind::Model => 1,
            RecordKind::Kernel => 0,
        }
    }

    /// Infer the layout from a table's column count.
    pub fn from_columns(ncol: usize) -> Option<Self> {
        match ncol {
            6 => Some(RecordKind::Model),
            5 => Some(RecordKind::Kernel),
            _ => None,
        }
    }
}

impl FromStr for RecordKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "model" => Ok(RecordKind::Model),
            "kernel" => Ok(RecordKind::Kernel),
            other => Err(SolverError::InvalidKind(other.to_string())),
        }
    }
}

/// A model or kernel: per-node values keyed by field.
///
/// Coordinates are always present and every stored field has the same
/// length as the coordinates. Material fields may be absent; they are
/// backfilled from a reference model on save.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    fields: BTreeMap<Field, Vec<f64>>,
    ids: Option<Vec<f64>>,
    layout: Option<RecordKind>,
}

impl ModelRecord {
    /// Create a record holding only node coordinates.
    ///
    /// # Errors
    /// Returns an error if `x` and `z` differ in length.
    pub fn new(x: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        if x.len() != z.len() {
            return Err(SolverError::ShapeMismatch {
                field: Field::Z.to_string(),
                expected: x.len(),
                got: z.len(),
            });
        }
        let mut fields = BTreeMap::new();
        fields.insert(Field::X, x);
        fields.insert(Field::Z, z);
        Ok(ModelRecord {
            fields,
            ids: None,
            layout: None,
        })
    }

    /// Attach the identifier column read from a six-column table (builder method).
    ///
    /// # Errors
    /// Returns an error if the length differs from the node count.
    pub fn with_ids(mut self, ids: Vec<f64>) -> Result<Self> {
        self.check_len("id", ids.len())?;
        self.ids = Some(ids);
        Ok(self)
    }

    /// Record the layout the table was read with (builder method).
    pub fn with_layout(mut self, layout: RecordKind) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Number of mesh nodes.
    pub fn num_nodes(&self) -> usize {
        self.fields.get(&Field::X).map_or(0, Vec::len)
    }

    /// Values of a field, if present.
    pub fn get(&self, field: Field) -> Option<&[f64]> {
        self.fields.get(&field).map(Vec::as_slice)
    }

    /// Mutable values of a field, if present. The slice keeps the length fixed.
    pub fn get_mut(&mut self, field: Field) -> Option<&mut [f64]> {
        self.fields.get_mut(&field).map(Vec::as_mut_slice)
    }

    /// Whether the field is stored in this record.
    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// Insert or replace a field.
    ///
    /// # Errors
    /// Returns an error if the length differs from the node count.
    pub fn insert(&mut self, field: Field, values: Vec<f64>) -> Result<()> {
        self.check_len(field.name(), values.len())?;
        self.fields.insert(field, values);
        Ok(())
    }

    /// Remove a material field. Coordinates cannot be removed.
    pub fn remove(&mut self, field: Field) -> Option<Vec<f64>> {
        match field {
            Field::X | Field::Z => None,
            _ => self.fields.remove(&field),
        }
    }

    /// Fields present in the record, in column order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.keys().copied()
    }

    /// Identifier column, if the record was read from a six-column table.
    pub fn ids(&self) -> Option<&[f64]> {
        self.ids.as_deref()
    }

    /// Layout the record was read with, if it came from disk.
    pub fn layout(&self) -> Option<RecordKind> {
        self.layout
    }

    /// Minimum and maximum of a field, ignoring NaN.
    pub fn extrema(&self, field: Field) -> Option<(f64, f64)> {
        value_range(self.get(field)?)
    }

    /// Concatenate the given fields into one flat vector for the optimizer.
    ///
    /// # Errors
    /// Returns an error if any of the fields is absent.
    pub fn merge(&self, parameters: &[Field]) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(parameters.len() * self.num_nodes());
        for &field in parameters {
            let values = self.get(field).ok_or_else(|| SolverError::MissingField {
                field: field.to_string(),
            })?;
            out.extend_from_slice(values);
        }
        Ok(out)
    }

    /// Inverse of [`merge`](Self::merge): a copy of this record with the given
    /// fields replaced by consecutive slices of `vector`.
    ///
    /// # Errors
    /// Returns an error if `vector` is not `parameters.len()` node counts long.
    pub fn split(&self, vector: &[f64], parameters: &[Field]) -> Result<ModelRecord> {
        let n = self.num_nodes();
        if vector.len() != n * parameters.len() {
            return Err(SolverError::ShapeMismatch {
                field: "vector".to_string(),
                expected: n * parameters.len(),
                got: vector.len(),
            });
        }
        let mut out = self.clone();
        for (&field, chunk) in parameters.iter().zip(vector.chunks(n.max(1))) {
            out.insert(field, chunk.to_vec())?;
        }
        Ok(out)
    }

    fn check_len(&self, name: &str, got: usize) -> Result<()> {
        let expected = self.num_nodes();
        if got != expected {
            return Err(SolverError::ShapeMismatch {
                field: name.to_string(),
                expected,
                got,
            });
        }
        Ok(())
    }
}

/// Minimum and maximum of `values`, ignoring NaN.
///
/// Returns `None` for an empty slice or one that holds only NaN.
pub fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    (lo <= hi).then_some((lo, hi))
}
