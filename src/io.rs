// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1};

use crate::core::{Field, ModelRecord, RecordKind};
use crate::error::{Result, SolverError};

/// Width of one formatted value.
pub const VALUE_WIDTH: usize = 16;
/// Fractional digits of one formatted value.
pub const VALUE_PRECISION: usize = 10;

/// Read a whitespace-delimited numeric table and infer its layout.
///
/// Blank lines and lines starting with `#` are skipped. Every row must have
/// the same number of columns, and that number must be 5 or 6.
pub fn read_table(path: &Path) -> Result<(Array2<f64>, RecordKind)> {
    let text = std::fs::read_to_string(path)?;
    let bad = |reason: String| SolverError::Format {
        path: path.to_path_buf(),
        reason,
    };

    let mut ncol = None;
    let mut nrow = 0;
    let mut data = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let before = data.len();
        for token in line.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| {
                bad(format!(
                    "line {}: cannot parse '{}' as a number",
                    lineno + 1,
                    token
                ))
            })?;
            data.push(value);
        }
        let width = data.len() - before;
        match ncol {
            None => ncol = Some(width),
            Some(n) if n != width => {
                return Err(bad(format!(
                    "line {}: expected {} columns, found {}",
                    lineno + 1,
                    n,
                    width
                )))
            }
            Some(_) => {}
        }
        nrow += 1;
    }

    let ncol = ncol.ok_or_else(|| bad("table is empty".to_string()))?;
    let kind = RecordKind::from_columns(ncol)
        .ok_or_else(|| bad(format!("expected 5 or 6 columns, found {}", ncol)))?;
    let table = Array2::from_shape_vec((nrow, ncol), data)
        .map_err(|e| SolverError::Other(format!("shape error: {}", e)))?;
    Ok((table, kind))
}

/// Load a SPECFEM2D model or kernel.
///
/// A six-column table keeps its identifier column so that saving it back as
/// a model reproduces it.
pub fn load(path: &Path) -> Result<ModelRecord> {
    let (table, kind) = read_table(path)?;
    let ioff = kind.offset();
    let column = |field: Field| table.column(field.column() + ioff).to_vec();

    let mut record = ModelRecord::new(column(Field::X), column(Field::Z))?.with_layout(kind);
    for field in Field::MATERIAL {
        record.insert(field, column(field))?;
    }
    if kind == RecordKind::Model {
        record = record.with_ids(table.column(0).to_vec())?;
    }
    Ok(record)
}

/// Load a single field from a model or kernel file.
pub fn load_field(path: &Path, field: Field) -> Result<Vec<f64>> {
    let (table, kind) = read_table(path)?;
    Ok(table.column(field.column() + kind.offset()).to_vec())
}

/// Save a record as a SPECFEM2D model (6 columns) or kernel (5 columns).
///
/// Material fields absent from `record` are taken, by node position, from the
/// table at `reference`. Identifiers of a model are written from the record
/// when it carries them and as zero otherwise.
///
/// # Errors
/// Returns [`SolverError::MissingField`] if a field is absent and no reference
/// is given, and [`SolverError::ShapeMismatch`] if the reference has a
/// different node count.
pub fn save(
    path: &Path,
    record: &ModelRecord,
    kind: RecordKind,
    reference: Option<&Path>,
) -> Result<()> {
    let nrow = record.num_nodes();
    let ioff = kind.offset();
    let mut table = Array2::<f64>::zeros((nrow, kind.columns()));

    if kind == RecordKind::Model {
        if let Some(ids) = record.ids() {
            table.column_mut(0).assign(&ArrayView1::from(ids));
        }
    }

    let missing: Vec<Field> = Field::ALL
        .iter()
        .copied()
        .filter(|&f| !record.contains(f))
        .collect();
    if let Some(&field) = missing.first() {
        let Some(reference) = reference else {
            return Err(SolverError::MissingField {
                field: field.to_string(),
            });
        };
        tracing::debug!(
            reference = %reference.display(),
            fields = ?missing,
            "backfilling fields from reference model"
        );
    }

    for field in Field::ALL {
        let col = field.column() + ioff;
        if let Some(values) = record.get(field) {
            table.column_mut(col).assign(&ArrayView1::from(values));
        } else if let Some(reference) = reference {
            let values = load_field(reference, field)?;
            if values.len() != nrow {
                return Err(SolverError::ShapeMismatch {
                    field: field.to_string(),
                    expected: nrow,
                    got: values.len(),
                });
            }
            table.column_mut(col).assign(&ArrayView1::from(&values[..]));
        }
    }

    write_table(path, &table)
}

/// Save with the kind given by name, as read from a command line or config.
///
/// # Errors
/// Returns [`SolverError::InvalidKind`] for anything but `model` or `kernel`.
pub fn save_named(
    path: &Path,
    record: &ModelRecord,
    kind: &str,
    reference: Option<&Path>,
) -> Result<()> {
    save(path, record, kind.parse()?, reference)
}

/// Write a table with every value in `%16.10e` form, one space between columns.
pub fn write_table(path: &Path, table: &Array2<f64>) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);
    for row in table.rows() {
        let line: Vec<String> = row.iter().map(|&v| format_value(v)).collect();
        writeln!(w, "{}", line.join(" "))?;
    }
    w.flush()?;
    Ok(())
}

/// Format a value the way C's `%16.10e` does.
///
/// Rust's `{:e}` omits the exponent sign and zero padding, so the exponent is
/// rebuilt with a sign and at least two digits.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        let s = if value.is_nan() {
            "nan"
        } else if value > 0.0 {
            "inf"
        } else {
            "-inf"
        };
        return format!("{:>width$}", s, width = VALUE_WIDTH);
    }
    let s = format!("{:.prec$e}", value, prec = VALUE_PRECISION);
    let (mantissa, exponent) = s.split_once('e').unwrap_or((s.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let body = format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    format!("{:>width$}", body, width = VALUE_WIDTH)
}

/// Save a flat parameter vector to a .npy file.
pub fn save_npy_vector(path: &Path, values: &[f64]) -> Result<()> {
    let arr = Array1::from(values.to_vec());
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| SolverError::Other(format!("npy write error: {}", e)))?;
    Ok(())
}

/// Load a flat parameter vector from a .npy file, promoting f32 to f64.
pub fn load_npy_vector(path: &Path) -> Result<Vec<f64>> {
    let arr: Array1<f64> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr32: Array1<f32> = ndarray_npy::read_npy(path)
                .map_err(|e| SolverError::Other(format!("npy read error: {}", e)))?;
            arr32.mapv(|v| v as f64)
        }
    };
    Ok(arr.to_vec())
}
