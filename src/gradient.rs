// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;

use crate::core::{value_range, Field, ModelRecord, RecordKind};
use crate::error::{Result, SolverError};
use crate::fsutil;
use crate::invoker::launch;
use crate::io;
use crate::smoothing::{grid_resolution, MeshResampler};

/// Sibling that keeps the kernel as it was before smoothing.
pub const NOSMOOTH: &str = "_nosmooth";
/// Sibling that keeps the kernel as it was before clipping.
pub const NOCLIP: &str = "_noclip";

/// Post-processing of gradient (kernel) files.
///
/// Transforms act on the configured material fields only. The input file is
/// renamed to an archive sibling before the result is written in its place.
pub struct GradientProcessor<'a> {
    parameters: &'a [Field],
    model_init: &'a Path,
}

impl<'a> GradientProcessor<'a> {
    /// Create a processor for the given fields, backfilling others from `model_init`.
    pub fn new(parameters: &'a [Field], model_init: &'a Path) -> Self {
        GradientProcessor {
            parameters,
            model_init,
        }
    }

    /// Smooth `path/tag` with a Gaussian of `span` grid cells.
    ///
    /// A zero span returns the record without touching the file.
    ///
    /// # Errors
    /// Returns [`SolverError::InvalidSpan`] for a negative or non-finite span.
    pub fn smooth(&self, path: &Path, tag: &str, span: f64) -> Result<ModelRecord> {
        if !span.is_finite() || span < 0.0 {
            return Err(SolverError::InvalidSpan(span));
        }
        let mut record = io::load(&path.join(tag))?;
        if span == 0.0 {
            return Ok(record);
        }

        let (x, z) = coordinates(&record)?;
        let shape = grid_resolution(x, z)?;
        tracing::info!(
            path = %path.join(tag).display(),
            span,
            nx = shape[0],
            nz = shape[1],
            "smoothing kernel"
        );
        let resampler = MeshResampler::new(x, z, shape)?;

        for &field in self.parameters {
            let values = tracked(&record, field)?;
            let smoothed = resampler.smooth(values, span);
            record.insert(field, smoothed)?;
        }

        self.replace(path, tag, NOSMOOTH, &record)?;
        Ok(record)
    }

    /// Clip `path/tag` so that each field lies within `thresh` times its own extrema.
    ///
    /// A threshold of 1 or more returns the record without touching the file.
    pub fn clip(&self, path: &Path, tag: &str, thresh: f64) -> Result<ModelRecord> {
        let mut record = io::load(&path.join(tag))?;
        if thresh >= 1.0 {
            return Ok(record);
        }

        for &field in self.parameters {
            tracked(&record, field)?;
            if let Some(values) = record.get_mut(field) {
                clip_field(values, thresh);
            }
        }
        tracing::info!(path = %path.join(tag).display(), thresh, "clipped kernel");

        self.replace(path, tag, NOCLIP, &record)?;
        Ok(record)
    }

    /// Sum per-worker kernels under `path` with the external summation tool.
    ///
    /// The tool receives the number of entries under `path` and `path`
    /// itself, and writes the combined kernel where the solver expects it.
    ///
    /// A relative `path` is resolved against the process working directory
    /// before it is handed to the tool, which runs in `cwd`.
    pub fn combine(&self, program: &Path, path: &Path, cwd: &Path) -> Result<()> {
        let path = fsutil::absolute(path)?;
        let count = fsutil::list_visible(&path)?.len();
        tracing::info!(path = %path.display(), count, "combining kernels");
        let args = [count.to_string(), path.display().to_string()];
        launch(program, &args, cwd)
    }

    fn replace(&self, path: &Path, tag: &str, archive: &str, record: &ModelRecord) -> Result<()> {
        let target = path.join(tag);
        std::fs::rename(&target, path.join(archive))?;
        let kind = record.layout().unwrap_or(RecordKind::Kernel);
        io::save(&target, record, kind, Some(self.model_init))
    }
}

/// Clamp every value into `[thresh * min, thresh * max]` of the slice itself.
///
/// NaN entries are left as they are and do not take part in the extrema.
pub fn clip_field(values: &mut [f64], thresh: f64) {
    let Some((min, max)) = value_range(values) else {
        return;
    };
    if !min.is_finite() || !max.is_finite() {
        return;
    }
    let lo = thresh * min;
    let hi = thresh * max;
    for v in values.iter_mut().filter(|v| !v.is_nan()) {
        *v = v.max(lo).min(hi);
    }
}

fn coordinates(record: &ModelRecord) -> Result<(&[f64], &[f64])> {
    Ok((tracked(record, Field::X)?, tracked(record, Field::Z)?))
}

fn tracked(record: &ModelRecord, field: Field) -> Result<&[f64]> {
    record.get(field).ok_or_else(|| SolverError::MissingField {
        field: field.to_string(),
    })
}
