// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Gaussian smoothing of fields defined on scattered mesh nodes.
//!
//! Node values are resampled onto a regular grid (inverse-distance weighting
//! of the nearest nodes), convolved with a truncated Gaussian, and
//! interpolated back to the nodes bilinearly. The convolution is normalized
//! by the kernel weight that falls inside the grid.

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis, Zip};
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::{PointDistance, RTree};

use crate::core::value_range;
use crate::error::{Result, SolverError};

type Node = GeomWithData<[f64; 2], usize>;

/// Number of nearest nodes blended into each grid sample.
const NEIGHBORS: usize = 4;

fn bounds(values: &[f64]) -> (f64, f64) {
    value_range(values).unwrap_or((f64::NAN, f64::NAN))
}

/// Grid resolution `[nx, nz]` for a node scatter.
///
/// Both axes get `round(sqrt(n * lx / lz))`; the z axis does not invert the
/// ratio. Each axis has at least two samples.
pub fn grid_resolution(x: &[f64], z: &[f64]) -> Result<[usize; 2]> {
    let (xmin, xmax) = bounds(x);
    let (zmin, zmax) = bounds(z);
    let lx = xmax - xmin;
    let lz = zmax - zmin;
    if !(lx > 0.0 && lx.is_finite()) {
        return Err(SolverError::DegenerateMesh { axis: "x" });
    }
    if !(lz > 0.0 && lz.is_finite()) {
        return Err(SolverError::DegenerateMesh { axis: "z" });
    }

    let n = x.len() as f64;
    let nx = (n * lx / lz).sqrt().round();
    let nz = (n * lx / lz).sqrt().round();
    Ok([(nx as usize).max(2), (nz as usize).max(2)])
}

/// Truncated, unnormalized Gaussian of standard deviation `span` grid cells.
///
/// The kernel extends `ceil(2 * span)` cells either side of the center, but
/// never more than `max_radius`. A span too small to square without
/// underflowing gives the identity kernel.
pub fn gaussian_weights(span: f64, max_radius: usize) -> Vec<f64> {
    let var = span * span;
    if !(var > 0.0) {
        return vec![1.0];
    }
    let r = (2.0 * span).ceil().clamp(1.0, max_radius.max(1) as f64) as usize;
    (0..=2 * r)
        .map(|k| {
            let d = k as f64 - r as f64;
            (-0.5 * d * d / var).exp()
        })
        .collect()
}

fn convolve_normalized(input: ArrayView1<f64>, weights: &[f64], mut out: ArrayViewMut1<f64>) {
    let n = input.len();
    let r = weights.len() / 2;
    for i in 0..n {
        let lo = i.saturating_sub(r);
        let hi = (i + r).min(n - 1);
        let mut acc = 0.0;
        let mut wsum = 0.0;
        for k in lo..=hi {
            let w = weights[k + r - i];
            acc += w * input[k];
            wsum += w;
        }
        out[i] = acc / wsum;
    }
}

/// Convolve a grid with a Gaussian of `span` cells.
///
/// The Gaussian is separable and the edge normalization factors per axis,
/// so two normalized 1-D passes equal the normalized 2-D convolution.
pub fn gaussian_smooth(values: &Array2<f64>, span: f64) -> Array2<f64> {
    let (nx, nz) = values.dim();
    let weights = gaussian_weights(span, nx.max(nz));

    let mut pass = Array2::<f64>::zeros(values.raw_dim());
    Zip::from(pass.lanes_mut(Axis(0)))
        .and(values.lanes(Axis(0)))
        .par_for_each(|out, input| convolve_normalized(input, &weights, out));

    let mut result = Array2::<f64>::zeros(values.raw_dim());
    Zip::from(result.lanes_mut(Axis(1)))
        .and(pass.lanes(Axis(1)))
        .par_for_each(|out, input| convolve_normalized(input, &weights, out));
    result
}

/// Axis-aligned regular grid covering a node scatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegularGrid {
    /// Coordinates of sample `[0, 0]`.
    pub origin: [f64; 2],
    /// Distance between samples along x and z.
    pub spacing: [f64; 2],
    /// Number of samples along x and z.
    pub shape: [usize; 2],
}

impl RegularGrid {
    /// Coordinates of sample `[i, j]`.
    pub fn point(&self, i: usize, j: usize) -> [f64; 2] {
        [
            self.origin[0] + i as f64 * self.spacing[0],
            self.origin[1] + j as f64 * self.spacing[1],
        ]
    }

    fn locate(&self, axis: usize, coord: f64) -> (usize, f64) {
        let n = self.shape[axis];
        let f = ((coord - self.origin[axis]) / self.spacing[axis]).clamp(0.0, (n - 1) as f64);
        let i = (f.floor() as usize).min(n - 2);
        (i, f - i as f64)
    }

    /// Bilinear interpolation of grid values at a point, clamped to the grid.
    pub fn interpolate(&self, values: &Array2<f64>, x: f64, z: f64) -> f64 {
        let (i, tx) = self.locate(0, x);
        let (j, tz) = self.locate(1, z);
        let v00 = values[[i, j]];
        let v10 = values[[i + 1, j]];
        let v01 = values[[i, j + 1]];
        let v11 = values[[i + 1, j + 1]];
        (1.0 - tx) * (1.0 - tz) * v00
            + tx * (1.0 - tz) * v10
            + (1.0 - tx) * tz * v01
            + tx * tz * v11
    }
}

/// Resamples node fields to a regular grid and back.
///
/// Build once per node scatter and reuse for every field.
pub struct MeshResampler {
    nodes: Vec<[f64; 2]>,
    tree: RTree<Node>,
    grid: RegularGrid,
}

impl MeshResampler {
    /// Index the nodes and lay a `shape` grid over their bounding box.
    ///
    /// # Errors
    /// Returns an error if the coordinate slices differ in length, the
    /// scatter is flat along an axis, or either grid axis has fewer than
    /// two samples.
    pub fn new(x: &[f64], z: &[f64], shape: [usize; 2]) -> Result<Self> {
        if x.len() != z.len() {
            return Err(SolverError::ShapeMismatch {
                field: "z".to_string(),
                expected: x.len(),
                got: z.len(),
            });
        }
        if shape[0] < 2 || shape[1] < 2 {
            return Err(SolverError::Other(format!(
                "smoothing grid {:?} needs at least two samples per axis",
                shape
            )));
        }
        let (xmin, xmax) = bounds(x);
        let (zmin, zmax) = bounds(z);
        if !(xmax > xmin) {
            return Err(SolverError::DegenerateMesh { axis: "x" });
        }
        if !(zmax > zmin) {
            return Err(SolverError::DegenerateMesh { axis: "z" });
        }

        let nodes: Vec<[f64; 2]> = x.iter().zip(z).map(|(&x, &z)| [x, z]).collect();
        let tree = RTree::bulk_load(
            nodes
                .iter()
                .enumerate()
                .map(|(i, &p)| Node::new(p, i))
                .collect(),
        );
        let grid = RegularGrid {
            origin: [xmin, zmin],
            spacing: [
                (xmax - xmin) / (shape[0] - 1) as f64,
                (zmax - zmin) / (shape[1] - 1) as f64,
            ],
            shape,
        };
        Ok(MeshResampler { nodes, tree, grid })
    }

    /// Inverse-distance-squared blend of the nearest nodes at each grid sample.
    pub fn to_grid(&self, values: &[f64]) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((self.grid.shape[0], self.grid.shape[1]));
        Zip::indexed(&mut out).par_for_each(|(i, j), v| {
            *v = self.blend(self.grid.point(i, j), values);
        });
        out
    }

    fn blend(&self, p: [f64; 2], values: &[f64]) -> f64 {
        let mut num = 0.0;
        let mut den = 0.0;
        for node in self.tree.nearest_neighbor_iter(&p).take(NEIGHBORS) {
            let d2 = node.distance_2(&p);
            if d2 == 0.0 {
                return values[node.data];
            }
            num += values[node.data] / d2;
            den += 1.0 / d2;
        }
        if den > 0.0 {
            num / den
        } else {
            0.0
        }
    }

    /// Bilinear interpolation of grid values at every node.
    pub fn to_mesh(&self, grid_values: &Array2<f64>) -> Vec<f64> {
        self.nodes
            .par_iter()
            .map(|&[x, z]| self.grid.interpolate(grid_values, x, z))
            .collect()
    }

    /// Smooth a node field with a Gaussian of `span` grid cells.
    pub fn smooth(&self, values: &[f64], span: f64) -> Vec<f64> {
        let gridded = self.to_grid(values);
        let smoothed = gaussian_smooth(&gridded, span);
        self.to_mesh(&smoothed)
    }
}
