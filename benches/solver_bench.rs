// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;

use fwi_solver::core::{Field, ModelRecord, RecordKind};
use fwi_solver::io;
use fwi_solver::smoothing::{gaussian_smooth, grid_resolution, MeshResampler};

/// Jittered `n × n` node scatter with a single spike in the middle.
fn make_mesh(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut x = Vec::with_capacity(n * n);
    let mut z = Vec::with_capacity(n * n);
    let mut v = vec![0.0; n * n];
    for j in 0..n {
        for i in 0..n {
            let jitter = ((i * 7 + j * 13) % 5) as f64 * 0.05;
            x.push(i as f64 * 10.0 + jitter);
            z.push(j as f64 * 10.0 - jitter);
        }
    }
    v[(n / 2) * n + n / 2] = 1.0;
    (x, z, v)
}

fn bench_gaussian_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("gaussian_grid");
    for &n in &[64usize, 256] {
        let mut grid = Array2::<f64>::zeros((n, n));
        grid[[n / 2, n / 2]] = 1.0;
        group.bench_with_input(BenchmarkId::from_parameter(n), &grid, |b, grid| {
            b.iter(|| gaussian_smooth(black_box(grid), 3.0))
        });
    }
    group.finish();
}

fn bench_mesh_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_smoothing");
    group.sample_size(20);
    for &n in &[50usize, 150] {
        let (x, z, v) = make_mesh(n);
        let shape = grid_resolution(&x, &z).unwrap();
        let resampler = MeshResampler::new(&x, &z, shape).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &v, |b, v| {
            b.iter(|| resampler.smooth(black_box(v), 2.0))
        });
    }
    group.finish();
}

fn bench_table_io(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model");
    let (x, z, v) = make_mesh(200);
    let mut record = ModelRecord::new(x, z).unwrap();
    record.insert(Field::Rho, vec![2600.0; v.len()]).unwrap();
    record.insert(Field::Vp, vec![5800.0; v.len()]).unwrap();
    record.insert(Field::Vs, v).unwrap();
    io::save(&path, &record, RecordKind::Model, None).unwrap();

    c.bench_function("load_model_40k", |b| {
        b.iter(|| io::load(black_box(&path)).unwrap())
    });

    let out = dir.path().join("kernel");
    c.bench_function("save_kernel_40k", |b| {
        b.iter(|| io::save(black_box(&out), &record, RecordKind::Kernel, None).unwrap())
    });

    c.bench_function("format_value", |b| {
        b.iter(|| io::format_value(black_box(-1.234_567_890_123e-7)))
    });
}

criterion_group!(
    benches,
    bench_gaussian_grid,
    bench_mesh_smoothing,
    bench_table_io
);
criterion_main!(benches);
