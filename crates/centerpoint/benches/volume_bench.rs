//! Criterion benchmarks for slice-volume estimation.
//!
//! Sweeps the ambient dimension of the unit cube at a fixed draw count, and
//! the trunk sampler at a fixed target, to track the cost of the shared
//! rejection loop.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use centerpoint::polytope::{triangle_prism, unit_cube};
use centerpoint::sampling::{estimate_fiber_volume, fill_samples, FillCfg, VolumeCfg};

fn bench_fiber_volume(c: &mut Criterion) {
    let mut group = c.benchmark_group("fiber_volume");
    let cfg = VolumeCfg {
        draws: 20_000,
        ..VolumeCfg::default()
    };
    for &d in &[2usize, 4, 8] {
        let poly = unit_cube(d, 0, 1);
        group.bench_with_input(BenchmarkId::from_parameter(d), &d, |b, &d| {
            b.iter(|| black_box(estimate_fiber_volume(&poly, d, 0, &cfg, Some(42)).unwrap()));
        });
    }
    group.finish();
}

fn bench_trunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("trunk_fill");
    let poly = triangle_prism();
    for &workers in &[1usize, 4] {
        let cfg = FillCfg {
            target: 5_000,
            chunk_size: 5_000,
            max_workers: Some(workers),
            ..FillCfg::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(workers), &cfg, |b, cfg| {
            b.iter(|| black_box(fill_samples(&poly, 2, 0, cfg, Some(7)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fiber_volume, bench_trunk);
criterion_main!(benches);
