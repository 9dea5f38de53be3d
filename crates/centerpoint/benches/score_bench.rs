//! Criterion benchmarks for candidate scoring.
//!
//! Precomputed volumes are passed in, so the timings cover only the
//! per-direction sampling.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use centerpoint::cut::{score_candidate, CutCfg};
use centerpoint::polytope::{triangle_prism, FiberSet};
use centerpoint::sampling::{estimate_volumes, master_rng, VolumeCfg};
use nalgebra::dvector;

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_candidate");
    let poly = triangle_prism();
    let fibers = FiberSet::default();
    let vol_cfg = VolumeCfg {
        draws: 20_000,
        ..VolumeCfg::default()
    };
    let volumes = estimate_volumes(&poly, 2, &fibers, &vol_cfg, &mut master_rng(Some(1))).unwrap();
    let cp = dvector![0.0, 0.25, 0.75];
    for &n_directions in &[10usize, 50] {
        let cfg = CutCfg {
            n_directions,
            draws: 5_000,
            ..CutCfg::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(n_directions), &cfg, |b, cfg| {
            b.iter(|| {
                black_box(score_candidate(&poly, &cp, &fibers, 2, cfg, Some(&volumes), Some(3)).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
