//! Relative slice volumes by plain rejection sampling.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::batch::BatchPolicy;
use super::reject::{sample_fiber, AcceptCount};
use super::{child_seed, master_rng};
use crate::cfg::DEFAULT_TOL;
use crate::error::CoreError;
use crate::polytope::{FiberPolytope, FiberSet, ShiftedFiber, VolumeEstimate};

/// Volume estimator configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeCfg {
    /// Monte Carlo draws per fiber (`N`).
    pub draws: usize,
    pub tol: f64,
    pub batch: BatchPolicy,
}

impl Default for VolumeCfg {
    fn default() -> Self {
        Self {
            draws: 80_000,
            tol: DEFAULT_TOL,
            batch: BatchPolicy::default(),
        }
    }
}

/// Estimate `P[(z,p) ∈ C]` for `p ~ U([0,1]^d)`.
///
/// Returns exactly `0.0` when `cfg.draws == 0` or `d == 0`; a column count other
/// than `1 + d` is a configuration error.
pub fn estimate_fiber_volume(
    poly: &FiberPolytope,
    d: usize,
    z: i64,
    cfg: &VolumeCfg,
    seed: Option<u64>,
) -> Result<f64, CoreError> {
    if cfg.draws == 0 || d == 0 {
        return Ok(0.0);
    }
    poly.check_dim(d)?;
    let mut rng = master_rng(seed);
    Ok(shifted_volume(&poly.shifted(z, cfg.tol), cfg, &mut rng))
}

/// Estimate every fiber of `fibers`, one child seed per fiber in set order.
pub fn estimate_volumes<R: Rng + ?Sized>(
    poly: &FiberPolytope,
    d: usize,
    fibers: &FiberSet,
    cfg: &VolumeCfg,
    rng: &mut R,
) -> Result<VolumeEstimate, CoreError> {
    let mut out = VolumeEstimate::default();
    for z in fibers.iter() {
        let vol = estimate_fiber_volume(poly, d, z, cfg, Some(child_seed(rng)))?;
        tracing::trace!(fiber = z, vol, "fiber_volume");
        out.insert(z, vol);
    }
    Ok(out)
}

pub(crate) fn shifted_volume<R: Rng + ?Sized>(
    fiber: &ShiftedFiber,
    cfg: &VolumeCfg,
    rng: &mut R,
) -> f64 {
    let batch = cfg.batch.resolve(fiber.n_ineq(), cfg.draws);
    let mut tally = AcceptCount::default();
    sample_fiber(fiber, cfg.draws, batch, rng, &mut tally);
    tally.accepted as f64 / cfg.draws as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polytope::{empty, triangle_prism, unit_cube};
    use proptest::prelude::*;

    fn cfg(draws: usize) -> VolumeCfg {
        VolumeCfg {
            draws,
            ..VolumeCfg::default()
        }
    }

    fn mean_std(xs: &[f64]) -> (f64, f64) {
        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        (mean, var.sqrt())
    }

    #[test]
    fn degenerate_inputs_return_zero() {
        let poly = unit_cube(2, 0, 1);
        assert_eq!(estimate_fiber_volume(&poly, 2, 0, &cfg(0), Some(1)).unwrap(), 0.0);
        // d == 0 short-circuits before the shape check.
        assert_eq!(estimate_fiber_volume(&poly, 0, 0, &cfg(100), Some(1)).unwrap(), 0.0);
    }

    #[test]
    fn shape_mismatch_is_fatal() {
        let poly = unit_cube(2, 0, 1);
        assert!(matches!(
            estimate_fiber_volume(&poly, 3, 0, &cfg(100), Some(1)),
            Err(CoreError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn unit_cube_fibers_are_full() {
        let poly = unit_cube(2, 0, 1);
        for z in [0, 1] {
            let v = estimate_fiber_volume(&poly, 2, z, &cfg(100_000), Some(42)).unwrap();
            assert!((v - 1.0).abs() <= 0.01, "z={z} v={v}");
        }
        let outside = estimate_fiber_volume(&poly, 2, 5, &cfg(10_000), Some(42)).unwrap();
        assert_eq!(outside, 0.0);
    }

    #[test]
    fn empty_polytope_has_zero_volume() {
        let v = estimate_fiber_volume(&empty(3), 3, 0, &cfg(5_000), Some(3)).unwrap();
        assert_eq!(v, 0.0);
    }

    #[test]
    fn seeded_runs_are_bit_identical() {
        let poly = triangle_prism();
        let c = VolumeCfg {
            draws: 20_000,
            batch: BatchPolicy::Fixed(1_500),
            ..VolumeCfg::default()
        };
        let a = estimate_fiber_volume(&poly, 2, 0, &c, Some(77)).unwrap();
        let b = estimate_fiber_volume(&poly, 2, 0, &c, Some(77)).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn spread_shrinks_like_inverse_sqrt_n() {
        // Prism slices have relative volume exactly 1/4.
        let poly = triangle_prism();
        let run = |draws: usize| -> Vec<f64> {
            (0..16u64)
                .map(|s| estimate_fiber_volume(&poly, 2, 0, &cfg(draws), Some(1_000 + s)).unwrap())
                .collect()
        };
        let (mean_small, std_small) = mean_std(&run(1_000));
        let (mean_big, std_big) = mean_std(&run(100_000));
        assert!((mean_small - 0.25).abs() < 0.02, "mean_small={mean_small}");
        assert!((mean_big - 0.25).abs() < 0.003, "mean_big={mean_big}");
        // Expected ratio is 10; leave room for the noise of 16-sample stds.
        assert!(std_big * 4.0 < std_small, "std_small={std_small} std_big={std_big}");
    }

    #[test]
    fn estimate_volumes_covers_every_fiber() {
        let poly = unit_cube(2, 0, 1);
        let fibers = FiberSet::new([0, 1, 2]);
        let mut rng = master_rng(Some(8));
        let vols = estimate_volumes(&poly, 2, &fibers, &cfg(2_000), &mut rng).unwrap();
        assert_eq!(vols.len(), 3);
        assert_eq!(vols.get(0), Some(1.0));
        assert_eq!(vols.get(2), Some(0.0));
        assert!((vols.total() - 2.0).abs() < 1e-12);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn estimate_is_a_probability(seed in any::<u64>(), z in -1i64..3, draws in 1usize..3_000) {
            let v = estimate_fiber_volume(&triangle_prism(), 2, z, &cfg(draws), Some(seed)).unwrap();
            prop_assert!((0.0..=1.0).contains(&v));
        }
    }
}
