//! Worst balanced-cut ratio of a candidate centerpoint.
//!
//! For a candidate `cp = (z_cp, p_cp)` and a unit direction `u` in `R^d`, the
//! hyperplane `{p : (p - p_cp)·u = 0}` splits every fiber slice in two. The
//! direction's ratio is
//!
//! `Σ_z min(Vol(S_z ∩ H⁺), Vol(S_z ∩ H⁻)) / Σ_z Vol(S_z)`
//!
//! and the candidate's score is the minimum over random directions. Only the
//! continuous part of `cp` matters; `z_cp` just has to make `cp` a member.

use nalgebra::DVector;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::cfg::{DEFAULT_TOL, DIRECTION_NORM_EPS};
use crate::error::CoreError;
use crate::polytope::{FiberPolytope, FiberSet, ShiftedFiber, VolumeEstimate};
use crate::sampling::{estimate_volumes, master_rng, sample_fiber, BatchPolicy, SideCounts, VolumeCfg};

/// Cut estimator configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CutCfg {
    /// Random directions tried (`N_hip`).
    pub n_directions: usize,
    /// Draws per (direction, fiber) pair; also used for self-computed volumes.
    pub draws: usize,
    pub tol: f64,
    pub batch: BatchPolicy,
}

impl Default for CutCfg {
    fn default() -> Self {
        Self {
            n_directions: 1000,
            draws: 80_000,
            tol: DEFAULT_TOL,
            batch: BatchPolicy::default(),
        }
    }
}

impl CutCfg {
    pub fn volume_cfg(&self) -> VolumeCfg {
        VolumeCfg {
            draws: self.draws,
            tol: self.tol,
            batch: self.batch,
        }
    }
}

/// Score of one candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CutScore {
    /// Minimum direction ratio; nominally in `[0, 0.5]`.
    pub ratio: f64,
    /// Direction realizing `ratio`, if any direction was evaluated.
    pub worst_direction: Option<DVector<f64>>,
    pub directions_evaluated: usize,
    pub directions_skipped: usize,
}

impl CutScore {
    fn degenerate() -> Self {
        Self {
            ratio: 0.0,
            worst_direction: None,
            directions_evaluated: 0,
            directions_skipped: 0,
        }
    }
}

/// Estimate the worst balanced-cut ratio of `cp` (length `1 + d`).
///
/// `volumes` may carry per-fiber estimates computed once by the caller;
/// without them the estimator bootstraps its own from `seed`. A total volume
/// `<= 0` scores `0.0`.
pub fn score_candidate(
    poly: &FiberPolytope,
    cp: &DVector<f64>,
    fibers: &FiberSet,
    d: usize,
    cfg: &CutCfg,
    volumes: Option<&VolumeEstimate>,
    seed: Option<u64>,
) -> Result<CutScore, CoreError> {
    poly.check_dim(d)?;
    if cp.len() != 1 + d {
        return Err(CoreError::invalid(format!(
            "candidate has {} coordinates, expected 1+d = {}",
            cp.len(),
            1 + d
        )));
    }
    if cfg.n_directions == 0 {
        return Err(CoreError::invalid("n_directions must be > 0"));
    }
    let mut rng = master_rng(seed);
    let own;
    let volumes = match volumes {
        Some(v) => v,
        None => {
            own = estimate_volumes(poly, d, fibers, &cfg.volume_cfg(), &mut rng)?;
            &own
        }
    };
    let vol_total = volumes.total();
    if !(vol_total > 0.0) {
        return Ok(CutScore::degenerate());
    }

    let slices: Vec<ShiftedFiber> = fibers.iter().map(|z| poly.shifted(z, cfg.tol)).collect();
    let center = &cp.as_slice()[1..];
    let batch = cfg.batch.resolve(poly.n_ineq(), cfg.draws);

    let mut score = CutScore {
        ratio: 1.0,
        worst_direction: None,
        directions_evaluated: 0,
        directions_skipped: 0,
    };
    for _ in 0..cfg.n_directions {
        let Some(u) = draw_direction(d, &mut rng) else {
            score.directions_skipped += 1;
            continue;
        };
        let ratio = direction_ratio(&slices, center, &u, cfg.draws, batch, &mut rng) / vol_total;
        score.directions_evaluated += 1;
        if ratio < score.ratio {
            score.ratio = ratio;
            score.worst_direction = Some(u);
        }
    }
    Ok(score)
}

/// Gaussian vector normalized to the unit sphere; `None` for a near-zero draw.
fn draw_direction<R: Rng + ?Sized>(d: usize, rng: &mut R) -> Option<DVector<f64>> {
    let u = DVector::<f64>::from_fn(d, |_, _| rng.sample(StandardNormal));
    let norm = u.norm();
    if norm < DIRECTION_NORM_EPS {
        None
    } else {
        Some(u / norm)
    }
}

/// `Σ_z min(pos_z, neg_z) / N` for one direction (not yet normalized).
fn direction_ratio<R: Rng + ?Sized>(
    slices: &[ShiftedFiber],
    center: &[f64],
    u: &DVector<f64>,
    draws: usize,
    batch: usize,
    rng: &mut R,
) -> f64 {
    slices
        .iter()
        .map(|slice| {
            let mut sides = SideCounts::new(center, u.as_slice());
            sample_fiber(slice, draws, batch, rng, &mut sides);
            sides.balanced(draws)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polytope::{empty, triangle_prism, unit_cube};
    use nalgebra::dvector;
    use proptest::prelude::*;

    fn cfg(n_directions: usize, draws: usize) -> CutCfg {
        CutCfg {
            n_directions,
            draws,
            ..CutCfg::default()
        }
    }

    #[test]
    fn cube_centroid_scores_half() {
        // Every line through the centroid halves both slices: (0.5 + 0.5) / 2.
        let poly = unit_cube(2, 0, 1);
        let cp = dvector![0.0, 0.5, 0.5];
        let score = score_candidate(&poly, &cp, &FiberSet::default(), 2, &cfg(60, 20_000), None, Some(42))
            .unwrap();
        assert!((score.ratio - 0.5).abs() < 0.02, "ratio={}", score.ratio);
        assert!(score.ratio <= 0.5);
        assert_eq!(score.directions_evaluated, 60);
        let u = score.worst_direction.unwrap();
        assert!((u.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn corner_candidate_scores_low() {
        // Through a corner, some direction leaves almost nothing on one side.
        let poly = unit_cube(2, 0, 1);
        let cp = dvector![1.0, 0.02, 0.02];
        let score = score_candidate(&poly, &cp, &FiberSet::default(), 2, &cfg(200, 4_000), None, Some(7))
            .unwrap();
        assert!(score.ratio < 0.05, "ratio={}", score.ratio);
    }

    #[test]
    fn precomputed_volumes_are_used() {
        let poly = unit_cube(2, 0, 1);
        let cp = dvector![0.0, 0.5, 0.5];
        // Claiming twice the true mass halves every ratio.
        let vols: VolumeEstimate = [(0, 2.0), (1, 2.0)].into_iter().collect();
        let score = score_candidate(&poly, &cp, &FiberSet::default(), 2, &cfg(30, 10_000), Some(&vols), Some(1))
            .unwrap();
        assert!((score.ratio - 0.25).abs() < 0.015, "ratio={}", score.ratio);
    }

    #[test]
    fn zero_total_volume_scores_zero() {
        let cp = dvector![0.0, 0.5, 0.5];
        let score = score_candidate(&empty(2), &cp, &FiberSet::default(), 2, &cfg(5, 1_000), None, Some(1))
            .unwrap();
        assert_eq!(score.ratio, 0.0);
        assert!(score.worst_direction.is_none());
    }

    #[test]
    fn bad_shapes_and_params_are_errors() {
        let poly = unit_cube(2, 0, 1);
        let fibers = FiberSet::default();
        let short = dvector![0.0, 0.5];
        assert!(matches!(
            score_candidate(&poly, &short, &fibers, 2, &cfg(5, 100), None, Some(1)),
            Err(CoreError::InvalidParams { .. })
        ));
        let cp = dvector![0.0, 0.5, 0.5];
        assert!(matches!(
            score_candidate(&poly, &cp, &fibers, 2, &cfg(0, 100), None, Some(1)),
            Err(CoreError::InvalidParams { .. })
        ));
        assert!(matches!(
            score_candidate(&poly, &cp, &fibers, 3, &cfg(5, 100), None, Some(1)),
            Err(CoreError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn directions_are_unit_vectors() {
        let mut rng = master_rng(Some(3));
        for _ in 0..50 {
            let u = draw_direction(4, &mut rng).unwrap();
            assert!((u.norm() - 1.0).abs() < 1e-12);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]
        #[test]
        fn score_stays_in_half_band(seed in any::<u64>(), x in 0.0f64..=1.0, y in 0.0f64..=1.0) {
            // (x·y/2, y) sweeps the prism slice.
            let poly = triangle_prism();
            let p = [x * y / 2.0, y];
            let cp = FiberPolytope::join(0, &p);
            prop_assume!(poly.contains(&cp, 1e-9));
            let score = score_candidate(&poly, &cp, &FiberSet::default(), 2, &cfg(10, 4_000), None, Some(seed)).unwrap();
            prop_assert!(score.ratio >= 0.0);
            prop_assert!(score.ratio <= 0.5 + 0.05, "ratio={}", score.ratio);
        }
    }
}
