//! Random-search for an approximate fibered centerpoint.
//!
//! Phases
//! - Initializing: `A`/`b`/`d` shapes and the cfg are validated.
//! - VolumeBootstrap: per-fiber volumes are estimated once; a total `<= 0`
//!   aborts with `CoreError::DegenerateVolume`.
//! - Searching: candidates `(z, p)` with `z ~ U(fibers)`, `p ~ U([0,1]^d)`;
//!   non-members are discarded, members are scored with the shared volumes.
//!   Only a strictly better score replaces the incumbent.
//! - Fallback: when nothing was scored, up to `fallback_draws` membership-only
//!   draws look for any interior point and score that one. A successful
//!   fallback sets `SearchResult::fallback`; a failed one is
//!   `CoreError::SearchExhausted`.
//!
//! Seeding
//! - One master RNG supplies, in order: the per-fiber volume seeds, then for
//!   every trial `z`, `p` and (only for members) the scoring seed. A run with
//!   fewer candidates therefore sees a prefix of a longer run's candidates.

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cfg::{DEFAULT_TOL, FALLBACK_DRAWS};
use crate::cut::{score_candidate, CutCfg, CutScore};
use crate::error::CoreError;
use crate::polytope::{FiberPolytope, FiberSet, VolumeEstimate};
use crate::sampling::{child_seed, estimate_volumes, master_rng, BatchPolicy, VolumeCfg};

/// Search configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCfg {
    pub fibers: FiberSet,
    /// Candidates to score (`N_cp`).
    pub n_candidates: usize,
    /// Directions per candidate (`N_hip`).
    pub n_directions: usize,
    /// Draws per fiber, for the bootstrap volumes and for every direction.
    pub draws: usize,
    pub tol: f64,
    pub batch: BatchPolicy,
    /// Trial cap is `n_candidates * max_trials_per_cp`.
    pub max_trials_per_cp: usize,
    pub fallback_draws: usize,
}

impl Default for SearchCfg {
    fn default() -> Self {
        Self {
            fibers: FiberSet::default(),
            n_candidates: 50,
            n_directions: 1000,
            draws: 80_000,
            tol: DEFAULT_TOL,
            batch: BatchPolicy::default(),
            max_trials_per_cp: 20,
            fallback_draws: FALLBACK_DRAWS,
        }
    }
}

impl SearchCfg {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fibers.is_empty() {
            return Err(CoreError::invalid("fiber set is empty"));
        }
        if self.n_candidates == 0 {
            return Err(CoreError::invalid("n_candidates must be > 0"));
        }
        if self.n_directions == 0 {
            return Err(CoreError::invalid("n_directions must be > 0"));
        }
        if self.draws == 0 {
            return Err(CoreError::invalid("draws must be > 0"));
        }
        if self.max_trials_per_cp == 0 {
            return Err(CoreError::invalid("max_trials_per_cp must be > 0"));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(CoreError::invalid(format!("tol must be finite and >= 0, got {}", self.tol)));
        }
        Ok(())
    }

    pub fn volume_cfg(&self) -> VolumeCfg {
        VolumeCfg {
            draws: self.draws,
            tol: self.tol,
            batch: self.batch,
        }
    }

    pub fn cut_cfg(&self) -> CutCfg {
        CutCfg {
            n_directions: self.n_directions,
            draws: self.draws,
            tol: self.tol,
            batch: self.batch,
        }
    }

    fn trial_cap(&self) -> usize {
        self.n_candidates.saturating_mul(self.max_trials_per_cp)
    }
}

/// Best candidate of one search run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// `(z, p_1, .., p_d)`.
    pub point: DVector<f64>,
    /// Balanced-cut ratio `F` of `point`.
    pub score: f64,
    pub worst_direction: Option<DVector<f64>>,
    /// Bootstrap volumes shared by every candidate.
    pub volumes: VolumeEstimate,
    pub candidates_scored: usize,
    /// Membership trials in the main loop (fallback draws excluded).
    pub trials: usize,
    /// The point came from the fallback draws, not the main loop.
    pub fallback: bool,
}

/// Search for the candidate with the largest balanced-cut ratio.
pub fn search_centerpoint(
    poly: &FiberPolytope,
    d: usize,
    cfg: &SearchCfg,
    seed: Option<u64>,
) -> Result<SearchResult, CoreError> {
    if d == 0 {
        return Err(CoreError::invalid("d must be > 0"));
    }
    poly.check_dim(d)?;
    cfg.validate()?;

    let mut rng = master_rng(seed);
    let volumes = estimate_volumes(poly, d, &cfg.fibers, &cfg.volume_cfg(), &mut rng)?;
    let total = volumes.total();
    if !(total > 0.0) {
        return Err(CoreError::DegenerateVolume { total });
    }
    tracing::debug!(d, fibers = cfg.fibers.len(), total, "search_bootstrap");

    SearchRunner::new(poly, d, cfg, volumes, rng).run()
}

/// Search runner carrying the shared context and the incumbent.
struct SearchRunner<'a> {
    poly: &'a FiberPolytope,
    d: usize,
    cfg: &'a SearchCfg,
    cut: CutCfg,
    volumes: VolumeEstimate,
    rng: StdRng,
    best: Option<(DVector<f64>, CutScore)>,
    scored: usize,
    trials: usize,
}

impl<'a> SearchRunner<'a> {
    fn new(
        poly: &'a FiberPolytope,
        d: usize,
        cfg: &'a SearchCfg,
        volumes: VolumeEstimate,
        rng: StdRng,
    ) -> Self {
        Self {
            poly,
            d,
            cfg,
            cut: cfg.cut_cfg(),
            volumes,
            rng,
            best: None,
            scored: 0,
            trials: 0,
        }
    }

    fn run(mut self) -> Result<SearchResult, CoreError> {
        let cap = self.cfg.trial_cap();
        while self.scored < self.cfg.n_candidates && self.trials < cap {
            self.trials += 1;
            if let Some(cp) = self.draw_member()? {
                self.consider(cp)?;
            }
        }
        tracing::debug!(
            scored = self.scored,
            trials = self.trials,
            best = self.best.as_ref().map(|(_, s)| s.ratio),
            "search_loop"
        );

        let mut fallback = false;
        if self.best.is_none() {
            tracing::warn!(
                trials = self.trials,
                draws = self.cfg.fallback_draws,
                "no candidate scored; trying fallback draws"
            );
            for _ in 0..self.cfg.fallback_draws {
                if let Some(cp) = self.draw_member()? {
                    self.consider(cp)?;
                    fallback = true;
                    break;
                }
            }
        }

        let Some((point, score)) = self.best else {
            return Err(CoreError::SearchExhausted {
                trials: self.trials,
                fallback_draws: self.cfg.fallback_draws,
            });
        };
        Ok(SearchResult {
            point,
            score: score.ratio,
            worst_direction: score.worst_direction,
            volumes: self.volumes,
            candidates_scored: self.scored,
            trials: self.trials,
            fallback,
        })
    }

    /// One `(z, p)` draw; `None` when it misses the polytope.
    fn draw_member(&mut self) -> Result<Option<DVector<f64>>, CoreError> {
        let z = self
            .cfg
            .fibers
            .choose(&mut self.rng)
            .ok_or_else(|| CoreError::invalid("fiber set is empty"))?;
        let p: Vec<f64> = (0..self.d).map(|_| self.rng.gen::<f64>()).collect();
        if self.poly.contains_parts(z, &p, self.cfg.tol) {
            Ok(Some(FiberPolytope::join(z, &p)))
        } else {
            Ok(None)
        }
    }

    fn consider(&mut self, cp: DVector<f64>) -> Result<(), CoreError> {
        let seed = child_seed(&mut self.rng);
        let score = score_candidate(
            self.poly,
            &cp,
            &self.cfg.fibers,
            self.d,
            &self.cut,
            Some(&self.volumes),
            Some(seed),
        )?;
        self.scored += 1;
        let improves = self
            .best
            .as_ref()
            .map_or(true, |(_, best)| score.ratio > best.ratio);
        if improves {
            tracing::trace!(ratio = score.ratio, scored = self.scored, "search_improved");
            self.best = Some((cp, score));
        }
        Ok(())
    }
}
