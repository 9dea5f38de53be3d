//! The trunk: parallel rejection sampling into a fixed-capacity bucket.
//!
//! Protocol
//! - The coordinator (caller thread) owns the bucket and a master RNG. It
//!   keeps at most `workers` chunk tasks outstanding; every task gets a child
//!   seed drawn in submission order and a read-only `Arc<ShiftedFiber>`.
//! - Tasks complete in any order but retire in submission order: early
//!   completions wait in a reorder buffer until every older task is in. Each
//!   retired task is replaced until the bucket is full, the draw budget is
//!   spent, or too many consecutive chunks came back empty. In-flight tasks
//!   always drain; surplus points are truncated away.
//! - Every merge and every replacement (its seed and `take_limit`) is decided
//!   at retirement, so a run replays exactly from (seed, workers, chunk size).
//! - Failed tasks (error or panic) yield nothing and are counted in
//!   `FillStats::failed_tasks`; they never abort the run.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::thread;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::batch::plan_batch;
use super::pool::{TaskFailure, WorkerPool};
use super::reject::{sample_fiber, AcceptPoints};
use super::{child_seed, master_rng};
use crate::cfg::{DEFAULT_TOL, MAX_IDLE_CHUNKS};
use crate::error::CoreError;
use crate::polytope::{FiberPolytope, ShiftedFiber};

/// Trunk configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillCfg {
    /// Bucket capacity (`targetAccepted`).
    pub target: usize,
    /// Draws per chunk task.
    pub chunk_size: usize,
    pub tol: f64,
    /// Outstanding tasks; `None` uses the available parallelism.
    pub max_workers: Option<usize>,
    /// Global draw budget; `None` is unbounded.
    pub max_draws: Option<u64>,
    /// Consecutive empty chunks before giving up; `0` disables the check.
    pub max_idle_chunks: usize,
}

impl Default for FillCfg {
    fn default() -> Self {
        Self {
            target: 10_000,
            chunk_size: 50_000,
            tol: DEFAULT_TOL,
            max_workers: None,
            max_draws: None,
            max_idle_chunks: MAX_IDLE_CHUNKS,
        }
    }
}

/// Why a fill stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    #[serde(rename = "filled")]
    Filled,
    #[serde(rename = "max_draws")]
    MaxDraws,
    #[serde(rename = "exhausted")]
    Exhausted,
    #[serde(rename = "invalid-args")]
    InvalidArgs,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Filled => "filled",
            StopReason::MaxDraws => "max_draws",
            StopReason::Exhausted => "exhausted",
            StopReason::InvalidArgs => "invalid-args",
        };
        f.write_str(s)
    }
}

/// Accepted continuous points of one fiber, row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleBucket {
    pub fiber: i64,
    pub dim: usize,
    points: Vec<f64>,
}

impl SampleBucket {
    fn new(fiber: i64, dim: usize) -> Self {
        Self {
            fiber,
            dim,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.points.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, i: usize) -> Option<&[f64]> {
        self.points.get(i * self.dim..(i + 1) * self.dim)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.points.chunks_exact(self.dim.max(1))
    }

    /// `n × d` matrix, one accepted point per row.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.len(), self.dim, &self.points)
    }

    /// Append up to `room` points from a flat row-major slice.
    fn absorb(&mut self, flat: &[f64], room: usize) {
        let take = (flat.len() / self.dim.max(1)).min(room);
        self.points.extend_from_slice(&flat[..take * self.dim]);
    }
}

/// Provenance of one fill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillStats {
    pub target: usize,
    pub achieved: usize,
    /// Chunk tasks issued.
    pub chunks: u64,
    /// Draws issued, failed tasks included.
    pub draws: u64,
    /// In-polytope hits reported by completed tasks, truncated ones included.
    pub accepts: u64,
    /// `accepts / (draws - failed_draws)`.
    pub vol_est: f64,
    pub stopped_reason: StopReason,
    pub failed_tasks: u64,
    pub failed_draws: u64,
    /// One entry per failed task, in completion order.
    pub failures: Vec<TaskFailure>,
    pub workers: usize,
    pub chunk_size: usize,
}

#[derive(Debug)]
struct ChunkTask {
    seed: u64,
    draws: usize,
    take_limit: usize,
}

#[derive(Debug)]
struct ChunkYield {
    accepted: u64,
    points: Vec<f64>,
}

fn run_chunk(fiber: &ShiftedFiber, task: ChunkTask) -> Result<ChunkYield, String> {
    if !fiber.is_finite() {
        return Err(format!(
            "fiber {} has non-finite inequality data",
            fiber.fiber
        ));
    }
    let mut rng = StdRng::seed_from_u64(task.seed);
    let batch = plan_batch(fiber.n_ineq(), None, task.draws);
    let mut tally = AcceptPoints::new(fiber.dim(), Some(task.take_limit));
    sample_fiber(fiber, task.draws, batch, &mut rng, &mut tally);
    Ok(ChunkYield {
        accepted: tally.accepted,
        points: tally.into_points(),
    })
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Fill a bucket with up to `cfg.target` accepted points of fiber `z`.
///
/// `d == 0`, `target == 0` or `chunk_size == 0` return an empty bucket with
/// `StopReason::InvalidArgs` and no work launched. A column count other than
/// `1 + d` is a configuration error.
pub fn fill_samples(
    poly: &FiberPolytope,
    d: usize,
    z: i64,
    cfg: &FillCfg,
    seed: Option<u64>,
) -> Result<(SampleBucket, FillStats), CoreError> {
    let workers = cfg.max_workers.unwrap_or_else(default_workers).max(1);
    let mut stats = FillStats {
        target: cfg.target,
        achieved: 0,
        chunks: 0,
        draws: 0,
        accepts: 0,
        vol_est: 0.0,
        stopped_reason: StopReason::InvalidArgs,
        failed_tasks: 0,
        failed_draws: 0,
        failures: Vec::new(),
        workers,
        chunk_size: cfg.chunk_size,
    };
    if d == 0 || cfg.target == 0 || cfg.chunk_size == 0 {
        return Ok((SampleBucket::new(z, d), stats));
    }
    poly.check_dim(d)?;

    let fiber = Arc::new(poly.shifted(z, cfg.tol));
    let pool = {
        let fiber = Arc::clone(&fiber);
        WorkerPool::spawn(workers, "trunk", move |task: ChunkTask| {
            run_chunk(&fiber, task)
        })?
    };
    let mut coord = Coordinator {
        cfg,
        workers,
        rng: master_rng(seed),
        bucket: SampleBucket::new(z, d),
        in_flight: VecDeque::new(),
        arrived: HashMap::new(),
        next_id: 0,
        idle_streak: 0,
        stop_issuing: false,
        stats: &mut stats,
    };
    coord.run(&pool)?;
    let bucket = coord.bucket;
    drop(pool);

    stats.achieved = bucket.len();
    let effective = stats.draws - stats.failed_draws;
    stats.vol_est = if effective > 0 {
        stats.accepts as f64 / effective as f64
    } else {
        0.0
    };
    stats.stopped_reason = if bucket.len() >= cfg.target {
        StopReason::Filled
    } else if cfg.max_draws.is_some_and(|max| stats.draws >= max) {
        StopReason::MaxDraws
    } else {
        StopReason::Exhausted
    };
    tracing::debug!(
        fiber = z,
        target = stats.target,
        achieved = stats.achieved,
        chunks = stats.chunks,
        draws = stats.draws,
        accepts = stats.accepts,
        failed = stats.failed_tasks,
        reason = %stats.stopped_reason,
        "trunk_fill"
    );
    Ok((bucket, stats))
}

/// Single-worker fill; same contract as `fill_samples`.
pub fn fill_samples_sequential(
    poly: &FiberPolytope,
    d: usize,
    z: i64,
    cfg: &FillCfg,
    seed: Option<u64>,
) -> Result<(SampleBucket, FillStats), CoreError> {
    let cfg = FillCfg {
        max_workers: Some(1),
        ..*cfg
    };
    fill_samples(poly, d, z, &cfg, seed)
}

struct Coordinator<'a> {
    cfg: &'a FillCfg,
    workers: usize,
    rng: StdRng,
    bucket: SampleBucket,
    /// `(task id, draws issued)` in submission order.
    in_flight: VecDeque<(u64, u64)>,
    /// Completed tasks waiting for an older one to retire.
    arrived: HashMap<u64, Result<ChunkYield, TaskFailure>>,
    next_id: u64,
    idle_streak: usize,
    stop_issuing: bool,
    stats: &'a mut FillStats,
}

impl Coordinator<'_> {
    fn room(&self) -> usize {
        self.cfg.target.saturating_sub(self.bucket.len())
    }

    fn run(&mut self, pool: &WorkerPool<ChunkTask, ChunkYield>) -> Result<(), CoreError> {
        for _ in 0..self.workers {
            if self.room() == 0 || !self.submit_one(pool)? {
                break;
            }
        }
        while let Some(&(head, draws)) = self.in_flight.front() {
            let Some(outcome) = self.arrived.remove(&head) else {
                let (id, outcome) = pool.recv()?;
                self.arrived.insert(id, outcome);
                continue;
            };
            self.in_flight.pop_front();
            self.retire(outcome, draws);
            if self.room() == 0 {
                continue;
            }
            if self.cfg.max_idle_chunks > 0 && self.idle_streak >= self.cfg.max_idle_chunks {
                self.stop_issuing = true;
            }
            self.submit_one(pool)?;
        }
        Ok(())
    }

    fn retire(&mut self, outcome: Result<ChunkYield, TaskFailure>, draws: u64) {
        match outcome {
            Ok(chunk) => {
                self.stats.accepts += chunk.accepted;
                let room = self.room();
                self.bucket.absorb(&chunk.points, room);
                self.idle_streak = if chunk.accepted == 0 {
                    self.idle_streak + 1
                } else {
                    0
                };
            }
            Err(failure) => {
                tracing::warn!(task = failure.task, cause = %failure.cause, "trunk_task_failed");
                self.stats.failed_tasks += 1;
                self.stats.failed_draws += draws;
                self.stats.failures.push(failure);
                self.idle_streak += 1;
            }
        }
    }

    fn submit_one(&mut self, pool: &WorkerPool<ChunkTask, ChunkYield>) -> Result<bool, CoreError> {
        if self.stop_issuing {
            return Ok(false);
        }
        let mut draws = self.cfg.chunk_size as u64;
        if let Some(max) = self.cfg.max_draws {
            let remaining = max.saturating_sub(self.stats.draws);
            if remaining == 0 {
                return Ok(false);
            }
            draws = draws.min(remaining);
        }
        let task = ChunkTask {
            seed: child_seed(&mut self.rng),
            draws: draws as usize,
            take_limit: self.room(),
        };
        let id = self.next_id;
        self.next_id += 1;
        pool.submit(id, task)?;
        self.in_flight.push_back((id, draws));
        self.stats.draws += draws;
        self.stats.chunks += 1;
        Ok(true)
    }
}
