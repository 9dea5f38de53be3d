//! Rejection sampling over fiber slices.
//!
//! Purpose
//! - One batched inner loop (`reject::sample_fiber`) shared by the volume
//!   estimator, the cut-ratio estimator and the parallel trunk; they differ
//!   only in the `Tally` they feed.
//! - Memory stays bounded: each batch materializes `k × batch` products and
//!   `batch` comes from the planner in `batch`.
//!
//! Seeding
//! - Every operation takes `seed: Option<u64>`; `None` draws from OS entropy.
//! - Child seeds are taken from a master `StdRng` in a fixed order so whole
//!   runs replay from one number.

pub mod batch;
pub(crate) mod pool;
pub mod reject;
pub mod trunk;
pub mod volume;

pub use batch::{plan_batch, BatchPolicy};
pub use pool::TaskFailure;
pub use reject::{sample_fiber, AcceptCount, AcceptPoints, SideCounts, Tally};
pub use trunk::{fill_samples, fill_samples_sequential, FillCfg, FillStats, SampleBucket, StopReason};
pub use volume::{estimate_fiber_volume, estimate_volumes, VolumeCfg};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::cfg::SEED_MASK;

/// Master RNG for one operation.
pub fn master_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Next child seed in `[0, 2^63)`.
#[inline]
pub fn child_seed<R: RngCore + ?Sized>(rng: &mut R) -> u64 {
    rng.next_u64() & SEED_MASK
}
