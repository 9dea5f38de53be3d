//! Memory-bounded batch sizes.

use serde::{Deserialize, Serialize};

use crate::cfg::{DEFAULT_TARGET_MB, MIN_BATCH};

/// Batch size so that `batch × n_ineq` doubles fit roughly in `target_mb` MiB.
///
/// Floored at `MIN_BATCH`, then capped at `quota` (the draws still owed).
/// `n_ineq == 0` yields the floor; an unusable budget falls back to 64 MiB.
pub fn plan_batch(n_ineq: usize, target_mb: Option<f64>, quota: usize) -> usize {
    let quota = quota.max(1);
    if n_ineq == 0 {
        return MIN_BATCH.min(quota);
    }
    let mb = match target_mb {
        Some(mb) if mb.is_finite() && mb > 0.0 => mb,
        _ => DEFAULT_TARGET_MB,
    };
    let bytes = (mb * 1024.0 * 1024.0) as usize;
    let fit = (bytes / (8 * n_ineq)).max(1);
    fit.max(MIN_BATCH).min(quota)
}

/// How callers pick batch sizes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum BatchPolicy {
    /// Plan from the inequality count and a memory budget in MiB.
    Auto { target_mb: f64 },
    /// Use this many draws per batch; `0` means `Auto` with the default budget.
    Fixed(usize),
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self::Auto {
            target_mb: DEFAULT_TARGET_MB,
        }
    }
}

impl BatchPolicy {
    pub fn resolve(&self, n_ineq: usize, quota: usize) -> usize {
        match *self {
            BatchPolicy::Fixed(n) if n > 0 => n.min(quota.max(1)),
            BatchPolicy::Fixed(_) => plan_batch(n_ineq, None, quota),
            BatchPolicy::Auto { target_mb } => plan_batch(n_ineq, Some(target_mb), quota),
        }
    }
}
