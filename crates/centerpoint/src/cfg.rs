//! Tolerance and budget defaults (internal).
//!
//! Policy
//! - Defaults are fixed constants; callers override them through the cfg
//!   structs (`VolumeCfg`, `CutCfg`, `FillCfg`, `SearchCfg`), never through
//!   process-wide state.

/// Membership slack for `A·x <= b + tol`.
pub const DEFAULT_TOL: f64 = 1e-9;
/// Memory budget (MiB) for one `k × batch` block of products.
pub const DEFAULT_TARGET_MB: f64 = 64.0;
/// Smallest batch the planner hands out (unless the quota is smaller).
pub const MIN_BATCH: usize = 1000;
/// Gaussian draws with a norm below this are discarded as directions.
pub(crate) const DIRECTION_NORM_EPS: f64 = 1e-15;
/// Membership-only draws tried when the search loop scored nothing.
pub const FALLBACK_DRAWS: usize = 1000;
/// Consecutive empty chunks after which the trunk stops issuing work.
pub const MAX_IDLE_CHUNKS: usize = 64;
/// Child seeds are drawn from `[0, 2^63)`.
pub(crate) const SEED_MASK: u64 = (1u64 << 63) - 1;
