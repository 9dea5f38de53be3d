//! Error type shared by all core operations.

use std::fmt;

/// Errors surfaced by the estimators and the search.
///
/// Degenerate *inputs* to the pure estimators (`draws == 0`, `d == 0`) are not
/// errors: those return `0.0`. Everything here is a distinct, fatal outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// `A`, `b` and `d` disagree (`A.cols != 1 + d` or `A.rows != b.len`).
    ShapeMismatch {
        a_rows: usize,
        a_cols: usize,
        b_len: usize,
        d: Option<usize>,
    },
    /// A parameter that must be positive (or otherwise constrained) is not.
    InvalidParams { reason: String },
    /// Estimated total volume across fibers is not positive.
    DegenerateVolume { total: f64 },
    /// Neither the search loop nor the fallback found an interior candidate.
    SearchExhausted { trials: usize, fallback_draws: usize },
    /// The sampler's worker pool could not be started or died mid-run.
    WorkerPool { reason: String },
}

impl CoreError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    pub(crate) fn pool(reason: impl Into<String>) -> Self {
        Self::WorkerPool {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::ShapeMismatch {
                a_rows,
                a_cols,
                b_len,
                d: Some(d),
            } => write!(
                f,
                "incompatible shapes: A is {a_rows}x{a_cols}, b has {b_len} entries, d={d} (expected A.cols = {})",
                1 + d
            ),
            CoreError::ShapeMismatch {
                a_rows,
                a_cols,
                b_len,
                d: None,
            } => write!(
                f,
                "incompatible shapes: A is {a_rows}x{a_cols}, b has {b_len} entries"
            ),
            CoreError::InvalidParams { reason } => write!(f, "invalid parameters: {reason}"),
            CoreError::DegenerateVolume { total } => write!(
                f,
                "degenerate polytope: estimated total fiber volume is {total} (needs > 0)"
            ),
            CoreError::SearchExhausted {
                trials,
                fallback_draws,
            } => write!(
                f,
                "no interior candidate found after {trials} trials and {fallback_draws} fallback draws"
            ),
            CoreError::WorkerPool { reason } => write!(f, "worker pool failure: {reason}"),
        }
    }
}

impl std::error::Error for CoreError {}
