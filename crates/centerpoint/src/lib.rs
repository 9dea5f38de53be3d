//! Monte Carlo centerpoint estimation over fibered polytopes.
//!
//! A `FiberPolytope` is `{(z, p) : A·(z, p) <= b}` with a discrete fiber
//! coordinate `z` and a continuous part `p ∈ [0,1]^d`. The crate estimates
//! slice volumes, the worst balanced-cut ratio of a candidate point, and
//! searches for the candidate maximizing that ratio.
//!
//! Layout
//! - `polytope`: the H-representation, fiber sets, analytic fixtures.
//! - `sampling`: batch planning, the shared rejection loop, volume
//!   estimation and the threaded trunk sampler.
//! - `cut`: balanced-cut ratio of one candidate.
//! - `search`: the candidate search.
//!
//! The crate performs no I/O; persistence lives in the `cli` crate.

pub mod api;
pub mod cfg;
pub mod cut;
pub mod error;
pub mod polytope;
pub mod sampling;
pub mod search;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::CoreError;

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::cut::{score_candidate, CutCfg, CutScore};
    pub use crate::error::CoreError;
    pub use crate::polytope::{FiberPolytope, FiberSet, VolumeEstimate};
    pub use crate::sampling::{estimate_fiber_volume, fill_samples, BatchPolicy, FillCfg, VolumeCfg};
    pub use crate::search::{search_centerpoint, SearchCfg, SearchResult};
    pub use nalgebra::{DMatrix, DVector};
}
