//! Curated surface for the orchestration layer.
//!
//! One entry point per core operation plus the types they exchange. Callers
//! that need the building blocks (tallies, the batch planner) import from
//! `sampling` directly.

// Polytope and fixtures
pub use crate::polytope::{empty, triangle_prism, unit_cube, FiberPolytope, FiberSet, VolumeEstimate};
// Volume estimation
pub use crate::sampling::{estimate_fiber_volume, estimate_volumes, plan_batch, BatchPolicy, VolumeCfg};
// Trunk sampler
pub use crate::sampling::{
    fill_samples, fill_samples_sequential, FillCfg, FillStats, SampleBucket, StopReason, TaskFailure,
};
// Cut ratio and search
pub use crate::cut::{score_candidate, CutCfg, CutScore};
pub use crate::search::{search_centerpoint, SearchCfg, SearchResult};
pub use crate::error::CoreError;
