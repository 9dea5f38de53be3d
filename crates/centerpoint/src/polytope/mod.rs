//! Fibered polytopes in H-representation.
//!
//! Purpose
//! - Hold the immutable `A·x <= b` description over `R^{1+d}` where column 0
//!   is the discrete fiber coordinate `z` and columns `1..=d` are continuous.
//! - Provide the fiber-shifted view (`b - A[:,0]·z`) every sampler works on.
//!
//! The core never builds hulls; `(A, b)` comes from an external geometry
//! library. `families` only carries a few analytic shapes with known slice
//! volumes for tests and CLI presets.

mod families;
mod fibers;
mod types;

pub use families::{empty, triangle_prism, unit_cube};
pub use fibers::{FiberSet, VolumeEstimate};
pub use types::{FiberPolytope, PolytopeRows, ShiftedFiber};
