//! Analytic fibered polytopes with known slice volumes.

use nalgebra::{DMatrix, DVector};

use super::types::FiberPolytope;

/// `[z_lo, z_hi] × [0,1]^d`: every fiber slice in range is the full cube.
pub fn unit_cube(d: usize, z_lo: i64, z_hi: i64) -> FiberPolytope {
    let rows = 2 * d + 2;
    let mut a = DMatrix::zeros(rows, 1 + d);
    let mut b = DVector::zeros(rows);
    for i in 0..d {
        a[(2 * i, 1 + i)] = 1.0;
        b[2 * i] = 1.0;
        a[(2 * i + 1, 1 + i)] = -1.0;
    }
    a[(2 * d, 0)] = 1.0;
    b[2 * d] = z_hi as f64;
    a[(2 * d + 1, 0)] = -1.0;
    b[2 * d + 1] = -(z_lo as f64);
    FiberPolytope::from_raw(a, b)
}

/// Triangle with vertices `(0,0), (0,1), (1/2,1)` on fibers `z ∈ [0, 1]`.
///
/// Each slice has relative volume `1/4` in `[0,1]^2`.
pub fn triangle_prism() -> FiberPolytope {
    #[rustfmt::skip]
    let a = DMatrix::from_row_slice(5, 3, &[
        0.0, -1.0,  0.0, // p1 >= 0
        0.0,  0.0,  1.0, // p2 <= 1
        0.0,  2.0, -1.0, // p2 >= 2 p1
        1.0,  0.0,  0.0, // z <= 1
       -1.0,  0.0,  0.0, // z >= 0
    ]);
    let b = DVector::from_vec(vec![0.0, 1.0, 0.0, 1.0, 0.0]);
    FiberPolytope::from_raw(a, b)
}

/// `0·x <= -1` over `R^{1+d}`: infeasible everywhere.
pub fn empty(d: usize) -> FiberPolytope {
    let a = DMatrix::zeros(1, 1 + d);
    let b = DVector::from_element(1, -1.0);
    FiberPolytope::from_raw(a, b)
}
