//! Core types: the fibered polytope and its per-fiber shifted system.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Convex region `{x ∈ R^{1+d} : A·x <= b}`.
///
/// Invariants:
/// - `a.nrows() == b.len()` and `a.ncols() >= 2` (fiber column plus `d >= 1`).
/// - Immutable after construction; callers share it by reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolytopeRows", into = "PolytopeRows")]
pub struct FiberPolytope {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl FiberPolytope {
    pub fn new(a: DMatrix<f64>, b: DVector<f64>) -> Result<Self, CoreError> {
        if a.nrows() != b.len() || a.ncols() < 2 {
            return Err(CoreError::ShapeMismatch {
                a_rows: a.nrows(),
                a_cols: a.ncols(),
                b_len: b.len(),
                d: None,
            });
        }
        Ok(Self { a, b })
    }

    /// Shapes must already agree; used by the analytic families.
    pub(crate) fn from_raw(a: DMatrix<f64>, b: DVector<f64>) -> Self {
        debug_assert!(a.nrows() == b.len() && a.ncols() >= 2);
        Self { a, b }
    }

    /// Build from row-major coefficient rows (the shape hull libraries emit).
    pub fn from_rows(rows: &[Vec<f64>], b: Vec<f64>) -> Result<Self, CoreError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(CoreError::invalid("coefficient rows have differing lengths"));
        }
        let a = DMatrix::from_row_iterator(rows.len(), cols, rows.iter().flatten().copied());
        Self::new(a, DVector::from_vec(b))
    }

    #[inline]
    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    #[inline]
    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    /// Continuous dimension `d` implied by the column count.
    #[inline]
    pub fn dim(&self) -> usize {
        self.a.ncols() - 1
    }

    #[inline]
    pub fn n_ineq(&self) -> usize {
        self.a.nrows()
    }

    /// Configuration check: `A.cols == 1 + d`.
    pub fn check_dim(&self, d: usize) -> Result<(), CoreError> {
        if self.a.ncols() != 1 + d {
            return Err(CoreError::ShapeMismatch {
                a_rows: self.a.nrows(),
                a_cols: self.a.ncols(),
                b_len: self.b.len(),
                d: Some(d),
            });
        }
        Ok(())
    }

    /// Membership of a full point `x = (z, p)` with slack `tol`.
    pub fn contains(&self, x: &DVector<f64>, tol: f64) -> bool {
        if x.len() != self.a.ncols() {
            return false;
        }
        let lhs = &self.a * x;
        lhs.iter().zip(self.b.iter()).all(|(l, b)| *l <= b + tol)
    }

    /// Membership of `(z, p)` without assembling the joined vector.
    pub fn contains_parts(&self, z: i64, p: &[f64], tol: f64) -> bool {
        if p.len() + 1 != self.a.ncols() {
            return false;
        }
        let zf = z as f64;
        self.a.row_iter().zip(self.b.iter()).all(|(row, b)| {
            let lhs: f64 = row.iter().skip(1).zip(p).map(|(a, x)| a * x).sum();
            lhs <= (b - row[0] * zf) + tol
        })
    }

    /// Substitute the fiber value into column 0.
    pub fn shifted(&self, z: i64, tol: f64) -> ShiftedFiber {
        let d = self.dim();
        let ap = self.a.columns(1, d).into_owned();
        let zf = z as f64;
        let rhs = DVector::from_iterator(
            self.b.len(),
            self.b
                .iter()
                .zip(self.a.column(0).iter())
                .map(|(b, a0)| (b - a0 * zf) + tol),
        );
        ShiftedFiber { fiber: z, ap, rhs }
    }

    /// Joined candidate vector `(z, p)`.
    pub fn join(z: i64, p: &[f64]) -> DVector<f64> {
        DVector::from_iterator(p.len() + 1, std::iter::once(z as f64).chain(p.iter().copied()))
    }
}

/// Row-major wire form `{"a": [[..], ..], "b": [..]}`; validated on the way in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolytopeRows {
    pub a: Vec<Vec<f64>>,
    pub b: Vec<f64>,
}

impl TryFrom<PolytopeRows> for FiberPolytope {
    type Error = CoreError;

    fn try_from(rows: PolytopeRows) -> Result<Self, Self::Error> {
        Self::from_rows(&rows.a, rows.b)
    }
}

impl From<FiberPolytope> for PolytopeRows {
    fn from(poly: FiberPolytope) -> Self {
        let a = poly
            .a
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();
        Self {
            a,
            b: poly.b.iter().copied().collect(),
        }
    }
}

/// The inequalities of one fiber: `A' · p <= rhs` with `A' = A[:, 1..]` and
/// `rhs = b - A[:,0]·z + tol`.
///
/// Read-only once built; the parallel sampler shares it across workers.
#[derive(Clone, Debug)]
pub struct ShiftedFiber {
    pub fiber: i64,
    ap: DMatrix<f64>,
    rhs: DVector<f64>,
}

impl ShiftedFiber {
    #[inline]
    pub fn dim(&self) -> usize {
        self.ap.ncols()
    }

    #[inline]
    pub fn n_ineq(&self) -> usize {
        self.ap.nrows()
    }

    #[inline]
    pub(crate) fn ap(&self) -> &DMatrix<f64> {
        &self.ap
    }

    #[inline]
    pub(crate) fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// All coefficients and right-hand sides are finite.
    pub fn is_finite(&self) -> bool {
        self.ap.iter().chain(self.rhs.iter()).all(|v| v.is_finite())
    }

    pub fn contains(&self, p: &[f64]) -> bool {
        debug_assert_eq!(p.len(), self.dim());
        (0..self.ap.nrows()).all(|i| {
            let lhs: f64 = self.ap.row(i).iter().zip(p).map(|(a, x)| a * x).sum();
            lhs <= self.rhs[i]
        })
    }
}
