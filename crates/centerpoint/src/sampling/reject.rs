//! The shared batched rejection loop and its tallies.

use nalgebra::DMatrix;
use rand::Rng;

use crate::polytope::ShiftedFiber;

/// What to accumulate per draw. `p` is the continuous point, `inside` its
/// membership in the fiber slice.
pub trait Tally {
    fn record(&mut self, p: &[f64], inside: bool);
}

/// Count of accepted draws.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptCount {
    pub accepted: u64,
}

impl Tally for AcceptCount {
    #[inline]
    fn record(&mut self, _p: &[f64], inside: bool) {
        self.accepted += inside as u64;
    }
}

/// Accepted count plus the accepted points themselves (row-major, flat).
///
/// `limit` caps how many points are kept; `accepted` keeps counting past it.
#[derive(Clone, Debug)]
pub struct AcceptPoints {
    pub accepted: u64,
    points: Vec<f64>,
    dim: usize,
    limit: Option<usize>,
}

impl AcceptPoints {
    pub fn new(dim: usize, limit: Option<usize>) -> Self {
        Self {
            accepted: 0,
            points: Vec::new(),
            dim,
            limit,
        }
    }

    pub fn kept(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.points.len() / self.dim
        }
    }

    pub fn into_points(self) -> Vec<f64> {
        self.points
    }
}

impl Tally for AcceptPoints {
    fn record(&mut self, p: &[f64], inside: bool) {
        if !inside {
            return;
        }
        self.accepted += 1;
        if self.limit.map_or(true, |lim| self.kept() < lim) {
            self.points.extend_from_slice(p);
        }
    }
}

/// Accepted draws split by the hyperplane through `center` with normal
/// `direction`: `(p - center)·u < 0` is negative, everything else non-negative.
#[derive(Clone, Debug)]
pub struct SideCounts<'a> {
    center: &'a [f64],
    direction: &'a [f64],
    pub non_negative: u64,
    pub negative: u64,
}

impl<'a> SideCounts<'a> {
    pub fn new(center: &'a [f64], direction: &'a [f64]) -> Self {
        debug_assert_eq!(center.len(), direction.len());
        Self {
            center,
            direction,
            non_negative: 0,
            negative: 0,
        }
    }

    /// `min(non_negative, negative) / draws`: the smaller side as a fraction
    /// of *all* draws, so misses still weigh in the denominator.
    pub fn balanced(&self, draws: usize) -> f64 {
        if draws == 0 || self.non_negative + self.negative == 0 {
            return 0.0;
        }
        self.non_negative.min(self.negative) as f64 / draws as f64
    }
}

impl Tally for SideCounts<'_> {
    fn record(&mut self, p: &[f64], inside: bool) {
        if !inside {
            return;
        }
        let side: f64 = p
            .iter()
            .zip(self.center)
            .zip(self.direction)
            .map(|((x, c), u)| (x - c) * u)
            .sum();
        if side < 0.0 {
            self.negative += 1;
        } else {
            self.non_negative += 1;
        }
    }
}

/// Draw `draws` points of `U([0,1]^d)` in batches of at most `batch` and
/// feed each one, with its membership in `fiber`, to `tally`.
///
/// Per batch the points form the columns of a `d × m` matrix so the whole
/// membership test is one `A'·P` product (`k × m`).
pub fn sample_fiber<R, T>(fiber: &ShiftedFiber, draws: usize, batch: usize, rng: &mut R, tally: &mut T)
where
    R: Rng + ?Sized,
    T: Tally + ?Sized,
{
    let d = fiber.dim();
    if draws == 0 || d == 0 {
        return;
    }
    let batch = batch.clamp(1, draws);
    let rhs = fiber.rhs();
    let mut done = 0;
    while done < draws {
        let m = batch.min(draws - done);
        let buf: Vec<f64> = (0..m * d).map(|_| rng.gen::<f64>()).collect();
        let pts = DMatrix::from_vec(d, m, buf);
        let lhs = fiber.ap() * &pts;
        let flat = pts.as_slice();
        for (j, col) in lhs.column_iter().enumerate() {
            let inside = col.iter().zip(rhs.iter()).all(|(l, r)| *l <= *r);
            tally.record(&flat[j * d..(j + 1) * d], inside);
        }
        done += m;
    }
}
