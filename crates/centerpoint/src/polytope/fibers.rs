//! Fiber id sets and per-fiber volume estimates.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ordered set of distinct integer fiber ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<i64>", into = "Vec<i64>")]
pub struct FiberSet(Vec<i64>);

impl FiberSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut ids: Vec<i64> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, z: i64) -> bool {
        self.0.binary_search(&z).is_ok()
    }

    /// Uniform draw; `None` for an empty set.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<i64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0[rng.gen_range(0..self.0.len())])
    }
}

impl Default for FiberSet {
    fn default() -> Self {
        Self(vec![0, 1])
    }
}

impl From<Vec<i64>> for FiberSet {
    fn from(ids: Vec<i64>) -> Self {
        Self::new(ids)
    }
}

impl From<FiberSet> for Vec<i64> {
    fn from(set: FiberSet) -> Self {
        set.0
    }
}

/// Relative slice volumes `P[(z,p) ∈ C | p ~ U([0,1]^d)]`, keyed by fiber.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeEstimate {
    per_fiber: BTreeMap<i64, f64>,
}

impl VolumeEstimate {
    pub fn insert(&mut self, z: i64, vol: f64) {
        self.per_fiber.insert(z, vol);
    }

    pub fn get(&self, z: i64) -> Option<f64> {
        self.per_fiber.get(&z).copied()
    }

    /// Sum over fibers; the normalizer of the cut ratio.
    pub fn total(&self) -> f64 {
        self.per_fiber.values().sum()
    }

    pub fn len(&self) -> usize {
        self.per_fiber.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_fiber.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.per_fiber.iter().map(|(z, v)| (*z, *v))
    }
}

impl FromIterator<(i64, f64)> for VolumeEstimate {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Self {
            per_fiber: iter.into_iter().collect(),
        }
    }
}
