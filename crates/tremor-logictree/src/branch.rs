// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Branches and Branch Sets
// ─────────────────────────────────────────────────────────────────────

use std::collections::HashSet;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use tremor_types::{HazardError, HazardResult};

/// Tolerance on the sum of sibling branch weights.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// One alternative at a logic-tree level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch<T> {
    pub id: String,
    pub weight: f64,
    pub value: T,
}

impl<T> Branch<T> {
    pub fn new(id: impl Into<String>, weight: f64, value: T) -> Self {
        Self {
            id: id.into(),
            weight,
            value,
        }
    }
}

/// Mutually exclusive, collectively exhaustive alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSet<T> {
    pub id: String,
    pub branches: Vec<Branch<T>>,
}

impl<T> BranchSet<T> {
    pub fn new(id: impl Into<String>, branches: Vec<Branch<T>>) -> Self {
        Self {
            id: id.into(),
            branches,
        }
    }

    /// Branch ids must be unique, every weight in (0, 1], and the
    /// weights must sum to 1.
    pub fn validate(&self) -> HazardResult<()> {
        if self.branches.is_empty() {
            return Err(HazardError::config(format!("branch set '{}' is empty", self.id)));
        }
        let mut seen = HashSet::new();
        for b in &self.branches {
            if !seen.insert(b.id.as_str()) {
                return Err(HazardError::config(format!(
                    "branch set '{}' has duplicate branch id '{}'",
                    self.id, b.id
                )));
            }
            if !(b.weight > 0.0 && b.weight <= 1.0) {
                return Err(HazardError::config(format!(
                    "branch '{}' in '{}' has weight {} outside (0, 1]",
                    b.id, self.id, b.weight
                )));
            }
        }
        let sum: f64 = self.branches.iter().map(|b| b.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(HazardError::config(format!(
                "weights of branch set '{}' sum to {sum}, expected 1",
                self.id
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Branch<T>> {
        self.branches.get(index)
    }

    /// Index of one branch drawn with probability equal to its weight.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HazardResult<usize> {
        let dist = WeightedIndex::new(self.branches.iter().map(|b| b.weight)).map_err(|e| {
            HazardError::config(format!("cannot sample branch set '{}': {e}", self.id))
        })?;
        Ok(dist.sample(rng))
    }
}
