// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Logic Trees
// ─────────────────────────────────────────────────────────────────────
//! The source-model tree (base models, then uncertainty levels) and the
//! ground-motion tree (one branch set per tectonic region type).

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use tremor_gmm::GroundMotionModel;
use tremor_source::SeismicSource;
use tremor_types::{HazardError, HazardResult};

use crate::branch::BranchSet;
use crate::uncertainty::UncertaintyLevel;

/// A complete set of seismic sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceModel {
    pub name: String,
    pub sources: Vec<SeismicSource>,
}

impl SourceModel {
    pub fn new(name: impl Into<String>, sources: Vec<SeismicSource>) -> Self {
        Self {
            name: name.into(),
            sources,
        }
    }

    pub fn validate(&self) -> HazardResult<()> {
        if self.sources.is_empty() {
            return Err(HazardError::config(format!("source model '{}' has no sources", self.name)));
        }
        let mut ids = HashSet::new();
        for src in &self.sources {
            if !ids.insert(src.id.as_str()) {
                return Err(HazardError::config(format!(
                    "source model '{}' has duplicate source id '{}'",
                    self.name, src.id
                )));
            }
            src.validate()?;
        }
        Ok(())
    }

    /// Tectonic region types present in the model.
    pub fn trts(&self) -> BTreeSet<String> {
        self.sources.iter().map(|s| s.trt.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceModelTree {
    pub models: BranchSet<SourceModel>,
    #[serde(default)]
    pub uncertainties: Vec<UncertaintyLevel>,
}

/// Ground-motion alternatives keyed by tectonic region type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GmmTree {
    pub branch_sets: BTreeMap<String, BranchSet<GroundMotionModel>>,
}

impl GmmTree {
    pub fn with_trt(mut self, trt: impl Into<String>, set: BranchSet<GroundMotionModel>) -> Self {
        self.branch_sets.insert(trt.into(), set);
        self
    }

    pub fn get(&self, trt: &str) -> Option<&BranchSet<GroundMotionModel>> {
        self.branch_sets.get(trt)
    }
}

/// Source-model and ground-motion logic trees of one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicTree {
    pub source_models: SourceModelTree,
    pub gmms: GmmTree,
}

impl LogicTree {
    pub fn new(models: BranchSet<SourceModel>, gmms: GmmTree) -> Self {
        Self {
            source_models: SourceModelTree {
                models,
                uncertainties: Vec::new(),
            },
            gmms,
        }
    }

    pub fn with_uncertainty(mut self, level: UncertaintyLevel) -> Self {
        self.source_models.uncertainties.push(level);
        self
    }

    /// Every branch set is well-formed, every model validates, and every
    /// tectonic region type used by a model has a ground-motion branch
    /// set.
    pub fn validate(&self) -> HazardResult<()> {
        self.source_models.models.validate()?;
        for level in &self.source_models.uncertainties {
            level.branch_set.validate()?;
        }
        for (trt, set) in &self.gmms.branch_sets {
            set.validate()?;
            for b in &set.branches {
                b.value.validate().map_err(|e| match e {
                    HazardError::Configuration(msg) => HazardError::Configuration(format!(
                        "GMM branch '{}' for '{trt}': {msg}",
                        b.id
                    )),
                    other => other,
                })?;
            }
        }
        for branch in &self.source_models.models.branches {
            branch.value.validate()?;
            for trt in branch.value.trts() {
                if self.gmms.get(&trt).is_none() {
                    return Err(HazardError::config(format!(
                        "source model '{}' uses tectonic region '{trt}' with no GMM branch set",
                        branch.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of distinct end-to-end paths under full enumeration.
    /// Ground-motion branch sets only multiply the paths of models that
    /// contain their tectonic region type.
    pub fn num_paths(&self) -> u128 {
        let uncertainty: u128 = self
            .source_models
            .uncertainties
            .iter()
            .map(|l| l.branch_set.len() as u128)
            .fold(1, u128::saturating_mul);
        self.source_models
            .models
            .branches
            .iter()
            .map(|b| {
                b.value
                    .trts()
                    .iter()
                    .map(|trt| self.gmms.get(trt).map_or(1, |s| s.len() as u128))
                    .fold(uncertainty, u128::saturating_mul)
            })
            .fold(0, u128::saturating_add)
    }
}
