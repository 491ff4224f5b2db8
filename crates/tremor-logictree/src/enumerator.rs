// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Realization Enumerator
// ─────────────────────────────────────────────────────────────────────
//! Turns a logic tree into weighted realizations, either by full
//! enumeration of every path or by seeded Monte Carlo sampling.
//!
//! Realizations sharing a source-model path share one resolved source
//! model so the calculator only enumerates its ruptures once.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use tremor_gmm::GroundMotionModel;
use tremor_types::{CalculationConfig, HazardError, HazardResult};

use crate::branch::Branch;
use crate::tree::{LogicTree, SourceModel};

/// How to turn the tree into realizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationSettings {
    /// 0 enumerates every path.
    pub samples: u32,
    pub seed: u64,
    pub max_realizations: u64,
}

impl From<&CalculationConfig> for EnumerationSettings {
    fn from(config: &CalculationConfig) -> Self {
        Self {
            samples: config.number_of_logic_tree_samples,
            seed: config.random_seed,
            max_realizations: config.max_realizations,
        }
    }
}

/// A source model with one combination of uncertainties applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedModel {
    pub ordinal: usize,
    /// Base-model branch id followed by one branch id per uncertainty level.
    pub path: Vec<String>,
    pub model: SourceModel,
    pub trts: BTreeSet<String>,
}

/// One end-to-end path through the source-model and GMM trees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Realization {
    pub ordinal: usize,
    /// Index into [`Realizations::source_models`].
    pub source_model: usize,
    /// Chosen GMM branch index per tectonic region type.
    pub gmm_branches: BTreeMap<String, usize>,
    /// Chosen GMM branch id per tectonic region type.
    pub gmm_path: BTreeMap<String, String>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Realizations {
    pub source_models: Vec<ResolvedModel>,
    pub realizations: Vec<Realization>,
    pub sampled: bool,
}

impl Realizations {
    pub fn len(&self) -> usize {
        self.realizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realizations.is_empty()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.realizations.iter().map(|r| r.weight).collect()
    }

    /// Source model of a realization.
    pub fn model_of(&self, rlz: &Realization) -> &ResolvedModel {
        &self.source_models[rlz.source_model]
    }
}

impl LogicTree {
    /// The GMM on branch `index` of the tectonic region's branch set.
    pub fn gmm(&self, trt: &str, index: usize) -> Option<&GroundMotionModel> {
        self.gmms.get(trt).and_then(|s| s.get(index)).map(|b| &b.value)
    }

    /// Validate the tree and produce its realizations.
    pub fn realizations(&self, settings: &EnumerationSettings) -> HazardResult<Realizations> {
        self.validate()?;
        let out = if settings.samples == 0 {
            self.enumerate_all(settings.max_realizations)?
        } else {
            self.sample(settings)?
        };
        log::info!(
            "{} realizations over {} distinct source models ({})",
            out.realizations.len(),
            out.source_models.len(),
            if out.sampled { "sampled" } else { "full enumeration" }
        );
        Ok(out)
    }

    fn enumerate_all(&self, limit: u64) -> HazardResult<Realizations> {
        let count = self.num_paths();
        if count > limit as u128 {
            return Err(HazardError::ResourceExhaustion {
                realizations: count,
                limit,
            });
        }
        let levels = &self.source_models.uncertainties;
        let level_sizes: Vec<usize> = levels.iter().map(|l| l.branch_set.len()).collect();
        let mut source_models = Vec::new();
        let mut realizations = Vec::with_capacity(count as usize);

        for (model_idx, model_branch) in self.source_models.models.branches.iter().enumerate() {
            for combo in cartesian(&level_sizes) {
                let resolved = self.resolve(source_models.len(), model_idx, &combo)?;
                let sm_weight = combo
                    .iter()
                    .zip(levels)
                    .map(|(&i, l)| l.branch_set.branches[i].weight)
                    .fold(model_branch.weight, |acc, w| acc * w);

                let trts: Vec<&String> = resolved.trts.iter().collect();
                let gmm_sizes: Vec<usize> = trts
                    .iter()
                    .map(|t| self.gmms.get(t).map_or(0, |s| s.len()))
                    .collect();
                for gmm_combo in cartesian(&gmm_sizes) {
                    let mut weight = sm_weight;
                    let mut gmm_branches = BTreeMap::new();
                    let mut gmm_path = BTreeMap::new();
                    for (trt, &i) in trts.iter().zip(&gmm_combo) {
                        let branch = self.gmm_branch(trt, i)?;
                        weight *= branch.weight;
                        gmm_branches.insert((*trt).clone(), i);
                        gmm_path.insert((*trt).clone(), branch.id.clone());
                    }
                    realizations.push(Realization {
                        ordinal: realizations.len(),
                        source_model: resolved.ordinal,
                        gmm_branches,
                        gmm_path,
                        weight,
                    });
                }
                source_models.push(resolved);
            }
        }
        Ok(Realizations {
            source_models,
            realizations,
            sampled: false,
        })
    }

    fn sample(&self, settings: &EnumerationSettings) -> HazardResult<Realizations> {
        if settings.samples as u64 > settings.max_realizations {
            return Err(HazardError::ResourceExhaustion {
                realizations: settings.samples as u128,
                limit: settings.max_realizations,
            });
        }
        let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
        let weight = 1.0 / settings.samples as f64;
        let mut known: HashMap<(usize, Vec<usize>), usize> = HashMap::new();
        let mut source_models: Vec<ResolvedModel> = Vec::new();
        let mut realizations = Vec::with_capacity(settings.samples as usize);

        for ordinal in 0..settings.samples as usize {
            let model_idx = self.source_models.models.sample(&mut rng)?;
            let combo = self
                .source_models
                .uncertainties
                .iter()
                .map(|l| l.branch_set.sample(&mut rng))
                .collect::<HazardResult<Vec<_>>>()?;
            let key = (model_idx, combo);
            let sm = match known.get(&key) {
                Some(&i) => i,
                None => {
                    let i = source_models.len();
                    source_models.push(self.resolve(i, model_idx, &key.1)?);
                    known.insert(key, i);
                    i
                }
            };

            let mut gmm_branches = BTreeMap::new();
            let mut gmm_path = BTreeMap::new();
            for trt in &source_models[sm].trts {
                let set = self
                    .gmms
                    .get(trt)
                    .ok_or_else(|| missing_trt(trt))?;
                let i = set.sample(&mut rng)?;
                gmm_branches.insert(trt.clone(), i);
                gmm_path.insert(trt.clone(), set.branches[i].id.clone());
            }
            realizations.push(Realization {
                ordinal,
                source_model: sm,
                gmm_branches,
                gmm_path,
                weight,
            });
        }
        Ok(Realizations {
            source_models,
            realizations,
            sampled: true,
        })
    }

    fn resolve(
        &self,
        ordinal: usize,
        model_idx: usize,
        combo: &[usize],
    ) -> HazardResult<ResolvedModel> {
        let base = &self.source_models.models.branches[model_idx];
        let mut model = base.value.clone();
        let mut path = vec![base.id.clone()];
        for (level, &i) in self.source_models.uncertainties.iter().zip(combo) {
            level.apply(i, &mut model.sources)?;
            path.push(level.branch_set.branches[i].id.clone());
        }
        let trts = model.trts();
        Ok(ResolvedModel {
            ordinal,
            path,
            model,
            trts,
        })
    }

    fn gmm_branch(&self, trt: &str, index: usize) -> HazardResult<&Branch<GroundMotionModel>> {
        self.gmms
            .get(trt)
            .and_then(|s| s.get(index))
            .ok_or_else(|| missing_trt(trt))
    }
}

fn missing_trt(trt: &str) -> HazardError {
    HazardError::config(format!("no GMM branch set for tectonic region '{trt}'"))
}

/// Every index combination of the given dimension sizes, last index
/// varying fastest. No dimensions yields one empty combination.
fn cartesian(sizes: &[usize]) -> Vec<Vec<usize>> {
    sizes.iter().fold(vec![Vec::new()], |acc, &n| {
        acc.into_iter()
            .flat_map(|prefix| {
                (0..n).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect()
    })
}
