// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Classical Hazard Calculator
// ─────────────────────────────────────────────────────────────────────
//! Drives a classical calculation end to end:
//!
//! 1. Validate the configuration and logic tree, enumerate or sample
//!    realizations, resolve one [`TrtSetup`] per tectonic region.
//! 2. Split the work into (source model, source, site group) units and
//!    run them on the rayon pool. Each unit accumulates rates per GMM
//!    branch of its source's tectonic region; partial rate maps are
//!    merged by a single reduction.
//! 3. Sum the matching maps into one curve set per realization, then
//!    derive statistics, hazard maps, spectra and disaggregation.
//!
//! Cancellation is checked at the start of every work unit.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use tremor_gmm::{DistanceMetric, GmEvaluator, GmPrediction};
use tremor_logictree::{EnumerationSettings, LogicTree, Realizations};
use tremor_source::{Rupture, TemporalOccurrence};
use tremor_types::{
    CalculationConfig, CurveKind, DisaggConfig, HazardError, HazardResult, Imt, SiteParam,
};

use crate::disagg::{Contribution, DisaggBins, DisaggMatrix};
use crate::exceedance::{epsilon, equivalent_rate, poe, Truncation};
use crate::output::{
    CurveSet, DisaggResult, HazardOutput, RealizationInfo, SiteCurves, SiteFailure,
};
use crate::postproc::{hazard_maps, invert_curve, uniform_hazard_spectra};
use crate::ratemap::{split_curves, RateMap};
use crate::stats::{reduce_curves, Statistic};

/// Shared flag that stops a running calculation at the next work unit.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-tectonic-region parameters, resolved once at setup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrtSetup {
    pub trt: String,
    pub maximum_distance: f64,
    pub minimum_magnitude: f64,
    /// Site parameters required by any GMM branch of this region.
    pub site_params: BTreeSet<SiteParam>,
}

struct Setup {
    rlzs: Realizations,
    trts: BTreeMap<String, TrtSetup>,
    truncation: Truncation,
    imts: Vec<Imt>,
    ln_levels: Vec<f64>,
    /// GMM branches combined with each (source model, region).
    branches: BTreeMap<(usize, String), BTreeSet<usize>>,
}

struct WorkUnit {
    model: usize,
    source: usize,
    sites: Range<usize>,
}

/// Rate maps keyed by (source model, region, GMM branch).
type RateKey = (usize, String, usize);

#[derive(Default)]
struct Partial {
    maps: BTreeMap<RateKey, RateMap>,
    failures: Vec<(usize, HazardError)>,
}

impl Partial {
    fn absorb(&mut self, key: RateKey, chunk: &RateMap, first_site: usize, num_sites: usize) {
        self.maps
            .entry(key)
            .or_insert_with(|| RateMap::new(num_sites, chunk.num_levels()))
            .merge_rows(chunk, first_site);
    }

    fn merge(mut self, other: Partial) -> Partial {
        for (key, map) in other.maps {
            match self.maps.get_mut(&key) {
                Some(existing) => existing.merge(&map),
                None => {
                    self.maps.insert(key, map);
                }
            }
        }
        self.failures.extend(other.failures);
        self
    }
}

/// Disaggregation request for one (site, IMT, statistic, target).
struct DisaggTarget {
    site: usize,
    imt: usize,
    statistic: Statistic,
    poe: Option<f64>,
    iml: f64,
    /// Realizations and the weight each contributes.
    members: Vec<(usize, f64)>,
}

pub struct HazardCalculator {
    config: CalculationConfig,
    tree: LogicTree,
    cancel: CancellationToken,
}

impl HazardCalculator {
    pub fn new(config: CalculationConfig, tree: LogicTree) -> Self {
        Self {
            config,
            tree,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &CalculationConfig {
        &self.config
    }

    /// Per-region setup records the calculation would use.
    pub fn trt_setups(&self) -> HazardResult<Vec<TrtSetup>> {
        Ok(self.setup()?.trts.into_values().collect())
    }

    /// Run the full calculation.
    pub fn run(&self) -> HazardResult<HazardOutput> {
        let setup = self.setup()?;
        let num_sites = self.config.sites.len();
        let units = self.work_units(&setup);
        log::info!(
            "classical calculation: {} realizations, {} sites, {} work units",
            setup.rlzs.len(),
            num_sites,
            units.len()
        );

        let partial = units
            .par_iter()
            .try_fold(Partial::default, |mut acc, unit| {
                self.process_unit(&setup, unit, &mut acc)?;
                Ok::<_, HazardError>(acc)
            })
            .try_reduce(Partial::default, |a, b| Ok(a.merge(b)))?;

        let mut failed: BTreeMap<usize, HazardError> = BTreeMap::new();
        for (site, err) in partial.failures.iter() {
            failed.entry(*site).or_insert_with(|| err.clone());
        }
        for (site, err) in &failed {
            log::warn!("dropping site {}: {err}", self.config.sites[*site].id);
        }
        let kept: Vec<usize> = (0..num_sites).filter(|s| !failed.contains_key(s)).collect();

        let rlz_maps = self.realization_maps(&setup, &partial);
        let out_cfg = &self.config.output;
        let kind = out_cfg.curve_kind;
        let time = self.config.investigation_time;
        // rows[k][r]: flat curve of kept site k under realization r
        let rows: Vec<Vec<Vec<f64>>> = kept
            .iter()
            .map(|&s| rlz_maps.iter().map(|m| m.site_values(s, kind, time)).collect())
            .collect();
        let weights = setup.rlzs.weights();

        let mut statistics = Vec::new();
        if out_cfg.individual_curves {
            statistics.extend((0..setup.rlzs.len()).map(Statistic::Realization));
        }
        if out_cfg.mean {
            statistics.push(Statistic::Mean);
        }
        statistics.extend(out_cfg.quantiles.iter().map(|&q| Statistic::Quantile(q)));

        let mut output = HazardOutput {
            realizations: setup
                .rlzs
                .realizations
                .iter()
                .map(|r| RealizationInfo {
                    ordinal: r.ordinal,
                    weight: r.weight,
                    source_model_path: setup.rlzs.model_of(r).path.clone(),
                    gmm_path: r.gmm_path.clone(),
                })
                .collect(),
            sampled: setup.rlzs.sampled,
            individual: Vec::new(),
            mean: None,
            quantiles: Vec::new(),
            hazard_maps: Vec::new(),
            uniform_hazard_spectra: Vec::new(),
            disagg_bins: None,
            disaggregation: Vec::new(),
            failures: failed
                .iter()
                .map(|(s, e)| SiteFailure::new(self.config.sites[*s].id, None, e))
                .collect(),
        };

        let site_ids: Vec<u32> = kept.iter().map(|&s| self.config.sites[s].id).collect();
        let want_maps = out_cfg.hazard_maps || out_cfg.uniform_hazard_spectra;
        for stat in statistics {
            let set = self.curve_set(stat, &site_ids, &rows, &weights);
            if want_maps {
                let per_site: Vec<Vec<_>> = set.sites.iter().map(|s| s.curves.clone()).collect();
                let maps = hazard_maps(stat, &site_ids, &per_site, &out_cfg.poes, kind, time);
                if out_cfg.uniform_hazard_spectra {
                    output
                        .uniform_hazard_spectra
                        .extend(uniform_hazard_spectra(&maps, &out_cfg.poes));
                }
                if out_cfg.hazard_maps {
                    output.hazard_maps.extend(maps);
                }
            }
            match stat {
                Statistic::Realization(_) => output.individual.push(set),
                Statistic::Mean => output.mean = Some(set),
                Statistic::Quantile(_) => output.quantiles.push(set),
            }
        }

        if let Some(disagg) = &self.config.disagg {
            let bins = self.disagg_bins(&setup, disagg)?;
            let (results, failures) =
                self.disaggregate_all(&setup, disagg, &bins, &kept, &rlz_maps, &weights)?;
            output.disaggregation = results;
            output.failures.extend(failures);
            output.disagg_bins = Some(bins);
        }

        log::info!(
            "classical calculation done: {} sites kept, {} failures",
            kept.len(),
            output.failures.len()
        );
        Ok(output)
    }

    fn setup(&self) -> HazardResult<Setup> {
        self.config.validate()?;
        let rlzs = self.tree.realizations(&EnumerationSettings::from(&self.config))?;
        let imts: Vec<Imt> = self.config.imtls.imts().collect();
        let ln_levels: Vec<f64> = self
            .config
            .imtls
            .iter()
            .flat_map(|(_, levels)| levels.iter().map(|l| l.ln()))
            .collect();

        let mut branches: BTreeMap<(usize, String), BTreeSet<usize>> = BTreeMap::new();
        for rlz in &rlzs.realizations {
            for (trt, &g) in &rlz.gmm_branches {
                branches
                    .entry((rlz.source_model, trt.clone()))
                    .or_default()
                    .insert(g);
            }
        }

        let mut trts: BTreeMap<String, TrtSetup> = BTreeMap::new();
        for ((_, trt), used) in &branches {
            let entry = trts.entry(trt.clone()).or_insert_with(|| TrtSetup {
                trt: trt.clone(),
                maximum_distance: self.config.maximum_distance.get(trt),
                minimum_magnitude: self.config.minimum_magnitude.get(trt),
                site_params: BTreeSet::new(),
            });
            for &g in used {
                let gmm = self.tree.gmm(trt, g).ok_or_else(|| {
                    HazardError::config(format!("no GMM branch {g} for tectonic region '{trt}'"))
                })?;
                if let Some(imt) = imts.iter().find(|imt| !gmm.supports(**imt)) {
                    return Err(HazardError::config(format!(
                        "{} (tectonic region '{trt}') does not support {imt}",
                        gmm.name()
                    )));
                }
                entry.site_params.extend(gmm.required_site_params());
            }
        }

        for setup in trts.values() {
            for site in &self.config.sites {
                if let Some(p) = setup.site_params.iter().find(|p| !site.has_param(**p)) {
                    return Err(HazardError::config(format!(
                        "site {} lacks {p}, required by the GMMs of '{}'",
                        site.id, setup.trt
                    )));
                }
            }
            log::debug!(
                "{}: maximum distance {} km, minimum magnitude {}, site params {:?}",
                setup.trt,
                setup.maximum_distance,
                setup.minimum_magnitude,
                setup.site_params
            );
        }

        Ok(Setup {
            rlzs,
            trts,
            truncation: Truncation::from_level(self.config.truncation_level)?,
            imts,
            ln_levels,
            branches,
        })
    }

    fn work_units(&self, setup: &Setup) -> Vec<WorkUnit> {
        let num_sites = self.config.sites.len();
        let group = self.config.sites_per_group;
        let mut units = Vec::new();
        for (m, model) in setup.rlzs.source_models.iter().enumerate() {
            for s in 0..model.model.sources.len() {
                for start in (0..num_sites).step_by(group) {
                    units.push(WorkUnit {
                        model: m,
                        source: s,
                        sites: start..(start + group).min(num_sites),
                    });
                }
            }
        }
        units
    }

    fn process_unit(
        &self,
        setup: &Setup,
        unit: &WorkUnit,
        partial: &mut Partial,
    ) -> HazardResult<()> {
        if self.cancel.is_cancelled() {
            return Err(HazardError::Cancelled);
        }
        let source = &setup.rlzs.source_models[unit.model].model.sources[unit.source];
        let (Some(trt), Some(used)) = (
            setup.trts.get(&source.trt),
            setup.branches.get(&(unit.model, source.trt.clone())),
        ) else {
            return Ok(());
        };
        let disc = &self.config.discretization;
        let sites = &self.config.sites[unit.sites.clone()];
        let active: Vec<usize> = (0..sites.len())
            .filter(|&i| {
                source.min_distance_bound(&sites[i].location, disc) <= trt.maximum_distance
            })
            .collect();
        if active.is_empty() {
            return Ok(());
        }

        let evaluators = used
            .iter()
            .map(|&g| {
                let gmm = self.tree.gmm(&source.trt, g).ok_or_else(|| {
                    HazardError::config(format!("no GMM branch {g} for '{}'", source.trt))
                })?;
                let evaluator = GmEvaluator::new(gmm, setup.imts.clone(), trt.maximum_distance);
                Ok::<_, HazardError>((g, evaluator))
            })
            .collect::<HazardResult<Vec<_>>>()?;
        let num_levels = self.config.imtls.total_levels();
        let mut local: Vec<RateMap> = evaluators
            .iter()
            .map(|_| RateMap::new(sites.len(), num_levels))
            .collect();
        let mut failed = vec![false; sites.len()];

        let mut count = 0usize;
        for rupture in source.iter_ruptures(disc, trt.minimum_magnitude)? {
            count += 1;
            for &i in &active {
                if failed[i] {
                    continue;
                }
                for ((_, evaluator), map) in evaluators.iter().zip(local.iter_mut()) {
                    match evaluator.evaluate(&rupture, &sites[i]) {
                        Ok(None) => {}
                        Ok(Some(eval)) => {
                            self.add_rates(setup, &rupture, &eval.predictions, map.row_mut(i))
                        }
                        Err(e) if e.is_site_local() && !self.config.strict => {
                            partial.failures.push((unit.sites.start + i, e));
                            failed[i] = true;
                            break;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        log::debug!(
            "source '{}' (model {}): {count} ruptures over {} sites",
            source.id,
            unit.model,
            active.len()
        );

        let num_sites = self.config.sites.len();
        for ((g, _), map) in evaluators.iter().zip(&local) {
            partial.absorb((unit.model, source.trt.clone(), *g), map, unit.sites.start, num_sites);
        }
        Ok(())
    }

    fn add_rates(
        &self,
        setup: &Setup,
        rupture: &Rupture,
        predictions: &[GmPrediction],
        row: &mut [f64],
    ) {
        let time = self.config.investigation_time;
        for (m, pred) in predictions.iter().enumerate() {
            let off = self.config.imtls.offset(m);
            let n = self.config.imtls.levels_at(m).len();
            for l in off..off + n {
                let p = poe(setup.ln_levels[l], pred.mean, pred.total, setup.truncation);
                // levels increase, so every later poe is zero too
                if p <= 0.0 {
                    break;
                }
                row[l] += occurrence_rate(&rupture.occurrence, p, time);
            }
        }
    }

    fn realization_maps(&self, setup: &Setup, partial: &Partial) -> Vec<RateMap> {
        let num_sites = self.config.sites.len();
        let num_levels = self.config.imtls.total_levels();
        setup
            .rlzs
            .realizations
            .iter()
            .map(|rlz| {
                let mut map = RateMap::new(num_sites, num_levels);
                for (trt, &g) in &rlz.gmm_branches {
                    if let Some(m) = partial.maps.get(&(rlz.source_model, trt.clone(), g)) {
                        map.merge(m);
                    }
                }
                map
            })
            .collect()
    }

    fn curve_set(
        &self,
        stat: Statistic,
        site_ids: &[u32],
        rows: &[Vec<Vec<f64>>],
        weights: &[f64],
    ) -> CurveSet {
        let sites = site_ids
            .iter()
            .zip(rows)
            .map(|(&site_id, per_rlz)| {
                let refs: Vec<&[f64]> = per_rlz.iter().map(|r| r.as_slice()).collect();
                let values = reduce_curves(&refs, weights, stat);
                SiteCurves {
                    site_id,
                    curves: split_curves(&values, &self.config.imtls),
                }
            })
            .collect();
        CurveSet {
            statistic: stat,
            kind: self.config.output.curve_kind,
            sites,
        }
    }

    fn disagg_bins(&self, setup: &Setup, disagg: &DisaggConfig) -> HazardResult<DisaggBins> {
        let width = self.config.discretization.width_of_mfd_bin;
        let sources = setup.rlzs.source_models.iter().flat_map(|m| m.model.sources.iter());
        let (lo, hi) = sources
            .clone()
            .filter_map(|s| s.magnitude_range(width))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (a, b)| (lo.min(a), hi.max(b)));
        DisaggBins::new(
            (lo, hi),
            disagg.mag_bin_width,
            self.config.maximum_distance.max(),
            disagg.distance_bin_width,
            self.config.truncation_level,
            disagg.num_epsilon_bins,
            sources.map(|s| (s.id.clone(), s.trt.clone())),
        )
    }

    /// Statistics to disaggregate. With no realizations listed and no
    /// mean requested, the mean is used when there are several
    /// realizations and the single realization otherwise.
    fn disagg_statistics(disagg: &DisaggConfig, num_rlzs: usize) -> HazardResult<Vec<Statistic>> {
        let mut out = Vec::new();
        for &r in &disagg.realizations {
            if r >= num_rlzs {
                return Err(HazardError::config(format!(
                    "disaggregation realization {r} does not exist ({num_rlzs} realizations)"
                )));
            }
            out.push(Statistic::Realization(r));
        }
        if disagg.mean || (disagg.realizations.is_empty() && num_rlzs > 1) {
            out.push(Statistic::Mean);
        }
        if out.is_empty() {
            out.push(Statistic::Realization(0));
        }
        Ok(out)
    }

    /// Targets are located on rate curves: each realization's own, and
    /// for the mean the weighted mean rate Σ w_r·λ_r, which is exactly
    /// what the weighted sum of realization matrices adds up to.
    fn disaggregate_all(
        &self,
        setup: &Setup,
        disagg: &DisaggConfig,
        bins: &DisaggBins,
        kept: &[usize],
        rlz_maps: &[RateMap],
        weights: &[f64],
    ) -> HazardResult<(Vec<DisaggResult>, Vec<SiteFailure>)> {
        let time = self.config.investigation_time;
        let imtls = &self.config.imtls;
        let mut mean_rates = RateMap::new(self.config.sites.len(), imtls.total_levels());
        for (map, &w) in rlz_maps.iter().zip(weights) {
            mean_rates.merge_scaled(map, w);
        }
        let mut failures = Vec::new();
        let mut targets = Vec::new();

        for stat in Self::disagg_statistics(disagg, setup.rlzs.len())? {
            let (rates, members): (&RateMap, Vec<(usize, f64)>) = match stat {
                Statistic::Realization(r) => (&rlz_maps[r], vec![(r, 1.0)]),
                _ => (&mean_rates, weights.iter().copied().enumerate().collect()),
            };
            for &site in kept {
                let values = rates.site_values(site, CurveKind::Rate, time);
                for (m, (imt, levels)) in imtls.iter().enumerate() {
                    let curve = &values[imtls.offset(m)..imtls.offset(m) + levels.len()];
                    let mut requests: Vec<(Option<f64>, HazardResult<f64>)> = disagg
                        .poes_disagg
                        .iter()
                        .map(|&p| (Some(p), invert_curve(levels, curve, p, CurveKind::Rate, time)))
                        .collect();
                    if let Some(&iml) = disagg.iml_disagg.get(&imt) {
                        requests.push((None, check_iml_in_range(levels, iml)));
                    }
                    for (poe, iml) in requests {
                        match iml {
                            Ok(iml) => targets.push(DisaggTarget {
                                site,
                                imt: m,
                                statistic: stat,
                                poe,
                                iml,
                                members: members.clone(),
                            }),
                            Err(e) => {
                                failures.push(self.site_failure(site, imt, e)?);
                            }
                        }
                    }
                }
            }
        }
        log::debug!("{} disaggregation targets", targets.len());

        let matrices: Vec<HazardResult<DisaggMatrix>> = targets
            .par_iter()
            .map(|t| self.disaggregate(setup, disagg, bins, t))
            .collect();

        let mut results = Vec::with_capacity(targets.len());
        for (target, matrix) in targets.iter().zip(matrices) {
            let site_id = self.config.sites[target.site].id;
            let imt = imtls.imt_at(target.imt);
            match matrix {
                Ok(matrix) => results.push(DisaggResult {
                    site_id,
                    imt,
                    statistic: target.statistic,
                    poe: target.poe,
                    iml: target.iml,
                    investigation_time: time,
                    matrix,
                }),
                Err(e) => failures.push(self.site_failure(target.site, imt, e)?),
            }
        }
        Ok((results, failures))
    }

    /// Record a site-local error, or propagate it when strict or fatal.
    fn site_failure(&self, site: usize, imt: Imt, err: HazardError) -> HazardResult<SiteFailure> {
        if !err.is_site_local() || self.config.strict {
            return Err(err);
        }
        let id = self.config.sites[site].id;
        log::warn!("site {id} {imt}: {err}");
        Ok(SiteFailure::new(id, Some(imt), &err))
    }

    fn disaggregate(
        &self,
        setup: &Setup,
        disagg: &DisaggConfig,
        bins: &DisaggBins,
        target: &DisaggTarget,
    ) -> HazardResult<DisaggMatrix> {
        let site = &self.config.sites[target.site];
        let imt = setup.imts[target.imt];
        let ln_iml = target.iml.ln();
        let time = self.config.investigation_time;
        let disc = &self.config.discretization;
        let mut total = DisaggMatrix::new(bins.shape());

        for &(r, weight) in &target.members {
            if self.cancel.is_cancelled() {
                return Err(HazardError::Cancelled);
            }
            let rlz = &setup.rlzs.realizations[r];
            let model = setup.rlzs.model_of(rlz);
            let mut matrix = DisaggMatrix::new(bins.shape());
            for source in &model.model.sources {
                let (Some(trt), Some(&g)) =
                    (setup.trts.get(&source.trt), rlz.gmm_branches.get(&source.trt))
                else {
                    continue;
                };
                if source.min_distance_bound(&site.location, disc) > trt.maximum_distance {
                    continue;
                }
                let Some(s) = bins.source_index(&source.id) else {
                    continue;
                };
                let gmm = self.tree.gmm(&source.trt, g).ok_or_else(|| {
                    HazardError::config(format!("no GMM branch {g} for '{}'", source.trt))
                })?;
                let evaluator = GmEvaluator::new(gmm, vec![imt], trt.maximum_distance)
                    .with_metric(DistanceMetric::Rjb);
                for rupture in source.iter_ruptures(disc, trt.minimum_magnitude)? {
                    let Some(eval) = evaluator.evaluate(&rupture, site)? else {
                        continue;
                    };
                    let pred = eval.predictions[0];
                    let p = poe(ln_iml, pred.mean, pred.total, setup.truncation);
                    if p <= 0.0 {
                        continue;
                    }
                    let contribution = Contribution {
                        mag: rupture.mag,
                        rjb: eval.distances.get(DistanceMetric::Rjb).unwrap_or(eval.distances.rrup),
                        source: s,
                        rate: occurrence_rate(&rupture.occurrence, p, time),
                        epsilon: (pred.total > 0.0).then(|| epsilon(ln_iml, pred.mean, pred.total)),
                    };
                    matrix.accumulate(bins, setup.truncation, disagg.epsilon_star, &contribution);
                }
            }
            total.merge_scaled(&matrix, weight);
        }

        if total.total() <= 0.0 {
            return Err(HazardError::domain(format!(
                "zero total rate at {imt} = {} for site {}",
                target.iml, site.id
            )));
        }
        Ok(total)
    }
}

/// Rate contributed by one rupture whose ground motion exceeds a level
/// with probability `poe` per occurrence.
fn occurrence_rate(occurrence: &TemporalOccurrence, poe: f64, time: f64) -> f64 {
    match occurrence {
        TemporalOccurrence::Poisson { annual_rate } => annual_rate * poe,
        TemporalOccurrence::NonParametric { probs_occur } => {
            equivalent_rate(probs_occur, poe, time)
        }
    }
}

fn check_iml_in_range(levels: &[f64], iml: f64) -> HazardResult<f64> {
    let (lo, hi) = (levels[0], levels[levels.len() - 1]);
    if iml < lo || iml > hi {
        return Err(HazardError::domain(format!(
            "target level {iml} lies outside the computed levels [{lo}, {hi}]"
        )));
    }
    Ok(iml)
}
