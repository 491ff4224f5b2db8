// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Calculation Outputs
// ─────────────────────────────────────────────────────────────────────
//! Write-once results of a hazard calculation, serializable for the
//! collaborators that store or render them.

use std::collections::BTreeMap;

use serde::Serialize;

use tremor_types::{CurveKind, HazardCurve, HazardError, Imt};

use crate::disagg::{DisaggBins, DisaggMatrix};
use crate::postproc::{HazardMap, UniformHazardSpectrum};
use crate::stats::Statistic;

/// Curves of one site, one per IMT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteCurves {
    pub site_id: u32,
    pub curves: Vec<HazardCurve>,
}

/// Every site's curves for one statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveSet {
    pub statistic: Statistic,
    pub kind: CurveKind,
    pub sites: Vec<SiteCurves>,
}

impl CurveSet {
    pub fn site(&self, site_id: u32) -> Option<&SiteCurves> {
        self.sites.iter().find(|s| s.site_id == site_id)
    }

    pub fn curve(&self, site_id: u32, imt: Imt) -> Option<&HazardCurve> {
        self.site(site_id)
            .and_then(|s| s.curves.iter().find(|c| c.imt == imt))
    }
}

/// Descriptor of one realization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealizationInfo {
    pub ordinal: usize,
    pub weight: f64,
    pub source_model_path: Vec<String>,
    pub gmm_path: BTreeMap<String, String>,
}

/// Disaggregation of one (site, IMT, target) triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisaggResult {
    pub site_id: u32,
    pub imt: Imt,
    pub statistic: Statistic,
    /// Poe the target level was obtained from, if not given directly.
    pub poe: Option<f64>,
    pub iml: f64,
    pub investigation_time: f64,
    pub matrix: DisaggMatrix,
}

impl DisaggResult {
    pub fn total_rate(&self) -> f64 {
        self.matrix.total()
    }

    /// Bin probabilities of exceedance over the investigation time.
    pub fn probabilities(&self) -> DisaggMatrix {
        self.matrix.to_probability(self.investigation_time)
    }

    /// Rate shares per magnitude bin.
    pub fn mag_fractions(&self) -> Vec<f64> {
        normalize(self.matrix.magnitude())
    }

    pub fn dist_fractions(&self) -> Vec<f64> {
        normalize(self.matrix.distance())
    }

    pub fn eps_fractions(&self) -> Vec<f64> {
        normalize(self.matrix.epsilon())
    }

    pub fn trt_fractions(&self, bins: &DisaggBins) -> Vec<f64> {
        normalize(self.matrix.trt(bins))
    }
}

fn normalize(values: Vec<f64>) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return values;
    }
    values.into_iter().map(|v| v / total).collect()
}

/// A site (and IMT, when known) whose outputs were dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteFailure {
    pub site_id: u32,
    pub imt: Option<Imt>,
    pub message: String,
}

impl SiteFailure {
    pub fn new(site_id: u32, imt: Option<Imt>, error: &HazardError) -> Self {
        Self {
            site_id,
            imt,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardOutput {
    pub realizations: Vec<RealizationInfo>,
    pub sampled: bool,
    /// Per-realization curves, when requested.
    pub individual: Vec<CurveSet>,
    pub mean: Option<CurveSet>,
    pub quantiles: Vec<CurveSet>,
    pub hazard_maps: Vec<HazardMap>,
    pub uniform_hazard_spectra: Vec<UniformHazardSpectrum>,
    pub disagg_bins: Option<DisaggBins>,
    pub disaggregation: Vec<DisaggResult>,
    pub failures: Vec<SiteFailure>,
}

impl HazardOutput {
    pub fn is_failed(&self, site_id: u32) -> bool {
        self.failures.iter().any(|f| f.site_id == site_id)
    }

    pub fn quantile(&self, q: f64) -> Option<&CurveSet> {
        self.quantiles
            .iter()
            .find(|c| c.statistic == Statistic::Quantile(q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_lookup() {
        let set = CurveSet {
            statistic: Statistic::Mean,
            kind: CurveKind::Probability,
            sites: vec![SiteCurves {
                site_id: 4,
                curves: vec![HazardCurve::new(Imt::Pga, vec![0.1], vec![0.02])],
            }],
        };
        assert_eq!(set.curve(4, Imt::Pga).map(|c| c.values[0]), Some(0.02));
        assert!(set.curve(4, Imt::Pgv).is_none());
        assert!(set.curve(5, Imt::Pga).is_none());
    }

    #[test]
    fn test_failure_serializes() {
        let f = SiteFailure::new(9, Some(Imt::Sa(0.2)), &HazardError::domain("target below curve"));
        let json = serde_json::to_string(&f).unwrap();
        assert!(json.contains("SA(0.2)"), "{json}");
        assert!(json.contains("target below curve"), "{json}");
    }

    #[test]
    fn test_fractions_normalized() {
        let mut matrix = DisaggMatrix::new([2, 1, 1, 1]);
        matrix.add(0, 0, 0, 0, 1.0);
        matrix.add(1, 0, 0, 0, 3.0);
        let r = DisaggResult {
            site_id: 1,
            imt: Imt::Pga,
            statistic: Statistic::Realization(0),
            poe: None,
            iml: 0.1,
            investigation_time: 1.0,
            matrix,
        };
        assert_eq!(r.mag_fractions(), vec![0.25, 0.75]);
        assert_eq!(r.total_rate(), 4.0);
    }
}
