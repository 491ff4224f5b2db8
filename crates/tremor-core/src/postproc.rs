// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Hazard Maps and Uniform Hazard Spectra
// ─────────────────────────────────────────────────────────────────────
//! Hazard maps invert each curve at fixed probabilities of exceedance.
//! Uniform hazard spectra collect the map values of the spectral IMTs of
//! one site, ordered by period.

use serde::Serialize;

use tremor_types::{
    locate_on_curve, CurveKind, CurveLookup, HazardCurve, HazardError, HazardResult, Imt,
};

use crate::exceedance::poe_to_rate;
use crate::stats::Statistic;

/// IML at which a curve reaches `poe`. A poe above the curve maximum
/// maps to 0; one below the smallest positive value maps to the highest
/// level.
pub fn hazard_map_value(
    curve: &HazardCurve,
    poe: f64,
    kind: CurveKind,
    investigation_time: f64,
) -> f64 {
    let target = match kind {
        CurveKind::Probability => poe,
        CurveKind::Rate => poe_to_rate(poe, investigation_time),
    };
    match locate_on_curve(&curve.imls, &curve.values, target) {
        CurveLookup::Found(iml) => iml,
        CurveLookup::AboveCurve { .. } => 0.0,
        CurveLookup::BelowCurve { .. } => curve.imls.last().copied().unwrap_or(0.0),
    }
}

/// Disaggregation target level at which a curve reaches `poe`. Unlike
/// a map value, a poe outside the curve's positive range has no level.
pub fn invert_curve(
    imls: &[f64],
    values: &[f64],
    poe: f64,
    kind: CurveKind,
    investigation_time: f64,
) -> HazardResult<f64> {
    let target = match kind {
        CurveKind::Probability => poe,
        CurveKind::Rate => poe_to_rate(poe, investigation_time),
    };
    match locate_on_curve(imls, values, target) {
        CurveLookup::Found(iml) => Ok(iml),
        CurveLookup::AboveCurve { max } => Err(HazardError::domain(format!(
            "poe {poe} exceeds the curve maximum {max:e}"
        ))),
        CurveLookup::BelowCurve { min } => Err(HazardError::domain(format!(
            "poe {poe} is below the curve minimum {min:e}"
        ))),
    }
}

/// Map values of one statistic for one IMT and poe, one per site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardMap {
    pub statistic: Statistic,
    pub imt: Imt,
    pub poe: f64,
    pub site_ids: Vec<u32>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformHazardSpectrum {
    pub statistic: Statistic,
    pub site_id: u32,
    pub poe: f64,
    pub periods: Vec<f64>,
    pub values: Vec<f64>,
}

/// Hazard maps for every (IMT, poe) from per-site curve sets.
/// `site_curves[i]` holds the curves of site `site_ids[i]`, one per IMT
/// in the same order for every site.
pub fn hazard_maps(
    statistic: Statistic,
    site_ids: &[u32],
    site_curves: &[Vec<HazardCurve>],
    poes: &[f64],
    kind: CurveKind,
    investigation_time: f64,
) -> Vec<HazardMap> {
    let Some(first) = site_curves.first() else {
        return Vec::new();
    };
    let mut maps = Vec::with_capacity(first.len() * poes.len());
    for (m, template) in first.iter().enumerate() {
        for &poe in poes {
            let values = site_curves
                .iter()
                .map(|curves| hazard_map_value(&curves[m], poe, kind, investigation_time))
                .collect();
            maps.push(HazardMap {
                statistic,
                imt: template.imt,
                poe,
                site_ids: site_ids.to_vec(),
                values,
            });
        }
    }
    maps
}

/// Uniform hazard spectra from hazard maps: for each site and poe, the
/// PGA and SA values ordered by period.
pub fn uniform_hazard_spectra(maps: &[HazardMap], poes: &[f64]) -> Vec<UniformHazardSpectrum> {
    let Some(first) = maps.first() else {
        return Vec::new();
    };
    let mut spectral: Vec<&HazardMap> = maps.iter().filter(|m| m.imt.is_spectral()).collect();
    spectral.sort_by(|a, b| a.imt.cmp(&b.imt));
    let mut out = Vec::new();
    for (s, &site_id) in first.site_ids.iter().enumerate() {
        for &poe in poes {
            let (periods, values): (Vec<f64>, Vec<f64>) = spectral
                .iter()
                .filter(|m| m.poe == poe)
                .filter_map(|m| m.imt.period().map(|t| (t, m.values[s])))
                .unzip();
            out.push(UniformHazardSpectrum {
                statistic: first.statistic,
                site_id,
                poe,
                periods,
                values,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(imt: Imt, values: Vec<f64>) -> HazardCurve {
        HazardCurve::new(imt, vec![0.01, 0.1, 1.0], values)
    }

    #[test]
    fn test_map_value_interpolates() {
        let c = curve(Imt::Pga, vec![0.1, 0.01, 0.001]);
        let v = hazard_map_value(&c, 10f64.powf(-1.5), CurveKind::Probability, 50.0);
        assert!((v - 10f64.powf(-1.5)).abs() < 1e-12, "v={v}");
    }

    #[test]
    fn test_map_value_out_of_range() {
        let c = curve(Imt::Pga, vec![0.1, 0.01, 0.001]);
        assert_eq!(hazard_map_value(&c, 0.5, CurveKind::Probability, 50.0), 0.0);
        assert_eq!(hazard_map_value(&c, 1e-6, CurveKind::Probability, 50.0), 1.0);
        let zero = curve(Imt::Pga, vec![0.0; 3]);
        assert_eq!(hazard_map_value(&zero, 0.1, CurveKind::Probability, 50.0), 0.0);
    }

    #[test]
    fn test_map_value_on_rate_curve() {
        let time = 50.0;
        let rates: Vec<f64> = [0.1, 0.01, 0.001].iter().map(|p| poe_to_rate(*p, time)).collect();
        let c = curve(Imt::Pga, rates);
        let v = hazard_map_value(&c, 0.01, CurveKind::Rate, time);
        assert!((v - 0.1).abs() < 1e-9, "v={v}");
    }

    #[test]
    fn test_invert_curve_outside_domain() {
        let c = curve(Imt::Pga, vec![0.1, 0.01, 0.0]);
        let iml = invert_curve(&c.imls, &c.values, 0.01, CurveKind::Probability, 1.0).unwrap();
        assert_eq!(iml, 0.1);
        for poe in [0.5, 0.001] {
            let err =
                invert_curve(&c.imls, &c.values, poe, CurveKind::Probability, 1.0).unwrap_err();
            assert!(matches!(err, HazardError::NumericalDomain(_)), "{err}");
        }
    }

    #[test]
    fn test_uhs_ordered_by_period() {
        let site_curves = vec![vec![
            curve(Imt::Sa(1.0), vec![0.05, 0.005, 0.0005]),
            curve(Imt::Pga, vec![0.1, 0.01, 0.001]),
            curve(Imt::Pgv, vec![0.1, 0.01, 0.001]),
        ]];
        let kind = CurveKind::Probability;
        let maps = hazard_maps(Statistic::Mean, &[7], &site_curves, &[0.01], kind, 50.0);
        assert_eq!(maps.len(), 3);
        let uhs = uniform_hazard_spectra(&maps, &[0.01]);
        assert_eq!(uhs.len(), 1);
        assert_eq!(uhs[0].site_id, 7);
        assert_eq!(uhs[0].periods, vec![0.0, 1.0]);
        assert!((uhs[0].values[0] - 0.1).abs() < 1e-12);
        // SA(1.0) falls from 0.05 to 0.005 over 0.01..0.1 g: poe 0.01 sits
        // at 0.05 g on the log-log curve
        assert!((uhs[0].values[1] - 0.05).abs() < 1e-9, "{:?}", uhs[0].values);
    }
}
