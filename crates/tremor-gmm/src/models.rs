// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Ground-Motion Models
// ─────────────────────────────────────────────────────────────────────
//! The closed set of ground-motion models. Every model maps a rupture,
//! a site and its distances to the natural-log mean and standard
//! deviations of an intensity measure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tremor_source::Rupture;
use tremor_types::{HazardError, HazardResult, Imt, Site, SiteParam};

use crate::component::HorizontalComponent;
use crate::distance::{DistanceMetric, Distances};

/// Log-space ground-motion prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GmPrediction {
    /// Mean of ln(IML).
    pub mean: f64,
    /// Total standard deviation.
    pub total: f64,
    /// Between-event standard deviation.
    pub inter: f64,
    /// Within-event standard deviation.
    pub intra: f64,
}

impl GmPrediction {
    pub fn from_components(mean: f64, inter: f64, intra: f64) -> Self {
        Self {
            mean,
            total: (inter * inter + intra * intra).sqrt(),
            inter,
            intra,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.total.is_finite() && self.total >= 0.0
    }
}

/// Constant prediction for one IMT.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedMotion {
    /// Mean of ln(IML).
    pub mean: f64,
    pub sigma: f64,
}

/// Coefficients of the generic functional form
/// `c0 + c1(M-6) + c2(M-6)² + c3 ln√(R²+h²) + c4 R + c5 ln(Vs30/760) + c6 ln(z2.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenericCoefficients {
    pub c0: f64,
    pub c1: f64,
    #[serde(default)]
    pub c2: f64,
    pub c3: f64,
    #[serde(default)]
    pub c4: f64,
    #[serde(default)]
    pub c5: f64,
    #[serde(default)]
    pub c6: f64,
    pub h: f64,
    /// Between-event σ.
    pub tau: f64,
    /// Within-event σ.
    pub phi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum GmmKind {
    /// Rupture-independent prediction per IMT.
    Fixed { motions: BTreeMap<Imt, FixedMotion> },
    /// Boore, Joyner & Fumal (1997), shallow crustal earthquakes.
    BooreEtAl1997,
    /// Generic attenuation form with user coefficients per IMT.
    GenericAttenuation {
        distance: DistanceMetric,
        coefficients: BTreeMap<Imt, GenericCoefficients>,
    },
}

/// A ground-motion model together with the horizontal-component
/// convention its predictions are reported in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundMotionModel {
    #[serde(flatten)]
    pub kind: GmmKind,
    #[serde(default)]
    pub component: HorizontalComponent,
}

impl From<GmmKind> for GroundMotionModel {
    fn from(kind: GmmKind) -> Self {
        Self {
            kind,
            component: HorizontalComponent::GeometricMean,
        }
    }
}

impl GroundMotionModel {
    pub fn fixed(motions: impl IntoIterator<Item = (Imt, f64, f64)>) -> Self {
        let motions = motions
            .into_iter()
            .map(|(imt, mean, sigma)| (imt, FixedMotion { mean, sigma }))
            .collect();
        GmmKind::Fixed { motions }.into()
    }

    pub fn with_component(mut self, component: HorizontalComponent) -> Self {
        self.component = component;
        self
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            GmmKind::Fixed { .. } => "Fixed",
            GmmKind::BooreEtAl1997 => "BooreEtAl1997",
            GmmKind::GenericAttenuation { .. } => "GenericAttenuation",
        }
    }

    pub fn validate(&self) -> HazardResult<()> {
        match &self.kind {
            GmmKind::Fixed { motions } => {
                if motions.is_empty() {
                    return Err(HazardError::config("fixed GMM defines no IMTs"));
                }
                if let Some((imt, m)) = motions
                    .iter()
                    .find(|(_, m)| !(m.mean.is_finite() && m.sigma.is_finite() && m.sigma >= 0.0))
                {
                    return Err(HazardError::config(format!(
                        "fixed GMM motion for {imt} is invalid: mean {} sigma {}",
                        m.mean, m.sigma
                    )));
                }
            }
            GmmKind::BooreEtAl1997 => {}
            GmmKind::GenericAttenuation { coefficients, .. } => {
                if coefficients.is_empty() {
                    return Err(HazardError::config("generic GMM defines no IMTs"));
                }
                for (imt, c) in coefficients {
                    if !(c.tau >= 0.0 && c.phi >= 0.0 && c.h >= 0.0) {
                        return Err(HazardError::config(format!(
                            "generic GMM coefficients for {imt} need tau, phi, h >= 0"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn required_distances(&self) -> Vec<DistanceMetric> {
        match &self.kind {
            GmmKind::Fixed { .. } => Vec::new(),
            GmmKind::BooreEtAl1997 => vec![DistanceMetric::Rjb],
            GmmKind::GenericAttenuation { distance, .. } => vec![*distance],
        }
    }

    pub fn required_site_params(&self) -> Vec<SiteParam> {
        match &self.kind {
            GmmKind::Fixed { .. } => Vec::new(),
            GmmKind::BooreEtAl1997 => vec![SiteParam::Vs30],
            GmmKind::GenericAttenuation { coefficients, .. } => {
                let mut params = vec![SiteParam::Vs30];
                if coefficients.values().any(|c| c.c6 != 0.0) {
                    params.push(SiteParam::Z2pt5);
                }
                params
            }
        }
    }

    pub fn supports(&self, imt: Imt) -> bool {
        match &self.kind {
            GmmKind::Fixed { motions } => motions.contains_key(&imt),
            GmmKind::BooreEtAl1997 => bjf97_coefficients(imt).is_some(),
            GmmKind::GenericAttenuation { coefficients, .. } => coefficients.contains_key(&imt),
        }
    }

    /// Mean and standard deviations for `imt`, in the model's
    /// horizontal-component convention.
    pub fn mean_and_stddevs(
        &self,
        rupture: &Rupture,
        site: &Site,
        distances: &Distances,
        imt: Imt,
    ) -> HazardResult<GmPrediction> {
        let base = match &self.kind {
            GmmKind::Fixed { motions } => motions
                .get(&imt)
                .map(|m| GmPrediction::from_components(m.mean, 0.0, m.sigma)),
            GmmKind::BooreEtAl1997 => bjf97_coefficients(imt)
                .map(|c| {
                    required(distances, DistanceMetric::Rjb)
                        .map(|rjb| c.predict(rupture, site, rjb))
                })
                .transpose()?,
            GmmKind::GenericAttenuation {
                distance,
                coefficients,
            } => match coefficients.get(&imt) {
                Some(c) => {
                    let r = required(distances, *distance)?;
                    Some(generic_predict(c, rupture, site, r)?)
                }
                None => None,
            },
        }
        .ok_or_else(|| HazardError::config(format!("{} does not support {imt}", self.name())))?;

        let (ln_ratio, ratio_sigma) = self.component.conversion(imt);
        let pred = GmPrediction::from_components(
            base.mean + ln_ratio,
            base.inter,
            (base.intra * base.intra + ratio_sigma * ratio_sigma).sqrt(),
        );
        if !pred.is_finite() {
            return Err(HazardError::domain(format!(
                "{} produced a non-finite prediction for {imt} at site {} (M{:.2})",
                self.name(),
                site.id,
                rupture.mag
            )));
        }
        Ok(pred)
    }
}

fn required(distances: &Distances, metric: DistanceMetric) -> HazardResult<f64> {
    distances
        .get(metric)
        .ok_or_else(|| HazardError::domain(format!("distance {metric:?} was not computed")))
}

fn generic_predict(
    c: &GenericCoefficients,
    rupture: &Rupture,
    site: &Site,
    r: f64,
) -> HazardResult<GmPrediction> {
    let dm = rupture.mag - 6.0;
    let mut mean = c.c0
        + c.c1 * dm
        + c.c2 * dm * dm
        + c.c3 * (r * r + c.h * c.h).sqrt().ln()
        + c.c4 * r
        + c.c5 * (site.vs30 / 760.0).ln();
    if c.c6 != 0.0 {
        let z = site
            .z2pt5
            .ok_or_else(|| HazardError::config(format!("site {} lacks z2pt5", site.id)))?;
        mean += c.c6 * z.ln();
    }
    Ok(GmPrediction::from_components(mean, c.tau, c.phi))
}

/// One row of the BJF97 coefficient table.
#[derive(Debug, Clone, Copy)]
struct Bjf97 {
    b1_ss: f64,
    b1_rv: f64,
    b1_all: f64,
    b2: f64,
    b3: f64,
    b5: f64,
    bv: f64,
    va: f64,
    h: f64,
    sigma1: f64,
    sigma_c: f64,
    sigma_e: f64,
}

impl Bjf97 {
    fn predict(&self, rupture: &Rupture, site: &Site, rjb: f64) -> GmPrediction {
        let b1 = match faulting_style(rupture.rake) {
            Faulting::StrikeSlip => self.b1_ss,
            Faulting::Reverse => self.b1_rv,
            Faulting::Other => self.b1_all,
        };
        let dm = rupture.mag - 6.0;
        let r = (rjb * rjb + self.h * self.h).sqrt();
        let mean = b1
            + self.b2 * dm
            + self.b3 * dm * dm
            + self.b5 * r.ln()
            + self.bv * (site.vs30 / self.va).ln();
        let intra = (self.sigma1 * self.sigma1 + self.sigma_c * self.sigma_c).sqrt();
        GmPrediction::from_components(mean, self.sigma_e, intra)
    }
}

enum Faulting {
    StrikeSlip,
    Reverse,
    Other,
}

fn faulting_style(rake: f64) -> Faulting {
    if rake.abs() <= 30.0 || rake.abs() >= 150.0 {
        Faulting::StrikeSlip
    } else if rake > 30.0 && rake < 150.0 {
        Faulting::Reverse
    } else {
        Faulting::Other
    }
}

#[rustfmt::skip]
const BJF97_TABLE: [(f64, Bjf97); 7] = [
    (0.0, Bjf97 { b1_ss: -0.313, b1_rv: -0.117, b1_all: -0.242, b2: 0.527, b3:  0.000, b5: -0.778, bv: -0.371, va: 1396.0, h: 5.57, sigma1: 0.431, sigma_c: 0.160, sigma_e: 0.184 }),
    (0.1, Bjf97 { b1_ss:  1.006, b1_rv:  1.087, b1_all:  1.059, b2: 0.753, b3: -0.226, b5: -0.934, bv: -0.212, va: 1112.0, h: 6.27, sigma1: 0.440, sigma_c: 0.134, sigma_e: 0.000 }),
    (0.2, Bjf97 { b1_ss:  0.999, b1_rv:  1.170, b1_all:  1.089, b2: 0.711, b3: -0.207, b5: -0.924, bv: -0.292, va: 2118.0, h: 7.02, sigma1: 0.474, sigma_c: 0.132, sigma_e: 0.000 }),
    (0.3, Bjf97 { b1_ss:  0.598, b1_rv:  0.803, b1_all:  0.700, b2: 0.769, b3: -0.161, b5: -0.893, bv: -0.401, va: 2133.0, h: 5.94, sigma1: 0.495, sigma_c: 0.148, sigma_e: 0.000 }),
    (0.5, Bjf97 { b1_ss: -0.136, b1_rv:  0.059, b1_all: -0.067, b2: 0.876, b3: -0.098, b5: -0.854, bv: -0.577, va: 1782.0, h: 4.13, sigma1: 0.521, sigma_c: 0.183, sigma_e: 0.000 }),
    (1.0, Bjf97 { b1_ss: -1.133, b1_rv: -1.009, b1_all: -1.080, b2: 1.036, b3: -0.032, b5: -0.798, bv: -0.698, va: 1406.0, h: 2.90, sigma1: 0.530, sigma_c: 0.225, sigma_e: 0.000 }),
    (2.0, Bjf97 { b1_ss: -1.699, b1_rv: -1.801, b1_all: -1.743, b2: 1.085, b3: -0.085, b5: -0.812, bv: -0.655, va: 1795.0, h: 5.85, sigma1: 0.562, sigma_c: 0.286, sigma_e: 0.000 }),
];

fn bjf97_coefficients(imt: Imt) -> Option<Bjf97> {
    let period = match imt {
        Imt::Pga => 0.0,
        Imt::Sa(t) => t,
        Imt::Pgv => return None,
    };
    BJF97_TABLE
        .iter()
        .find(|(t, _)| (t - period).abs() < 1e-9)
        .map(|(_, c)| *c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tremor_source::Mesh;
    use tremor_types::Point;

    fn rupture(mag: f64, rake: f64) -> Rupture {
        let surface = Mesh::planar(Point::new(0.0, 0.0, 0.0), 0.0, 90.0, 10.0, 10.0, 2.0);
        let hypo = surface.middle_point();
        Rupture::poisson(mag, rake, hypo, surface, 0.01)
    }

    fn at_rjb(rup: &Rupture, rjb: f64) -> (Site, Distances) {
        let (lon, lat) = tremor_types::geo::point_at(0.0, 0.0, 270.0, rjb);
        let site = Site::new(1, lon, lat, 760.0);
        let d = Distances::compute(rup, &site.location, &[DistanceMetric::Rjb]);
        (site, d)
    }

    #[test]
    fn test_fixed_model() {
        let gmm = GroundMotionModel::fixed([(Imt::Pga, 0.1f64.ln(), 0.5)]);
        let rup = rupture(6.0, 0.0);
        let (site, d) = at_rjb(&rup, 10.0);
        let p = gmm.mean_and_stddevs(&rup, &site, &d, Imt::Pga).unwrap();
        assert!((p.mean - 0.1f64.ln()).abs() < 1e-12);
        assert!((p.total - 0.5).abs() < 1e-12);
        assert!(gmm.mean_and_stddevs(&rup, &site, &d, Imt::Pgv).is_err());
    }

    #[test]
    fn test_bjf97_pga_reference_value() {
        let gmm: GroundMotionModel = GmmKind::BooreEtAl1997.into();
        let rup = rupture(6.0, 0.0);
        let (site, d) = at_rjb(&rup, 10.0);
        let p = gmm.mean_and_stddevs(&rup, &site, &d, Imt::Pga).unwrap();
        let rjb = d.get(DistanceMetric::Rjb).unwrap();
        let expected = -0.313 - 0.778 * (rjb * rjb + 5.57f64 * 5.57).sqrt().ln()
            - 0.371 * (760.0f64 / 1396.0).ln();
        assert!((p.mean - expected).abs() < 1e-12, "mean={} expected={expected}", p.mean);
        let sigma = (0.431f64.powi(2) + 0.160f64.powi(2) + 0.184f64.powi(2)).sqrt();
        assert!((p.total - sigma).abs() < 1e-12);
    }

    #[test]
    fn test_bjf97_attenuates_and_scales() {
        let gmm: GroundMotionModel = GmmKind::BooreEtAl1997.into();
        let small = rupture(5.5, 0.0);
        let large = rupture(7.0, 0.0);
        let (near, d_near) = at_rjb(&small, 5.0);
        let (far, d_far) = at_rjb(&small, 50.0);
        let imt = Imt::Sa(1.0);
        let m_near = gmm.mean_and_stddevs(&small, &near, &d_near, imt).unwrap().mean;
        let m_far = gmm.mean_and_stddevs(&small, &far, &d_far, imt).unwrap().mean;
        assert!(m_near > m_far);
        let m_large = gmm.mean_and_stddevs(&large, &near, &d_near, imt).unwrap().mean;
        assert!(m_large > m_near);
        assert!(!gmm.supports(Imt::Sa(0.75)));
    }

    #[test]
    fn test_max_direction_raises_mean_and_sigma() {
        let gm: GroundMotionModel = GmmKind::BooreEtAl1997.into();
        let md = gm.clone().with_component(HorizontalComponent::MaxDirection);
        let rup = rupture(6.5, 90.0);
        let (site, d) = at_rjb(&rup, 20.0);
        let a = gm.mean_and_stddevs(&rup, &site, &d, Imt::Sa(0.2)).unwrap();
        let b = md.mean_and_stddevs(&rup, &site, &d, Imt::Sa(0.2)).unwrap();
        assert!((b.mean - a.mean - 1.21f64.ln()).abs() < 1e-12);
        assert!(b.total > a.total);
    }

    #[test]
    fn test_generic_requires_z2pt5() {
        let mut coefficients = BTreeMap::new();
        coefficients.insert(
            Imt::Pga,
            GenericCoefficients {
                c0: 1.0,
                c1: 0.5,
                c2: 0.0,
                c3: -1.0,
                c4: -0.002,
                c5: -0.4,
                c6: 0.1,
                h: 6.0,
                tau: 0.3,
                phi: 0.5,
            },
        );
        let gmm: GroundMotionModel = GmmKind::GenericAttenuation {
            distance: DistanceMetric::Rrup,
            coefficients,
        }
        .into();
        assert_eq!(gmm.required_site_params(), vec![SiteParam::Vs30, SiteParam::Z2pt5]);
        let rup = rupture(6.0, 0.0);
        let (mut site, d) = at_rjb(&rup, 10.0);
        assert!(gmm.mean_and_stddevs(&rup, &site, &d, Imt::Pga).is_err());
        site.z2pt5 = Some(1.0);
        let p = gmm.mean_and_stddevs(&rup, &site, &d, Imt::Pga).unwrap();
        assert!((p.total - (0.09f64 + 0.25).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_serde_tagged() {
        let gmm = GroundMotionModel::fixed([(Imt::Sa(1.0), -2.0, 0.6)])
            .with_component(HorizontalComponent::MaxDirection);
        let json = serde_json::to_string(&gmm).unwrap();
        assert!(json.contains("\"model\":\"fixed\""));
        assert!(json.contains("SA(1.0)"));
        let back: GroundMotionModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, gmm);
    }
}
