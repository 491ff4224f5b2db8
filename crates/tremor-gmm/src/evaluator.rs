// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Ground-Motion Evaluator
// ─────────────────────────────────────────────────────────────────────
//! Binds a ground-motion model to a maximum-distance cutoff and the list
//! of IMTs a calculation needs, and evaluates rupture/site pairs.

use tremor_source::Rupture;
use tremor_types::{HazardResult, Imt, Site};

use crate::distance::{DistanceMetric, Distances};
use crate::models::{GmPrediction, GroundMotionModel};

/// Predictions for one rupture at one site, one entry per IMT.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub distances: Distances,
    pub predictions: Vec<GmPrediction>,
}

#[derive(Debug, Clone)]
pub struct GmEvaluator<'a> {
    gmm: &'a GroundMotionModel,
    imts: Vec<Imt>,
    maximum_distance: f64,
    metrics: Vec<DistanceMetric>,
}

impl<'a> GmEvaluator<'a> {
    pub fn new(gmm: &'a GroundMotionModel, imts: Vec<Imt>, maximum_distance: f64) -> Self {
        Self {
            gmm,
            imts,
            maximum_distance,
            metrics: gmm.required_distances(),
        }
    }

    /// Also compute `metric` even if the model does not use it.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        if !self.metrics.contains(&metric) {
            self.metrics.push(metric);
        }
        self
    }

    pub fn gmm(&self) -> &GroundMotionModel {
        self.gmm
    }

    pub fn imts(&self) -> &[Imt] {
        &self.imts
    }

    /// `None` when the rupture lies beyond the maximum distance (Rrup)
    /// and therefore contributes nothing at this site.
    pub fn evaluate(&self, rupture: &Rupture, site: &Site) -> HazardResult<Option<Evaluation>> {
        let rrup = DistanceMetric::Rrup.compute(rupture, &site.location);
        if rrup > self.maximum_distance {
            return Ok(None);
        }
        let mut distances = Distances::from_rrup(rrup);
        distances.complete(rupture, &site.location, &self.metrics);
        let predictions = self
            .imts
            .iter()
            .map(|imt| self.gmm.mean_and_stddevs(rupture, site, &distances, *imt))
            .collect::<HazardResult<Vec<_>>>()?;
        Ok(Some(Evaluation {
            distances,
            predictions,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GmmKind;
    use tremor_source::Mesh;
    use tremor_types::{HazardError, Point};

    fn rupture() -> Rupture {
        let surface = Mesh::planar(Point::new(0.0, 0.0, 2.0), 0.0, 90.0, 10.0, 8.0, 2.0);
        let hypo = surface.middle_point();
        Rupture::poisson(6.0, 0.0, hypo, surface, 0.01)
    }

    #[test]
    fn test_cutoff_excludes_far_sites() {
        let gmm: GroundMotionModel = GmmKind::BooreEtAl1997.into();
        let ev = GmEvaluator::new(&gmm, vec![Imt::Pga, Imt::Sa(1.0)], 100.0);
        let near = Site::new(1, 0.2, 0.0, 760.0);
        let far = Site::new(2, 2.0, 0.0, 760.0);
        let hit = ev.evaluate(&rupture(), &near).unwrap().unwrap();
        assert_eq!(hit.predictions.len(), 2);
        assert!(ev.evaluate(&rupture(), &far).unwrap().is_none());
    }

    #[test]
    fn test_zero_maximum_distance() {
        let gmm = GroundMotionModel::fixed([(Imt::Pga, 0.1f64.ln(), 0.5)]);
        let ev = GmEvaluator::new(&gmm, vec![Imt::Pga], 0.0);
        let site = Site::new(1, 0.0, 0.0, 760.0);
        assert!(ev.evaluate(&rupture(), &site).unwrap().is_none());
    }

    #[test]
    fn test_extra_metric_is_computed() {
        let gmm = GroundMotionModel::fixed([(Imt::Pga, 0.1f64.ln(), 0.5)]);
        let ev = GmEvaluator::new(&gmm, vec![Imt::Pga], 200.0).with_metric(DistanceMetric::Rjb);
        let site = Site::new(1, 0.1, 0.0, 760.0);
        let e = ev.evaluate(&rupture(), &site).unwrap().unwrap();
        assert!(e.distances.get(DistanceMetric::Rjb).is_some());
    }

    #[test]
    fn test_distances_match_direct_computation() {
        let gmm: GroundMotionModel = GmmKind::BooreEtAl1997.into();
        let ev = GmEvaluator::new(&gmm, vec![Imt::Pga], 200.0);
        let site = Site::new(1, 0.15, 0.02, 760.0);
        let e = ev.evaluate(&rupture(), &site).unwrap().unwrap();
        let direct = Distances::compute(&rupture(), &site.location, &[DistanceMetric::Rjb]);
        assert_eq!(e.distances, direct);
    }

    #[test]
    fn test_unsupported_imt_is_error() {
        let gmm: GroundMotionModel = GmmKind::BooreEtAl1997.into();
        let ev = GmEvaluator::new(&gmm, vec![Imt::Pgv], 200.0);
        let site = Site::new(1, 0.1, 0.0, 760.0);
        let err = ev.evaluate(&rupture(), &site).unwrap_err();
        assert!(matches!(err, HazardError::Configuration(_)));
    }
}
