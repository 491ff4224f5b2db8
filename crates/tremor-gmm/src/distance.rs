// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Source-to-Site Distance Metrics
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use tremor_source::Rupture;
use tremor_types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Closest distance to the rupture surface.
    Rrup,
    /// Closest horizontal distance to the surface projection.
    Rjb,
    /// Distance to the hypocentre.
    Rhypo,
    /// Horizontal distance to the epicentre.
    Repi,
}

impl DistanceMetric {
    pub fn compute(&self, rupture: &Rupture, site: &Point) -> f64 {
        match self {
            DistanceMetric::Rrup => rupture.surface.min_distance(site),
            DistanceMetric::Rjb => rupture.surface.joyner_boore_distance(site),
            DistanceMetric::Rhypo => rupture.hypocenter.distance(site),
            DistanceMetric::Repi => rupture.hypocenter.epicentral_distance(site),
        }
    }
}

/// Distances between one rupture and one site. Rrup is always present
/// since it drives the maximum-distance cutoff; the others are filled
/// only when requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distances {
    pub rrup: f64,
    rjb: Option<f64>,
    rhypo: Option<f64>,
    repi: Option<f64>,
}

impl Distances {
    pub fn compute(rupture: &Rupture, site: &Point, metrics: &[DistanceMetric]) -> Self {
        let mut d = Self::from_rrup(DistanceMetric::Rrup.compute(rupture, site));
        d.complete(rupture, site, metrics);
        d
    }

    /// Only Rrup known; the rest are filled by [`Distances::complete`].
    pub fn from_rrup(rrup: f64) -> Self {
        Self {
            rrup,
            rjb: None,
            rhypo: None,
            repi: None,
        }
    }

    /// Compute every metric in `metrics` that is still missing.
    pub fn complete(&mut self, rupture: &Rupture, site: &Point, metrics: &[DistanceMetric]) {
        for metric in metrics {
            self.fill(*metric, rupture, site);
        }
    }

    fn fill(&mut self, metric: DistanceMetric, rupture: &Rupture, site: &Point) {
        let slot = match metric {
            DistanceMetric::Rrup => return,
            DistanceMetric::Rjb => &mut self.rjb,
            DistanceMetric::Rhypo => &mut self.rhypo,
            DistanceMetric::Repi => &mut self.repi,
        };
        if slot.is_none() {
            *slot = Some(metric.compute(rupture, site));
        }
    }

    /// The requested metric, or `None` if it was not computed.
    pub fn get(&self, metric: DistanceMetric) -> Option<f64> {
        match metric {
            DistanceMetric::Rrup => Some(self.rrup),
            DistanceMetric::Rjb => self.rjb,
            DistanceMetric::Rhypo => self.rhypo,
            DistanceMetric::Repi => self.repi,
        }
    }
}
