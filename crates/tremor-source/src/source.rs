// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Seismic Sources
// ─────────────────────────────────────────────────────────────────────
//! The closed set of source kinds and their lazy rupture enumeration.

use serde::{Deserialize, Serialize};

use tremor_types::{DiscretizationConfig, HazardError, HazardResult, Point};

use crate::fault::{CharacteristicSource, FaultGeometry, FaultSource, NonParametricSource};
use crate::mfd::Mfd;
use crate::point::{AreaSource, PointSource};
use crate::rupture::Rupture;

/// Boxed lazy rupture sequence of one source.
pub type RuptureIter<'a> = Box<dyn Iterator<Item = Rupture> + Send + 'a>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    Point(PointSource),
    Area(AreaSource),
    SimpleFault(FaultSource),
    ComplexFault(FaultSource),
    Characteristic(CharacteristicSource),
    NonParametric(NonParametricSource),
}

/// A seismic source: identity, tectonic region and kind-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicSource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Tectonic region type.
    pub trt: String,
    #[serde(flatten)]
    pub kind: SourceKind,
}

impl SeismicSource {
    pub fn new(id: impl Into<String>, trt: impl Into<String>, kind: SourceKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            trt: trt.into(),
            kind,
        }
    }

    pub fn validate(&self) -> HazardResult<()> {
        if self.id.is_empty() {
            return Err(HazardError::config("source id must not be empty"));
        }
        if self.trt.is_empty() {
            return Err(HazardError::config(format!(
                "source '{}' has no tectonic region type",
                self.id
            )));
        }
        let result = match &self.kind {
            SourceKind::Point(s) => s.validate(),
            SourceKind::Area(s) => s.validate(),
            SourceKind::SimpleFault(s) => match s.geometry {
                FaultGeometry::Simple { .. } => s.validate(),
                _ => Err(HazardError::config("simple fault requires a simple (trace) geometry")),
            },
            SourceKind::ComplexFault(s) => match s.geometry {
                FaultGeometry::Complex { .. } => s.validate(),
                _ => Err(HazardError::config("complex fault requires a complex (edges) geometry")),
            },
            SourceKind::Characteristic(s) => s.validate(),
            SourceKind::NonParametric(s) => s.validate(),
        };
        result.map_err(|e| match e {
            HazardError::Configuration(msg) => {
                HazardError::Configuration(format!("source '{}': {msg}", self.id))
            }
            other => other,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            SourceKind::Point(_) => "point",
            SourceKind::Area(_) => "area",
            SourceKind::SimpleFault(_) => "simple_fault",
            SourceKind::ComplexFault(_) => "complex_fault",
            SourceKind::Characteristic(_) => "characteristic",
            SourceKind::NonParametric(_) => "non_parametric",
        }
    }

    /// The MFD, absent for non-parametric sources.
    pub fn mfd(&self) -> Option<&Mfd> {
        match &self.kind {
            SourceKind::Point(s) => Some(&s.params.mfd),
            SourceKind::Area(s) => Some(&s.params.mfd),
            SourceKind::SimpleFault(s) | SourceKind::ComplexFault(s) => Some(&s.params.mfd),
            SourceKind::Characteristic(s) => Some(&s.mfd),
            SourceKind::NonParametric(_) => None,
        }
    }

    pub fn mfd_mut(&mut self) -> Option<&mut Mfd> {
        match &mut self.kind {
            SourceKind::Point(s) => Some(&mut s.params.mfd),
            SourceKind::Area(s) => Some(&mut s.params.mfd),
            SourceKind::SimpleFault(s) | SourceKind::ComplexFault(s) => Some(&mut s.params.mfd),
            SourceKind::Characteristic(s) => Some(&mut s.mfd),
            SourceKind::NonParametric(_) => None,
        }
    }

    /// Smallest and largest rupture magnitude.
    pub fn magnitude_range(&self, width_of_mfd_bin: f64) -> Option<(f64, f64)> {
        match &self.kind {
            SourceKind::NonParametric(s) => s.magnitude_range(),
            _ => self.mfd().and_then(|m| m.min_max_mag(width_of_mfd_bin)),
        }
    }

    /// Poisson rate of all ruptures at or above `min_mag`.
    pub fn total_rate(&self, disc: &DiscretizationConfig, min_mag: f64) -> f64 {
        self.mfd()
            .map(|m| {
                m.annual_occurrence_rates(disc.width_of_mfd_bin)
                    .iter()
                    .filter(|(mag, _)| *mag >= min_mag)
                    .map(|(_, r)| r)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// Lazily enumerates every rupture with magnitude >= `min_mag`. Each
    /// call restarts the sequence from the beginning.
    pub fn iter_ruptures(
        &self,
        disc: &DiscretizationConfig,
        min_mag: f64,
    ) -> HazardResult<RuptureIter<'_>> {
        let bins = |mfd: &Mfd| -> Vec<(f64, f64)> {
            mfd.annual_occurrence_rates(disc.width_of_mfd_bin)
                .into_iter()
                .filter(|(mag, rate)| *mag >= min_mag && *rate > 0.0)
                .collect()
        };
        let spacing = disc.rupture_mesh_spacing;
        let iter: RuptureIter<'_> = match &self.kind {
            SourceKind::Point(s) => {
                let loc = s.location;
                Box::new(s.params.ruptures_at(loc.lon, loc.lat, bins(&s.params.mfd), spacing))
            }
            SourceKind::Area(s) => Box::new(s.ruptures(
                bins(&s.params.mfd),
                disc.area_source_discretization,
                spacing,
            )),
            SourceKind::SimpleFault(s) | SourceKind::ComplexFault(s) => {
                Box::new(s.ruptures(bins(&s.params.mfd), spacing)?)
            }
            SourceKind::Characteristic(s) => Box::new(s.ruptures(bins(&s.mfd), spacing)?),
            SourceKind::NonParametric(s) => Box::new(s.ruptures(min_mag, spacing)?),
        };
        Ok(iter)
    }

    /// Lower bound (km) on the rupture distance from `site` to any
    /// rupture this source can generate, up to its largest magnitude.
    pub fn min_distance_bound(&self, site: &Point, disc: &DiscretizationConfig) -> f64 {
        let max_mag = self
            .magnitude_range(disc.width_of_mfd_bin)
            .map(|(_, hi)| hi)
            .unwrap_or(0.0);
        match &self.kind {
            SourceKind::Point(s) => s.min_distance_bound(site, max_mag),
            SourceKind::Area(s) => s.min_distance_bound(site, max_mag),
            SourceKind::SimpleFault(s) | SourceKind::ComplexFault(s) => {
                outline_bound(&s.geometry, site)
            }
            SourceKind::Characteristic(s) => outline_bound(&s.geometry, site),
            SourceKind::NonParametric(s) => s
                .ruptures
                .iter()
                .map(|r| outline_bound(&r.geometry, site))
                .fold(f64::INFINITY, f64::min),
        }
    }
}

/// Fault surfaces lie inside the convex region spanned by their outline
/// points; the distance to the nearest outline point minus the largest
/// gap between outline points bounds the distance from below.
fn outline_bound(geometry: &FaultGeometry, site: &Point) -> f64 {
    let pts = geometry.outline_points();
    let nearest = pts
        .iter()
        .map(|p| p.epicentral_distance(site))
        .fold(f64::INFINITY, f64::min);
    let mut span: f64 = 0.0;
    for (i, a) in pts.iter().enumerate() {
        for b in &pts[i + 1..] {
            span = span.max(a.epicentral_distance(b));
        }
    }
    (nearest - span).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FloatingParams;
    use crate::msr::MagScaling;
    use crate::point::{NodalPlane, PointParams};

    fn point_source() -> SeismicSource {
        SeismicSource::new(
            "p1",
            "Active Shallow Crust",
            SourceKind::Point(PointSource {
                location: Point::surface(0.0, 0.0),
                params: PointParams {
                    upper_seismogenic_depth: 0.0,
                    lower_seismogenic_depth: 20.0,
                    nodal_planes: vec![(1.0, NodalPlane { strike: 0.0, dip: 90.0, rake: 0.0 })],
                    hypocentral_depths: vec![(1.0, 10.0)],
                    mfd: Mfd::TruncatedGr {
                        a_val: 3.0,
                        b_val: 1.0,
                        min_mag: 5.0,
                        max_mag: 7.0,
                    },
                    msr: MagScaling::Wc1994,
                    rupture_aspect_ratio: 1.0,
                },
            }),
        )
    }

    #[test]
    fn test_total_rate_matches_ruptures() {
        let src = point_source();
        let disc = DiscretizationConfig::default();
        let total: f64 = src
            .iter_ruptures(&disc, 0.0)
            .unwrap()
            .filter_map(|r| r.occurrence.annual_rate())
            .sum();
        assert!((total - src.total_rate(&disc, 0.0)).abs() < 1e-12);
        assert!((total - (0.01 - 0.0001)).abs() < 1e-9, "total={total}");
    }

    #[test]
    fn test_min_mag_excludes_bins() {
        let src = point_source();
        let disc = DiscretizationConfig::default();
        assert_eq!(src.iter_ruptures(&disc, 8.0).unwrap().count(), 0);
        assert_eq!(src.total_rate(&disc, 8.0), 0.0);
        let above_six = src.iter_ruptures(&disc, 6.0).unwrap();
        assert!(above_six.into_iter().all(|r| r.mag >= 6.0));
    }

    #[test]
    fn test_iteration_is_restartable() {
        let src = point_source();
        let disc = DiscretizationConfig::default();
        let a: Vec<Rupture> = src.iter_ruptures(&disc, 0.0).unwrap().collect();
        let b: Vec<Rupture> = src.iter_ruptures(&disc, 0.0).unwrap().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kind_mismatch_is_config_error() {
        let src = SeismicSource::new(
            "f1",
            "Active Shallow Crust",
            SourceKind::SimpleFault(FaultSource {
                geometry: FaultGeometry::Complex {
                    edges: vec![
                        vec![Point::surface(0.0, 0.0), Point::surface(0.0, 0.1)],
                        vec![Point::new(0.0, 0.0, 10.0), Point::new(0.0, 0.1, 10.0)],
                    ],
                },
                params: FloatingParams {
                    rake: 0.0,
                    mfd: Mfd::Arbitrary {
                        magnitudes: vec![6.0],
                        occurrence_rates: vec![0.01],
                    },
                    msr: MagScaling::Peer,
                    rupture_aspect_ratio: 1.0,
                },
            }),
        );
        let err = src.validate().unwrap_err();
        assert!(matches!(err, HazardError::Configuration(ref m) if m.contains("f1")));
    }

    #[test]
    fn test_fault_distance_bound_conservative() {
        let geometry = FaultGeometry::Simple {
            trace: vec![Point::surface(0.0, 0.0), Point::surface(0.0, 0.3)],
            upper_seismogenic_depth: 0.0,
            lower_seismogenic_depth: 15.0,
            dip: 60.0,
        };
        let src = SeismicSource::new(
            "f2",
            "Active Shallow Crust",
            SourceKind::SimpleFault(FaultSource {
                geometry,
                params: FloatingParams {
                    rake: 90.0,
                    mfd: Mfd::Arbitrary {
                        magnitudes: vec![6.5],
                        occurrence_rates: vec![0.01],
                    },
                    msr: MagScaling::Wc1994,
                    rupture_aspect_ratio: 1.5,
                },
            }),
        );
        let disc = DiscretizationConfig::default();
        let site = Point::surface(1.0, 0.15);
        let bound = src.min_distance_bound(&site, &disc);
        let closest = src
            .iter_ruptures(&disc, 0.0)
            .unwrap()
            .map(|r| r.surface.min_distance(&site))
            .fold(f64::INFINITY, f64::min);
        assert!(bound <= closest, "bound={bound} closest={closest}");
    }

    #[test]
    fn test_json_round_trip_shape() {
        let src = point_source();
        let json = serde_json::to_string(&src).unwrap();
        assert!(json.contains("\"kind\":\"point\""));
        let back: SeismicSource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, src);
    }
}
