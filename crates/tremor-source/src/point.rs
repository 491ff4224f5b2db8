// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Point and Area Sources
// ─────────────────────────────────────────────────────────────────────
//! Point sources generate one planar rupture per (magnitude, nodal
//! plane, hypocentral depth) combination. Area sources are gridded into
//! point sources sharing the total rate equally.

use serde::{Deserialize, Serialize};

use tremor_types::geo::{distance_to_segment, point_in_polygon, LocalProjection};
use tremor_types::{HazardError, HazardResult, Point};

use crate::mfd::Mfd;
use crate::msr::MagScaling;
use crate::rupture::Rupture;
use crate::surface::Mesh;

/// Fault-plane orientation (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodalPlane {
    pub strike: f64,
    pub dip: f64,
    pub rake: f64,
}

impl NodalPlane {
    pub fn validate(&self) -> HazardResult<()> {
        if !(0.0..360.0).contains(&self.strike) {
            return Err(HazardError::config(format!(
                "strike must be in [0, 360), got {}",
                self.strike
            )));
        }
        if !(self.dip > 0.0 && self.dip <= 90.0) {
            return Err(HazardError::config(format!("dip must be in (0, 90], got {}", self.dip)));
        }
        if !(-180.0..=180.0).contains(&self.rake) {
            return Err(HazardError::config(format!(
                "rake must be in [-180, 180], got {}",
                self.rake
            )));
        }
        Ok(())
    }
}

/// Parameters shared by point and area sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointParams {
    pub upper_seismogenic_depth: f64,
    pub lower_seismogenic_depth: f64,
    /// (probability, plane)
    pub nodal_planes: Vec<(f64, NodalPlane)>,
    /// (probability, depth km)
    pub hypocentral_depths: Vec<(f64, f64)>,
    pub mfd: Mfd,
    #[serde(default)]
    pub msr: MagScaling,
    pub rupture_aspect_ratio: f64,
}

impl PointParams {
    pub fn validate(&self) -> HazardResult<()> {
        let (usd, lsd) = (self.upper_seismogenic_depth, self.lower_seismogenic_depth);
        if !(usd.is_finite() && usd >= 0.0 && lsd.is_finite() && lsd > usd) {
            return Err(HazardError::config(format!(
                "seismogenic depths must satisfy 0 <= upper < lower, got {usd} and {lsd}"
            )));
        }
        if !(self.rupture_aspect_ratio.is_finite() && self.rupture_aspect_ratio > 0.0) {
            return Err(HazardError::config(format!(
                "rupture_aspect_ratio must be > 0, got {}",
                self.rupture_aspect_ratio
            )));
        }
        check_pmf("nodal plane distribution", self.nodal_planes.iter().map(|(p, _)| *p))?;
        check_pmf(
            "hypocentral depth distribution",
            self.hypocentral_depths.iter().map(|(p, _)| *p),
        )?;
        for (_, np) in &self.nodal_planes {
            np.validate()?;
        }
        if let Some((_, d)) = self
            .hypocentral_depths
            .iter()
            .find(|(_, d)| !(usd..=lsd).contains(d))
        {
            return Err(HazardError::config(format!(
                "hypocentral depth {d} outside seismogenic layer [{usd}, {lsd}]"
            )));
        }
        self.mfd.validate()
    }

    /// Radius (km) around the epicentre that contains the surface
    /// projection of every rupture up to `max_mag`.
    fn horizontal_extent(&self, max_mag: f64) -> f64 {
        let layer = self.lower_seismogenic_depth - self.upper_seismogenic_depth;
        self.nodal_planes
            .iter()
            .map(|(_, np)| {
                let (sin_dip, cos_dip) = np.dip.to_radians().sin_cos();
                let (length, width) =
                    self.msr
                        .dimensions(max_mag, np.rake, self.rupture_aspect_ratio, layer / sin_dip);
                let shift = if np.dip < 90.0 { layer * cos_dip / sin_dip } else { 0.0 };
                length / 2.0 + width * cos_dip + shift
            })
            .fold(0.0, f64::max)
    }

    /// Ruptures of a point source at (lon, lat). `bins` are the already
    /// filtered and scaled (magnitude, annual rate) pairs.
    pub(crate) fn ruptures_at<'a>(
        &'a self,
        lon: f64,
        lat: f64,
        bins: Vec<(f64, f64)>,
        spacing: f64,
    ) -> impl Iterator<Item = Rupture> + 'a {
        bins.into_iter().flat_map(move |(mag, rate)| {
            self.nodal_planes.iter().flat_map(move |(np_prob, np)| {
                self.hypocentral_depths.iter().map(move |(hd_prob, depth)| {
                    let hypocenter = Point::new(lon, lat, *depth);
                    let surface = self.rupture_surface(&hypocenter, mag, np, spacing);
                    Rupture::poisson(mag, np.rake, hypocenter, surface, rate * np_prob * hd_prob)
                })
            })
        })
    }

    /// Planar surface centred on the hypocentre, shifted along dip so it
    /// stays inside the seismogenic layer.
    fn rupture_surface(&self, hypocenter: &Point, mag: f64, np: &NodalPlane, spacing: f64) -> Mesh {
        let (usd, lsd) = (self.upper_seismogenic_depth, self.lower_seismogenic_depth);
        let (sin_dip, cos_dip) = np.dip.to_radians().sin_cos();
        let (length, width) =
            self.msr
                .dimensions(mag, np.rake, self.rupture_aspect_ratio, (lsd - usd) / sin_dip);
        let half_height = width * sin_dip / 2.0;

        let mut centre_depth = hypocenter.depth;
        if centre_depth - half_height < usd {
            centre_depth = usd + half_height;
        } else if centre_depth + half_height > lsd {
            centre_depth = lsd - half_height;
        }
        let vshift = centre_depth - hypocenter.depth;
        let hshift = if np.dip < 90.0 { vshift * cos_dip / sin_dip } else { 0.0 };
        let dip_dir = np.strike + 90.0;

        let centre = hypocenter.translate(dip_dir, hshift, vshift);
        let top_left = centre
            .translate(dip_dir, -(width / 2.0) * cos_dip, -half_height)
            .translate(np.strike, -length / 2.0, 0.0);
        Mesh::planar(top_left, np.strike, np.dip, length, width, spacing)
    }
}

fn check_pmf(what: &str, probs: impl Iterator<Item = f64>) -> HazardResult<()> {
    let probs: Vec<f64> = probs.collect();
    if probs.is_empty() {
        return Err(HazardError::config(format!("{what} is empty")));
    }
    if probs.iter().any(|p| !(*p > 0.0 && *p <= 1.0)) {
        return Err(HazardError::config(format!("{what} probabilities must be in (0, 1]")));
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > 1e-6 {
        return Err(HazardError::config(format!("{what} must sum to 1, got {sum}")));
    }
    Ok(())
}

/// A single-location source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSource {
    pub location: Point,
    #[serde(flatten)]
    pub params: PointParams,
}

impl PointSource {
    pub fn validate(&self) -> HazardResult<()> {
        if !self.location.is_valid() {
            return Err(HazardError::config(format!("invalid point location {:?}", self.location)));
        }
        self.params.validate()
    }

    pub fn min_distance_bound(&self, site: &Point, max_mag: f64) -> f64 {
        let epi = self.location.epicentral_distance(site);
        (epi - self.params.horizontal_extent(max_mag)).max(0.0)
    }
}

/// A polygonal source of distributed seismicity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSource {
    pub polygon: Vec<Point>,
    #[serde(flatten)]
    pub params: PointParams,
}

impl AreaSource {
    pub fn validate(&self) -> HazardResult<()> {
        if self.polygon.len() < 3 {
            return Err(HazardError::config(format!(
                "area polygon needs at least 3 vertices, got {}",
                self.polygon.len()
            )));
        }
        if let Some(p) = self.polygon.iter().find(|p| !p.is_valid()) {
            return Err(HazardError::config(format!("invalid polygon vertex {p:?}")));
        }
        self.params.validate()
    }

    /// Grid nodes (lon, lat) inside the polygon at `step` km spacing.
    /// A polygon too small to hold a node collapses to its centroid.
    pub fn discretize(&self, step: f64) -> Vec<(f64, f64)> {
        let proj = LocalProjection::centred_on(&self.polygon);
        let poly: Vec<(f64, f64)> = self
            .polygon
            .iter()
            .map(|p| proj.project(p.lon, p.lat))
            .collect();
        let (mut xmin, mut xmax, mut ymin, mut ymax) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &poly {
            xmin = xmin.min(x);
            xmax = xmax.max(x);
            ymin = ymin.min(y);
            ymax = ymax.max(y);
        }
        let nx = ((xmax - xmin) / step).floor() as usize + 1;
        let ny = ((ymax - ymin) / step).floor() as usize + 1;
        let mut nodes = Vec::new();
        for j in 0..ny {
            let y = ymin + step * (j as f64 + 0.5);
            for i in 0..nx {
                let x = xmin + step * (i as f64 + 0.5);
                if point_in_polygon(x, y, &poly) {
                    nodes.push(proj.unproject(x, y));
                }
            }
        }
        if nodes.is_empty() {
            log::debug!("area smaller than a {step} km cell, using its centroid");
            nodes.push(proj.unproject(0.0, 0.0));
        }
        nodes
    }

    pub(crate) fn ruptures<'a>(
        &'a self,
        bins: Vec<(f64, f64)>,
        step: f64,
        spacing: f64,
    ) -> impl Iterator<Item = Rupture> + 'a {
        let nodes = self.discretize(step);
        let share = 1.0 / nodes.len() as f64;
        let scaled: Vec<(f64, f64)> = bins.into_iter().map(|(m, r)| (m, r * share)).collect();
        nodes
            .into_iter()
            .flat_map(move |(lon, lat)| self.params.ruptures_at(lon, lat, scaled.clone(), spacing))
    }

    pub fn min_distance_bound(&self, site: &Point, max_mag: f64) -> f64 {
        let proj = LocalProjection::new(site.lon, site.lat);
        let poly: Vec<(f64, f64)> = self
            .polygon
            .iter()
            .map(|p| proj.project(p.lon, p.lat))
            .collect();
        if point_in_polygon(0.0, 0.0, &poly) {
            return 0.0;
        }
        let n = poly.len();
        let outside = (0..n)
            .map(|i| distance_to_segment(0.0, 0.0, poly[i], poly[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min);
        (outside - self.params.horizontal_extent(max_mag)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn params() -> PointParams {
        PointParams {
            upper_seismogenic_depth: 0.0,
            lower_seismogenic_depth: 20.0,
            nodal_planes: vec![
                (0.5, NodalPlane { strike: 0.0, dip: 90.0, rake: 0.0 }),
                (0.5, NodalPlane { strike: 90.0, dip: 45.0, rake: 90.0 }),
            ],
            hypocentral_depths: vec![(0.4, 5.0), (0.6, 10.0)],
            mfd: Mfd::EvenlyDiscretized {
                min_mag: 5.0,
                bin_width: 1.0,
                occurrence_rates: vec![0.1, 0.01],
            },
            msr: MagScaling::Wc1994,
            rupture_aspect_ratio: 1.5,
        }
    }

    #[test]
    fn test_point_rupture_count_and_rate() {
        let p = params();
        let bins = p.mfd.annual_occurrence_rates(0.1);
        let rups: Vec<Rupture> = p.ruptures_at(0.0, 0.0, bins, 2.0).collect();
        assert_eq!(rups.len(), 2 * 2 * 2);
        let total: f64 = rups.iter().filter_map(|r| r.occurrence.annual_rate()).sum();
        assert!((total - 0.11).abs() < 1e-12, "total={total}");
    }

    #[test]
    fn test_surface_stays_in_layer() {
        let mut p = params();
        p.mfd = Mfd::EvenlyDiscretized {
            min_mag: 7.5,
            bin_width: 0.1,
            occurrence_rates: vec![0.001],
        };
        let bins = p.mfd.annual_occurrence_rates(0.1);
        for r in p.ruptures_at(0.0, 0.0, bins, 2.0) {
            for pt in r.surface.points() {
                assert!(pt.depth >= -1e-6 && pt.depth <= 20.0 + 1e-6, "depth {}", pt.depth);
            }
        }
    }

    #[test]
    fn test_nodal_plane_pmf_checked() {
        let mut p = params();
        p.nodal_planes[0].0 = 0.3;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_hypocentre_outside_layer() {
        let mut p = params();
        p.hypocentral_depths = vec![(1.0, 25.0)];
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_area_discretization() {
        let area = AreaSource {
            polygon: vec![
                Point::surface(0.0, 0.0),
                Point::surface(0.5, 0.0),
                Point::surface(0.5, 0.5),
                Point::surface(0.0, 0.5),
            ],
            params: params(),
        };
        let nodes = area.discretize(10.0);
        // ~55 km square on a 10 km grid
        assert!(nodes.len() >= 25 && nodes.len() <= 36, "n={}", nodes.len());
        let bins = area.params.mfd.annual_occurrence_rates(0.1);
        let total: f64 = area
            .ruptures(bins, 10.0, 5.0)
            .filter_map(|r| r.occurrence.annual_rate())
            .sum();
        assert!((total - 0.11).abs() < 1e-12, "total={total}");
    }

    #[test]
    fn test_tiny_area_collapses_to_centroid() {
        let area = AreaSource {
            polygon: vec![
                Point::surface(0.0, 0.0),
                Point::surface(0.01, 0.0),
                Point::surface(0.0, 0.01),
            ],
            params: params(),
        };
        assert_eq!(area.discretize(50.0).len(), 1);
    }

    #[test]
    fn test_distance_bound_is_conservative() {
        let src = PointSource {
            location: Point::surface(0.0, 0.0),
            params: params(),
        };
        let site = Point::surface(0.5, 0.0);
        let bound = src.min_distance_bound(&site, 6.0);
        let bins = src.params.mfd.annual_occurrence_rates(0.1);
        let closest = src
            .params
            .ruptures_at(0.0, 0.0, bins, 1.0)
            .map(|r| r.surface.min_distance(&site))
            .fold(f64::INFINITY, f64::min);
        assert!(bound <= closest + 1e-9, "bound={bound} closest={closest}");
    }
}
