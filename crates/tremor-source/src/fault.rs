// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Fault Sources
// ─────────────────────────────────────────────────────────────────────
//! Fault geometries, their meshes, and the floating-rupture scheme.
//!
//! Simple and complex faults float ruptures sized by the magnitude
//! scaling relationship over every sub-mesh of the fault mesh.
//! Characteristic and non-parametric sources rupture a fixed surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tremor_types::geo::azimuth;
use tremor_types::{HazardError, HazardResult, Point};

use crate::mfd::Mfd;
use crate::msr::MagScaling;
use crate::rupture::{Rupture, TemporalOccurrence};
use crate::surface::Mesh;

/// Surface geometry of a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "geometry", rename_all = "snake_case")]
pub enum FaultGeometry {
    /// Surface trace projected down `dip` between the seismogenic depths.
    Simple {
        trace: Vec<Point>,
        upper_seismogenic_depth: f64,
        lower_seismogenic_depth: f64,
        dip: f64,
    },
    /// 3-D edges ordered from top to bottom.
    Complex { edges: Vec<Vec<Point>> },
    /// Rectangle hanging from its top-left corner.
    Planar {
        top_left: Point,
        strike: f64,
        dip: f64,
        length: f64,
        width: f64,
    },
}

impl FaultGeometry {
    pub fn validate(&self) -> HazardResult<()> {
        match self {
            FaultGeometry::Simple {
                trace,
                upper_seismogenic_depth: usd,
                lower_seismogenic_depth: lsd,
                dip,
            } => {
                check_line("fault trace", trace)?;
                if !(*usd >= 0.0 && lsd > usd) {
                    return Err(HazardError::config(format!(
                        "seismogenic depths must satisfy 0 <= upper < lower, got {usd} and {lsd}"
                    )));
                }
                check_dip(*dip)?;
            }
            FaultGeometry::Complex { edges } => {
                if edges.len() < 2 {
                    return Err(HazardError::config(format!(
                        "complex fault needs at least top and bottom edges, got {}",
                        edges.len()
                    )));
                }
                for edge in edges {
                    check_line("complex fault edge", edge)?;
                }
            }
            FaultGeometry::Planar {
                top_left,
                strike,
                dip,
                length,
                width,
            } => {
                if !top_left.is_valid() {
                    return Err(HazardError::config(format!("invalid planar corner {top_left:?}")));
                }
                if !strike.is_finite() {
                    return Err(HazardError::config("planar strike must be finite"));
                }
                check_dip(*dip)?;
                if !(*length > 0.0 && *width > 0.0) {
                    return Err(HazardError::config(format!(
                        "planar surface needs positive dimensions, got {length} x {width}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Structured mesh at roughly `spacing` km.
    pub fn mesh(&self, spacing: f64) -> HazardResult<Mesh> {
        self.validate()?;
        match self {
            FaultGeometry::Simple {
                trace,
                upper_seismogenic_depth: usd,
                lower_seismogenic_depth: lsd,
                dip,
            } => mesh_between_edges(&simple_edges(trace, *usd, *lsd, *dip), spacing),
            FaultGeometry::Complex { edges } => mesh_between_edges(edges, spacing),
            FaultGeometry::Planar {
                top_left,
                strike,
                dip,
                length,
                width,
            } => Ok(Mesh::planar(*top_left, *strike, *dip, *length, *width, spacing)),
        }
    }

    /// Points bounding the surface, for conservative distance checks.
    pub(crate) fn outline_points(&self) -> Vec<Point> {
        match self {
            FaultGeometry::Simple {
                trace,
                upper_seismogenic_depth: usd,
                lower_seismogenic_depth: lsd,
                dip,
            } => simple_edges(trace, *usd, *lsd, *dip).concat(),
            FaultGeometry::Complex { edges } => edges.iter().flatten().copied().collect(),
            FaultGeometry::Planar {
                top_left,
                strike,
                dip,
                length,
                width,
            } => {
                let (sin_dip, cos_dip) = dip.to_radians().sin_cos();
                let top_right = top_left.translate(*strike, *length, 0.0);
                let down = |p: &Point| p.translate(strike + 90.0, width * cos_dip, width * sin_dip);
                vec![*top_left, top_right, down(&top_right), down(top_left)]
            }
        }
    }
}

/// Top and bottom edges of a simple fault: the trace pushed down dip to
/// each seismogenic depth.
fn simple_edges(trace: &[Point], usd: f64, lsd: f64, dip: f64) -> [Vec<Point>; 2] {
    let first = trace[0];
    let last = trace[trace.len() - 1];
    let dip_dir = azimuth(first.lon, first.lat, last.lon, last.lat) + 90.0;
    let cot = if dip < 90.0 { 1.0 / dip.to_radians().tan() } else { 0.0 };
    let edge = |depth: f64| -> Vec<Point> {
        trace
            .iter()
            .map(|p| Point::new(p.lon, p.lat, 0.0).translate(dip_dir, depth * cot, depth))
            .collect()
    };
    [edge(usd), edge(lsd)]
}

fn check_dip(dip: f64) -> HazardResult<()> {
    if !(dip > 0.0 && dip <= 90.0) {
        return Err(HazardError::config(format!("dip must be in (0, 90], got {dip}")));
    }
    Ok(())
}

fn check_line(what: &str, line: &[Point]) -> HazardResult<()> {
    if line.len() < 2 {
        return Err(HazardError::config(format!(
            "{what} needs at least 2 points, got {}",
            line.len()
        )));
    }
    if let Some(p) = line.iter().find(|p| !p.is_valid()) {
        return Err(HazardError::config(format!("{what} has invalid point {p:?}")));
    }
    if line_length(line) <= 0.0 {
        return Err(HazardError::config(format!("{what} has zero length")));
    }
    Ok(())
}

fn line_length(line: &[Point]) -> f64 {
    line.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

fn lerp(a: &Point, b: &Point, t: f64) -> Point {
    Point::new(
        a.lon + (b.lon - a.lon) * t,
        a.lat + (b.lat - a.lat) * t,
        a.depth + (b.depth - a.depth) * t,
    )
}

/// `n` points equally spaced by arc length along `line`, endpoints kept.
fn resample(line: &[Point], n: usize) -> Vec<Point> {
    let cumulative: Vec<f64> = std::iter::once(0.0)
        .chain(line.windows(2).scan(0.0, |acc, w| {
            *acc += w[0].distance(&w[1]);
            Some(*acc)
        }))
        .collect();
    let total = cumulative[cumulative.len() - 1];
    let mut out = Vec::with_capacity(n);
    let mut seg = 0;
    for i in 0..n {
        let target = total * i as f64 / (n - 1) as f64;
        while seg + 2 < cumulative.len() && cumulative[seg + 1] < target {
            seg += 1;
        }
        let span = cumulative[seg + 1] - cumulative[seg];
        let t = if span > 0.0 {
            ((target - cumulative[seg]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(lerp(&line[seg], &line[seg + 1], t));
    }
    out
}

/// Mesh spanning consecutive edges. Every edge is resampled to the same
/// column count; rows are interpolated between neighbouring edges.
fn mesh_between_edges(edges: &[Vec<Point>], spacing: f64) -> HazardResult<Mesh> {
    let mean_length = edges.iter().map(|e| line_length(e)).sum::<f64>() / edges.len() as f64;
    let cols = ((mean_length / spacing).round() as usize + 1).max(2);
    let resampled: Vec<Vec<Point>> = edges.iter().map(|e| resample(e, cols)).collect();

    let mut rows: Vec<Vec<Point>> = vec![resampled[0].clone()];
    for pair in resampled.windows(2) {
        let (upper, lower) = (&pair[0], &pair[1]);
        let gap = upper
            .iter()
            .zip(lower.iter())
            .map(|(a, b)| a.distance(b))
            .sum::<f64>()
            / cols as f64;
        let steps = ((gap / spacing).round() as usize).max(1);
        for s in 1..=steps {
            let t = s as f64 / steps as f64;
            rows.push(upper.iter().zip(lower.iter()).map(|(a, b)| lerp(a, b, t)).collect());
        }
    }
    let n_rows = rows.len();
    Mesh::new(n_rows, cols, rows.into_iter().flatten().collect())
}

/// Rupture properties shared by floating fault sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingParams {
    pub rake: f64,
    pub mfd: Mfd,
    #[serde(default)]
    pub msr: MagScaling,
    pub rupture_aspect_ratio: f64,
}

impl FloatingParams {
    fn validate(&self) -> HazardResult<()> {
        if !(-180.0..=180.0).contains(&self.rake) {
            return Err(HazardError::config(format!(
                "rake must be in [-180, 180], got {}",
                self.rake
            )));
        }
        if !(self.rupture_aspect_ratio.is_finite() && self.rupture_aspect_ratio > 0.0) {
            return Err(HazardError::config(format!(
                "rupture_aspect_ratio must be > 0, got {}",
                self.rupture_aspect_ratio
            )));
        }
        self.mfd.validate()
    }
}

/// A fault whose ruptures float over its mesh. Covers both simple
/// (trace + dip) and complex (edges) geometries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultSource {
    #[serde(flatten)]
    pub geometry: FaultGeometry,
    #[serde(flatten)]
    pub params: FloatingParams,
}

impl FaultSource {
    pub fn validate(&self) -> HazardResult<()> {
        self.geometry.validate()?;
        self.params.validate()
    }

    pub(crate) fn ruptures(
        &self,
        bins: Vec<(f64, f64)>,
        spacing: f64,
    ) -> HazardResult<impl Iterator<Item = Rupture>> {
        let mesh = Arc::new(self.geometry.mesh(spacing)?);
        let (mesh_length, mesh_width) = (mesh.length(), mesh.width());
        let params = self.params.clone();
        Ok(bins.into_iter().flat_map(move |(mag, rate)| {
            let (length, width) =
                params
                    .msr
                    .dimensions(mag, params.rake, params.rupture_aspect_ratio, mesh_width);
            let length = length.min(mesh_length);
            floating_ruptures(Arc::clone(&mesh), mag, params.rake, rate, length, width, spacing)
        }))
    }
}

/// Every placement of a `length` x `width` window on the mesh, each with
/// an equal share of `rate`.
fn floating_ruptures(
    mesh: Arc<Mesh>,
    mag: f64,
    rake: f64,
    rate: f64,
    length: f64,
    width: f64,
    spacing: f64,
) -> impl Iterator<Item = Rupture> {
    let rup_cols = ((length / spacing).round() as usize + 1).clamp(2, mesh.cols());
    let rup_rows = ((width / spacing).round() as usize + 1).clamp(2, mesh.rows());
    let n_along = mesh.cols() - rup_cols + 1;
    let n_down = mesh.rows() - rup_rows + 1;
    let share = rate / (n_along * n_down) as f64;
    (0..n_down).flat_map(move |r| {
        let mesh = Arc::clone(&mesh);
        (0..n_along).map(move |c| {
            let surface = mesh.sub_mesh(r, c, rup_rows, rup_cols);
            let hypocenter = surface.middle_point();
            Rupture::poisson(mag, rake, hypocenter, surface, share)
        })
    })
}

/// A fixed surface that ruptures entirely for each magnitude bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacteristicSource {
    #[serde(flatten)]
    pub geometry: FaultGeometry,
    pub rake: f64,
    pub mfd: Mfd,
}

impl CharacteristicSource {
    pub fn validate(&self) -> HazardResult<()> {
        self.geometry.validate()?;
        if !(-180.0..=180.0).contains(&self.rake) {
            return Err(HazardError::config(format!(
                "rake must be in [-180, 180], got {}",
                self.rake
            )));
        }
        self.mfd.validate()
    }

    pub(crate) fn ruptures(
        &self,
        bins: Vec<(f64, f64)>,
        spacing: f64,
    ) -> HazardResult<impl Iterator<Item = Rupture>> {
        let surface = self.geometry.mesh(spacing)?;
        let hypocenter = surface.middle_point();
        let rake = self.rake;
        Ok(bins
            .into_iter()
            .map(move |(mag, rate)| Rupture::poisson(mag, rake, hypocenter, surface.clone(), rate)))
    }
}

/// One explicitly listed rupture with its occurrence probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonParametricRupture {
    pub mag: f64,
    pub rake: f64,
    #[serde(flatten)]
    pub geometry: FaultGeometry,
    /// Probability of 0, 1, 2, … occurrences in the investigation time.
    pub probs_occur: Vec<f64>,
}

/// A source given as a list of ruptures with non-Poissonian occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonParametricSource {
    pub ruptures: Vec<NonParametricRupture>,
}

impl NonParametricSource {
    pub fn validate(&self) -> HazardResult<()> {
        if self.ruptures.is_empty() {
            return Err(HazardError::config("non-parametric source has no ruptures"));
        }
        for rup in &self.ruptures {
            if !rup.mag.is_finite() {
                return Err(HazardError::config(format!(
                    "rupture magnitude must be finite, got {}",
                    rup.mag
                )));
            }
            rup.geometry.validate()?;
            TemporalOccurrence::NonParametric {
                probs_occur: rup.probs_occur.clone(),
            }
            .validate()?;
        }
        Ok(())
    }

    pub(crate) fn ruptures(
        &self,
        min_mag: f64,
        spacing: f64,
    ) -> HazardResult<impl Iterator<Item = Rupture>> {
        let mut out = Vec::new();
        for rup in self.ruptures.iter().filter(|r| r.mag >= min_mag) {
            let surface = rup.geometry.mesh(spacing)?;
            out.push(Rupture {
                mag: rup.mag,
                rake: rup.rake,
                hypocenter: surface.middle_point(),
                surface,
                occurrence: TemporalOccurrence::NonParametric {
                    probs_occur: rup.probs_occur.clone(),
                },
            });
        }
        Ok(out.into_iter())
    }

    pub(crate) fn magnitude_range(&self) -> Option<(f64, f64)> {
        let lo = self.ruptures.iter().map(|r| r.mag).fold(f64::INFINITY, f64::min);
        let hi = self.ruptures.iter().map(|r| r.mag).fold(f64::NEG_INFINITY, f64::max);
        (lo <= hi).then_some((lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn vertical_fault() -> FaultSource {
        FaultSource {
            geometry: FaultGeometry::Simple {
                trace: vec![Point::surface(0.0, 0.0), Point::surface(0.0, 0.36)],
                upper_seismogenic_depth: 0.0,
                lower_seismogenic_depth: 10.0,
                dip: 90.0,
            },
            params: FloatingParams {
                rake: 0.0,
                mfd: Mfd::EvenlyDiscretized {
                    min_mag: 6.0,
                    bin_width: 0.5,
                    occurrence_rates: vec![0.01, 0.002],
                },
                msr: MagScaling::Peer,
                rupture_aspect_ratio: 1.0,
            },
        }
    }

    #[test]
    fn test_simple_fault_mesh() {
        let src = vertical_fault();
        let mesh = src.geometry.mesh(2.0).unwrap();
        // ~40 km long, 10 km deep
        assert_eq!(mesh.cols(), 21);
        assert_eq!(mesh.rows(), 6);
        assert!((mesh.at(5, 0).depth - 10.0).abs() < 1e-9);
        assert!((mesh.length() - 40.03).abs() < 0.1, "length={}", mesh.length());
    }

    #[test]
    fn test_dipping_fault_moves_down_dip() {
        let geom = FaultGeometry::Simple {
            trace: vec![Point::surface(0.0, 0.0), Point::surface(0.0, 0.2)],
            upper_seismogenic_depth: 0.0,
            lower_seismogenic_depth: 10.0,
            dip: 45.0,
        };
        let mesh = geom.mesh(1.0).unwrap();
        let top = mesh.at(0, 0);
        let bottom = mesh.at(mesh.rows() - 1, 0);
        // Striking north, dipping east by 10 km over 10 km depth
        assert!(bottom.lon > top.lon);
        assert!((top.epicentral_distance(bottom) - 10.0).abs() < 0.05);
        assert!((mesh.dip() - 45.0).abs() < 0.5, "dip={}", mesh.dip());
    }

    #[test]
    fn test_floating_rates_conserved() {
        let src = vertical_fault();
        let bins = src.params.mfd.annual_occurrence_rates(0.1);
        let rups: Vec<Rupture> = src.ruptures(bins, 2.0).unwrap().collect();
        let total: f64 = rups.iter().filter_map(|r| r.occurrence.annual_rate()).sum();
        assert!((total - 0.012).abs() < 1e-12, "total={total}");
        // M6.0 Peer: 100 km² -> 10 x 10 km: 6 cols, full width
        let m6 = rups.iter().filter(|r| r.mag == 6.0).count();
        assert_eq!(m6, 21 - 6 + 1);
        assert!(rups.iter().all(|r| r.surface.rows() == 6));
    }

    #[test]
    fn test_complex_fault_interpolates_rows() {
        let geom = FaultGeometry::Complex {
            edges: vec![
                vec![Point::new(0.0, 0.0, 5.0), Point::new(0.0, 0.2, 5.0)],
                vec![Point::new(0.1, 0.0, 25.0), Point::new(0.1, 0.2, 25.0)],
            ],
        };
        let mesh = geom.mesh(5.0).unwrap();
        assert!(mesh.rows() >= 3);
        assert!((mesh.top_edge_depth() - 5.0).abs() < 1e-9);
        assert!((mesh.at(mesh.rows() - 1, 0).depth - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_characteristic_full_surface() {
        let src = CharacteristicSource {
            geometry: FaultGeometry::Planar {
                top_left: Point::new(0.0, 0.0, 1.0),
                strike: 0.0,
                dip: 90.0,
                length: 20.0,
                width: 10.0,
            },
            rake: 0.0,
            mfd: Mfd::Arbitrary {
                magnitudes: vec![6.5, 7.0],
                occurrence_rates: vec![0.003, 0.001],
            },
        };
        let bins = src.mfd.annual_occurrence_rates(0.1);
        let rups: Vec<Rupture> = src.ruptures(bins, 2.0).unwrap().collect();
        assert_eq!(rups.len(), 2);
        assert_eq!(rups[0].surface, rups[1].surface);
    }

    #[test]
    fn test_non_parametric_filter_and_validate() {
        let planar = FaultGeometry::Planar {
            top_left: Point::new(0.0, 0.0, 0.0),
            strike: 0.0,
            dip: 90.0,
            length: 10.0,
            width: 5.0,
        };
        let src = NonParametricSource {
            ruptures: vec![
                NonParametricRupture {
                    mag: 6.0,
                    rake: 0.0,
                    geometry: planar.clone(),
                    probs_occur: vec![0.9, 0.1],
                },
                NonParametricRupture {
                    mag: 7.0,
                    rake: 0.0,
                    geometry: planar,
                    probs_occur: vec![0.95, 0.04, 0.01],
                },
            ],
        };
        assert!(src.validate().is_ok());
        assert_eq!(src.ruptures(6.5, 2.0).unwrap().count(), 1);
        assert_eq!(src.magnitude_range(), Some((6.0, 7.0)));
    }

    #[test]
    fn test_geometry_validation() {
        let bad = FaultGeometry::Simple {
            trace: vec![Point::surface(0.0, 0.0)],
            upper_seismogenic_depth: 0.0,
            lower_seismogenic_depth: 10.0,
            dip: 90.0,
        };
        assert!(bad.validate().is_err());
        let shallow = FaultGeometry::Complex { edges: vec![vec![]] };
        assert!(shallow.validate().is_err());
    }
}
