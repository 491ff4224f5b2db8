// ─────────────────────────────────────────────────────────────────────
// Tremor Kernel — Rupture Surface Meshes
// ─────────────────────────────────────────────────────────────────────
//! Every rupture surface is a structured mesh of 3-D points: rows run
//! down dip, columns along strike, stored row-major. Distance metrics
//! are evaluated against the mesh nodes and its outline.

use serde::{Deserialize, Serialize};

use tremor_types::geo::{azimuth, distance_to_segment, point_in_polygon, LocalProjection};
use tremor_types::{HazardError, HazardResult, Point};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    rows: usize,
    cols: usize,
    points: Vec<Point>,
}

impl Mesh {
    pub fn new(rows: usize, cols: usize, points: Vec<Point>) -> HazardResult<Self> {
        if rows == 0 || cols == 0 || points.len() != rows * cols {
            return Err(HazardError::config(format!(
                "mesh of {rows}x{cols} needs {} points, got {}",
                rows * cols,
                points.len()
            )));
        }
        Ok(Self { rows, cols, points })
    }

    /// Planar rectangle hanging from `top_left`: `length` km along
    /// `strike`, `width` km down `dip`, sampled every ~`spacing` km.
    pub fn planar(
        top_left: Point,
        strike: f64,
        dip: f64,
        length: f64,
        width: f64,
        spacing: f64,
    ) -> Self {
        let cols = ((length / spacing).round() as usize + 1).max(2);
        let rows = ((width / spacing).round() as usize + 1).max(2);
        let ds = length / (cols - 1) as f64;
        let dw = width / (rows - 1) as f64;
        let (sin_dip, cos_dip) = dip.to_radians().sin_cos();
        let dip_dir = strike + 90.0;
        let mut points = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            let down = dw * r as f64;
            let row_origin = top_left.translate(dip_dir, down * cos_dip, down * sin_dip);
            for c in 0..cols {
                points.push(row_origin.translate(strike, ds * c as f64, 0.0));
            }
        }
        Self { rows, cols, points }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> &Point {
        &self.points[row * self.cols + col]
    }

    /// Rectangular window of the mesh.
    pub fn sub_mesh(&self, row0: usize, col0: usize, rows: usize, cols: usize) -> Mesh {
        debug_assert!(row0 + rows <= self.rows && col0 + cols <= self.cols);
        let mut points = Vec::with_capacity(rows * cols);
        for r in row0..row0 + rows {
            let start = r * self.cols + col0;
            points.extend_from_slice(&self.points[start..start + cols]);
        }
        Mesh { rows, cols, points }
    }

    /// Closest distance from `site` to any mesh node (Rrup).
    pub fn min_distance(&self, site: &Point) -> f64 {
        self.points
            .iter()
            .map(|p| p.distance(site))
            .fold(f64::INFINITY, f64::min)
    }

    /// Closest horizontal distance to the surface projection (Rjb):
    /// zero when the site lies above the rupture.
    pub fn joyner_boore_distance(&self, site: &Point) -> f64 {
        let proj = LocalProjection::new(site.lon, site.lat);
        let outline: Vec<(f64, f64)> = self
            .outline()
            .into_iter()
            .map(|p| proj.project(p.lon, p.lat))
            .collect();
        if point_in_polygon(0.0, 0.0, &outline) {
            return 0.0;
        }
        let n = outline.len();
        (0..n)
            .map(|i| distance_to_segment(0.0, 0.0, outline[i], outline[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min)
    }

    /// Depth to the top of rupture (Ztor).
    pub fn top_edge_depth(&self) -> f64 {
        self.points[..self.cols]
            .iter()
            .map(|p| p.depth)
            .fold(f64::INFINITY, f64::min)
    }

    /// Centre of the mesh, averaging the central nodes when a dimension
    /// has an even count.
    pub fn middle_point(&self) -> Point {
        let rows = central_indices(self.rows);
        let cols = central_indices(self.cols);
        let mut sum = Point::new(0.0, 0.0, 0.0);
        let mut n = 0.0;
        for &r in &rows {
            for &c in &cols {
                let p = self.at(r, c);
                sum.lon += p.lon;
                sum.lat += p.lat;
                sum.depth += p.depth;
                n += 1.0;
            }
        }
        Point::new(sum.lon / n, sum.lat / n, sum.depth / n)
    }

    /// Mean down-dip extent (km) over all columns.
    pub fn width(&self) -> f64 {
        let total: f64 = (0..self.cols)
            .map(|c| {
                (1..self.rows)
                    .map(|r| self.at(r - 1, c).distance(self.at(r, c)))
                    .sum::<f64>()
            })
            .sum();
        total / self.cols as f64
    }

    /// Length (km) of the top edge.
    pub fn length(&self) -> f64 {
        (1..self.cols)
            .map(|c| self.at(0, c - 1).distance(self.at(0, c)))
            .sum()
    }

    /// Azimuth of the top edge.
    pub fn strike(&self) -> f64 {
        let a = self.at(0, 0);
        let b = self.at(0, self.cols - 1);
        azimuth(a.lon, a.lat, b.lon, b.lat)
    }

    /// Mean dip (degrees) along the middle column.
    pub fn dip(&self) -> f64 {
        let c = self.cols / 2;
        let top = self.at(0, c);
        let bottom = self.at(self.rows - 1, c);
        let horizontal = top.epicentral_distance(bottom);
        let vertical = bottom.depth - top.depth;
        vertical.atan2(horizontal).to_degrees()
    }

    /// Perimeter nodes in order: top edge, right edge, bottom edge
    /// reversed, left edge reversed.
    fn outline(&self) -> Vec<Point> {
        let mut out = Vec::with_capacity(2 * (self.rows + self.cols));
        out.extend((0..self.cols).map(|c| *self.at(0, c)));
        out.extend((1..self.rows).map(|r| *self.at(r, self.cols - 1)));
        if self.rows > 1 {
            out.extend((0..self.cols - 1).rev().map(|c| *self.at(self.rows - 1, c)));
        }
        if self.cols > 1 {
            out.extend((1..self.rows - 1).rev().map(|r| *self.at(r, 0)));
        }
        out
    }
}

fn central_indices(n: usize) -> Vec<usize> {
    if n % 2 == 1 {
        vec![n / 2]
    } else {
        vec![n / 2 - 1, n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_fault() -> Mesh {
        // 20 km long, 10 km deep, striking north from (0, 0)
        Mesh::planar(Point::new(0.0, 0.0, 0.0), 0.0, 90.0, 20.0, 10.0, 1.0)
    }

    #[test]
    fn test_planar_dimensions() {
        let m = vertical_fault();
        assert_eq!(m.cols(), 21);
        assert_eq!(m.rows(), 11);
        assert!((m.at(10, 0).depth - 10.0).abs() < 1e-9);
        assert!((m.dip() - 90.0).abs() < 1e-6, "dip={}", m.dip());
        assert!(m.strike().abs() < 1e-6 || (m.strike() - 360.0).abs() < 1e-6);
    }

    #[test]
    fn test_rrup_and_rjb_offset_site() {
        let m = vertical_fault();
        // Site 10 km east of the fault mid-point
        let (lon, lat) = tremor_types::geo::point_at(0.0, 0.09, 90.0, 10.0);
        let site = Point::surface(lon, lat);
        let rrup = m.min_distance(&site);
        let rjb = m.joyner_boore_distance(&site);
        assert!((rrup - 10.0).abs() < 0.05, "rrup={rrup}");
        assert!((rjb - 10.0).abs() < 0.05, "rjb={rjb}");
        assert!(rjb <= rrup + 1e-9);
    }

    #[test]
    fn test_rjb_zero_above_dipping_rupture() {
        let m = Mesh::planar(Point::new(0.0, 0.0, 2.0), 0.0, 30.0, 20.0, 20.0, 2.0);
        // Point up-dip in the middle of the projection
        let (lon, lat) = tremor_types::geo::point_at(0.0, 0.09, 90.0, 5.0);
        let site = Point::surface(lon, lat);
        assert_eq!(m.joyner_boore_distance(&site), 0.0);
        assert!(m.min_distance(&site) > 0.0);
    }

    #[test]
    fn test_sub_mesh_and_middle() {
        let m = vertical_fault();
        let sub = m.sub_mesh(2, 3, 3, 5);
        assert_eq!(sub.rows(), 3);
        assert_eq!(sub.cols(), 5);
        assert_eq!(sub.at(0, 0), m.at(2, 3));
        let mid = sub.middle_point();
        assert_eq!(mid, *m.at(3, 5));
    }

    #[test]
    fn test_top_edge_depth() {
        let m = Mesh::planar(Point::new(0.0, 0.0, 3.0), 45.0, 60.0, 10.0, 8.0, 2.0);
        assert!((m.top_edge_depth() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_rejects_wrong_count() {
        assert!(Mesh::new(2, 2, vec![Point::surface(0.0, 0.0)]).is_err());
    }
}
